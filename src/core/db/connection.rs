/// Connection Management Module
///
/// This module provides the data source registry: named `r2d2` pools of
/// SQLite connections plus the designated default. The registry is built once
/// at startup and shared read-only through an `Arc`.

use crate::config::{Config, DataSourceConfig};
use crate::core::{Result, WeaveError};
use crate::transaction::Session;
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// A connection checked out of a data source pool. Dropping it returns it.
pub type PooledConnection = r2d2::PooledConnection<SqliteConnectionManager>;

/// A named, independently pooled SQLite database.
#[derive(Clone)]
pub struct DataSource {
    name: String,
    pool: Pool<SqliteConnectionManager>,
}

impl fmt::Debug for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataSource")
            .field("name", &self.name)
            .field("state", &self.pool.state())
            .finish()
    }
}

impl DataSource {
    /// Wraps an existing pool.
    pub fn new(name: impl Into<String>, pool: Pool<SqliteConnectionManager>) -> Self {
        DataSource {
            name: name.into(),
            pool,
        }
    }

    /// Builds the pool described by `config`.
    ///
    /// Every pooled connection is initialized with the busy timeout, the
    /// foreign key setting and the journal mode before it is handed out.
    pub fn open(config: &DataSourceConfig) -> Result<Self> {
        config.validate()?;

        let manager = if config.path == ":memory:" {
            SqliteConnectionManager::memory()
        } else {
            SqliteConnectionManager::file(&config.path)
        };

        let busy_timeout = Duration::from_millis(config.busy_timeout_ms());
        let foreign_keys = config.foreign_keys();
        let journal_mode = config.journal_mode();
        let manager = manager.with_init(move |conn| {
            conn.busy_timeout(busy_timeout)?;
            conn.pragma_update(None, "foreign_keys", foreign_keys)?;
            // journal_mode reports the resulting mode as a row
            let _mode: String = conn.query_row(
                &format!("PRAGMA journal_mode = {}", journal_mode),
                [],
                |row| row.get(0),
            )?;
            Ok(())
        });

        let pool = Pool::builder()
            .max_size(config.max_size())
            .min_idle(config.min_idle)
            .connection_timeout(Duration::from_millis(config.connection_timeout_ms()))
            .build(manager)?;

        info!(
            "Opened data source '{}' at {} (max_size {})",
            config.name,
            config.path,
            config.max_size()
        );
        Ok(DataSource::new(config.name.clone(), pool))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Checks out an autocommit connection, blocking up to the pool timeout.
    pub fn connection(&self) -> Result<PooledConnection> {
        let conn = self.pool.get()?;
        debug!("Acquired connection from data source '{}'", self.name);
        Ok(conn)
    }

    /// Current pool occupancy.
    pub fn state(&self) -> r2d2::State {
        self.pool.state()
    }

    /// Number of connections currently checked out.
    pub fn checked_out(&self) -> u32 {
        let state = self.pool.state();
        state.connections - state.idle_connections
    }

    pub fn pool(&self) -> &Pool<SqliteConnectionManager> {
        &self.pool
    }
}

/// Process-wide mapping from data source name to pool, plus the default name.
#[derive(Debug)]
pub struct DataSourceRegistry {
    sources: BTreeMap<String, DataSource>,
    default: String,
}

impl DataSourceRegistry {
    /// Creates a registry from already opened data sources.
    ///
    /// Fails if a name is registered twice or `default` is not among them.
    pub fn new(default: impl Into<String>, sources: Vec<DataSource>) -> Result<Self> {
        let default = default.into();
        let mut map = BTreeMap::new();
        for source in sources {
            let name = source.name().to_string();
            if map.insert(name.clone(), source).is_some() {
                return Err(WeaveError::Config(format!(
                    "data source '{}' registered twice",
                    name
                )));
            }
        }
        if !map.contains_key(&default) {
            return Err(WeaveError::Config(format!(
                "default data source '{}' is not registered",
                default
            )));
        }
        info!(
            "Registered {} data source(s), default '{}'",
            map.len(),
            default
        );
        Ok(DataSourceRegistry {
            sources: map,
            default,
        })
    }

    /// Opens every data source in `config`.
    pub fn from_config(config: &Config) -> Result<Self> {
        config.validate()?;
        let sources = config
            .data_sources
            .iter()
            .map(DataSource::open)
            .collect::<Result<Vec<_>>>()?;
        DataSourceRegistry::new(config.default_name()?, sources)
    }

    /// Looks up a data source by name.
    pub fn get(&self, name: &str) -> Result<&DataSource> {
        self.sources
            .get(name)
            .ok_or_else(|| WeaveError::UnknownDataSource(name.to_string()))
    }

    pub fn default_name(&self) -> &str {
        &self.default
    }

    pub fn default_source(&self) -> &DataSource {
        // `new` guarantees the default is registered
        &self.sources[&self.default]
    }

    /// Registered names in ascending order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.sources.keys().map(String::as_str)
    }

    /// Registered data sources in ascending name order.
    pub fn iter(&self) -> impl Iterator<Item = &DataSource> {
        self.sources.values()
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Total connections checked out across every pool.
    pub fn checked_out(&self) -> u32 {
        self.sources.values().map(DataSource::checked_out).sum()
    }

    /// Starts a new logical execution context over this registry.
    pub fn session(self: &Arc<Self>) -> Session {
        Session::new(Arc::clone(self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn open_source(dir: &TempDir, name: &str) -> DataSource {
        let path = dir.path().join(format!("{}.db", name));
        let mut config = DataSourceConfig::new(name, path.to_string_lossy());
        config.max_size = Some(2);
        DataSource::open(&config).unwrap()
    }

    #[test]
    fn test_open_applies_connection_init() {
        let dir = TempDir::new().unwrap();
        let source = open_source(&dir, "main");
        let conn = source.connection().unwrap();

        let fk: i64 = conn.query_row("PRAGMA foreign_keys", [], |r| r.get(0)).unwrap();
        assert_eq!(fk, 1);
        let mode: String = conn.query_row("PRAGMA journal_mode", [], |r| r.get(0)).unwrap();
        assert_eq!(mode, "wal");
    }

    #[test]
    fn test_checked_out_tracks_drops() {
        let dir = TempDir::new().unwrap();
        let source = open_source(&dir, "main");
        assert_eq!(source.checked_out(), 0);

        let conn = source.connection().unwrap();
        assert_eq!(source.checked_out(), 1);
        drop(conn);
        assert_eq!(source.checked_out(), 0);
    }

    #[test]
    fn test_registry_lookup() {
        let dir = TempDir::new().unwrap();
        let registry = DataSourceRegistry::new(
            "main",
            vec![open_source(&dir, "main"), open_source(&dir, "audit")],
        )
        .unwrap();

        assert_eq!(registry.default_name(), "main");
        assert_eq!(registry.default_source().name(), "main");
        assert_eq!(registry.names().collect::<Vec<_>>(), vec!["audit", "main"]);
        assert!(matches!(
            registry.get("nope"),
            Err(WeaveError::UnknownDataSource(name)) if name == "nope"
        ));
    }

    #[test]
    fn test_registry_rejects_bad_setup() {
        let dir = TempDir::new().unwrap();
        let duplicate =
            DataSourceRegistry::new("main", vec![open_source(&dir, "main"), open_source(&dir, "main")]);
        assert!(matches!(duplicate, Err(WeaveError::Config(_))));

        let no_default = DataSourceRegistry::new("other", vec![open_source(&dir, "main")]);
        assert!(matches!(no_default, Err(WeaveError::Config(_))));
    }

    #[test]
    fn test_from_config() {
        let dir = TempDir::new().unwrap();
        let config = Config {
            default: None,
            data_sources: vec![DataSourceConfig::new(
                "main",
                dir.path().join("main.db").to_string_lossy(),
            )],
        };
        let registry = DataSourceRegistry::from_config(&config).unwrap();
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.default_name(), "main");
    }
}
