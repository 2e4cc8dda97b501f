/// # Test Utilities Module
///
/// Fixtures for unit tests that need real pooled data sources:
/// - `RegistryFixture`: file-backed data sources in a temporary directory,
///   each with the standard schema applied

use crate::config::DataSourceConfig;
use crate::core::db::{DataSource, DataSourceRegistry};
use crate::transaction::Session;
use std::sync::Arc;
use tempfile::TempDir;

/// Schema applied to every fixture data source.
pub const STANDARD_SCHEMA: &str = "
    CREATE TABLE users (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        username TEXT NOT NULL UNIQUE,
        email TEXT NOT NULL UNIQUE,
        created_at DATETIME DEFAULT CURRENT_TIMESTAMP
    );

    CREATE TABLE posts (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id INTEGER NOT NULL,
        title TEXT NOT NULL,
        FOREIGN KEY (user_id) REFERENCES users (id) DEFERRABLE INITIALLY DEFERRED
    );
";

/// Isolated data sources living in a temporary directory.
pub struct RegistryFixture {
    pub registry: Arc<DataSourceRegistry>,
    // keeps the database files alive for the fixture's lifetime
    _dir: TempDir,
}

impl RegistryFixture {
    /// One data source per name, the first being the default.
    pub fn new(names: &[&str]) -> Self {
        Self::with_pool_size(names, 4)
    }

    pub fn with_pool_size(names: &[&str], max_size: u32) -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let sources = names
            .iter()
            .map(|name| {
                let path = dir.path().join(format!("{}.db", name));
                let mut config = DataSourceConfig::new(*name, path.to_string_lossy());
                config.max_size = Some(max_size);
                config.connection_timeout_ms = Some(500);
                let source = DataSource::open(&config).expect("Failed to open data source");
                source
                    .connection()
                    .and_then(|conn| Ok(conn.execute_batch(STANDARD_SCHEMA)?))
                    .expect("Failed to create schema");
                source
            })
            .collect();

        let registry = DataSourceRegistry::new(names[0], sources).expect("Failed to build registry");
        RegistryFixture {
            registry: Arc::new(registry),
            _dir: dir,
        }
    }

    pub fn session(&self) -> Session {
        self.registry.session()
    }

    /// Counts rows through a fresh pooled connection, outside any session.
    pub fn count_rows(&self, data_source: &str, table: &str) -> i64 {
        let conn = self
            .registry
            .get(data_source)
            .and_then(|source| source.connection())
            .expect("Failed to get connection");
        conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| row.get(0))
            .expect("Failed to count rows")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assert_weave_error;
    use crate::core::{Result, WeaveError};

    #[test]
    fn test_fixture_creation() {
        let fixture = RegistryFixture::new(&["main", "audit"]);
        assert_eq!(fixture.registry.default_name(), "main");
        assert_eq!(fixture.count_rows("audit", "users"), 0);
        assert_eq!(fixture.registry.checked_out(), 0);
    }

    #[test]
    fn test_error_assertion_macro() {
        let result: Result<i32> = Err(WeaveError::MultipleRows(3));
        assert_weave_error!(result, WeaveError::MultipleRows(3), "macro test");
    }
}
