use crate::core::{Result, WeaveError};
use serde::Deserialize;
use std::fs;
use std::path::Path;

const DEFAULT_MAX_SIZE: u32 = 8;
const DEFAULT_CONNECTION_TIMEOUT_MS: u64 = 30_000;
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// Journal modes accepted by `PRAGMA journal_mode`.
const JOURNAL_MODES: &[&str] = &["delete", "truncate", "persist", "memory", "wal", "off"];

/// Top-level configuration structure parsed from a TOML file.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Name of the data source used when none is given explicitly.
    pub default: Option<String>,
    pub data_sources: Vec<DataSourceConfig>,
}

/// One named SQLite data source and its pool settings.
#[derive(Debug, Clone, Deserialize)]
pub struct DataSourceConfig {
    pub name: String,
    /// Database file, or ":memory:" for a private in-memory database per connection.
    pub path: String,
    pub max_size: Option<u32>,
    pub min_idle: Option<u32>,
    pub connection_timeout_ms: Option<u64>,
    pub busy_timeout_ms: Option<u64>,
    pub foreign_keys: Option<bool>,
    pub journal_mode: Option<String>,
}

impl DataSourceConfig {
    /// A file-backed data source with default pool settings.
    pub fn new(name: impl Into<String>, path: impl Into<String>) -> Self {
        DataSourceConfig {
            name: name.into(),
            path: path.into(),
            max_size: None,
            min_idle: None,
            connection_timeout_ms: None,
            busy_timeout_ms: None,
            foreign_keys: None,
            journal_mode: None,
        }
    }

    pub fn max_size(&self) -> u32 {
        self.max_size.unwrap_or(DEFAULT_MAX_SIZE)
    }

    pub fn connection_timeout_ms(&self) -> u64 {
        self.connection_timeout_ms.unwrap_or(DEFAULT_CONNECTION_TIMEOUT_MS)
    }

    pub fn busy_timeout_ms(&self) -> u64 {
        self.busy_timeout_ms.unwrap_or(DEFAULT_BUSY_TIMEOUT_MS)
    }

    pub fn foreign_keys(&self) -> bool {
        self.foreign_keys.unwrap_or(true)
    }

    /// Lower-cased journal mode, "wal" unless configured.
    pub fn journal_mode(&self) -> String {
        self.journal_mode
            .as_deref()
            .unwrap_or("wal")
            .to_ascii_lowercase()
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(WeaveError::Config("data source name must not be empty".to_string()));
        }
        if self.max_size() == 0 {
            return Err(WeaveError::Config(format!(
                "data source '{}': max_size must be at least 1",
                self.name
            )));
        }
        if let Some(min_idle) = self.min_idle {
            if min_idle > self.max_size() {
                return Err(WeaveError::Config(format!(
                    "data source '{}': min_idle ({}) exceeds max_size ({})",
                    self.name,
                    min_idle,
                    self.max_size()
                )));
            }
        }
        let mode = self.journal_mode();
        if !JOURNAL_MODES.contains(&mode.as_str()) {
            return Err(WeaveError::Config(format!(
                "data source '{}': unsupported journal_mode '{}'",
                self.name, mode
            )));
        }
        Ok(())
    }
}

impl Config {
    /// Parses a configuration from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Config =
            toml::from_str(content).map_err(|e| WeaveError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// The configured default name, or the only data source when there is exactly one.
    pub fn default_name(&self) -> Result<&str> {
        match (&self.default, self.data_sources.as_slice()) {
            (Some(name), _) => Ok(name.as_str()),
            (None, [only]) => Ok(only.name.as_str()),
            (None, _) => Err(WeaveError::Config(
                "a default data source must be named when several are configured".to_string(),
            )),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.data_sources.is_empty() {
            return Err(WeaveError::Config("at least one data source is required".to_string()));
        }
        for source in &self.data_sources {
            source.validate()?;
        }
        let default = self.default_name()?;
        if !self.data_sources.iter().any(|s| s.name == default) {
            return Err(WeaveError::Config(format!(
                "default data source '{}' is not configured",
                default
            )));
        }
        Ok(())
    }
}

/// Loads configuration from a TOML file at the given path.
///
/// # Arguments
///
/// * `path` - The file path to the TOML configuration file.
///
/// # Example
///
/// ```no_run
/// let config = sqlweave::config::load_config("sqlweave.toml").expect("Failed to load config");
/// println!("{:?}", config.default_name());
/// ```
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let content = fs::read_to_string(path)?;
    Config::from_toml_str(&content)
}
