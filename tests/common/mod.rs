//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use serde::{Deserialize, Serialize};
use sqlweave::config::DataSourceConfig;
use sqlweave::{DataSource, DataSourceRegistry, Session};
use std::sync::Arc;
use tempfile::TempDir;

pub const SCHEMA: &str = "
    CREATE TABLE accounts (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        owner TEXT NOT NULL,
        balance INTEGER NOT NULL DEFAULT 0
    );

    CREATE TABLE transfers (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        account_id INTEGER NOT NULL,
        amount INTEGER NOT NULL,
        FOREIGN KEY (account_id) REFERENCES accounts (id) DEFERRABLE INITIALLY DEFERRED
    );
";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Account {
    pub id: Option<i64>,
    pub owner: String,
    pub balance: i64,
}

impl Account {
    pub fn new(owner: &str, balance: i64) -> Self {
        Account {
            id: None,
            owner: owner.to_string(),
            balance,
        }
    }
}

/// File-backed data sources in a temporary directory, schema applied.
pub struct Fixture {
    pub registry: Arc<DataSourceRegistry>,
    _dir: TempDir,
}

impl Fixture {
    pub fn new(names: &[&str]) -> Self {
        Self::with_pool_size(names, 4)
    }

    pub fn with_pool_size(names: &[&str], max_size: u32) -> Self {
        sqlweave::core::logging::init_for_tests();
        let dir = TempDir::new().unwrap();
        let sources = names
            .iter()
            .map(|name| {
                let mut config =
                    DataSourceConfig::new(*name, dir.path().join(format!("{}.db", name)).to_string_lossy());
                config.max_size = Some(max_size);
                config.connection_timeout_ms = Some(300);
                let source = DataSource::open(&config).unwrap();
                source.connection().unwrap().execute_batch(SCHEMA).unwrap();
                source
            })
            .collect();
        Fixture {
            registry: Arc::new(DataSourceRegistry::new(names[0], sources).unwrap()),
            _dir: dir,
        }
    }

    pub fn session(&self) -> Session {
        self.registry.session()
    }

    /// Row count seen by a fresh autocommit connection.
    pub fn count(&self, data_source: &str, table: &str) -> i64 {
        let conn = self.registry.get(data_source).unwrap().connection().unwrap();
        conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| row.get(0))
            .unwrap()
    }

    /// True when no pool has a connection checked out.
    pub fn all_idle(&self) -> bool {
        self.registry.checked_out() == 0
    }
}
