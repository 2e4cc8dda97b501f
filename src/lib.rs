//! sqlweave: a lightweight data-access layer over SQLite.
//!
//! - named, pooled data sources ([`DataSourceRegistry`])
//! - transactions scoped to a [`Session`] and applied across every data source
//! - `{name}` templates and condition sets compiled to positional SQL
//! - a [`Template`] facade for table-scoped CRUD, free-form SQL and paging
//!
//! ```no_run
//! use std::sync::Arc;
//! use sqlweave::{config, ConditionSet, DataSourceRegistry, Row};
//!
//! # fn main() -> sqlweave::Result<()> {
//! let config = config::load_config("sqlweave.toml")?;
//! let registry = Arc::new(DataSourceRegistry::from_config(&config)?);
//!
//! let session = registry.session();
//! session.begin_transaction()?;
//! let open: Vec<Row> = session
//!     .template()
//!     .select("tickets", &ConditionSet::all().eq("status", "open"))?;
//! session.commit()?;
//! # let _ = open;
//! # Ok(())
//! # }
//! ```

// Core infrastructure modules
pub mod core;

// Feature modules
pub mod config;
pub mod page;
pub mod record;
pub mod sql;
pub mod template;
pub mod transaction;

#[cfg(test)]
pub(crate) mod test_utils;

pub use crate::core::db::{DataSource, DataSourceRegistry, QueryExecutor};
pub use crate::core::{Args, IntoValue, NamedParams, Result, Row, Value, WeaveError};
pub use crate::page::{PageRequest, PageResult};
pub use crate::sql::{CompiledSql, Condition, ConditionSet, OrderBy};
pub use crate::template::Template;
pub use crate::transaction::{IsolationLevel, ScopedConnection, Session};
