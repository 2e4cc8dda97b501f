/// Transaction Module
///
/// Session-scoped transaction coordination and connection resolution.
///
/// A [`Session`] is one logical execution context. While it has a transaction
/// in progress it holds one connection per registered data source, each with
/// an open manual-commit transaction, and every operation run through the
/// session uses those connections. Outside a transaction each operation
/// checks out its own autocommit connection and returns it when done.
///
/// ## Ownership
///
/// [`ScopedConnection`] encodes who releases a connection: a
/// `Transactional` connection is only borrowed from the session and goes back
/// to its pool on commit or rollback; a `Pooled` one is owned by the caller
/// and goes back to its pool when dropped.

use crate::core::db::{DataSourceRegistry, PooledConnection};
use crate::core::{Result, WeaveError};
use crate::template::Template;
use rusqlite::Connection;
use std::cell::{Ref, RefCell};
use std::collections::BTreeMap;
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Isolation level requested when a transaction begins.
///
/// SQLite has no per-transaction isolation setting, so each level maps to a
/// lock acquisition mode (and `read_uncommitted` for shared-cache readers):
///
/// | Level | SQLite |
/// |---|---|
/// | `ReadUncommitted` | `PRAGMA read_uncommitted = 1`, `BEGIN DEFERRED` |
/// | `ReadCommitted` | `BEGIN DEFERRED` |
/// | `RepeatableRead` | `BEGIN IMMEDIATE` |
/// | `Serializable` | `BEGIN EXCLUSIVE` |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IsolationLevel {
    ReadUncommitted,
    #[default]
    ReadCommitted,
    RepeatableRead,
    Serializable,
}

impl IsolationLevel {
    fn begin_sql(self) -> &'static str {
        match self {
            IsolationLevel::ReadUncommitted | IsolationLevel::ReadCommitted => "BEGIN DEFERRED",
            IsolationLevel::RepeatableRead => "BEGIN IMMEDIATE",
            IsolationLevel::Serializable => "BEGIN EXCLUSIVE",
        }
    }

    /// Switches the connection out of autocommit mode at this level.
    ///
    /// If `BEGIN` fails, `read_uncommitted` is cleared again so the
    /// connection goes back to its pool unchanged.
    fn begin(self, conn: &Connection) -> Result<()> {
        let uncommitted = self == IsolationLevel::ReadUncommitted;
        conn.pragma_update(None, "read_uncommitted", uncommitted)?;
        if let Err(e) = conn.execute_batch(self.begin_sql()) {
            if uncommitted {
                if let Err(reset) = conn.pragma_update(None, "read_uncommitted", false) {
                    warn!("Could not reset read_uncommitted after failed BEGIN: {}", reset);
                }
            }
            return Err(e.into());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Commit,
    Rollback,
}

impl Outcome {
    fn sql(self) -> &'static str {
        match self {
            Outcome::Commit => "COMMIT",
            Outcome::Rollback => "ROLLBACK",
        }
    }
}

/// Connections held by an active transaction, keyed by data source name.
struct TransactionContext {
    level: IsolationLevel,
    connections: BTreeMap<String, PooledConnection>,
}

impl TransactionContext {
    /// Opens a transaction on every registered data source.
    ///
    /// If any acquisition or `BEGIN` fails, the connections opened so far are
    /// rolled back and returned to their pools before the error is returned.
    fn open(registry: &DataSourceRegistry, level: IsolationLevel) -> Result<Self> {
        let mut context = TransactionContext {
            level,
            connections: BTreeMap::new(),
        };
        for source in registry.iter() {
            let acquired = source.connection().and_then(|conn| {
                level.begin(&conn)?;
                Ok(conn)
            });
            match acquired {
                Ok(conn) => {
                    context.connections.insert(source.name().to_string(), conn);
                }
                Err(e) => {
                    // connections that failed BEGIN are still in autocommit and drop cleanly
                    if let Err(cleanup) = context.finish(Outcome::Rollback) {
                        warn!("Rollback of partially opened transaction failed: {}", cleanup);
                    }
                    return Err(e);
                }
            }
        }
        Ok(context)
    }

    /// Applies `outcome` to every connection and releases all of them.
    ///
    /// Every connection is attempted even after a failure; the first error
    /// is returned once all connections are back in their pools. A connection
    /// left inside a transaction by a failed COMMIT is rolled back first.
    fn finish(self, outcome: Outcome) -> Result<()> {
        let level = self.level;
        let mut first_error: Option<WeaveError> = None;

        for (name, conn) in self.connections {
            if let Err(e) = conn.execute_batch(outcome.sql()) {
                error!("{} failed on data source '{}': {}", outcome.sql(), name, e);
                first_error.get_or_insert(WeaveError::Database(e));
            }
            if !conn.is_autocommit() {
                if let Err(e) = conn.execute_batch("ROLLBACK") {
                    error!("Cleanup rollback failed on data source '{}': {}", name, e);
                }
            }
            if level == IsolationLevel::ReadUncommitted {
                if let Err(e) = conn.pragma_update(None, "read_uncommitted", false) {
                    warn!("Could not reset read_uncommitted on data source '{}': {}", name, e);
                }
            }
            debug!("Released transactional connection for data source '{}'", name);
            // dropping `conn` returns it to the pool
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

/// A connection resolved for one operation.
pub enum ScopedConnection<'s> {
    /// Borrowed from the session's active transaction; never released by the caller.
    Transactional(Ref<'s, PooledConnection>),
    /// Checked out for this operation alone; dropping it returns it to the pool.
    Pooled(PooledConnection),
}

impl ScopedConnection<'_> {
    pub fn is_transactional(&self) -> bool {
        matches!(self, ScopedConnection::Transactional(_))
    }
}

impl Deref for ScopedConnection<'_> {
    type Target = Connection;

    fn deref(&self) -> &Connection {
        match self {
            ScopedConnection::Transactional(conn) => conn,
            ScopedConnection::Pooled(conn) => conn,
        }
    }
}

impl fmt::Debug for ScopedConnection<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopedConnection")
            .field("transactional", &self.is_transactional())
            .finish()
    }
}

/// One logical execution context over a [`DataSourceRegistry`].
///
/// A session is `Send` but not `Sync`: hand it to the thread or task that
/// does the work, and create one session per concurrent unit of work.
pub struct Session {
    registry: Arc<DataSourceRegistry>,
    context: RefCell<Option<TransactionContext>>,
}

impl Session {
    pub fn new(registry: Arc<DataSourceRegistry>) -> Self {
        Session {
            registry,
            context: RefCell::new(None),
        }
    }

    pub fn registry(&self) -> &Arc<DataSourceRegistry> {
        &self.registry
    }

    /// Facade over the default data source.
    pub fn template(&self) -> Template<'_> {
        Template::new(self, self.registry.default_name())
    }

    /// Facade over a named data source.
    pub fn template_for(&self, data_source: &str) -> Result<Template<'_>> {
        self.registry.get(data_source)?;
        Ok(Template::new(self, data_source))
    }

    /// True while a transaction is in progress.
    pub fn is_active(&self) -> bool {
        self.context.borrow().is_some()
    }

    /// Isolation level of the transaction in progress.
    pub fn isolation_level(&self) -> Option<IsolationLevel> {
        self.context.borrow().as_ref().map(|context| context.level)
    }

    /// Begins a read-committed transaction across every data source.
    pub fn begin_transaction(&self) -> Result<()> {
        self.begin_transaction_with(IsolationLevel::default())
    }

    /// Begins a transaction across every registered data source.
    ///
    /// # Errors
    ///
    /// - `TransactionActive` if this session already has one in progress
    /// - pool or database errors from acquiring and opening connections; no
    ///   connection stays checked out in that case
    pub fn begin_transaction_with(&self, level: IsolationLevel) -> Result<()> {
        let mut slot = self
            .context
            .try_borrow_mut()
            .map_err(|_| WeaveError::Transaction("transaction connections are still in use".to_string()))?;
        if slot.is_some() {
            return Err(WeaveError::TransactionActive);
        }

        match TransactionContext::open(&self.registry, level) {
            Ok(context) => {
                info!(
                    "Transaction started on {} data source(s) at {:?}",
                    context.connections.len(),
                    level
                );
                *slot = Some(context);
                Ok(())
            }
            Err(e) => {
                error!("Error beginning transaction: {}", e);
                Err(e)
            }
        }
    }

    /// Commits on every data source, then releases all connections.
    ///
    /// Connections are released and the session returns to autocommit even
    /// when a commit fails; the first failure is returned.
    pub fn commit(&self) -> Result<()> {
        let context = self.take_context()?;
        context.finish(Outcome::Commit).map_err(|e| {
            error!("Error committing transaction: {}", e);
            e
        })?;
        info!("Transaction committed");
        Ok(())
    }

    /// Rolls back on every data source, then releases all connections.
    pub fn rollback(&self) -> Result<()> {
        let context = self.take_context()?;
        context.finish(Outcome::Rollback).map_err(|e| {
            error!("Error rolling back transaction: {}", e);
            e
        })?;
        info!("Transaction rolled back");
        Ok(())
    }

    /// Runs `f` inside a transaction: commit on `Ok`, rollback on `Err`.
    pub fn in_transaction<T, F>(&self, level: IsolationLevel, f: F) -> Result<T>
    where
        F: FnOnce(&Session) -> Result<T>,
    {
        self.begin_transaction_with(level)?;
        match f(self) {
            Ok(value) => {
                self.commit()?;
                Ok(value)
            }
            Err(e) => {
                if let Err(rollback) = self.rollback() {
                    warn!("Rollback after failed unit of work also failed: {}", rollback);
                }
                Err(e)
            }
        }
    }

    /// Resolves the connection an operation on `data_source` must use.
    ///
    /// Inside a transaction this is the session's connection for that data
    /// source; otherwise a fresh autocommit connection from its pool.
    pub fn resolve(&self, data_source: &str) -> Result<ScopedConnection<'_>> {
        let context = self
            .context
            .try_borrow()
            .map_err(|_| WeaveError::Transaction("transaction state is being modified".to_string()))?;

        if context.is_some() {
            return Ref::filter_map(context, |context| {
                context
                    .as_ref()
                    .and_then(|context| context.connections.get(data_source))
            })
            .map(ScopedConnection::Transactional)
            .map_err(|_| WeaveError::UnknownDataSource(data_source.to_string()));
        }
        drop(context);

        let conn = self.registry.get(data_source)?.connection()?;
        Ok(ScopedConnection::Pooled(conn))
    }

    fn take_context(&self) -> Result<TransactionContext> {
        let mut slot = self
            .context
            .try_borrow_mut()
            .map_err(|_| WeaveError::Transaction("transaction connections are still in use".to_string()))?;
        slot.take().ok_or(WeaveError::NoActiveTransaction)
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("default", &self.registry.default_name())
            .field("isolation_level", &self.context.try_borrow().ok().and_then(|c| c.as_ref().map(|c| c.level)))
            .finish()
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if let Some(context) = self.context.get_mut().take() {
            warn!("Session dropped with a transaction in progress; rolling back");
            if let Err(e) = context.finish(Outcome::Rollback) {
                error!("Implicit rollback failed: {}", e);
            }
        }
    }
}
