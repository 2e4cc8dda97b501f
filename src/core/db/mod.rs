/// Database Module
///
/// The database layer is split into two concerns:
/// - **Connection Management** (`connection.rs`): named data source pools and the registry
/// - **Query Execution** (`query.rs`): running compiled SQL on a connection and collecting rows
///
/// Transactions live one level up in `crate::transaction`, because they span
/// every registered data source at once.
pub mod connection;
pub mod query;

pub use connection::*;
pub use query::*;
