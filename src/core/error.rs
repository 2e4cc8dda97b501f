/// Sqlweave Error Module
///
/// This module defines the error taxonomy shared by the compiler, the
/// transaction coordinator and the query facade. Compilation and policy
/// errors are raised before any connection is touched; database and pool
/// errors pass through unchanged.
use thiserror::Error;

/// Comprehensive error type for sqlweave.
///
/// The variants fall into three groups:
/// - SQL compilation (missing named parameters, placeholder/parameter drift,
///   malformed conditions)
/// - Safety and multiplicity policies (unconditional destructive operations,
///   `select_one` matching several rows)
/// - Transaction state, configuration, and pass-through errors from
///   `rusqlite`, `r2d2` and `serde_json`
#[derive(Error, Debug)]
pub enum WeaveError {
    /// A `{name}` placeholder has no value in the supplied parameter map
    #[error("Missing parameter: no value supplied for placeholder {{{0}}}")]
    MissingParameter(String),

    /// The compiled SQL and its parameter list disagree in length
    #[error("Parameter count mismatch: SQL has {placeholders} placeholder(s) but {params} parameter(s) were bound")]
    ParameterCountMismatch { placeholders: usize, params: usize },

    /// A condition whose operand does not fit its comparator
    #[error("Invalid condition: {0}")]
    InvalidCondition(String),

    /// Update or delete without any filter condition
    #[error("Condition required: unconditional {0} is refused, write the SQL explicitly instead")]
    ConditionRequired(&'static str),

    /// `select_one` matched more than one row
    #[error("Multiple rows error: expected at most one row but the query returned {0}")]
    MultipleRows(usize),

    /// Commit or rollback with no transaction in progress
    #[error("Transaction error: no transaction in progress")]
    NoActiveTransaction,

    /// Begin while this session already has a transaction in progress
    #[error("Transaction error: a transaction is already in progress for this session")]
    TransactionActive,

    /// Other transaction state errors
    #[error("Transaction error: {0}")]
    Transaction(String),

    /// Lookup of a data source name that was never registered
    #[error("Unknown data source: {0}")]
    UnknownDataSource(String),

    /// Paging request that cannot be satisfied
    #[error("Invalid page request: {0}")]
    InvalidPage(String),

    /// Record to column mapping errors
    #[error("Mapping error: {0}")]
    Mapping(String),

    /// Configuration loading and validation errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Database-related errors from SQLite operations
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Connection pool errors (checkout timeout, failed initialization)
    #[error("Connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    /// JSON conversion errors from the record mapper
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// File system and I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl WeaveError {
    /// Returns true for errors raised by the underlying database or pool.
    pub fn is_database_error(&self) -> bool {
        matches!(self, WeaveError::Database(_) | WeaveError::Pool(_))
    }
}

/// Type alias for Result to use WeaveError as the error type.
pub type Result<T> = std::result::Result<T, WeaveError>;

/// Asserts that `$result` is an `Err` matching `$expected`, naming `$context` on failure.
#[macro_export]
macro_rules! assert_weave_error {
    ($result:expr, $expected:pat, $context:expr) => {
        match $result {
            Err($expected) => {}
            Ok(_) => panic!("Expected {} but got Ok in {}", stringify!($expected), $context),
            Err(other) => panic!("Expected {} but got {:?} in {}", stringify!($expected), other, $context),
        }
    };
}
