/// Core Module for sqlweave
///
/// Shared infrastructure used by the compiler, the transaction coordinator
/// and the query facade: the error taxonomy, parameter and row values, the
/// data source registry with its row executor, and logging setup.

pub mod db;
pub mod error;
pub mod logging;
pub mod value;

// Re-export commonly used types for convenience
pub use error::{Result, WeaveError};
pub use value::{Args, IntoValue, NamedParams, Row, Value};
