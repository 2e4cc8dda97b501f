/// SQL Module
///
/// Pure SQL assembly with no I/O:
/// - **Conditions** (`condition.rs`): predicates, nested and/or sets, ordering
/// - **Compiler** (`compiler.rs`): `{name}` templates and condition sets to positional SQL
/// - **Statements** (`statement.rs`): single-table select/count/insert/update/delete
///
/// Every compiled statement shares one parameter binding path, so the
/// placeholder count and the parameter list cannot drift apart.
pub mod compiler;
pub mod condition;
pub mod statement;

pub use compiler::{compile_conditions, compile_template, count_placeholders, CompiledSql};
pub use condition::{Comparator, Condition, ConditionSet, Connective, Direction, Node, Operand, OrderBy};
pub use statement::Statement;
