/// Query Execution Module
///
/// The row executor: runs compiled SQL on a borrowed connection and turns
/// result rows into column-name keyed maps. It never acquires or releases
/// connections; ownership stays with whoever resolved the connection.

use crate::core::value::{json_from_sql, Row};
use crate::core::Result;
use crate::sql::CompiledSql;
use rusqlite::{params_from_iter, Connection};
use tracing::debug;

/// Query execution service that operates on a database connection
pub struct QueryExecutor<'a> {
    connection: &'a Connection,
}

impl<'a> QueryExecutor<'a> {
    /// Creates a new QueryExecutor for the given connection
    pub fn new(connection: &'a Connection) -> Self {
        QueryExecutor { connection }
    }

    /// Executes a query and collects every row.
    ///
    /// # Errors
    ///
    /// Returns `WeaveError::Database` if the statement cannot be prepared or
    /// a row cannot be read.
    pub fn execute_query(&self, compiled: &CompiledSql) -> Result<Vec<Row>> {
        debug!(sql = compiled.sql(), params = compiled.params().len(), "executing query");
        let mut stmt = self.connection.prepare(compiled.sql())?;

        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();

        let mut rows = stmt.query(params_from_iter(compiled.params()))?;
        let mut result = Vec::new();
        while let Some(row) = rows.next()? {
            let mut record = Row::new();
            for (i, column) in columns.iter().enumerate() {
                record.insert(column.clone(), json_from_sql(row.get_ref(i)?));
            }
            result.push(record);
        }
        debug!("query returned {} row(s)", result.len());
        Ok(result)
    }

    /// Executes an insert, update, delete or DDL statement.
    ///
    /// # Returns
    ///
    /// The number of rows changed.
    pub fn execute_update(&self, compiled: &CompiledSql) -> Result<usize> {
        debug!(sql = compiled.sql(), params = compiled.params().len(), "executing update");
        let mut stmt = self.connection.prepare(compiled.sql())?;
        let changed = stmt.execute(params_from_iter(compiled.params()))?;
        debug!("update affected {} row(s)", changed);
        Ok(changed)
    }

    /// Rowid of the most recent successful insert on this connection.
    pub fn last_insert_rowid(&self) -> i64 {
        self.connection.last_insert_rowid()
    }
}
