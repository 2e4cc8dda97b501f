/// Query Template Module
///
/// The public read/write facade. A [`Template`] is bound to a [`Session`] and
/// one data source; each call compiles its SQL first, then resolves a
/// connection through the session, runs it, and releases the connection
/// (unless it belongs to the session's transaction).
///
/// ## Safety policy
///
/// Table-scoped `update` and `delete` refuse an empty condition set with
/// `ConditionRequired`. Unconditional destructive statements must be written
/// out as SQL and run through `exec`.

use crate::core::db::QueryExecutor;
use crate::core::value::{Args, Row};
use crate::core::{Result, WeaveError};
use crate::page::{PageRequest, PageResult};
use crate::record;
use crate::sql::{compile_template, CompiledSql, ConditionSet, OrderBy, Statement};
use crate::transaction::Session;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value as JsonValue;
use tracing::debug;

/// Column the count query of a page must return.
const TOTAL_COLUMN: &str = "total";

/// Read/write operations against one data source within a session.
#[derive(Debug, Clone)]
pub struct Template<'s> {
    session: &'s Session,
    data_source: String,
}

impl<'s> Template<'s> {
    pub fn new(session: &'s Session, data_source: impl Into<String>) -> Self {
        Template {
            session,
            data_source: data_source.into(),
        }
    }

    pub fn data_source(&self) -> &str {
        &self.data_source
    }

    /* ---------------------------- single-table operations ---------------------------- */

    /// `select *` from `table` filtered by `conditions`; an empty set selects every row.
    pub fn select<T: DeserializeOwned>(&self, table: &str, conditions: &ConditionSet) -> Result<Vec<T>> {
        self.select_ordered(table, conditions, &[])
    }

    pub fn select_ordered<T: DeserializeOwned>(
        &self,
        table: &str,
        conditions: &ConditionSet,
        order_by: &[OrderBy],
    ) -> Result<Vec<T>> {
        let compiled = Statement::Select {
            table,
            conditions,
            order_by,
        }
        .compile()?;
        record::from_rows(self.run_query(&compiled)?)
    }

    /// Number of rows in `table` matching `conditions`.
    pub fn count(&self, table: &str, conditions: &ConditionSet) -> Result<u64> {
        let compiled = Statement::Count { table, conditions }.compile()?;
        let rows = self.run_query(&compiled)?;
        rows.first().map(total_of).unwrap_or(Ok(0))
    }

    /// Updates the non-null fields of `record` on every row matching `conditions`.
    ///
    /// # Errors
    ///
    /// `ConditionRequired` for an empty condition set, raised before any
    /// connection is resolved.
    pub fn update<R: Serialize + ?Sized>(&self, table: &str, record: &R, conditions: &ConditionSet) -> Result<usize> {
        if conditions.is_empty() {
            return Err(WeaveError::ConditionRequired("update"));
        }
        let compiled = Statement::Update {
            table,
            values: record::to_columns(record)?,
            conditions,
        }
        .compile()?;
        self.run_update(&compiled)
    }

    /// Deletes every row matching `conditions`.
    ///
    /// # Errors
    ///
    /// `ConditionRequired` for an empty condition set, raised before any
    /// connection is resolved.
    pub fn delete(&self, table: &str, conditions: &ConditionSet) -> Result<usize> {
        if conditions.is_empty() {
            return Err(WeaveError::ConditionRequired("delete"));
        }
        let compiled = Statement::Delete { table, conditions }.compile()?;
        self.run_update(&compiled)
    }

    /// Inserts the non-null fields of `record`.
    pub fn insert<R: Serialize + ?Sized>(&self, table: &str, record: &R) -> Result<usize> {
        let compiled = Statement::Insert {
            table,
            values: record::to_columns(record)?,
        }
        .compile()?;
        self.run_update(&compiled)
    }

    /// Inserts `record` and returns the new row's rowid.
    pub fn insert_returning_id<R: Serialize + ?Sized>(&self, table: &str, record: &R) -> Result<i64> {
        let compiled = Statement::Insert {
            table,
            values: record::to_columns(record)?,
        }
        .compile()?;
        let conn = self.session.resolve(&self.data_source)?;
        let executor = QueryExecutor::new(&conn);
        executor.execute_update(&compiled)?;
        Ok(executor.last_insert_rowid())
    }

    /* ---------------------------- free-form SQL ---------------------------- */

    /// Runs a query and maps every row into `T`.
    pub fn query<T: DeserializeOwned>(&self, sql: &str, args: impl Into<Args>) -> Result<Vec<T>> {
        record::from_rows(self.query_rows(sql, args)?)
    }

    /// Runs a query and returns raw rows.
    pub fn query_rows(&self, sql: &str, args: impl Into<Args>) -> Result<Vec<Row>> {
        let compiled = compile_args(sql, args.into())?;
        self.run_query(&compiled)
    }

    /// Runs a query expected to match at most one row.
    ///
    /// # Returns
    ///
    /// `None` when nothing matches.
    ///
    /// # Errors
    ///
    /// `MultipleRows` when more than one row matches.
    pub fn select_one<T: DeserializeOwned>(&self, sql: &str, args: impl Into<Args>) -> Result<Option<T>> {
        let mut rows = self.query_rows(sql, args)?;
        match rows.len() {
            0 => Ok(None),
            1 => record::from_row(rows.remove(0)).map(Some),
            n => Err(WeaveError::MultipleRows(n)),
        }
    }

    /// Runs an insert, update, delete or DDL statement and returns the
    /// number of rows changed.
    pub fn exec(&self, sql: &str, args: impl Into<Args>) -> Result<usize> {
        let compiled = compile_args(sql, args.into())?;
        self.run_update(&compiled)
    }

    /* ---------------------------- paging ---------------------------- */

    /// Pages `sql`, counting with `select count(0) as total from (<sql>) as _t`.
    pub fn select_page<T: DeserializeOwned>(&self, sql: &str, request: &PageRequest) -> Result<PageResult<T>> {
        let count_sql = format!("select count(0) as {} from ({}) as _t", TOTAL_COLUMN, sql);
        self.select_page_with_count(sql, &count_sql, request)
    }

    /// Pages `sql` with a caller-supplied count query, which must return a
    /// `total` column. Count and data queries bind the same named parameters.
    pub fn select_page_with_count<T: DeserializeOwned>(
        &self,
        sql: &str,
        count_sql: &str,
        request: &PageRequest,
    ) -> Result<PageResult<T>> {
        request.validate()?;

        // compile both before touching a connection
        let count = compile_template(count_sql, &request.params)?;
        let data = compile_template(
            &format!("{} limit {{pageStart}},{{pageSize}}", sql),
            &request.data_params(),
        )?;

        let count_rows = self.run_query(&count)?;
        if count_rows.len() > 1 {
            return Err(WeaveError::MultipleRows(count_rows.len()));
        }
        let total = count_rows.first().map(total_of).unwrap_or(Ok(0))?;

        let rows = record::from_rows(self.run_query(&data)?)?;
        debug!(
            "page {} of {} ({} total row(s))",
            request.page(),
            crate::page::page_total(total, request.page_size),
            total
        );
        Ok(PageResult::new(rows, request, total))
    }

    /* ---------------------------- execution ---------------------------- */

    fn run_query(&self, compiled: &CompiledSql) -> Result<Vec<Row>> {
        let conn = self.session.resolve(&self.data_source)?;
        QueryExecutor::new(&conn).execute_query(compiled)
    }

    fn run_update(&self, compiled: &CompiledSql) -> Result<usize> {
        let conn = self.session.resolve(&self.data_source)?;
        QueryExecutor::new(&conn).execute_update(compiled)
    }
}

/// Positional arguments are used verbatim; named ones go through the template compiler.
fn compile_args(sql: &str, args: Args) -> Result<CompiledSql> {
    match args {
        Args::None => CompiledSql::new(sql, Vec::new()),
        Args::Positional(values) => CompiledSql::new(sql, values),
        Args::Named(params) => compile_template(sql, &params),
    }
}

/// Reads the `total` column of a count row; missing or null counts as zero.
///
/// # Errors
///
/// `Mapping` when the column holds anything but a non-negative integer or
/// a string spelling one.
fn total_of(row: &Row) -> Result<u64> {
    let total = match row.get(TOTAL_COLUMN) {
        None | Some(JsonValue::Null) => Some(0),
        Some(JsonValue::Number(n)) => n.as_u64(),
        Some(JsonValue::String(s)) => s.trim().parse().ok(),
        Some(_) => None,
    };
    total.ok_or_else(|| {
        WeaveError::Mapping(format!(
            "count column '{}' is not a row count: {}",
            TOTAL_COLUMN,
            row.get(TOTAL_COLUMN).map(JsonValue::to_string).unwrap_or_default()
        ))
    })
}
