//! Table-scoped statements.
//!
//! One enum variant per statement kind, each compiled by its own function.
//! Column and table names are emitted verbatim; values are always bound.

use crate::core::value::Value;
use crate::core::{Result, WeaveError};
use crate::sql::compiler::{append_where, CompiledSql};
use crate::sql::condition::{ConditionSet, Direction, OrderBy};

/// A single-table statement ready to compile.
#[derive(Debug, Clone)]
pub enum Statement<'a> {
    Select {
        table: &'a str,
        conditions: &'a ConditionSet,
        order_by: &'a [OrderBy],
    },
    Count {
        table: &'a str,
        conditions: &'a ConditionSet,
    },
    Insert {
        table: &'a str,
        values: Vec<(String, Value)>,
    },
    Update {
        table: &'a str,
        values: Vec<(String, Value)>,
        conditions: &'a ConditionSet,
    },
    Delete {
        table: &'a str,
        conditions: &'a ConditionSet,
    },
}

impl Statement<'_> {
    pub fn compile(self) -> Result<CompiledSql> {
        match self {
            Statement::Select {
                table,
                conditions,
                order_by,
            } => compile_select(table, conditions, order_by),
            Statement::Count { table, conditions } => compile_count(table, conditions),
            Statement::Insert { table, values } => compile_insert(table, values),
            Statement::Update {
                table,
                values,
                conditions,
            } => compile_update(table, values, conditions),
            Statement::Delete { table, conditions } => compile_delete(table, conditions),
        }
    }
}

fn compile_select(table: &str, conditions: &ConditionSet, order_by: &[OrderBy]) -> Result<CompiledSql> {
    let mut sql = format!("select * from {}", table);
    let mut params = Vec::new();
    append_where(&mut sql, &mut params, conditions)?;
    if !order_by.is_empty() {
        let terms: Vec<String> = order_by
            .iter()
            .map(|term| {
                let direction = match term.direction {
                    Direction::Asc => "asc",
                    Direction::Desc => "desc",
                };
                format!("{} {}", term.column, direction)
            })
            .collect();
        sql.push_str(" order by ");
        sql.push_str(&terms.join(", "));
    }
    CompiledSql::new(sql, params)
}

fn compile_count(table: &str, conditions: &ConditionSet) -> Result<CompiledSql> {
    let mut sql = format!("select count(0) as total from {}", table);
    let mut params = Vec::new();
    append_where(&mut sql, &mut params, conditions)?;
    CompiledSql::new(sql, params)
}

fn compile_insert(table: &str, values: Vec<(String, Value)>) -> Result<CompiledSql> {
    if values.is_empty() {
        return Err(WeaveError::Mapping(format!(
            "nothing to insert into {}: the record has no non-null fields",
            table
        )));
    }
    let (columns, params): (Vec<String>, Vec<Value>) = values.into_iter().unzip();
    let sql = format!(
        "insert into {} ({}) values ({})",
        table,
        columns.join(", "),
        vec!["?"; params.len()].join(", ")
    );
    CompiledSql::new(sql, params)
}

fn compile_update(table: &str, values: Vec<(String, Value)>, conditions: &ConditionSet) -> Result<CompiledSql> {
    if values.is_empty() {
        return Err(WeaveError::Mapping(format!(
            "nothing to update in {}: the record has no non-null fields",
            table
        )));
    }
    let (columns, mut params): (Vec<String>, Vec<Value>) = values.into_iter().unzip();
    let assignments: Vec<String> = columns.iter().map(|column| format!("{} = ?", column)).collect();
    let mut sql = format!("update {} set {}", table, assignments.join(", "));
    append_where(&mut sql, &mut params, conditions)?;
    CompiledSql::new(sql, params)
}

fn compile_delete(table: &str, conditions: &ConditionSet) -> Result<CompiledSql> {
    let mut sql = format!("delete from {}", table);
    let mut params = Vec::new();
    append_where(&mut sql, &mut params, conditions)?;
    CompiledSql::new(sql, params)
}
