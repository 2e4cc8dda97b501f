//! Record mapping between typed records and rows.
//!
//! Records describe their columns at compile time through `serde` derive
//! (`#[serde(rename)]`, `#[serde(skip)]` and friends apply as usual).
//! Null fields are skipped when building insert and update column lists, so a
//! field that was never set cannot be told apart from one set to null.

use crate::core::value::{value_from_json, Row, Value};
use crate::core::{Result, WeaveError};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value as JsonValue;

/// Serializes a record into `(column, value)` pairs, skipping null fields.
///
/// Columns come out in ascending name order.
///
/// # Errors
///
/// `Mapping` if the record does not serialize to a JSON object.
pub fn to_columns<R: Serialize + ?Sized>(record: &R) -> Result<Vec<(String, Value)>> {
    match serde_json::to_value(record)? {
        JsonValue::Object(fields) => {
            let mut columns: Vec<(String, Value)> = fields
                .into_iter()
                .filter_map(|(column, field)| value_from_json(field).map(|value| (column, value)))
                .collect();
            columns.sort_by(|a, b| a.0.cmp(&b.0));
            Ok(columns)
        }
        other => Err(WeaveError::Mapping(format!(
            "a record must serialize to an object with named fields, got {}",
            json_kind(&other)
        ))),
    }
}

/// Materializes one row as a typed record.
pub fn from_row<T: DeserializeOwned>(row: Row) -> Result<T> {
    Ok(serde_json::from_value(JsonValue::Object(row))?)
}

/// Materializes every row, failing on the first row that does not fit `T`.
pub fn from_rows<T: DeserializeOwned>(rows: Vec<Row>) -> Result<Vec<T>> {
    rows.into_iter().map(from_row).collect()
}

fn json_kind(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "a boolean",
        JsonValue::Number(_) => "a number",
        JsonValue::String(_) => "a string",
        JsonValue::Array(_) => "an array",
        JsonValue::Object(_) => "an object",
    }
}
