/// Value Module
///
/// Bound parameter values and result rows. Parameters reuse
/// `rusqlite::types::Value` so they bind without conversion; rows are JSON
/// objects so the record mapper can hand them straight to `serde`.

use rusqlite::types::{Null, ValueRef};
use serde_json::Value as JsonValue;
use std::collections::HashMap;

pub use rusqlite::types::Value;

/// One result row: column name to value.
pub type Row = serde_json::Map<String, JsonValue>;

/// Conversion into a bindable [`Value`].
///
/// `rusqlite` does not provide `From<&str>` for its `Value`, so conditions and
/// parameter maps accept anything implementing this trait instead.
pub trait IntoValue {
    fn into_value(self) -> Value;
}

impl IntoValue for Value {
    fn into_value(self) -> Value {
        self
    }
}

impl IntoValue for &Value {
    fn into_value(self) -> Value {
        self.clone()
    }
}

impl IntoValue for Null {
    fn into_value(self) -> Value {
        Value::Null
    }
}

impl IntoValue for &str {
    fn into_value(self) -> Value {
        Value::Text(self.to_string())
    }
}

impl IntoValue for String {
    fn into_value(self) -> Value {
        Value::Text(self)
    }
}

impl IntoValue for &String {
    fn into_value(self) -> Value {
        Value::Text(self.clone())
    }
}

impl IntoValue for bool {
    fn into_value(self) -> Value {
        Value::Integer(i64::from(self))
    }
}

macro_rules! integer_into_value {
    ($($t:ty),*) => {
        $(
            impl IntoValue for $t {
                fn into_value(self) -> Value {
                    Value::Integer(i64::from(self))
                }
            }
        )*
    };
}

integer_into_value!(i8, i16, i32, i64, u8, u16, u32);

impl IntoValue for f32 {
    fn into_value(self) -> Value {
        Value::Real(f64::from(self))
    }
}

impl IntoValue for f64 {
    fn into_value(self) -> Value {
        Value::Real(self)
    }
}

impl IntoValue for Vec<u8> {
    fn into_value(self) -> Value {
        Value::Blob(self)
    }
}

impl IntoValue for &[u8] {
    fn into_value(self) -> Value {
        Value::Blob(self.to_vec())
    }
}

impl<T: IntoValue> IntoValue for Option<T> {
    fn into_value(self) -> Value {
        match self {
            Some(value) => value.into_value(),
            None => Value::Null,
        }
    }
}

/// Named parameters for `{name}` templates.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NamedParams(HashMap<String, Value>);

impl NamedParams {
    pub fn new() -> Self {
        NamedParams(HashMap::new())
    }

    /// Builder-style insert.
    pub fn with(mut self, name: impl Into<String>, value: impl IntoValue) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl IntoValue) {
        self.0.insert(name.into(), value.into_value());
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: IntoValue> FromIterator<(K, V)> for NamedParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = NamedParams::new();
        for (name, value) in iter {
            params.insert(name, value);
        }
        params
    }
}

impl From<HashMap<String, Value>> for NamedParams {
    fn from(map: HashMap<String, Value>) -> Self {
        NamedParams(map)
    }
}

/// Arguments for free-form SQL.
///
/// Positional arguments are bound verbatim; named arguments go through the
/// `{name}` template compiler first.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Args {
    #[default]
    None,
    Positional(Vec<Value>),
    Named(NamedParams),
}

impl From<Vec<Value>> for Args {
    fn from(values: Vec<Value>) -> Self {
        Args::Positional(values)
    }
}

impl From<NamedParams> for Args {
    fn from(params: NamedParams) -> Self {
        Args::Named(params)
    }
}

impl From<&NamedParams> for Args {
    fn from(params: &NamedParams) -> Self {
        Args::Named(params.clone())
    }
}

impl From<()> for Args {
    fn from(_: ()) -> Self {
        Args::None
    }
}

/// Converts a SQLite column value into its row representation.
pub(crate) fn json_from_sql(value: ValueRef<'_>) -> JsonValue {
    match value {
        ValueRef::Null => JsonValue::Null,
        ValueRef::Integer(i) => JsonValue::from(i),
        ValueRef::Real(f) => serde_json::Number::from_f64(f)
            .map(JsonValue::Number)
            .unwrap_or(JsonValue::Null),
        ValueRef::Text(t) => JsonValue::String(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(b) => JsonValue::Array(b.iter().map(|byte| JsonValue::from(*byte)).collect()),
    }
}

/// Converts a record field into a bindable value. `None` means the field is
/// null and should be skipped.
pub(crate) fn value_from_json(value: JsonValue) -> Option<Value> {
    match value {
        JsonValue::Null => None,
        JsonValue::Bool(b) => Some(Value::Integer(i64::from(b))),
        JsonValue::Number(n) => Some(match n.as_i64() {
            Some(i) => Value::Integer(i),
            None => Value::Real(n.as_f64().unwrap_or(f64::NAN)),
        }),
        JsonValue::String(s) => Some(Value::Text(s)),
        nested @ (JsonValue::Array(_) | JsonValue::Object(_)) => Some(Value::Text(nested.to_string())),
    }
}
