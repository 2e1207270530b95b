use rusqlite::types::Value;

use crate::codec::{self, BackendValue};
use crate::error::SqlClientError;
use crate::types::SqlValue;

/// Convert a codec value to a rusqlite `Value`.
#[must_use]
pub fn to_sqlite_value(value: BackendValue) -> Value {
    match value {
        BackendValue::Null => Value::Null,
        BackendValue::Integer(i) => Value::Integer(i),
        BackendValue::Real(f) => Value::Real(f),
        BackendValue::Text(s) => Value::Text(s),
        BackendValue::Blob(b) => Value::Blob(b),
    }
}

/// Convert a rusqlite `Value` to a codec value.
#[must_use]
pub fn from_sqlite_value(value: Value) -> BackendValue {
    match value {
        Value::Null => BackendValue::Null,
        Value::Integer(i) => BackendValue::Integer(i),
        Value::Real(f) => BackendValue::Real(f),
        Value::Text(s) => BackendValue::Text(s),
        Value::Blob(b) => BackendValue::Blob(b),
    }
}

/// Encode positional parameters for binding.
///
/// # Errors
/// Returns `SqlClientError::UnsupportedType` if a value cannot be encoded.
pub fn convert_params(params: &[SqlValue]) -> Result<Vec<Value>, SqlClientError> {
    let mut values = Vec::with_capacity(params.len());
    for p in params {
        values.push(to_sqlite_value(codec::encode(p)?));
    }
    Ok(values)
}
