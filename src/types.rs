use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::error::SqlClientError;

/// Values that can be bound as statement parameters or read back from a row.
///
/// The same enum is used in both directions so application code never sees a
/// backend's native value type:
/// ```rust
/// use async_sql::prelude::*;
///
/// let params = vec![
///     SqlValue::Text("Fox".into()),
///     SqlValue::Int(9),
///     SqlValue::Bool(true),
/// ];
/// # let _ = params;
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    /// NULL value
    Null,
    /// Boolean value
    Bool(bool),
    /// Integer value (64-bit)
    Int(i64),
    /// Floating point value (64-bit)
    Float(f64),
    /// Text/string value
    Text(String),
    /// Binary data
    Bytes(Vec<u8>),
    /// Timestamp value
    Timestamp(NaiveDateTime),
}

impl SqlValue {
    /// Check if this value is NULL
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// The declared type this value naturally decodes as.
    #[must_use]
    pub fn sql_type(&self) -> SqlType {
        match self {
            SqlValue::Null => SqlType::Null,
            SqlValue::Bool(_) => SqlType::Boolean,
            SqlValue::Int(_) => SqlType::Integer,
            SqlValue::Float(_) => SqlType::Double,
            SqlValue::Text(_) => SqlType::Varchar,
            SqlValue::Bytes(_) => SqlType::Binary,
            SqlValue::Timestamp(_) => SqlType::Timestamp,
        }
    }

    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        if let SqlValue::Int(value) = self {
            Some(*value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        if let SqlValue::Text(value) = self {
            Some(value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            SqlValue::Bool(value) => Some(*value),
            SqlValue::Int(1) => Some(true),
            SqlValue::Int(0) => Some(false),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_float(&self) -> Option<f64> {
        match self {
            SqlValue::Float(value) => Some(*value),
            #[allow(clippy::cast_precision_loss)]
            SqlValue::Int(value) => Some(*value as f64),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_bytes(&self) -> Option<&[u8]> {
        if let SqlValue::Bytes(bytes) = self {
            Some(bytes)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_timestamp(&self) -> Option<NaiveDateTime> {
        match self {
            SqlValue::Timestamp(value) => Some(*value),
            SqlValue::Text(s) => crate::codec::parse_timestamp(s),
            _ => None,
        }
    }

    /// Convert a JSON parameter into a value.
    ///
    /// Integral numbers become `Int`, other numbers `Float`. Arrays and
    /// objects have no parameter representation.
    ///
    /// # Errors
    /// Returns [`SqlClientError::UnsupportedType`] for arrays, objects and
    /// integers outside the `i64` range.
    pub fn from_json(value: &serde_json::Value) -> Result<Self, SqlClientError> {
        match value {
            serde_json::Value::Null => Ok(SqlValue::Null),
            serde_json::Value::Bool(b) => Ok(SqlValue::Bool(*b)),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Ok(SqlValue::Int(i))
                } else if n.is_u64() {
                    Err(SqlClientError::UnsupportedType(format!(
                        "integer {n} does not fit in 64-bit signed range"
                    )))
                } else {
                    n.as_f64().map(SqlValue::Float).ok_or_else(|| {
                        SqlClientError::UnsupportedType(format!("number {n}"))
                    })
                }
            }
            serde_json::Value::String(s) => Ok(SqlValue::Text(s.clone())),
            serde_json::Value::Array(_) => Err(SqlClientError::UnsupportedType(
                "JSON array cannot be bound as a parameter".into(),
            )),
            serde_json::Value::Object(_) => Err(SqlClientError::UnsupportedType(
                "JSON object cannot be bound as a parameter".into(),
            )),
        }
    }

    /// Convert a JSON array (the parameter-list shape) into positional values.
    ///
    /// # Errors
    /// Returns [`SqlClientError::UnsupportedType`] if `value` is not an array or
    /// any element cannot be converted.
    pub fn list_from_json(value: &serde_json::Value) -> Result<Vec<Self>, SqlClientError> {
        let items = value.as_array().ok_or_else(|| {
            SqlClientError::UnsupportedType("parameter list must be a JSON array".into())
        })?;
        items.iter().map(Self::from_json).collect()
    }

    /// JSON view of the value. Bytes render as an array of numbers.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            SqlValue::Null => serde_json::Value::Null,
            SqlValue::Bool(b) => serde_json::Value::Bool(*b),
            SqlValue::Int(i) => serde_json::Value::from(*i),
            SqlValue::Float(f) => serde_json::Number::from_f64(*f)
                .map_or(serde_json::Value::Null, serde_json::Value::Number),
            SqlValue::Text(s) => serde_json::Value::String(s.clone()),
            SqlValue::Bytes(b) => serde_json::Value::from(b.clone()),
            SqlValue::Timestamp(ts) => {
                serde_json::Value::String(ts.format(crate::codec::TIMESTAMP_FORMAT).to_string())
            }
        }
    }
}

impl From<bool> for SqlValue {
    fn from(v: bool) -> Self {
        SqlValue::Bool(v)
    }
}
impl From<i32> for SqlValue {
    fn from(v: i32) -> Self {
        SqlValue::Int(i64::from(v))
    }
}
impl From<i64> for SqlValue {
    fn from(v: i64) -> Self {
        SqlValue::Int(v)
    }
}
impl From<f64> for SqlValue {
    fn from(v: f64) -> Self {
        SqlValue::Float(v)
    }
}
impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        SqlValue::Text(v)
    }
}
impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        SqlValue::Text(v.to_string())
    }
}
impl From<Vec<u8>> for SqlValue {
    fn from(v: Vec<u8>) -> Self {
        SqlValue::Bytes(v)
    }
}
impl From<NaiveDateTime> for SqlValue {
    fn from(v: NaiveDateTime) -> Self {
        SqlValue::Timestamp(v)
    }
}
impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(SqlValue::Null, Into::into)
    }
}

/// Declared type used to decode backend values, for result columns and OUT
/// parameters alike.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SqlType {
    /// No declared type; the backend storage class decides.
    Null,
    Boolean,
    Integer,
    Double,
    Varchar,
    Binary,
    Timestamp,
}

impl SqlType {
    /// Map a backend declared column type (`VARCHAR(255)`, `BIGINT`, ...) to a
    /// `SqlType`, following SQLite's affinity rules with boolean and timestamp
    /// names checked first.
    #[must_use]
    pub fn from_declared(declared: &str) -> SqlType {
        let upper = declared.to_ascii_uppercase();
        if upper.contains("BOOL") {
            SqlType::Boolean
        } else if upper.contains("TIMESTAMP") || upper.contains("DATETIME") {
            SqlType::Timestamp
        } else if upper.contains("INT") {
            SqlType::Integer
        } else if upper.contains("CHAR") || upper.contains("CLOB") || upper.contains("TEXT") {
            SqlType::Varchar
        } else if upper.contains("BLOB") || upper.contains("BINARY") {
            SqlType::Binary
        } else if upper.contains("REAL") || upper.contains("FLOA") || upper.contains("DOUB") {
            SqlType::Double
        } else {
            SqlType::Null
        }
    }
}

impl FromStr for SqlType {
    type Err = SqlClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "NULL" => Ok(SqlType::Null),
            "BOOLEAN" | "BOOL" | "BIT" => Ok(SqlType::Boolean),
            "INTEGER" | "INT" | "BIGINT" | "SMALLINT" | "TINYINT" => Ok(SqlType::Integer),
            "DOUBLE" | "FLOAT" | "REAL" | "NUMERIC" | "DECIMAL" => Ok(SqlType::Double),
            "VARCHAR" | "CHAR" | "TEXT" | "CLOB" | "NVARCHAR" | "LONGVARCHAR" => {
                Ok(SqlType::Varchar)
            }
            "BINARY" | "VARBINARY" | "BLOB" | "LONGVARBINARY" => Ok(SqlType::Binary),
            "TIMESTAMP" | "DATETIME" => Ok(SqlType::Timestamp),
            other => Err(SqlClientError::UnsupportedType(format!(
                "unknown SQL type `{other}`"
            ))),
        }
    }
}

impl fmt::Display for SqlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SqlType::Null => "NULL",
            SqlType::Boolean => "BOOLEAN",
            SqlType::Integer => "INTEGER",
            SqlType::Double => "DOUBLE",
            SqlType::Varchar => "VARCHAR",
            SqlType::Binary => "BINARY",
            SqlType::Timestamp => "TIMESTAMP",
        };
        f.write_str(name)
    }
}
