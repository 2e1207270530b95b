//! Parameter codec.
//!
//! Converts application values into the storage classes a backend binds, and
//! decodes backend values back into typed values given a declared type.

use chrono::NaiveDateTime;

use crate::error::SqlClientError;
use crate::types::{SqlType, SqlValue};

/// Format used when a timestamp crosses the boundary as text.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// Representation a backend binds and returns.
#[derive(Debug, Clone, PartialEq)]
pub enum BackendValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl BackendValue {
    fn kind(&self) -> &'static str {
        match self {
            BackendValue::Null => "null",
            BackendValue::Integer(_) => "integer",
            BackendValue::Real(_) => "real",
            BackendValue::Text(_) => "text",
            BackendValue::Blob(_) => "blob",
        }
    }
}

/// Encode a single value for binding.
///
/// # Errors
/// Returns [`SqlClientError::UnsupportedType`] for non-finite floats, which no
/// supported backend stores faithfully.
pub fn encode(value: &SqlValue) -> Result<BackendValue, SqlClientError> {
    Ok(match value {
        SqlValue::Null => BackendValue::Null,
        SqlValue::Bool(b) => BackendValue::Integer(i64::from(*b)),
        SqlValue::Int(i) => BackendValue::Integer(*i),
        SqlValue::Float(f) => {
            if !f.is_finite() {
                return Err(SqlClientError::UnsupportedType(format!(
                    "non-finite float {f}"
                )));
            }
            BackendValue::Real(*f)
        }
        SqlValue::Text(s) => BackendValue::Text(s.clone()),
        SqlValue::Bytes(b) => BackendValue::Blob(b.clone()),
        SqlValue::Timestamp(ts) => BackendValue::Text(ts.format(TIMESTAMP_FORMAT).to_string()),
    })
}

/// Encode a positional parameter list.
///
/// # Errors
/// Propagates the first [`encode`] failure.
pub fn encode_all(values: &[SqlValue]) -> Result<Vec<BackendValue>, SqlClientError> {
    values.iter().map(encode).collect()
}

/// Decode a backend value as `declared`.
///
/// `NULL` decodes to [`SqlValue::Null`] whatever the declared type;
/// [`SqlType::Null`] defers to [`decode_untyped`].
///
/// # Errors
/// Returns [`SqlClientError::DecodeError`] when the representation cannot be
/// read as the declared type.
pub fn decode(value: BackendValue, declared: SqlType) -> Result<SqlValue, SqlClientError> {
    if matches!(value, BackendValue::Null) {
        return Ok(SqlValue::Null);
    }
    match declared {
        SqlType::Null => Ok(decode_untyped(value)),
        SqlType::Boolean => decode_bool(value),
        SqlType::Integer => decode_int(value),
        SqlType::Double => decode_float(value),
        SqlType::Varchar => decode_text(value),
        SqlType::Binary => match value {
            BackendValue::Blob(b) => Ok(SqlValue::Bytes(b)),
            BackendValue::Text(s) => Ok(SqlValue::Bytes(s.into_bytes())),
            other => Err(mismatch(&other, declared)),
        },
        SqlType::Timestamp => match value {
            BackendValue::Text(ref s) => parse_timestamp(s)
                .map(SqlValue::Timestamp)
                .ok_or_else(|| mismatch(&value, declared)),
            BackendValue::Integer(secs) => chrono::DateTime::from_timestamp(secs, 0)
                .map(|dt| SqlValue::Timestamp(dt.naive_utc()))
                .ok_or_else(|| mismatch(&value, declared)),
            other => Err(mismatch(&other, declared)),
        },
    }
}

/// Decode a backend value by its storage class alone.
#[must_use]
pub fn decode_untyped(value: BackendValue) -> SqlValue {
    match value {
        BackendValue::Null => SqlValue::Null,
        BackendValue::Integer(i) => SqlValue::Int(i),
        BackendValue::Real(f) => SqlValue::Float(f),
        BackendValue::Text(s) => SqlValue::Text(s),
        BackendValue::Blob(b) => SqlValue::Bytes(b),
    }
}

pub(crate) fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f"))
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M"))
        .ok()
}

fn decode_bool(value: BackendValue) -> Result<SqlValue, SqlClientError> {
    match value {
        BackendValue::Integer(0) => Ok(SqlValue::Bool(false)),
        BackendValue::Integer(1) => Ok(SqlValue::Bool(true)),
        BackendValue::Text(ref s) => match s.to_ascii_lowercase().as_str() {
            "true" | "1" => Ok(SqlValue::Bool(true)),
            "false" | "0" => Ok(SqlValue::Bool(false)),
            _ => Err(mismatch(&value, SqlType::Boolean)),
        },
        other => Err(mismatch(&other, SqlType::Boolean)),
    }
}

fn decode_int(value: BackendValue) -> Result<SqlValue, SqlClientError> {
    match value {
        BackendValue::Integer(i) => Ok(SqlValue::Int(i)),
        #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
        BackendValue::Real(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => {
            Ok(SqlValue::Int(f as i64))
        }
        BackendValue::Text(ref s) => s
            .trim()
            .parse::<i64>()
            .map(SqlValue::Int)
            .map_err(|_| mismatch(&value, SqlType::Integer)),
        other => Err(mismatch(&other, SqlType::Integer)),
    }
}

fn decode_float(value: BackendValue) -> Result<SqlValue, SqlClientError> {
    match value {
        BackendValue::Real(f) => Ok(SqlValue::Float(f)),
        #[allow(clippy::cast_precision_loss)]
        BackendValue::Integer(i) => Ok(SqlValue::Float(i as f64)),
        BackendValue::Text(ref s) => s
            .trim()
            .parse::<f64>()
            .map(SqlValue::Float)
            .map_err(|_| mismatch(&value, SqlType::Double)),
        other => Err(mismatch(&other, SqlType::Double)),
    }
}

fn decode_text(value: BackendValue) -> Result<SqlValue, SqlClientError> {
    match value {
        BackendValue::Text(s) => Ok(SqlValue::Text(s)),
        BackendValue::Integer(i) => Ok(SqlValue::Text(i.to_string())),
        BackendValue::Real(f) => Ok(SqlValue::Text(f.to_string())),
        BackendValue::Blob(b) => String::from_utf8(b)
            .map(SqlValue::Text)
            .map_err(|_| SqlClientError::DecodeError("blob is not valid UTF-8".into())),
        BackendValue::Null => Ok(SqlValue::Null),
    }
}

fn mismatch(value: &BackendValue, declared: SqlType) -> SqlClientError {
    let shown = match value {
        BackendValue::Text(s) => format!(" `{s}`"),
        BackendValue::Integer(i) => format!(" {i}"),
        BackendValue::Real(f) => format!(" {f}"),
        _ => String::new(),
    };
    SqlClientError::DecodeError(format!(
        "cannot decode {}{shown} as {declared}",
        value.kind()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn sample_values() -> Vec<SqlValue> {
        let ts = NaiveDate::from_ymd_opt(2024, 2, 29)
            .unwrap()
            .and_hms_micro_opt(13, 45, 7, 250)
            .unwrap();
        vec![
            SqlValue::Null,
            SqlValue::Bool(true),
            SqlValue::Bool(false),
            SqlValue::Int(i64::MIN),
            SqlValue::Int(42),
            SqlValue::Float(-0.125),
            SqlValue::Float(1.0e300),
            SqlValue::Text(String::new()),
            SqlValue::Text("smith ünïcode".into()),
            SqlValue::Bytes(vec![0, 159, 146, 150]),
            SqlValue::Timestamp(ts),
        ]
    }

    #[test]
    fn decode_inverts_encode() {
        for value in sample_values() {
            let encoded = encode(&value).unwrap();
            assert_eq!(decode(encoded, value.sql_type()).unwrap(), value);
        }
    }

    #[test]
    fn rejects_non_finite_floats() {
        assert!(matches!(
            encode(&SqlValue::Float(f64::NAN)),
            Err(SqlClientError::UnsupportedType(_))
        ));
    }

    #[test]
    fn decode_mismatches() {
        let err = decode(BackendValue::Text("abc".into()), SqlType::Integer).unwrap_err();
        assert!(matches!(err, SqlClientError::DecodeError(_)));
        assert!(err.to_string().contains("`abc`"));

        assert!(decode(BackendValue::Integer(2), SqlType::Boolean).is_err());
        assert!(decode(BackendValue::Blob(vec![1]), SqlType::Double).is_err());
        assert!(decode(BackendValue::Text("yesterday".into()), SqlType::Timestamp).is_err());
    }

    #[test]
    fn decode_coerces_compatible_representations() {
        assert_eq!(
            decode(BackendValue::Text(" 12 ".into()), SqlType::Integer).unwrap(),
            SqlValue::Int(12)
        );
        assert_eq!(
            decode(BackendValue::Integer(3), SqlType::Double).unwrap(),
            SqlValue::Float(3.0)
        );
        assert_eq!(
            decode(BackendValue::Integer(7), SqlType::Varchar).unwrap(),
            SqlValue::Text("7".into())
        );
        assert_eq!(
            decode(BackendValue::Null, SqlType::Integer).unwrap(),
            SqlValue::Null
        );
        assert_eq!(
            decode(BackendValue::Real(2.5), SqlType::Null).unwrap(),
            SqlValue::Float(2.5)
        );
    }
}
