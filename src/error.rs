use thiserror::Error;

#[derive(Debug, Error)]
pub enum SqlClientError {
    #[error("connection is closed")]
    ConnectionClosed,

    #[error("connection is busy")]
    ConnectionBusy,

    #[error("SQL syntax error: {0}")]
    SyntaxError(String),

    #[error("parameter mismatch: statement expects {expected} parameter(s), got {actual}")]
    ParameterMismatch { expected: usize, actual: usize },

    #[error("unsupported value type: {0}")]
    UnsupportedType(String),

    #[error("decode error: {0}")]
    DecodeError(String),

    #[error("unknown column `{0}`")]
    UnknownColumn(String),

    #[error("index {index} out of range for row of width {len}")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("no active transaction (connection is in auto-commit mode)")]
    NoActiveTransaction,

    #[error("backend error{}: {message}", code_suffix(.code))]
    BackendError { code: Option<i32>, message: String },

    #[error("operation cancelled")]
    Cancelled,

    #[error("configuration error: {0}")]
    ConfigError(String),
}

fn code_suffix(code: &Option<i32>) -> String {
    code.map(|c| format!(" ({c})")).unwrap_or_default()
}

impl SqlClientError {
    /// Shorthand for a backend failure without a numeric code.
    pub fn backend(message: impl Into<String>) -> Self {
        SqlClientError::BackendError {
            code: None,
            message: message.into(),
        }
    }

    /// Whether the error leaves the connection unusable.
    #[must_use]
    pub fn is_connection_closed(&self) -> bool {
        matches!(self, SqlClientError::ConnectionClosed)
    }
}

#[cfg(feature = "sqlite")]
impl From<rusqlite::Error> for SqlClientError {
    fn from(err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::InvalidParameterCount(actual, expected) => {
                SqlClientError::ParameterMismatch { expected, actual }
            }
            rusqlite::Error::InvalidColumnType(idx, name, ty) => SqlClientError::DecodeError(
                format!("column {idx} (`{name}`) has unexpected type {ty}"),
            ),
            other => {
                let message = other.to_string();
                if message.contains("syntax error") || message.contains("incomplete input") {
                    return SqlClientError::SyntaxError(message);
                }
                match other.sqlite_error() {
                    Some(ffi_err)
                        if matches!(
                            ffi_err.code,
                            rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked
                        ) =>
                    {
                        SqlClientError::ConnectionBusy
                    }
                    Some(ffi_err) => SqlClientError::BackendError {
                        code: Some(ffi_err.extended_code),
                        message,
                    },
                    None => SqlClientError::BackendError {
                        code: None,
                        message,
                    },
                }
            }
        }
    }
}
