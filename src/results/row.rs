use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDateTime;

use crate::error::SqlClientError;
use crate::types::SqlValue;

/// Column names shared by every row of a result set, with a name → index map.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Columns {
    pub(crate) names: Arc<Vec<String>>,
    pub(crate) index: Arc<HashMap<String, usize>>,
}

/// A borrowed row of a [`ResultSet`](super::ResultSet).
///
/// Lookup by index and by column name read the same values.
#[derive(Debug, Clone, Copy)]
pub struct Row<'a> {
    columns: &'a Columns,
    values: &'a [SqlValue],
}

impl<'a> Row<'a> {
    pub(crate) fn new(columns: &'a Columns, values: &'a [SqlValue]) -> Self {
        Self { columns, values }
    }

    /// Number of values (equal to the column count).
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    #[must_use]
    pub fn values(&self) -> &'a [SqlValue] {
        self.values
    }

    #[must_use]
    pub fn column_names(&self) -> &'a [String] {
        &self.columns.names
    }

    /// Value at `index`.
    ///
    /// # Errors
    /// Returns [`SqlClientError::IndexOutOfRange`] past the last column.
    pub fn get(&self, index: usize) -> Result<&'a SqlValue, SqlClientError> {
        self.values.get(index).ok_or(SqlClientError::IndexOutOfRange {
            index,
            len: self.values.len(),
        })
    }

    /// Index of a column by name.
    #[must_use]
    pub fn column_index(&self, column_name: &str) -> Option<usize> {
        self.columns.index.get(column_name).copied()
    }

    /// Value of the named column.
    ///
    /// # Errors
    /// Returns [`SqlClientError::UnknownColumn`] if no column has that name.
    pub fn get_by_name(&self, column_name: &str) -> Result<&'a SqlValue, SqlClientError> {
        let idx = self
            .column_index(column_name)
            .ok_or_else(|| SqlClientError::UnknownColumn(column_name.to_string()))?;
        self.get(idx)
    }

    /// Named column as an integer; `None` for NULL.
    ///
    /// # Errors
    /// `UnknownColumn`, or `DecodeError` when the value is not an integer.
    pub fn get_i64(&self, column_name: &str) -> Result<Option<i64>, SqlClientError> {
        typed(self.get_by_name(column_name)?, column_name, "integer", SqlValue::as_int)
    }

    /// Named column as a float; integers widen.
    ///
    /// # Errors
    /// `UnknownColumn`, or `DecodeError` when the value is not numeric.
    pub fn get_f64(&self, column_name: &str) -> Result<Option<f64>, SqlClientError> {
        typed(self.get_by_name(column_name)?, column_name, "float", SqlValue::as_float)
    }

    /// Named column as text.
    ///
    /// # Errors
    /// `UnknownColumn`, or `DecodeError` when the value is not text.
    pub fn get_str(&self, column_name: &str) -> Result<Option<&'a str>, SqlClientError> {
        typed(self.get_by_name(column_name)?, column_name, "text", SqlValue::as_text)
    }

    /// Named column as a boolean (integers 0/1 accepted).
    ///
    /// # Errors
    /// `UnknownColumn`, or `DecodeError` otherwise.
    pub fn get_bool(&self, column_name: &str) -> Result<Option<bool>, SqlClientError> {
        typed(self.get_by_name(column_name)?, column_name, "boolean", SqlValue::as_bool)
    }

    /// Named column as bytes.
    ///
    /// # Errors
    /// `UnknownColumn`, or `DecodeError` otherwise.
    pub fn get_bytes(&self, column_name: &str) -> Result<Option<&'a [u8]>, SqlClientError> {
        typed(self.get_by_name(column_name)?, column_name, "bytes", SqlValue::as_bytes)
    }

    /// Named column as a timestamp (text timestamps are parsed).
    ///
    /// # Errors
    /// `UnknownColumn`, or `DecodeError` otherwise.
    pub fn get_timestamp(&self, column_name: &str) -> Result<Option<NaiveDateTime>, SqlClientError> {
        typed(
            self.get_by_name(column_name)?,
            column_name,
            "timestamp",
            SqlValue::as_timestamp,
        )
    }

    /// JSON object keyed by column name.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        let map = self
            .columns
            .names
            .iter()
            .zip(self.values)
            .map(|(name, value)| (name.clone(), value.to_json()))
            .collect::<serde_json::Map<_, _>>();
        serde_json::Value::Object(map)
    }
}

fn typed<'a, T>(
    value: &'a SqlValue,
    column_name: &str,
    wanted: &str,
    extract: impl FnOnce(&'a SqlValue) -> Option<T>,
) -> Result<Option<T>, SqlClientError> {
    if value.is_null() {
        return Ok(None);
    }
    extract(value).map(Some).ok_or_else(|| {
        SqlClientError::DecodeError(format!(
            "column `{column_name}` holds {value:?}, not {wanted}"
        ))
    })
}
