use std::collections::HashMap;
use std::sync::Arc;

use super::row::{Columns, Row};
use crate::error::SqlClientError;
use crate::types::SqlValue;

/// The result of a query: ordered, uniquely named columns and the rows
/// aligned to them.
///
/// A `ResultSet` is immutable once built; [`ResultSet::rows`] can be called any
/// number of times and always starts from the first row.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultSet {
    columns: Columns,
    rows: Vec<Vec<SqlValue>>,
}

impl ResultSet {
    /// Build a result set, checking column uniqueness and row width.
    ///
    /// # Errors
    /// Returns [`SqlClientError::DecodeError`] on a duplicate column name or a
    /// row whose width differs from the column count. Columns are addressed by
    /// name, so a join selecting `a.id, b.id` must alias one of them with `AS`.
    pub fn new(
        column_names: Vec<String>,
        rows: Vec<Vec<SqlValue>>,
    ) -> Result<Self, SqlClientError> {
        let mut index = HashMap::with_capacity(column_names.len());
        for (i, name) in column_names.iter().enumerate() {
            if index.insert(name.clone(), i).is_some() {
                return Err(SqlClientError::DecodeError(format!(
                    "ambiguous result column `{name}`: the name appears more than once, \
                     alias one of the columns with AS"
                )));
            }
        }
        if let Some((row_idx, row)) = rows
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != column_names.len())
        {
            return Err(SqlClientError::DecodeError(format!(
                "row {row_idx} has {} value(s) for {} column(s)",
                row.len(),
                column_names.len()
            )));
        }
        Ok(Self {
            columns: Columns {
                names: Arc::new(column_names),
                index: Arc::new(index),
            },
            rows,
        })
    }

    /// A result with no columns and no rows.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            columns: Columns {
                names: Arc::new(Vec::new()),
                index: Arc::new(HashMap::new()),
            },
            rows: Vec::new(),
        }
    }

    /// Column names in declaration order.
    #[must_use]
    pub fn column_names(&self) -> &[String] {
        &self.columns.names
    }

    /// Iterate the rows from the start.
    pub fn rows(&self) -> impl ExactSizeIterator<Item = Row<'_>> + '_ {
        self.rows.iter().map(|values| Row::new(&self.columns, values))
    }

    /// Row at `index`.
    ///
    /// # Errors
    /// Returns [`SqlClientError::IndexOutOfRange`] past the last row.
    pub fn row(&self, index: usize) -> Result<Row<'_>, SqlClientError> {
        self.rows
            .get(index)
            .map(|values| Row::new(&self.columns, values))
            .ok_or(SqlClientError::IndexOutOfRange {
                index,
                len: self.rows.len(),
            })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Positional view: one value list per row.
    #[must_use]
    pub fn results(&self) -> &[Vec<SqlValue>] {
        &self.rows
    }

    /// One JSON object per row, keyed by column name.
    #[must_use]
    pub fn to_json_rows(&self) -> Vec<serde_json::Value> {
        self.rows().map(|row| row.to_json()).collect()
    }

    /// Consume the set, keeping only the positional rows.
    #[must_use]
    pub fn into_results(self) -> Vec<Vec<SqlValue>> {
        self.rows
    }
}

impl Default for ResultSet {
    fn default() -> Self {
        Self::empty()
    }
}
