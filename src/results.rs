mod result_set;
mod row;

pub use result_set::ResultSet;
pub use row::Row;

use crate::types::SqlValue;

/// Outcome of a write statement.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateOutcome {
    /// Number of rows affected.
    pub updated: u64,
    /// Keys generated by the statement, empty if none.
    pub keys: Vec<SqlValue>,
}

impl UpdateOutcome {
    #[must_use]
    pub fn new(updated: u64, keys: Vec<SqlValue>) -> Self {
        Self { updated, keys }
    }
}

/// Outcome of a routine call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallOutcome {
    /// Rows produced by the routine, if it produced a result.
    pub result_set: Option<ResultSet>,
    /// Rows affected by the routine.
    pub updated: u64,
    /// One decoded value per OUT/INOUT placeholder, in placeholder order.
    pub outputs: Vec<SqlValue>,
}
