//! Batch execution.
//!
//! Batches are fail-fast: entries run in input order and the first backend
//! failure stops the batch. The outcome keeps the entries that ran and marks
//! where it stopped.

use crate::error::SqlClientError;
use crate::results::UpdateOutcome;
use crate::session::Session;
use crate::statement::Statement;
use crate::types::SqlValue;

/// Where and why a batch stopped.
#[derive(Debug)]
pub struct BatchTruncation {
    /// Input index of the entry that failed; entries from here on did not run.
    pub index: usize,
    pub error: SqlClientError,
}

/// Per-entry outcomes of a batch, in input order.
#[derive(Debug, Default)]
#[must_use = "a batch may have stopped early; check `truncated` or call `into_result`"]
pub struct BatchOutcome {
    pub entries: Vec<UpdateOutcome>,
    pub truncated: Option<BatchTruncation>,
}

impl BatchOutcome {
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.truncated.is_none()
    }

    /// Affected-row counts of the entries that ran.
    #[must_use]
    pub fn counts(&self) -> Vec<u64> {
        self.entries.iter().map(|e| e.updated).collect()
    }

    /// Entries of a complete batch, or the error that truncated it.
    ///
    /// # Errors
    /// Returns the truncating error when the batch stopped early.
    pub fn into_result(self) -> Result<Vec<UpdateOutcome>, SqlClientError> {
        match self.truncated {
            Some(truncation) => Err(truncation.error),
            None => Ok(self.entries),
        }
    }
}

/// Validate a list of parameterless statements.
pub(crate) fn prepare_statements(sqls: Vec<String>) -> Result<Vec<Statement>, SqlClientError> {
    sqls.into_iter().map(Statement::plain).collect()
}

/// Validate every parameter set against one statement text.
pub(crate) fn prepare_parameter_sets(
    sql: &str,
    parameter_sets: Vec<Vec<SqlValue>>,
) -> Result<Vec<Statement>, SqlClientError> {
    parameter_sets
        .into_iter()
        .map(|params| Statement::new(sql, params))
        .collect()
}

/// Run validated entries in order, stopping at the first failure.
pub(crate) async fn run_batch(session: &mut dyn Session, statements: &[Statement]) -> BatchOutcome {
    let mut outcome = BatchOutcome {
        entries: Vec::with_capacity(statements.len()),
        truncated: None,
    };
    for (index, statement) in statements.iter().enumerate() {
        match session.update(statement).await {
            Ok(entry) => outcome.entries.push(entry),
            Err(error) => {
                tracing::debug!(index, %error, "batch truncated");
                outcome.truncated = Some(BatchTruncation { index, error });
                break;
            }
        }
    }
    outcome
}
