use crate::error::SqlClientError;

/// Transaction state of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TxState {
    /// Every statement is its own implicit transaction.
    #[default]
    AutoCommit,
    /// Statements accumulate until `commit` or `rollback`.
    InTransaction,
    /// Terminal.
    Closed,
}

/// What the backend must do to honour an auto-commit change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ModeChange {
    /// Already in the requested mode.
    Unchanged,
    /// Leave auto-commit; the backend opens transactions from now on.
    Begin,
    /// Commit pending work, then return to auto-commit.
    CommitAndEnd,
}

/// State machine consulted before every operation.
///
/// Transactions are chained: after `commit` or `rollback` the connection stays
/// in `InTransaction` and the next statement starts a fresh transaction, until
/// auto-commit is switched back on.
#[derive(Debug, Default)]
pub(crate) struct TransactionController {
    state: TxState,
}

impl TransactionController {
    pub(crate) fn state(&self) -> TxState {
        self.state
    }

    pub(crate) fn ensure_open(&self) -> Result<(), SqlClientError> {
        if self.state == TxState::Closed {
            Err(SqlClientError::ConnectionClosed)
        } else {
            Ok(())
        }
    }

    /// Plan a `set_auto_commit(enabled)` call.
    pub(crate) fn plan_auto_commit(&self, enabled: bool) -> Result<ModeChange, SqlClientError> {
        self.ensure_open()?;
        Ok(match (self.state, enabled) {
            (TxState::AutoCommit, false) => ModeChange::Begin,
            (TxState::InTransaction, true) => ModeChange::CommitAndEnd,
            _ => ModeChange::Unchanged,
        })
    }

    /// Record a mode change the backend acknowledged.
    pub(crate) fn apply(&mut self, change: ModeChange) {
        match change {
            ModeChange::Unchanged => {}
            ModeChange::Begin => self.state = TxState::InTransaction,
            ModeChange::CommitAndEnd => self.state = TxState::AutoCommit,
        }
    }

    /// Check that `commit`/`rollback` is meaningful.
    pub(crate) fn ensure_in_transaction(&self) -> Result<(), SqlClientError> {
        match self.state {
            TxState::InTransaction => Ok(()),
            TxState::AutoCommit => Err(SqlClientError::NoActiveTransaction),
            TxState::Closed => Err(SqlClientError::ConnectionClosed),
        }
    }

    pub(crate) fn close(&mut self) {
        self.state = TxState::Closed;
    }
}
