use tokio::sync::oneshot;

use crate::batch::BatchOutcome;
use crate::error::SqlClientError;
use crate::results::{CallOutcome, ResultSet, UpdateOutcome};
use crate::statement::{CallSpec, Statement};

type Reply<T> = oneshot::Sender<Result<T, SqlClientError>>;

fn closed<T>() -> Result<T, SqlClientError> {
    Err(SqlClientError::ConnectionClosed)
}

pub(super) enum Command {
    SetAutoCommit {
        enabled: bool,
        respond_to: Reply<()>,
    },
    Query {
        statement: Statement,
        respond_to: Reply<ResultSet>,
    },
    Update {
        statement: Statement,
        respond_to: Reply<UpdateOutcome>,
    },
    Execute {
        sql: String,
        respond_to: Reply<()>,
    },
    Call {
        spec: CallSpec,
        respond_to: Reply<CallOutcome>,
    },
    Batch {
        statements: Vec<Statement>,
        respond_to: Reply<BatchOutcome>,
    },
    Commit {
        respond_to: Reply<()>,
    },
    Rollback {
        respond_to: Reply<()>,
    },
}

impl Command {
    pub(super) fn kind(&self) -> &'static str {
        match self {
            Command::SetAutoCommit { .. } => "set_auto_commit",
            Command::Query { .. } => "query",
            Command::Update { .. } => "update",
            Command::Execute { .. } => "execute",
            Command::Call { .. } => "call",
            Command::Batch { .. } => "batch",
            Command::Commit { .. } => "commit",
            Command::Rollback { .. } => "rollback",
        }
    }

    /// Answer a command that will never run.
    pub(super) fn reject_closed(self) {
        match self {
            Command::SetAutoCommit { respond_to, .. }
            | Command::Execute { respond_to, .. }
            | Command::Commit { respond_to }
            | Command::Rollback { respond_to } => {
                let _ = respond_to.send(closed());
            }
            Command::Query { respond_to, .. } => {
                let _ = respond_to.send(closed());
            }
            Command::Update { respond_to, .. } => {
                let _ = respond_to.send(closed());
            }
            Command::Call { respond_to, .. } => {
                let _ = respond_to.send(closed());
            }
            Command::Batch { respond_to, .. } => {
                let _ = respond_to.send(closed());
            }
        }
    }
}
