use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;

use crate::batch::run_batch;
use crate::error::SqlClientError;
use crate::session::Session;
use crate::transaction::{ModeChange, TransactionController, TxState};

use super::channel::Command;

/// Run commands one at a time until the connection closes.
///
/// Returns the result of closing the backend session.
pub(super) async fn run_dispatcher(
    id: u64,
    mut session: Box<dyn Session>,
    mut receiver: mpsc::UnboundedReceiver<Command>,
    closing: CancellationToken,
    state: watch::Sender<TxState>,
) -> Result<(), SqlClientError> {
    let mut tx = TransactionController::default();

    loop {
        let command = tokio::select! {
            biased;
            () = closing.cancelled() => break,
            next = receiver.recv() => match next {
                Some(command) => command,
                None => break,
            },
        };

        let kind = command.kind();
        tracing::debug!(conn = id, op = kind, "dispatching");
        // Close preempts the in-flight command: its reply sender is dropped
        // with the future and the caller observes ConnectionClosed.
        tokio::select! {
            biased;
            () = closing.cancelled() => {
                tracing::debug!(conn = id, op = kind, "preempted by close");
                break;
            }
            () = dispatch(session.as_mut(), &mut tx, &state, command) => {}
        }
    }

    tx.close();
    state.send_replace(TxState::Closed);

    let closed = session.close().await;
    if let Err(err) = &closed {
        tracing::warn!(conn = id, backend = session.backend_name(), error = %err, "session close failed");
    }

    receiver.close();
    while let Ok(command) = receiver.try_recv() {
        command.reject_closed();
    }
    tracing::debug!(conn = id, "dispatcher stopped");
    closed
}

async fn dispatch(
    session: &mut dyn Session,
    tx: &mut TransactionController,
    state: &watch::Sender<TxState>,
    command: Command,
) {
    match command {
        Command::SetAutoCommit {
            enabled,
            respond_to,
        } => {
            let result = set_auto_commit(session, tx, enabled).await;
            state.send_replace(tx.state());
            let _ = respond_to.send(result);
        }
        Command::Query {
            statement,
            respond_to,
        } => {
            let _ = respond_to.send(session.query(&statement).await);
        }
        Command::Update {
            statement,
            respond_to,
        } => {
            let _ = respond_to.send(session.update(&statement).await);
        }
        Command::Execute { sql, respond_to } => {
            let _ = respond_to.send(session.execute(&sql).await);
        }
        Command::Call { spec, respond_to } => {
            let _ = respond_to.send(session.call(&spec).await);
        }
        Command::Batch {
            statements,
            respond_to,
        } => {
            let outcome = run_batch(session, &statements).await;
            let _ = respond_to.send(Ok(outcome));
        }
        Command::Commit { respond_to } => {
            let result = match tx.ensure_in_transaction() {
                Ok(()) => session.commit().await,
                Err(err) => Err(err),
            };
            let _ = respond_to.send(result);
        }
        Command::Rollback { respond_to } => {
            let result = match tx.ensure_in_transaction() {
                Ok(()) => session.rollback().await,
                Err(err) => Err(err),
            };
            let _ = respond_to.send(result);
        }
    }
}

async fn set_auto_commit(
    session: &mut dyn Session,
    tx: &mut TransactionController,
    enabled: bool,
) -> Result<(), SqlClientError> {
    let change = tx.plan_auto_commit(enabled)?;
    match change {
        ModeChange::Unchanged => return Ok(()),
        ModeChange::Begin => session.begin_manual().await?,
        ModeChange::CommitAndEnd => session.end_manual().await?,
    }
    tx.apply(change);
    tracing::debug!(state = ?tx.state(), "transaction mode changed");
    Ok(())
}
