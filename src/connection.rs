mod channel;
mod dispatcher;

use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use tokio::runtime::Handle;
use tokio::sync::{Mutex, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::batch::{self, BatchOutcome};
use crate::error::SqlClientError;
use crate::results::{CallOutcome, ResultSet, UpdateOutcome};
use crate::session::Session;
use crate::statement::{CallSpec, Statement};
use crate::transaction::TxState;
use crate::types::{SqlType, SqlValue};

use channel::Command;
use dispatcher::run_dispatcher;

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// One exclusive session with a backend.
///
/// Every operation is asynchronous and resolves to exactly one success value or
/// one error. Operations take `&self`, so a connection can be shared between
/// tasks; they are queued and run strictly in issue order, never overlapping.
///
/// ```rust,no_run
/// # use async_sql::prelude::*;
/// # async fn demo(conn: &Connection) -> Result<(), SqlClientError> {
/// conn.set_auto_commit(false).await?;
/// let outcome = conn
///     .update_with_params(
///         "UPDATE PEOPLE SET SHOE_SIZE = 10 WHERE LNAME=?",
///         params!["Fox"],
///     )
///     .await?;
/// println!("No. of rows updated: {}", outcome.updated);
/// conn.commit().await?;
/// conn.close().await?;
/// # Ok(())
/// # }
/// ```
pub struct Connection {
    id: u64,
    backend: &'static str,
    sender: mpsc::UnboundedSender<Command>,
    closing: CancellationToken,
    closed: AtomicBool,
    state: watch::Receiver<TxState>,
    dispatcher: Mutex<Option<JoinHandle<Result<(), SqlClientError>>>>,
}

impl Connection {
    /// Wrap a backend session, spawning its dispatcher on the current tokio
    /// runtime.
    ///
    /// # Errors
    /// Returns [`SqlClientError::ConfigError`] outside a tokio runtime.
    pub fn open(session: Box<dyn Session>) -> Result<Self, SqlClientError> {
        let handle = Handle::try_current().map_err(|err| {
            SqlClientError::ConfigError(format!("connections require a tokio runtime: {err}"))
        })?;
        let id = NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed);
        let backend = session.backend_name();
        let (sender, receiver) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(TxState::AutoCommit);
        let closing = CancellationToken::new();
        let dispatcher = handle.spawn(run_dispatcher(
            id,
            session,
            receiver,
            closing.clone(),
            state_tx,
        ));
        tracing::debug!(conn = id, backend, "connection opened");

        Ok(Self {
            id,
            backend,
            sender,
            closing,
            closed: AtomicBool::new(false),
            state: state_rx,
            dispatcher: Mutex::new(Some(dispatcher)),
        })
    }

    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Transaction state as of the last completed mode change.
    #[must_use]
    pub fn state(&self) -> TxState {
        if self.is_closed() {
            TxState::Closed
        } else {
            *self.state.borrow()
        }
    }

    /// Switch auto-commit on or off.
    ///
    /// Turning it on while a transaction is open commits the pending work
    /// first.
    ///
    /// # Errors
    /// `ConnectionClosed`, or `BackendError` if the backend rejects the change.
    pub async fn set_auto_commit(&self, enabled: bool) -> Result<(), SqlClientError> {
        self.ensure_open()?;
        self.request(|respond_to| Command::SetAutoCommit {
            enabled,
            respond_to,
        })
        .await
    }

    /// Run a read statement.
    ///
    /// # Errors
    /// `SyntaxError`, `ParameterMismatch`, `BackendError` or `ConnectionClosed`.
    pub async fn query(&self, sql: &str) -> Result<ResultSet, SqlClientError> {
        self.query_with_params(sql, Vec::new()).await
    }

    /// Run a read statement with positional parameters.
    ///
    /// # Errors
    /// `SyntaxError`, `ParameterMismatch`, `BackendError` or `ConnectionClosed`.
    pub async fn query_with_params(
        &self,
        sql: &str,
        params: Vec<SqlValue>,
    ) -> Result<ResultSet, SqlClientError> {
        self.ensure_open()?;
        let statement = Statement::new(sql, params)?;
        self.request(|respond_to| Command::Query {
            statement,
            respond_to,
        })
        .await
    }

    /// Run a write statement.
    ///
    /// # Errors
    /// `SyntaxError`, `ParameterMismatch`, `BackendError` or `ConnectionClosed`.
    pub async fn update(&self, sql: &str) -> Result<UpdateOutcome, SqlClientError> {
        self.update_with_params(sql, Vec::new()).await
    }

    /// Run a write statement with positional parameters.
    ///
    /// # Errors
    /// `SyntaxError`, `ParameterMismatch`, `BackendError` or `ConnectionClosed`.
    pub async fn update_with_params(
        &self,
        sql: &str,
        params: Vec<SqlValue>,
    ) -> Result<UpdateOutcome, SqlClientError> {
        self.ensure_open()?;
        let statement = Statement::new(sql, params)?;
        self.request(|respond_to| Command::Update {
            statement,
            respond_to,
        })
        .await
    }

    /// Run DDL or other administrative SQL.
    ///
    /// # Errors
    /// `SyntaxError`, `BackendError` or `ConnectionClosed`.
    pub async fn execute(&self, sql: &str) -> Result<(), SqlClientError> {
        self.ensure_open()?;
        let sql = sql.to_owned();
        self.request(|respond_to| Command::Execute { sql, respond_to })
            .await
    }

    /// Invoke a routine without parameters, e.g. `{ call one_hour_ago() }`.
    ///
    /// # Errors
    /// `ParameterMismatch`, `BackendError` or `ConnectionClosed`.
    pub async fn call(&self, sql: &str) -> Result<CallOutcome, SqlClientError> {
        self.call_spec(CallSpec::new(sql)).await
    }

    /// Invoke a routine with IN values and OUT declarations merged by position
    /// (see [`CallSpec::from_lists`]).
    ///
    /// # Errors
    /// `ParameterMismatch`, `DecodeError` for an OUT value that does not fit
    /// its declared type, `BackendError` or `ConnectionClosed`.
    pub async fn call_with_params(
        &self,
        sql: &str,
        inputs: Vec<SqlValue>,
        outputs: Vec<Option<SqlType>>,
    ) -> Result<CallOutcome, SqlClientError> {
        self.call_spec(CallSpec::from_lists(sql, &inputs, &outputs))
            .await
    }

    /// Invoke a routine described by a [`CallSpec`].
    ///
    /// # Errors
    /// Same as [`Connection::call_with_params`].
    pub async fn call_spec(&self, spec: CallSpec) -> Result<CallOutcome, SqlClientError> {
        self.ensure_open()?;
        spec.validate()?;
        self.request(|respond_to| Command::Call { spec, respond_to })
            .await
    }

    /// Run parameterless statements in order, stopping at the first failure.
    ///
    /// # Errors
    /// `ParameterMismatch` if any statement has placeholders (nothing runs), or
    /// `ConnectionClosed`. Backend failures are reported in
    /// [`BatchOutcome::truncated`].
    pub async fn batch(&self, statements: Vec<String>) -> Result<BatchOutcome, SqlClientError> {
        self.ensure_open()?;
        let statements = batch::prepare_statements(statements)?;
        self.request(|respond_to| Command::Batch {
            statements,
            respond_to,
        })
        .await
    }

    /// Run one statement once per parameter set, in order, stopping at the
    /// first failure.
    ///
    /// # Errors
    /// `ParameterMismatch` if any set has the wrong width (nothing runs), or
    /// `ConnectionClosed`. Backend failures are reported in
    /// [`BatchOutcome::truncated`].
    pub async fn batch_with_params(
        &self,
        sql: &str,
        parameter_sets: Vec<Vec<SqlValue>>,
    ) -> Result<BatchOutcome, SqlClientError> {
        self.ensure_open()?;
        let statements = batch::prepare_parameter_sets(sql, parameter_sets)?;
        self.request(|respond_to| Command::Batch {
            statements,
            respond_to,
        })
        .await
    }

    /// Make pending work durable.
    ///
    /// # Errors
    /// `NoActiveTransaction` in auto-commit mode, `BackendError` or
    /// `ConnectionClosed`.
    pub async fn commit(&self) -> Result<(), SqlClientError> {
        self.ensure_open()?;
        self.request(|respond_to| Command::Commit { respond_to })
            .await
    }

    /// Discard pending work.
    ///
    /// # Errors
    /// `NoActiveTransaction` in auto-commit mode, `BackendError` or
    /// `ConnectionClosed`.
    pub async fn rollback(&self) -> Result<(), SqlClientError> {
        self.ensure_open()?;
        self.request(|respond_to| Command::Rollback { respond_to })
            .await
    }

    /// Release the session.
    ///
    /// The in-flight operation and anything queued behind it fail with
    /// `ConnectionClosed`. Closing twice is a no-op.
    ///
    /// # Errors
    /// Returns the backend's error if the session failed to close cleanly.
    pub async fn close(&self) -> Result<(), SqlClientError> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        self.closing.cancel();
        let dispatcher = self.dispatcher.lock().await.take();
        tracing::debug!(conn = self.id, "connection closing");
        match dispatcher {
            Some(handle) => handle.await.map_err(|err| {
                SqlClientError::backend(format!("connection dispatcher failed: {err}"))
            })?,
            None => Ok(()),
        }
    }

    fn ensure_open(&self) -> Result<(), SqlClientError> {
        if self.is_closed() {
            Err(SqlClientError::ConnectionClosed)
        } else {
            Ok(())
        }
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<Result<T, SqlClientError>>) -> Command,
    ) -> Result<T, SqlClientError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(build(tx))
            .map_err(|_| SqlClientError::ConnectionClosed)?;
        rx.await.map_err(|_| SqlClientError::ConnectionClosed)?
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        if !self.closed.load(Ordering::Acquire) {
            tracing::warn!(conn = self.id, "connection dropped without close");
            self.closing.cancel();
        }
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("backend", &self.backend)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

/// Race an operation against a cancellation token.
///
/// When the token fires first the caller gets [`SqlClientError::Cancelled`].
/// An operation already handed to the connection still runs to completion and
/// its result is discarded.
///
/// # Errors
/// `Cancelled`, or the operation's own error.
pub async fn cancellable<T, F>(token: &CancellationToken, operation: F) -> Result<T, SqlClientError>
where
    F: Future<Output = Result<T, SqlClientError>>,
{
    tokio::select! {
        biased;
        () = token.cancelled() => Err(SqlClientError::Cancelled),
        result = operation => result,
    }
}
