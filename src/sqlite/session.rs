use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use regex::Regex;
use tokio::sync::Mutex;

use crate::error::SqlClientError;
use crate::results::{CallOutcome, ResultSet, UpdateOutcome};
use crate::session::Session;
use crate::statement::{CallSpec, Statement};
use crate::types::SqlValue;

use super::params::convert_params;
use super::query::build_result_set;
use super::routine::{RoutineRegistry, run_call};

/// Handle the session shares with blocking tasks. `None` once closed.
pub(crate) type SharedSqliteConnection = Arc<Mutex<Option<rusqlite::Connection>>>;

static GENERATES_KEYS: LazyLock<Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*(INSERT|REPLACE)\b"));

/// [`Session`] over a single `rusqlite` connection.
///
/// Every operation runs on the blocking pool. In manual mode a transaction is
/// opened lazily before the first statement after each commit or rollback.
pub struct SqliteSession {
    conn: SharedSqliteConnection,
    routines: Arc<RoutineRegistry>,
    manual: bool,
    /// Set once this session issued `BEGIN`; cleared by commit or rollback.
    tx_open: Arc<AtomicBool>,
}

impl SqliteSession {
    pub(crate) fn new(conn: rusqlite::Connection, routines: Arc<RoutineRegistry>) -> Self {
        Self {
            conn: Arc::new(Mutex::new(Some(conn))),
            routines,
            manual: false,
            tx_open: Arc::new(AtomicBool::new(false)),
        }
    }

    async fn run<F, R>(&self, func: F) -> Result<R, SqlClientError>
    where
        F: FnOnce(&mut rusqlite::Connection) -> Result<R, SqlClientError> + Send + 'static,
        R: Send + 'static,
    {
        let manual = self.manual;
        let tx_open = Arc::clone(&self.tx_open);
        run_blocking(Arc::clone(&self.conn), move |conn| {
            if manual {
                ensure_not_rolled_back(conn, &tx_open)?;
                if conn.is_autocommit() {
                    conn.execute_batch("BEGIN")?;
                    tx_open.store(true, Ordering::SeqCst);
                }
            }
            func(conn)
        })
        .await
    }

    async fn finish(&self, sql: &'static str) -> Result<(), SqlClientError> {
        let tx_open = Arc::clone(&self.tx_open);
        run_blocking(Arc::clone(&self.conn), move |conn| {
            finish_open_transaction(conn, &tx_open, sql)
        })
        .await
    }
}

impl fmt::Debug for SqliteSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqliteSession")
            .field("routines", &self.routines)
            .field("manual", &self.manual)
            .field("tx_open", &self.tx_open.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

pub(crate) async fn run_blocking<F, R>(
    conn: SharedSqliteConnection,
    func: F,
) -> Result<R, SqlClientError>
where
    F: FnOnce(&mut rusqlite::Connection) -> Result<R, SqlClientError> + Send + 'static,
    R: Send + 'static,
{
    tokio::task::spawn_blocking(move || {
        let mut guard = conn.blocking_lock();
        let conn = guard.as_mut().ok_or(SqlClientError::ConnectionClosed)?;
        func(conn)
    })
    .await
    .map_err(|e| SqlClientError::backend(format!("sqlite spawn_blocking join error: {e}")))?
}

fn generates_keys(sql: &str) -> Result<bool, SqlClientError> {
    GENERATES_KEYS
        .as_ref()
        .map(|re| re.is_match(sql))
        .map_err(|e| SqlClientError::ConfigError(format!("key detection pattern: {e}")))
}

/// Fails once if SQLite ended the transaction this session opened, e.g. after
/// `INSERT OR ROLLBACK` or `SQLITE_FULL`. The flag is reset so the next
/// statement starts a fresh transaction.
fn ensure_not_rolled_back(
    conn: &rusqlite::Connection,
    tx_open: &AtomicBool,
) -> Result<(), SqlClientError> {
    if conn.is_autocommit() && tx_open.swap(false, Ordering::SeqCst) {
        return Err(SqlClientError::backend(
            "transaction was rolled back by the backend",
        ));
    }
    Ok(())
}

fn finish_open_transaction(
    conn: &rusqlite::Connection,
    tx_open: &AtomicBool,
    sql: &str,
) -> Result<(), SqlClientError> {
    if sql == "COMMIT" {
        ensure_not_rolled_back(conn, tx_open)?;
    }
    if !conn.is_autocommit() {
        conn.execute_batch(sql)?;
    }
    tx_open.store(false, Ordering::SeqCst);
    Ok(())
}

#[async_trait]
impl Session for SqliteSession {
    fn backend_name(&self) -> &'static str {
        "sqlite"
    }

    async fn begin_manual(&mut self) -> Result<(), SqlClientError> {
        self.manual = true;
        Ok(())
    }

    async fn end_manual(&mut self) -> Result<(), SqlClientError> {
        self.finish("COMMIT").await?;
        self.manual = false;
        Ok(())
    }

    async fn query(&mut self, statement: &Statement) -> Result<ResultSet, SqlClientError> {
        let sql = statement.sql().to_owned();
        let params = convert_params(statement.params())?;
        self.run(move |conn| {
            let mut stmt = conn.prepare(&sql)?;
            build_result_set(&mut stmt, &params)
        })
        .await
    }

    async fn update(&mut self, statement: &Statement) -> Result<UpdateOutcome, SqlClientError> {
        let sql = statement.sql().to_owned();
        let params = convert_params(statement.params())?;
        let wants_keys = generates_keys(&sql)?;
        self.run(move |conn| {
            let before = conn.last_insert_rowid();
            let mut stmt = conn.prepare_cached(&sql)?;
            let affected = stmt.execute(rusqlite::params_from_iter(params.iter()))?;
            // last_insert_rowid is connection-wide; an unchanged value means
            // no rowid was generated (WITHOUT ROWID tables, upserts that update).
            let after = conn.last_insert_rowid();
            let keys = if wants_keys && affected > 0 && after != before {
                vec![SqlValue::Int(after)]
            } else {
                Vec::new()
            };
            Ok(UpdateOutcome::new(affected as u64, keys))
        })
        .await
    }

    async fn execute(&mut self, sql: &str) -> Result<(), SqlClientError> {
        let sql = sql.to_owned();
        // VACUUM and some pragmas refuse to run inside a transaction, so
        // auto-commit mode runs the text as is.
        self.run(move |conn| {
            conn.execute_batch(&sql)?;
            Ok(())
        })
        .await
    }

    async fn call(&mut self, call: &CallSpec) -> Result<CallOutcome, SqlClientError> {
        let spec = call.clone();
        let routines = Arc::clone(&self.routines);
        self.run(move |conn| run_call(conn, &routines, &spec))
            .await
    }

    async fn commit(&mut self) -> Result<(), SqlClientError> {
        self.finish("COMMIT").await
    }

    async fn rollback(&mut self) -> Result<(), SqlClientError> {
        self.finish("ROLLBACK").await
    }

    async fn close(&mut self) -> Result<(), SqlClientError> {
        let handle = Arc::clone(&self.conn);
        self.tx_open.store(false, Ordering::SeqCst);
        tokio::task::spawn_blocking(move || {
            let Some(conn) = handle.blocking_lock().take() else {
                return Ok(());
            };
            if !conn.is_autocommit() {
                conn.execute_batch("ROLLBACK")?;
            }
            conn.close().map_err(|(_, err)| SqlClientError::from(err))
        })
        .await
        .map_err(|e| SqlClientError::backend(format!("sqlite spawn_blocking join error: {e}")))?
    }
}
