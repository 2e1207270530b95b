use std::sync::Arc;
use std::time::Duration;

use rusqlite::types::Value;
use serde::Deserialize;

use crate::connection::Connection;
use crate::error::SqlClientError;

use super::routine::{RoutineOutput, RoutineRegistry};
use super::session::SqliteSession;

const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// Options for opening `SQLite` connections.
///
/// Deserializes from JSON such as
/// `{"db_path": "app.db", "busy_timeout_ms": 2000, "wal": false}`; missing
/// fields take their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SqliteOptions {
    pub db_path: String,
    pub busy_timeout_ms: u64,
    pub wal: bool,
}

impl Default for SqliteOptions {
    fn default() -> Self {
        Self {
            db_path: ":memory:".to_string(),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            wal: true,
        }
    }
}

impl SqliteOptions {
    #[must_use]
    pub fn new(db_path: String) -> Self {
        Self {
            db_path,
            ..Self::default()
        }
    }

    /// Parse options from a JSON document.
    ///
    /// # Errors
    /// Returns `SqlClientError::ConfigError` if the JSON is malformed or has
    /// unknown fields.
    pub fn from_json(json: &str) -> Result<Self, SqlClientError> {
        serde_json::from_str(json)
            .map_err(|e| SqlClientError::ConfigError(format!("invalid SQLite options: {e}")))
    }

    fn validate(&self) -> Result<(), SqlClientError> {
        if self.db_path.trim().is_empty() {
            return Err(SqlClientError::ConfigError(
                "SQLite db_path must not be empty".into(),
            ));
        }
        Ok(())
    }
}

/// Fluent builder for `SQLite` options and routines.
#[derive(Debug, Clone)]
pub struct SqliteOptionsBuilder {
    opts: SqliteOptions,
    routines: RoutineRegistry,
}

impl SqliteOptionsBuilder {
    #[must_use]
    pub fn new(db_path: String) -> Self {
        Self {
            opts: SqliteOptions::new(db_path),
            routines: RoutineRegistry::new(),
        }
    }

    #[must_use]
    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.opts.busy_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    #[must_use]
    pub fn wal(mut self, wal: bool) -> Self {
        self.opts.wal = wal;
        self
    }

    /// Register a routine callable as `{ call name(...) }`.
    #[must_use]
    pub fn routine<F>(mut self, name: &str, routine: F) -> Self
    where
        F: Fn(&rusqlite::Connection, &[Value]) -> Result<RoutineOutput, SqlClientError>
            + Send
            + Sync
            + 'static,
    {
        self.routines.register(name, routine);
        self
    }

    #[must_use]
    pub fn finish(self) -> SqliteOptions {
        self.opts
    }

    #[must_use]
    pub fn build(self) -> SqliteConnector {
        SqliteConnector {
            options: self.opts,
            routines: Arc::new(self.routines),
        }
    }
}

/// Opens [`Connection`]s to one `SQLite` database.
#[derive(Debug, Clone)]
pub struct SqliteConnector {
    options: SqliteOptions,
    routines: Arc<RoutineRegistry>,
}

impl SqliteConnector {
    #[must_use]
    pub fn new(options: SqliteOptions) -> Self {
        Self {
            options,
            routines: Arc::new(RoutineRegistry::new()),
        }
    }

    #[must_use]
    pub fn builder(db_path: String) -> SqliteOptionsBuilder {
        SqliteOptionsBuilder::new(db_path)
    }

    #[must_use]
    pub fn options(&self) -> &SqliteOptions {
        &self.options
    }

    /// Open a new connection.
    ///
    /// # Errors
    /// Returns `SqlClientError::ConfigError` for invalid options, or the
    /// backend error if the database cannot be opened or configured.
    pub async fn connect(&self) -> Result<Connection, SqlClientError> {
        self.options.validate()?;
        let opts = self.options.clone();
        let conn = tokio::task::spawn_blocking(move || open_configured(&opts))
            .await
            .map_err(|e| {
                SqlClientError::backend(format!("sqlite spawn_blocking join error: {e}"))
            })??;

        let session = SqliteSession::new(conn, Arc::clone(&self.routines));
        let connection = Connection::open(Box::new(session))?;
        tracing::debug!(
            conn = connection.id(),
            db_path = %self.options.db_path,
            "sqlite connection ready"
        );
        Ok(connection)
    }
}

fn open_configured(opts: &SqliteOptions) -> Result<rusqlite::Connection, SqlClientError> {
    let conn = rusqlite::Connection::open(&opts.db_path)?;
    conn.busy_timeout(Duration::from_millis(opts.busy_timeout_ms))?;
    if opts.wal {
        // journal_mode answers with the resulting mode; in-memory databases stay "memory".
        let _mode: String =
            conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;
    }
    Ok(conn)
}
