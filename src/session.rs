use async_trait::async_trait;

use crate::error::SqlClientError;
use crate::results::{CallOutcome, ResultSet, UpdateOutcome};
use crate::statement::{CallSpec, Statement};

/// A backend session driven by a [`Connection`](crate::Connection).
///
/// The connection's dispatcher owns the session and calls it one operation at
/// a time, so implementations never see overlapping calls. Parameters arrive
/// validated against the placeholder count.
///
/// Transaction mode is explicit: after `begin_manual` the session keeps every
/// statement inside an open transaction until `commit`/`rollback`, and opens a
/// new one for the next statement; `end_manual` commits and returns to
/// auto-commit.
#[async_trait]
pub trait Session: Send + 'static {
    /// Short backend name used in logs.
    fn backend_name(&self) -> &'static str;

    /// Leave auto-commit mode.
    async fn begin_manual(&mut self) -> Result<(), SqlClientError>;

    /// Commit pending work and return to auto-commit mode.
    async fn end_manual(&mut self) -> Result<(), SqlClientError>;

    async fn query(&mut self, statement: &Statement) -> Result<ResultSet, SqlClientError>;

    async fn update(&mut self, statement: &Statement) -> Result<UpdateOutcome, SqlClientError>;

    /// Run administrative SQL that yields no typed result.
    async fn execute(&mut self, sql: &str) -> Result<(), SqlClientError>;

    async fn call(&mut self, call: &CallSpec) -> Result<CallOutcome, SqlClientError>;

    async fn commit(&mut self) -> Result<(), SqlClientError>;

    async fn rollback(&mut self) -> Result<(), SqlClientError>;

    /// Release backend resources. Pending manual-mode work is discarded.
    async fn close(&mut self) -> Result<(), SqlClientError>;
}
