//! In-memory session used by the unit tests.
//!
//! Records every call as a line of text, can fail or stall on chosen SQL, and
//! tracks how many calls were in flight at once.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::error::SqlClientError;
use crate::results::{CallOutcome, ResultSet, UpdateOutcome};
use crate::session::Session;
use crate::statement::{CallSpec, Statement};
use crate::types::SqlValue;

#[derive(Default)]
struct Script {
    log: Vec<String>,
    failures: HashSet<String>,
    delays: HashMap<String, Duration>,
}

#[derive(Clone, Default)]
pub(crate) struct ScriptedSession {
    script: Arc<Mutex<Script>>,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
}

impl ScriptedSession {
    pub(crate) fn fail_on(&self, sql: &str) {
        self.script.lock().unwrap().failures.insert(sql.to_owned());
    }

    pub(crate) fn delay_on(&self, sql: &str, delay: Duration) {
        self.script
            .lock()
            .unwrap()
            .delays
            .insert(sql.to_owned(), delay);
    }

    pub(crate) fn log(&self) -> Vec<String> {
        self.script.lock().unwrap().log.clone()
    }

    pub(crate) fn max_concurrency(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn record(&self, entry: String) {
        self.script.lock().unwrap().log.push(entry);
    }

    async fn step(&self, op: &str, sql: &str, params: &[SqlValue]) -> Result<(), SqlClientError> {
        let entry = if params.is_empty() {
            format!("{op} {sql}")
        } else {
            format!("{op} {sql} {params:?}")
        };
        self.record(entry);

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        let (delay, fail) = {
            let script = self.script.lock().unwrap();
            (script.delays.get(sql).copied(), script.failures.contains(sql))
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        } else {
            tokio::task::yield_now().await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if fail {
            Err(SqlClientError::BackendError {
                code: Some(1),
                message: format!("scripted failure: {sql}"),
            })
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl Session for ScriptedSession {
    fn backend_name(&self) -> &'static str {
        "scripted"
    }

    async fn begin_manual(&mut self) -> Result<(), SqlClientError> {
        self.record("begin_manual".into());
        Ok(())
    }

    async fn end_manual(&mut self) -> Result<(), SqlClientError> {
        self.record("end_manual".into());
        Ok(())
    }

    async fn query(&mut self, statement: &Statement) -> Result<ResultSet, SqlClientError> {
        self.step("query", statement.sql(), statement.params())
            .await?;
        ResultSet::new(vec!["value".into()], vec![vec![SqlValue::Int(1)]])
    }

    async fn update(&mut self, statement: &Statement) -> Result<UpdateOutcome, SqlClientError> {
        self.step("update", statement.sql(), statement.params())
            .await?;
        Ok(UpdateOutcome::new(1, Vec::new()))
    }

    async fn execute(&mut self, sql: &str) -> Result<(), SqlClientError> {
        self.step("execute", sql, &[]).await
    }

    async fn call(&mut self, call: &CallSpec) -> Result<CallOutcome, SqlClientError> {
        let inputs = call.in_values();
        self.step("call", call.sql(), &inputs).await?;
        Ok(CallOutcome {
            outputs: vec![SqlValue::Null; call.output_count()],
            ..CallOutcome::default()
        })
    }

    async fn commit(&mut self) -> Result<(), SqlClientError> {
        self.record("commit".into());
        Ok(())
    }

    async fn rollback(&mut self) -> Result<(), SqlClientError> {
        self.record("rollback".into());
        Ok(())
    }

    async fn close(&mut self) -> Result<(), SqlClientError> {
        self.record("close".into());
        Ok(())
    }
}
