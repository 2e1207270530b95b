//! Routine calls for the SQLite backend.
//!
//! SQLite has no stored procedures, so `{ call name(?, ?) }` resolves `name` in
//! a registry of Rust closures first. A name that is not registered is
//! evaluated as a scalar SQL function, `SELECT name(?, ?)`, which can take IN
//! parameters only. Text that is not in call syntax runs as a plain statement.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, LazyLock};

use regex::Regex;
use rusqlite::types::Value;

use crate::codec;
use crate::error::SqlClientError;
use crate::results::{CallOutcome, ResultSet};
use crate::statement::CallSpec;

use super::params::{convert_params, from_sqlite_value};
use super::query::build_result_set;

static CALL_SYNTAX: LazyLock<Result<Regex, regex::Error>> = LazyLock::new(|| {
    Regex::new(r"(?is)^\s*\{\s*call\s+([A-Za-z_][A-Za-z0-9_]*)\s*(?:\((.*)\))?\s*\}\s*;?\s*$")
});

/// What a registered routine hands back.
#[derive(Debug, Default)]
pub struct RoutineOutput {
    pub result_set: Option<ResultSet>,
    pub updated: u64,
    /// One value per OUT/INOUT placeholder, in placeholder order.
    pub outputs: Vec<Value>,
}

/// A routine body. It receives the session's connection and one bound value
/// per placeholder (`NULL` for pure OUT slots).
pub type Routine =
    dyn Fn(&rusqlite::Connection, &[Value]) -> Result<RoutineOutput, SqlClientError> + Send + Sync;

/// Routines callable through `{ call name(...) }`, keyed case-insensitively.
#[derive(Clone, Default)]
pub struct RoutineRegistry {
    routines: HashMap<String, Arc<Routine>>,
}

impl RoutineRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `routine` under `name`, replacing any earlier registration.
    pub fn register<F>(&mut self, name: &str, routine: F)
    where
        F: Fn(&rusqlite::Connection, &[Value]) -> Result<RoutineOutput, SqlClientError>
            + Send
            + Sync
            + 'static,
    {
        self.routines
            .insert(name.to_ascii_lowercase(), Arc::new(routine));
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<Routine>> {
        self.routines.get(&name.to_ascii_lowercase()).cloned()
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.routines.contains_key(&name.to_ascii_lowercase())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.routines.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routines.is_empty()
    }
}

impl fmt::Debug for RoutineRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.routines.keys().collect();
        names.sort();
        f.debug_struct("RoutineRegistry")
            .field("routines", &names)
            .finish()
    }
}

#[derive(Debug, PartialEq, Eq)]
pub(crate) struct ParsedCall<'a> {
    pub(crate) name: &'a str,
    pub(crate) args: &'a str,
}

/// Split `{ call name(args) }` into its parts; `None` for any other text.
pub(crate) fn parse_call(sql: &str) -> Result<Option<ParsedCall<'_>>, SqlClientError> {
    let syntax = CALL_SYNTAX
        .as_ref()
        .map_err(|e| SqlClientError::ConfigError(format!("call syntax pattern: {e}")))?;
    Ok(syntax.captures(sql).and_then(|caps| {
        let name = caps.get(1)?.as_str();
        let args = caps.get(2).map_or("", |m| m.as_str().trim());
        Some(ParsedCall { name, args })
    }))
}

/// Run a call on `conn` and decode its OUT values by their declared types.
pub(crate) fn run_call(
    conn: &rusqlite::Connection,
    routines: &RoutineRegistry,
    spec: &CallSpec,
) -> Result<CallOutcome, SqlClientError> {
    let bound: Vec<_> = spec.params().iter().map(|p| p.bound_value().clone()).collect();
    let args = convert_params(&bound)?;

    let parsed = parse_call(spec.sql())?;
    if let Some(routine) = parsed.as_ref().and_then(|call| routines.get(call.name)) {
        let output = routine(conn, &args)?;
        return decode_outputs(spec, output);
    }

    if spec.output_count() > 0 {
        let target = parsed.as_ref().map_or(spec.sql(), |call| call.name);
        return Err(SqlClientError::BackendError {
            code: None,
            message: format!("`{target}` is not a registered routine and cannot bind OUT parameters"),
        });
    }

    let sql = match &parsed {
        Some(call) => format!("SELECT {}({})", call.name, call.args),
        None => spec.sql().to_owned(),
    };
    let mut stmt = conn.prepare(&sql)?;
    if stmt.column_count() > 0 {
        let result_set = build_result_set(&mut stmt, &args)?;
        Ok(CallOutcome {
            result_set: Some(result_set),
            ..CallOutcome::default()
        })
    } else {
        let updated = stmt.execute(rusqlite::params_from_iter(args.iter()))?;
        Ok(CallOutcome {
            updated: updated as u64,
            ..CallOutcome::default()
        })
    }
}

fn decode_outputs(spec: &CallSpec, output: RoutineOutput) -> Result<CallOutcome, SqlClientError> {
    let declared = spec.output_types();
    if output.outputs.len() != declared.len() {
        return Err(SqlClientError::BackendError {
            code: None,
            message: format!(
                "routine produced {} OUT value(s), call declares {}",
                output.outputs.len(),
                declared.len()
            ),
        });
    }
    let outputs = output
        .outputs
        .into_iter()
        .zip(declared)
        .map(|(value, ty)| codec::decode(from_sqlite_value(value), ty))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(CallOutcome {
        result_set: output.result_set,
        updated: output.updated,
        outputs,
    })
}
