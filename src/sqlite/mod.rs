// SQLite backend
//
// - config: options, builder and the connector that opens sessions
// - session: the Session implementation driving a rusqlite connection
// - params: conversion between codec values and rusqlite values
// - query: result set building
// - routine: `{ call name(...) }` parsing and the routine registry

pub mod config;
pub mod params;
pub mod query;
pub mod routine;
pub mod session;

pub use config::{SqliteConnector, SqliteOptions, SqliteOptionsBuilder};
pub use query::build_result_set;
pub use routine::{RoutineOutput, RoutineRegistry};
pub use session::SqliteSession;

/// Re-exported so routine bodies can use the same `rusqlite` version.
pub use rusqlite;
