//! Convenient imports for common functionality.
//!
//! This module re-exports the most commonly used types and functions
//! to make it easier to get started with the library.

pub use crate::batch::{BatchOutcome, BatchTruncation};
pub use crate::connection::{Connection, cancellable};
pub use crate::error::SqlClientError;
pub use crate::params;
pub use crate::results::{CallOutcome, ResultSet, Row, UpdateOutcome};
pub use crate::session::Session;
pub use crate::statement::{CallParam, CallSpec, Statement};
pub use crate::transaction::TxState;
pub use crate::types::{SqlType, SqlValue};

pub use tokio_util::sync::CancellationToken;

#[cfg(feature = "sqlite")]
pub use crate::sqlite::{
    RoutineOutput, RoutineRegistry, SqliteConnector, SqliteOptions, SqliteOptionsBuilder,
    SqliteSession,
};
