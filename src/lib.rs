//! Asynchronous SQL client core.
//!
//! A [`Connection`] wraps one backend session and runs its operations one at a
//! time, in the order they were issued, on a dedicated dispatcher task. Every
//! operation resolves to exactly one value or one [`SqlClientError`].
//!
//! ```rust,no_run
//! use async_sql::prelude::*;
//!
//! # async fn demo() -> Result<(), SqlClientError> {
//! let conn = SqliteConnector::builder("people.db".to_string())
//!     .build()
//!     .connect()
//!     .await?;
//! let rs = conn
//!     .query_with_params("SELECT FNAME, LNAME FROM PEOPLE WHERE LNAME=?", params!["Fox"])
//!     .await?;
//! for row in rs.rows() {
//!     println!("{:?} {:?}", row.get_str("FNAME")?, row.get_str("LNAME")?);
//! }
//! conn.close().await?;
//! # Ok(())
//! # }
//! ```
//!
//! Backends plug in through the [`Session`] trait; the `sqlite` feature (on by
//! default) provides one over `rusqlite`.

#[macro_use]
mod macros;

pub mod batch;
pub mod codec;
pub mod connection;
pub mod error;
pub mod prelude;
pub mod results;
pub mod session;
pub mod statement;
pub mod transaction;
pub mod types;

#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(test)]
mod test_utils;

pub use batch::{BatchOutcome, BatchTruncation};
pub use connection::{Connection, cancellable};
pub use error::SqlClientError;
pub use results::{CallOutcome, ResultSet, Row, UpdateOutcome};
pub use session::Session;
pub use statement::{CallParam, CallSpec, Statement};
pub use transaction::TxState;
pub use types::{SqlType, SqlValue};

#[cfg(feature = "sqlite")]
pub use sqlite::{SqliteConnector, SqliteOptions, SqliteOptionsBuilder};

pub use tokio_util::sync::CancellationToken;
