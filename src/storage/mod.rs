//! Storage Layer - SQLite table mirrors
//!
//! A store owns one connection and mirrors one table:
//! - `load`: `SELECT *`, decode each row, key it, keep it in memory
//! - `persist`: upsert every in-memory record, delete rows no longer in memory
//! - `close`: release the connection
//!
//! [`SqlStore`] is read-write; [`ReadOnlySqlStore`] loads but never writes.

pub mod lifecycle;
pub mod reconcile;
pub mod sql;
pub mod sqlite;

pub use lifecycle::{Closable, Lifecycle, Loader, Persister};
pub use reconcile::{reconcile, ReconcileReport};
pub use sqlite::{ReadOnlySqlStore, SqlStore};
