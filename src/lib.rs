//! # Tablemirror - In-memory mirror of a SQLite table
//!
//! A store loads every row of one table into memory as typed records keyed
//! by primary key, lets the caller mutate them freely, and on teardown
//! reconciles the table with the in-memory collection:
//! - every in-memory record is upserted (`ON CONFLICT([id]) DO UPDATE`)
//! - every table row whose `id` is no longer in memory is deleted
//!
//! Modules:
//! - `value`: scalar values and their SQL type tags
//! - `record`: record trait, row decoding and schema descriptors
//! - `key`: primary-key derivation
//! - `validate`: column-name and record-shape validation
//! - `collection`: the in-memory key/record map
//! - `storage`: load, reconciliation and store lifecycle

pub mod value;
pub mod record;
pub mod key;
pub mod validate;
pub mod collection;
pub mod storage;
pub mod config;
pub mod output;
pub mod ui;

// Re-exports for convenient access
pub use collection::Collection;
pub use record::{Column, DynamicRecord, KeySource, Record, Row, Schema, TypedRecord};
pub use storage::{Closable, Lifecycle, Loader, Persister, ReadOnlySqlStore, ReconcileReport, SqlStore};
pub use value::{Scalar, SqlType};

/// Result type alias for Tablemirror operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for Tablemirror operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("The class {0} does not exist.")]
    NonExistentClass(String),

    #[error("The class {0} should have either a 'getPrimaryKey' method or an 'id' property.")]
    NonExistentPrimaryKeyAccessor(String),

    #[error("One or more column names are invalid.")]
    InvalidColumnNames,

    #[error("The item must be an object.")]
    ItemNotObject,

    #[error("The item must be a {0}")]
    ItemClass(String),

    #[error("Cannot decode column '{column}': {reason}")]
    Decode { column: String, reason: String },

    #[error("{message}")]
    Query { message: String, code: i32 },

    #[error("{message}")]
    Statement { message: String, code: i32 },
}

/// Broad classification of an [`Error`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad record type or missing primary-key capability, raised at construction
    Configuration,
    /// Unsafe column names or wrongly shaped records, raised by persist or load
    Validation,
    /// Failure reported by SQLite
    Backend,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::NonExistentClass(_) | Error::NonExistentPrimaryKeyAccessor(_) => ErrorKind::Configuration,
            Error::InvalidColumnNames | Error::ItemNotObject | Error::ItemClass(_) | Error::Decode { .. } => {
                ErrorKind::Validation
            }
            Error::Query { .. } | Error::Statement { .. } => ErrorKind::Backend,
        }
    }

    /// SQLite extended result code, when the error came from the backend
    pub fn code(&self) -> Option<i32> {
        match self {
            Error::Query { code, .. } | Error::Statement { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Wrap a backend failure raised while loading
    pub(crate) fn query(err: rusqlite::Error) -> Self {
        let (message, code) = backend_parts(&err);
        Error::Query { message, code }
    }

    /// Wrap a backend failure raised while preparing or executing a write
    pub(crate) fn statement(err: rusqlite::Error) -> Self {
        let (message, code) = backend_parts(&err);
        Error::Statement { message, code }
    }
}

/// Split a rusqlite error into the message and code SQLite reported
fn backend_parts(err: &rusqlite::Error) -> (String, i32) {
    match err {
        rusqlite::Error::SqliteFailure(e, Some(msg)) => (msg.clone(), e.extended_code),
        rusqlite::Error::SqliteFailure(e, None) => (e.to_string(), e.extended_code),
        other => (other.to_string(), 0),
    }
}
