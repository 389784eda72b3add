//! Errors raised by the persistence collaborator.

use serde_json::Value;
use thiserror::Error;

/// Failures of the underlying write, read or transaction primitives.
///
/// These are never produced by validation rejection; a record that fails
/// validation is reported through [`ValidationError`](super::ValidationError).
#[derive(Debug, Clone, Error, PartialEq)]
pub enum PersistenceError {
    #[error("Record {id} not found in table '{table}'")]
    RecordNotFound { table: String, id: String },

    #[error("Unique constraint on {table}.{column} violated by value {value}")]
    ConstraintViolation {
        table: String,
        column: String,
        value: Value,
    },

    #[error("Record has not been persisted yet")]
    NotPersisted,

    #[error("Unknown table '{0}'")]
    UnknownTable(String),
}
