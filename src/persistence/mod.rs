//! Persistence Adapter: the seam between firing events and storage.
//!
//! The engine never talks to a storage engine directly. It consumes the
//! [`Persistence`] trait, which any record type can implement, and decides
//! through [`commit`] whether a transition's new state is written
//! immediately, deferred to the record's own creation, or discarded.
//!
//! | record | `require_whole_transaction` | `enforce_validity_before_persist` | outcome |
//! |---|---|---|---|
//! | new | any | any | assigned in memory only |
//! | existing | true | true | savepoint; validate; roll back and revert when invalid |
//! | existing | true | false | savepoint; write the state column regardless of validity |
//! | existing | false | any | write inside the caller's ambient transaction, if any |
//!
//! When `require_whole_transaction` is set, the runtime also runs the event's
//! hooks inside one scope around the commit, so a failing hook undoes the
//! write together with whatever the hooks stored.

mod adapter;
mod error;
mod policy;
mod validation;

pub use adapter::{assign_without_persistence, commit};
pub use error::PersistenceError;
pub use policy::PersistencePolicy;
pub use validation::{ValidationError, ValidationReport, ValidationResult};

use crate::error::FsmError;
use serde_json::Value;

/// How a transactional scope composes with one that is already open.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransactionScope {
    /// Participate in the ambient transaction, opening one if none exists.
    /// A failure rolls back the whole ambient transaction.
    Join,

    /// Open a nested scope (a savepoint when a transaction is already
    /// open). A failure rolls back only the nested scope; a later failure
    /// of the ambient transaction still undoes everything written here.
    RequiresNew,
}

/// Interface the engine consumes from the storage collaborator.
///
/// `read_state` and `write_state` default to the plain attribute accessors.
/// Types that keep their state somewhere else override them; the engine
/// always goes through these two methods.
pub trait Persistence: Sized {
    /// Current in-memory value of an attribute, `Value::Null` when unset.
    fn read_attribute(&self, name: &str) -> Value;

    fn write_attribute(&mut self, name: &str, value: Value);

    /// Whether the record has not been created in storage yet.
    fn is_new_record(&self) -> bool;

    /// Run the validation pipeline, including pre-creation hooks for new
    /// records.
    fn validate(&mut self) -> ValidationReport;

    /// Write every attribute to storage without validating.
    fn persist(&mut self) -> Result<(), PersistenceError>;

    /// Write a single column to storage without validating or touching
    /// other attributes.
    fn update_column(&mut self, name: &str, value: Value) -> Result<(), PersistenceError>;

    /// Run `body` inside a transactional scope. Any `Err` returned by the
    /// body rolls the scope back and is returned unchanged.
    fn transaction<T, F>(&mut self, scope: TransactionScope, body: F) -> Result<T, FsmError>
    where
        F: FnOnce(&mut Self) -> Result<T, FsmError>;

    /// Discard in-memory attribute values and re-read them from storage.
    fn reload(&mut self) -> Result<(), PersistenceError>;

    fn read_state(&self, attribute: &str) -> Value {
        self.read_attribute(attribute)
    }

    fn write_state(&mut self, attribute: &str, value: Value) {
        self.write_attribute(attribute, value)
    }
}
