//! Reference persistence collaborator.
//!
//! An in-memory database with nested transactions, type descriptors
//! ([`Model`]) and dynamic records ([`Record`]) implementing
//! [`Persistence`](crate::persistence::Persistence) and
//! [`StateMachine`](crate::runtime::StateMachine). Any other storage layer
//! can take its place by implementing the same two traits.

mod database;
mod model;
mod record;
mod relation;

pub use database::{Attributes, Database, RecordId};
pub use model::{Model, ModelBuilder, PreCreateHook, Validator, BUILTIN_MEMBERS, TYPE_COLUMN};
pub use record::Record;
pub use relation::Relation;
