//! Statehold: finite-state machines attached to persistent records
//!
//! A state machine is declared once per record type and shared by every
//! instance. Events resolve to guarded transitions, and the resulting state
//! change is written through a pluggable persistence seam that knows about
//! the record's validation and transaction lifecycle.
//!
//! # Core Concepts
//!
//! - **Definition**: states, initial state, state attribute and events of a type
//! - **Runtime**: `current_state`, `fire`, `fire_strict` on each record
//! - **Persistence**: when and how the new state reaches storage
//! - **Scopes**: one query filter per declared state
//!
//! # Example
//!
//! ```rust
//! use statehold::builder::{simple_transition, DefinitionBuilder, EventBuilder};
//! use statehold::store::{Database, Model};
//! use statehold::{Persistence, StateMachine};
//! use serde_json::json;
//!
//! let db = Database::new();
//! let workers = Model::builder("Worker", &db)
//!     .validates_presence_of("name")
//!     .state_machine(
//!         DefinitionBuilder::new()
//!             .attribute("status")
//!             .initial_state("sleeping")
//!             .state("running")
//!             .event(EventBuilder::new("run").add_transition(simple_transition("sleeping", "running")))
//!             .build()
//!             .unwrap(),
//!     )
//!     .build();
//!
//! let mut worker = workers.create(json!({ "name": "worker" })).unwrap();
//! assert!(worker.is_in("sleeping").unwrap());
//!
//! assert!(worker.fire_strict("run", &[]).unwrap());
//! worker.reload().unwrap();
//! assert!(worker.is_in("running").unwrap());
//! assert_eq!(workers.scope("running").unwrap().count().unwrap(), 1);
//! ```

pub mod builder;
pub mod core;
pub mod definition;
pub mod error;
pub mod persistence;
pub mod runtime;
pub mod scope;
pub mod store;

// Re-export commonly used types
pub use builder::{BuildError, DefinitionBuilder, EventBuilder, TransitionBuilder};
pub use core::{Guard, State, StateName};
pub use definition::Definition;
pub use error::{FsmError, HookError};
pub use persistence::{Persistence, PersistencePolicy, TransactionScope};
pub use runtime::StateMachine;
