//! Build errors for state machine definitions.

use crate::core::StateName;
use thiserror::Error;

/// Errors that can occur when declaring a state machine.
#[derive(Debug, Error, PartialEq)]
pub enum BuildError {
    #[error("No states declared. Call .state(name) before .build()")]
    NoStates,

    #[error("State '{0}' is declared more than once")]
    DuplicateState(StateName),

    #[error("Event '{0}' is declared more than once")]
    DuplicateEvent(String),

    #[error("Event '{0}' has no transitions")]
    EmptyEvent(String),

    #[error("Undeclared state '{state}' referenced by {context}")]
    UnknownState { state: StateName, context: String },

    #[error("Transition source not specified. Call .from(state) or .from_any()")]
    MissingSource,

    #[error("Transition target not specified. Call .to(state) or .to_resolved(resolver)")]
    MissingTarget,

    #[error("Attribute name must not be empty")]
    EmptyAttribute,
}
