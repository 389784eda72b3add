//! Shared vocabulary for state machine definitions and runtimes.
//!
//! - `StateName`: the persisted identifier of a state
//! - `State`: trait for typed enum states that map onto `StateName`s
//! - `Guard`: pure predicate gating a transition

mod guard;
mod state;

pub use guard::Guard;
pub use state::{State, StateName};
