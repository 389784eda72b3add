//! Instance Runtime: per-record access to the state machine.
//!
//! Any type implementing [`Persistence`](crate::persistence::Persistence)
//! gains the runtime by implementing [`StateMachine::definition`]. The live
//! state is always read from the backing attribute; nothing is cached.

mod machine;

pub use machine::StateMachine;
