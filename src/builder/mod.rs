//! Builder API for declaring state machines.
//!
//! Definitions are declared once per record type with fluent builders and
//! validated as a whole in [`DefinitionBuilder::build`].

pub mod error;
pub mod event;
pub mod machine;
pub mod macros;
pub mod transition;

pub use error::BuildError;
pub use event::EventBuilder;
pub use machine::DefinitionBuilder;
pub use transition::TransitionBuilder;

use crate::core::StateName;
use crate::definition::{Source, Target, Transition};
use crate::Guard;

/// Create an unconditional transition between two states.
///
/// # Example
///
/// ```
/// use statehold::builder::simple_transition;
///
/// struct Gate;
///
/// let transition = simple_transition::<Gate>("opened", "closed");
/// assert_eq!(transition.target.literal().unwrap(), "closed");
/// ```
pub fn simple_transition<R>(from: impl Into<StateName>, to: impl Into<StateName>) -> Transition<R> {
    Transition {
        source: Source::States(vec![from.into()]),
        target: Target::State(to.into()),
        guard: None,
    }
}

/// Create a transition with a guard predicate.
///
/// # Example
///
/// ```
/// use statehold::builder::guarded_transition;
///
/// struct Gate {
///     locked: bool,
/// }
///
/// let transition = guarded_transition("closed", "opened", |g: &Gate| !g.locked);
/// assert!(transition.guard.is_some());
/// ```
pub fn guarded_transition<R, F>(
    from: impl Into<StateName>,
    to: impl Into<StateName>,
    guard: F,
) -> Transition<R>
where
    F: Fn(&R) -> bool + Send + Sync + 'static,
{
    Transition {
        source: Source::States(vec![from.into()]),
        target: Target::State(to.into()),
        guard: Some(Guard::new(guard)),
    }
}

/// Create a transition that applies from every state.
pub fn any_transition<R>(to: impl Into<StateName>) -> Transition<R> {
    Transition {
        source: Source::Any,
        target: Target::State(to.into()),
        guard: None,
    }
}
