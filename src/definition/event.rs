//! Events: named triggers resolving to at most one transition.

use super::transition::Transition;
use crate::core::StateName;
use crate::error::{FsmError, HookError};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Callback run around a transition. Receives the event arguments.
pub type Hook<R> = Arc<dyn Fn(&mut R, &[Value]) -> Result<(), HookError> + Send + Sync>;

pub struct Event<R> {
    pub(crate) name: String,
    pub(crate) transitions: Vec<Transition<R>>,
    pub(crate) before: Vec<Hook<R>>,
    pub(crate) after: Vec<Hook<R>>,
}

impl<R> Event<R> {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Transitions in declaration order.
    pub fn transitions(&self) -> &[Transition<R>] {
        &self.transitions
    }

    /// First transition, in declaration order, whose source matches
    /// `current` and whose guard passes.
    ///
    /// A guard that errors aborts the search immediately.
    pub fn select(
        &self,
        record: &R,
        current: Option<&StateName>,
    ) -> Result<Option<&Transition<R>>, FsmError> {
        for transition in &self.transitions {
            let applicable =
                transition
                    .is_applicable(record, current)
                    .map_err(|source| FsmError::Guard {
                        event: self.name.clone(),
                        source,
                    })?;
            if applicable {
                return Ok(Some(transition));
            }
        }
        Ok(None)
    }

    pub(crate) fn before_hooks(&self) -> &[Hook<R>] {
        &self.before
    }

    pub(crate) fn after_hooks(&self) -> &[Hook<R>] {
        &self.after
    }
}

impl<R> Clone for Event<R> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            transitions: self.transitions.clone(),
            before: self.before.clone(),
            after: self.after.clone(),
        }
    }
}

impl<R> PartialEq for Event<R> {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.transitions == other.transitions
    }
}

impl<R> fmt::Debug for Event<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event")
            .field("name", &self.name)
            .field("transitions", &self.transitions)
            .field("before", &self.before.len())
            .field("after", &self.after.len())
            .finish()
    }
}
