//! Builder for constructing guarded transitions.

use crate::builder::error::BuildError;
use crate::core::{Guard, StateName};
use crate::definition::{Source, Target, TargetResolver, Transition};
use crate::error::HookError;
use serde_json::Value;
use std::sync::Arc;

/// Builder for constructing transitions with a fluent API.
pub struct TransitionBuilder<R> {
    source: Option<Source>,
    target: Option<Target<R>>,
    guard: Option<Guard<R>>,
}

impl<R> TransitionBuilder<R> {
    pub fn new() -> Self {
        Self {
            source: None,
            target: None,
            guard: None,
        }
    }

    /// Add a source state. May be called repeatedly to accept several.
    pub fn from(mut self, state: impl Into<StateName>) -> Self {
        let state = state.into();
        self.source = match self.source {
            Some(Source::States(mut states)) => {
                states.push(state);
                Some(Source::States(states))
            }
            Some(Source::Any) => Some(Source::Any),
            None => Some(Source::States(vec![state])),
        };
        self
    }

    pub fn from_states<I, S>(self, states: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<StateName>,
    {
        states.into_iter().fold(self, |builder, state| builder.from(state))
    }

    /// Accept every current state, including an unset one.
    pub fn from_any(mut self) -> Self {
        self.source = Some(Source::Any);
        self
    }

    pub fn to(mut self, state: impl Into<StateName>) -> Self {
        self.target = Some(Target::State(state.into()));
        self
    }

    /// Compute the target from the record and event arguments.
    pub fn to_resolved<F>(mut self, resolver: F) -> Self
    where
        F: Fn(&R, &[Value]) -> Result<StateName, HookError> + Send + Sync + 'static,
    {
        let resolver: TargetResolver<R> = Arc::new(resolver);
        self.target = Some(Target::Resolver(resolver));
        self
    }

    pub fn guard(mut self, guard: Guard<R>) -> Self {
        self.guard = Some(guard);
        self
    }

    /// Add a guard using a closure.
    pub fn when<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&R) -> bool + Send + Sync + 'static,
    {
        self.guard = Some(Guard::new(predicate));
        self
    }

    pub fn build(self) -> Result<Transition<R>, BuildError> {
        let source = self.source.ok_or(BuildError::MissingSource)?;
        let target = self.target.ok_or(BuildError::MissingTarget)?;

        Ok(Transition {
            source,
            target,
            guard: self.guard,
        })
    }
}

impl<R> Default for TransitionBuilder<R> {
    fn default() -> Self {
        Self::new()
    }
}
