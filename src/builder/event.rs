//! Builder for events.

use crate::builder::error::BuildError;
use crate::builder::transition::TransitionBuilder;
use crate::definition::{Event, Hook, Transition};
use crate::error::HookError;
use serde_json::Value;
use std::sync::Arc;

/// Builder for an event and its ordered transitions.
pub struct EventBuilder<R> {
    name: String,
    transitions: Vec<Transition<R>>,
    before: Vec<Hook<R>>,
    after: Vec<Hook<R>>,
}

impl<R> EventBuilder<R> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            transitions: Vec::new(),
            before: Vec::new(),
            after: Vec::new(),
        }
    }

    /// Add a transition using a builder.
    /// Returns an error if the builder fails validation.
    pub fn transition(mut self, builder: TransitionBuilder<R>) -> Result<Self, BuildError> {
        let transition = builder.build()?;
        self.transitions.push(transition);
        Ok(self)
    }

    /// Add a pre-built transition.
    pub fn add_transition(mut self, transition: Transition<R>) -> Self {
        self.transitions.push(transition);
        self
    }

    /// Add multiple transitions at once, keeping their order.
    pub fn transitions(mut self, transitions: Vec<Transition<R>>) -> Self {
        self.transitions.extend(transitions);
        self
    }

    /// Run before the target state is resolved.
    pub fn before<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut R, &[Value]) -> Result<(), HookError> + Send + Sync + 'static,
    {
        self.before.push(Arc::new(hook));
        self
    }

    /// Run once the new state has been committed.
    pub fn after<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut R, &[Value]) -> Result<(), HookError> + Send + Sync + 'static,
    {
        self.after.push(Arc::new(hook));
        self
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub fn build(self) -> Result<Event<R>, BuildError> {
        if self.transitions.is_empty() {
            return Err(BuildError::EmptyEvent(self.name));
        }
        Ok(Event {
            name: self.name,
            transitions: self.transitions,
            before: self.before,
            after: self.after,
        })
    }
}
