//! Guarded transitions belonging to an event.

use crate::core::{Guard, StateName};
use crate::error::HookError;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Computes a target state from the record and the event arguments.
pub type TargetResolver<R> =
    Arc<dyn Fn(&R, &[Value]) -> Result<StateName, HookError> + Send + Sync>;

/// States a transition can leave from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Source {
    /// Matches every current state, including an unset one.
    Any,
    States(Vec<StateName>),
}

impl Source {
    pub fn matches(&self, current: Option<&StateName>) -> bool {
        match (self, current) {
            (Source::Any, _) => true,
            (Source::States(states), Some(current)) => states.contains(current),
            (Source::States(_), None) => false,
        }
    }
}

/// Where a transition leads.
pub enum Target<R> {
    State(StateName),
    Resolver(TargetResolver<R>),
}

impl<R> Target<R> {
    /// The literal target, if it does not depend on the record.
    pub fn literal(&self) -> Option<&StateName> {
        match self {
            Target::State(name) => Some(name),
            Target::Resolver(_) => None,
        }
    }
}

impl<R> Clone for Target<R> {
    fn clone(&self) -> Self {
        match self {
            Target::State(name) => Target::State(name.clone()),
            Target::Resolver(resolver) => Target::Resolver(Arc::clone(resolver)),
        }
    }
}

impl<R> PartialEq for Target<R> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Target::State(a), Target::State(b)) => a == b,
            (Target::Resolver(a), Target::Resolver(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl<R> fmt::Debug for Target<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::State(name) => write!(f, "{name:?}"),
            Target::Resolver(_) => f.write_str("<resolver>"),
        }
    }
}

/// A declared `(source, guard, target)` rule.
pub struct Transition<R> {
    pub source: Source,
    pub target: Target<R>,
    pub guard: Option<Guard<R>>,
}

impl<R> Transition<R> {
    /// Whether this transition applies to `record` in state `current`.
    ///
    /// The guard is only evaluated when the source matches.
    pub fn is_applicable(&self, record: &R, current: Option<&StateName>) -> Result<bool, HookError> {
        if !self.source.matches(current) {
            return Ok(false);
        }
        match &self.guard {
            Some(guard) => guard.check(record),
            None => Ok(true),
        }
    }

    pub fn resolve_target(&self, record: &R, args: &[Value]) -> Result<StateName, HookError> {
        match &self.target {
            Target::State(name) => Ok(name.clone()),
            Target::Resolver(resolver) => resolver(record, args),
        }
    }
}

impl<R> Clone for Transition<R> {
    fn clone(&self) -> Self {
        Self {
            source: self.source.clone(),
            target: self.target.clone(),
            guard: self.guard.clone(),
        }
    }
}

impl<R> PartialEq for Transition<R> {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source && self.target == other.target && self.guard == other.guard
    }
}

impl<R> fmt::Debug for Transition<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transition")
            .field("source", &self.source)
            .field("target", &self.target)
            .field("guarded", &self.guard.is_some())
            .finish()
    }
}
