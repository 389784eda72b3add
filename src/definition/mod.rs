//! Definition Registry: the per-type description of a state machine.
//!
//! A [`Definition`] is built once through
//! [`DefinitionBuilder`](crate::builder::DefinitionBuilder) and then shared
//! behind an `Arc` by every instance of the declaring type and by subtypes
//! that do not extend it. Nothing mutates a definition after it is built.

mod event;
mod transition;

pub use event::{Event, Hook};
pub use transition::{Source, Target, TargetResolver, Transition};

use crate::core::{Guard, StateName};
use crate::error::{FsmError, HookError};
use crate::persistence::PersistencePolicy;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// Attribute used to hold the state when none is declared.
pub const DEFAULT_STATE_ATTRIBUTE: &str = "state";

/// Computes the initial state from record data.
pub type InitialResolver<R> = Arc<dyn Fn(&R) -> Result<StateName, HookError> + Send + Sync>;

/// A declared state and its enter hooks.
pub struct StateDecl<R> {
    pub(crate) name: StateName,
    pub(crate) before_enter: Vec<Hook<R>>,
    pub(crate) after_enter: Vec<Hook<R>>,
}

impl<R> StateDecl<R> {
    pub fn name(&self) -> &StateName {
        &self.name
    }
}

impl<R> Clone for StateDecl<R> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            before_enter: self.before_enter.clone(),
            after_enter: self.after_enter.clone(),
        }
    }
}

impl<R> PartialEq for StateDecl<R> {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl<R> fmt::Debug for StateDecl<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.name)
    }
}

/// A state flagged as initial, optionally under a condition.
pub struct InitialCandidate<R> {
    pub state: StateName,
    pub condition: Option<Guard<R>>,
}

impl<R> Clone for InitialCandidate<R> {
    fn clone(&self) -> Self {
        Self {
            state: self.state.clone(),
            condition: self.condition.clone(),
        }
    }
}

/// How the initial state of an instance is chosen.
pub enum InitialState<R> {
    /// Initial candidates in declaration order. Empty means "first declared
    /// state".
    Candidates(Vec<InitialCandidate<R>>),
    Resolver(InitialResolver<R>),
}

impl<R> Clone for InitialState<R> {
    fn clone(&self) -> Self {
        match self {
            InitialState::Candidates(candidates) => InitialState::Candidates(candidates.clone()),
            InitialState::Resolver(resolver) => InitialState::Resolver(Arc::clone(resolver)),
        }
    }
}

/// Complete, immutable description of a state machine.
pub struct Definition<R> {
    pub(crate) states: Vec<StateDecl<R>>,
    pub(crate) initial: InitialState<R>,
    pub(crate) attribute: String,
    pub(crate) events: Vec<Event<R>>,
    pub(crate) policy: PersistencePolicy,
}

impl<R> Definition<R> {
    /// Declared states in declaration order.
    pub fn states(&self) -> &[StateDecl<R>] {
        &self.states
    }

    pub fn state_names(&self) -> Vec<StateName> {
        self.states.iter().map(|s| s.name.clone()).collect()
    }

    pub fn state(&self, name: &str) -> Option<&StateDecl<R>> {
        self.states.iter().find(|s| s.name.as_str() == name)
    }

    pub fn has_state(&self, name: &str) -> bool {
        self.state(name).is_some()
    }

    /// Declared events in declaration order.
    pub fn events(&self) -> &[Event<R>] {
        &self.events
    }

    pub fn event_names(&self) -> Vec<&str> {
        self.events.iter().map(|e| e.name.as_str()).collect()
    }

    pub fn event(&self, name: &str) -> Option<&Event<R>> {
        self.events.iter().find(|e| e.name == name)
    }

    /// Name of the attribute holding the state.
    pub fn state_attribute(&self) -> &str {
        &self.attribute
    }

    pub fn initial_state(&self) -> &InitialState<R> {
        &self.initial
    }

    pub fn policy(&self) -> PersistencePolicy {
        self.policy
    }

    /// Resolve the initial state for `record`.
    ///
    /// With a resolver, its answer is used. With candidates, the first one
    /// whose condition holds wins, then the first unconditional one, then
    /// the first declared state.
    pub fn resolve_initial_state(&self, record: &R) -> Result<StateName, FsmError> {
        let resolved = match &self.initial {
            InitialState::Resolver(resolver) => {
                resolver(record).map_err(|source| FsmError::callback("initial_state", source))?
            }
            InitialState::Candidates(candidates) => {
                let mut chosen = None;
                for candidate in candidates {
                    if let Some(condition) = &candidate.condition {
                        let holds = condition
                            .check(record)
                            .map_err(|source| FsmError::callback("initial_state", source))?;
                        if holds {
                            chosen = Some(candidate.state.clone());
                            break;
                        }
                    }
                }
                chosen
                    .or_else(|| {
                        candidates
                            .iter()
                            .find(|c| c.condition.is_none())
                            .map(|c| c.state.clone())
                    })
                    .or_else(|| self.states.first().map(|s| s.name.clone()))
                    .ok_or(FsmError::Undeclared)?
            }
        };

        if !self.has_state(resolved.as_str()) {
            return Err(FsmError::UnknownState(resolved));
        }
        Ok(resolved)
    }

    /// Serializable view of the definition for introspection.
    pub fn summary(&self) -> DefinitionSummary {
        let initial = match &self.initial {
            InitialState::Resolver(_) => InitialSummary::Resolver,
            InitialState::Candidates(candidates) if candidates.is_empty() => {
                InitialSummary::Fixed(self.states.first().map(|s| s.name.clone()))
            }
            InitialState::Candidates(candidates)
                if candidates.len() == 1 && candidates[0].condition.is_none() =>
            {
                InitialSummary::Fixed(Some(candidates[0].state.clone()))
            }
            InitialState::Candidates(candidates) => InitialSummary::Conditional(
                candidates.iter().map(|c| c.state.clone()).collect(),
            ),
        };

        DefinitionSummary {
            attribute: self.attribute.clone(),
            states: self.state_names(),
            initial,
            events: self
                .events
                .iter()
                .map(|event| EventSummary {
                    name: event.name.clone(),
                    transitions: event
                        .transitions
                        .iter()
                        .map(|t| TransitionSummary {
                            from: match &t.source {
                                Source::Any => None,
                                Source::States(states) => Some(states.clone()),
                            },
                            to: t.target.literal().cloned(),
                            guarded: t.guard.is_some(),
                        })
                        .collect(),
                })
                .collect(),
            policy: self.policy,
        }
    }
}

impl<R> Clone for Definition<R> {
    fn clone(&self) -> Self {
        Self {
            states: self.states.clone(),
            initial: self.initial.clone(),
            attribute: self.attribute.clone(),
            events: self.events.clone(),
            policy: self.policy,
        }
    }
}

impl<R> PartialEq for Definition<R> {
    fn eq(&self, other: &Self) -> bool {
        self.states == other.states
            && self.events == other.events
            && self.attribute == other.attribute
            && self.policy == other.policy
    }
}

impl<R> fmt::Debug for Definition<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Definition")
            .field("attribute", &self.attribute)
            .field("states", &self.states)
            .field("events", &self.events)
            .field("policy", &self.policy)
            .finish()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DefinitionSummary {
    pub attribute: String,
    pub states: Vec<StateName>,
    pub initial: InitialSummary,
    pub events: Vec<EventSummary>,
    pub policy: PersistencePolicy,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InitialSummary {
    Fixed(Option<StateName>),
    Conditional(Vec<StateName>),
    Resolver,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct EventSummary {
    pub name: String,
    pub transitions: Vec<TransitionSummary>,
}

/// `from: None` means any state, `to: None` means a resolver.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TransitionSummary {
    pub from: Option<Vec<StateName>>,
    pub to: Option<StateName>,
    pub guarded: bool,
}
