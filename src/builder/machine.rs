//! Builder for state machine definitions.

use crate::builder::error::BuildError;
use crate::builder::event::EventBuilder;
use crate::core::{Guard, StateName};
use crate::definition::{
    Definition, Event, Hook, InitialCandidate, InitialResolver, InitialState, Source, StateDecl,
    Target, DEFAULT_STATE_ATTRIBUTE,
};
use crate::error::HookError;
use crate::persistence::PersistencePolicy;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;

enum EnterHook {
    Before,
    After,
}

/// Builder for declaring a state machine with a fluent API.
///
/// # Example
///
/// ```rust
/// use statehold::builder::{DefinitionBuilder, EventBuilder, TransitionBuilder};
///
/// struct Worker;
///
/// let definition = DefinitionBuilder::<Worker>::new()
///     .attribute("status")
///     .initial_state("sleeping")
///     .state("running")
///     .event(
///         EventBuilder::new("run")
///             .transition(TransitionBuilder::new().from("sleeping").to("running"))
///             .unwrap(),
///     )
///     .build()
///     .unwrap();
///
/// assert_eq!(definition.state_attribute(), "status");
/// assert_eq!(definition.event_names(), vec!["run"]);
/// ```
pub struct DefinitionBuilder<R> {
    attribute: String,
    states: Vec<StateDecl<R>>,
    candidates: Vec<InitialCandidate<R>>,
    resolver: Option<InitialResolver<R>>,
    events: Vec<Event<R>>,
    pending_events: Vec<EventBuilder<R>>,
    hooks: Vec<(StateName, EnterHook, Hook<R>)>,
    policy: PersistencePolicy,
}

impl<R> DefinitionBuilder<R> {
    pub fn new() -> Self {
        Self {
            attribute: DEFAULT_STATE_ATTRIBUTE.to_string(),
            states: Vec::new(),
            candidates: Vec::new(),
            resolver: None,
            events: Vec::new(),
            pending_events: Vec::new(),
            hooks: Vec::new(),
            policy: PersistencePolicy::default(),
        }
    }

    /// Start from an existing definition and append to it.
    ///
    /// Re-declaring a state or event the parent already has is reported
    /// by [`build`](Self::build).
    pub fn extending(parent: &Definition<R>) -> Self {
        Self {
            attribute: parent.attribute.clone(),
            states: parent.states.clone(),
            candidates: match &parent.initial {
                InitialState::Candidates(candidates) => candidates.clone(),
                InitialState::Resolver(_) => Vec::new(),
            },
            resolver: match &parent.initial {
                InitialState::Resolver(resolver) => Some(Arc::clone(resolver)),
                InitialState::Candidates(_) => None,
            },
            events: parent.events.clone(),
            pending_events: Vec::new(),
            hooks: Vec::new(),
            policy: parent.policy,
        }
    }

    /// Name of the attribute that stores the state.
    pub fn attribute(mut self, name: impl Into<String>) -> Self {
        self.attribute = name.into();
        self
    }

    pub fn state(mut self, name: impl Into<StateName>) -> Self {
        self.states.push(StateDecl {
            name: name.into(),
            before_enter: Vec::new(),
            after_enter: Vec::new(),
        });
        self
    }

    /// Declare a state and mark it as the unconditional initial state.
    pub fn initial_state(self, name: impl Into<StateName>) -> Self {
        let name = name.into();
        let mut builder = self.state(name.clone());
        builder.candidates.push(InitialCandidate {
            state: name,
            condition: None,
        });
        builder
    }

    /// Declare a state that is initial when `condition` holds.
    pub fn initial_state_when<F>(self, name: impl Into<StateName>, condition: F) -> Self
    where
        F: Fn(&R) -> bool + Send + Sync + 'static,
    {
        let name = name.into();
        let mut builder = self.state(name.clone());
        builder.candidates.push(InitialCandidate {
            state: name,
            condition: Some(Guard::new(condition)),
        });
        builder
    }

    /// Pick the initial state with a function of the record.
    /// Takes precedence over initial candidates.
    pub fn initial_resolver<F>(mut self, resolver: F) -> Self
    where
        F: Fn(&R) -> Result<StateName, HookError> + Send + Sync + 'static,
    {
        self.resolver = Some(Arc::new(resolver));
        self
    }

    pub fn before_enter<F>(mut self, state: impl Into<StateName>, hook: F) -> Self
    where
        F: Fn(&mut R, &[Value]) -> Result<(), HookError> + Send + Sync + 'static,
    {
        self.hooks
            .push((state.into(), EnterHook::Before, Arc::new(hook)));
        self
    }

    pub fn after_enter<F>(mut self, state: impl Into<StateName>, hook: F) -> Self
    where
        F: Fn(&mut R, &[Value]) -> Result<(), HookError> + Send + Sync + 'static,
    {
        self.hooks
            .push((state.into(), EnterHook::After, Arc::new(hook)));
        self
    }

    pub fn event(mut self, event: EventBuilder<R>) -> Self {
        self.pending_events.push(event);
        self
    }

    pub fn policy(mut self, policy: PersistencePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Whether invalid records are refused the new state.
    pub fn enforce_validity(mut self, enforce: bool) -> Self {
        self.policy.enforce_validity_before_persist = enforce;
        self
    }

    /// Whether the write gets its own rollback-capable scope.
    pub fn require_whole_transaction(mut self, required: bool) -> Self {
        self.policy.require_whole_transaction = required;
        self
    }

    /// Build the definition.
    /// Returns an error if the declarations are inconsistent.
    pub fn build(mut self) -> Result<Definition<R>, BuildError> {
        if self.attribute.is_empty() {
            return Err(BuildError::EmptyAttribute);
        }
        if self.states.is_empty() {
            return Err(BuildError::NoStates);
        }

        let mut seen = HashSet::new();
        for state in &self.states {
            if !seen.insert(state.name.clone()) {
                return Err(BuildError::DuplicateState(state.name.clone()));
            }
        }

        let mut event_names: HashSet<String> =
            self.events.iter().map(|e| e.name.clone()).collect();
        for pending in &self.pending_events {
            if !event_names.insert(pending.name().to_string()) {
                return Err(BuildError::DuplicateEvent(pending.name().to_string()));
            }
        }
        for pending in self.pending_events {
            self.events.push(pending.build()?);
        }

        for event in &self.events {
            for transition in &event.transitions {
                if let Source::States(sources) = &transition.source {
                    for source in sources {
                        require_state(&seen, source, || format!("event '{}'", event.name))?;
                    }
                }
                if let Target::State(target) = &transition.target {
                    require_state(&seen, target, || format!("event '{}'", event.name))?;
                }
            }
        }

        for candidate in &self.candidates {
            require_state(&seen, &candidate.state, || "initial state".to_string())?;
        }

        for (state, kind, hook) in self.hooks {
            let context = || format!("enter hook on '{state}'");
            require_state(&seen, &state, context)?;
            if let Some(decl) = self.states.iter_mut().find(|s| s.name == state) {
                match kind {
                    EnterHook::Before => decl.before_enter.push(hook),
                    EnterHook::After => decl.after_enter.push(hook),
                }
            }
        }

        let initial = match self.resolver {
            Some(resolver) => InitialState::Resolver(resolver),
            None => InitialState::Candidates(self.candidates),
        };

        Ok(Definition {
            states: self.states,
            initial,
            attribute: self.attribute,
            events: self.events,
            policy: self.policy,
        })
    }
}

fn require_state(
    declared: &HashSet<StateName>,
    state: &StateName,
    context: impl FnOnce() -> String,
) -> Result<(), BuildError> {
    if declared.contains(state) {
        Ok(())
    } else {
        Err(BuildError::UnknownState {
            state: state.clone(),
            context: context(),
        })
    }
}

impl<R> Default for DefinitionBuilder<R> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{guarded_transition, simple_transition};
    use crate::definition::InitialSummary;
    use crate::error::FsmError;

    struct Thief {
        skilled: bool,
    }

    fn run_event() -> EventBuilder<Thief> {
        EventBuilder::new("run").add_transition(simple_transition("sleeping", "running"))
    }

    #[test]
    fn builder_requires_states() {
        let result = DefinitionBuilder::<Thief>::new().build();
        assert_eq!(result.unwrap_err(), BuildError::NoStates);
    }

    #[test]
    fn default_attribute_is_state() {
        let definition = DefinitionBuilder::<Thief>::new().state("idle").build().unwrap();
        assert_eq!(definition.state_attribute(), "state");
    }

    #[test]
    fn duplicate_states_are_rejected() {
        let result = DefinitionBuilder::<Thief>::new()
            .state("idle")
            .initial_state("idle")
            .build();
        assert_eq!(result.unwrap_err(), BuildError::DuplicateState("idle".into()));
    }

    #[test]
    fn duplicate_events_are_rejected() {
        let result = DefinitionBuilder::<Thief>::new()
            .state("sleeping")
            .state("running")
            .event(run_event())
            .event(run_event())
            .build();
        assert_eq!(result.unwrap_err(), BuildError::DuplicateEvent("run".into()));
    }

    #[test]
    fn transitions_must_reference_declared_states() {
        let result = DefinitionBuilder::<Thief>::new()
            .state("sleeping")
            .event(run_event())
            .build();

        assert_eq!(
            result.unwrap_err(),
            BuildError::UnknownState {
                state: "running".into(),
                context: "event 'run'".into(),
            }
        );
    }

    #[test]
    fn enter_hooks_must_reference_declared_states() {
        let result = DefinitionBuilder::<Thief>::new()
            .state("sleeping")
            .after_enter("flying", |_, _| Ok(()))
            .build();

        assert!(matches!(result, Err(BuildError::UnknownState { .. })));
    }

    #[test]
    fn first_declared_state_is_initial_by_default() {
        let definition = DefinitionBuilder::<Thief>::new()
            .state("jailed")
            .state("rich")
            .build()
            .unwrap();

        let initial = definition.resolve_initial_state(&Thief { skilled: true }).unwrap();
        assert_eq!(initial, "jailed");
    }

    #[test]
    fn conditional_initial_states_follow_declaration_order() {
        let definition = DefinitionBuilder::new()
            .initial_state("jailed")
            .initial_state_when("rich", |t: &Thief| t.skilled)
            .build()
            .unwrap();

        assert_eq!(
            definition.resolve_initial_state(&Thief { skilled: true }).unwrap(),
            "rich"
        );
        assert_eq!(
            definition.resolve_initial_state(&Thief { skilled: false }).unwrap(),
            "jailed"
        );
        assert_eq!(
            definition.summary().initial,
            InitialSummary::Conditional(vec!["jailed".into(), "rich".into()])
        );
    }

    #[test]
    fn initial_resolver_inspects_record() {
        let definition = DefinitionBuilder::new()
            .state("rich")
            .state("jailed")
            .initial_resolver(|t: &Thief| {
                Ok(if t.skilled { "rich" } else { "jailed" }.into())
            })
            .build()
            .unwrap();

        assert_eq!(
            definition.resolve_initial_state(&Thief { skilled: true }).unwrap(),
            "rich"
        );
        assert_eq!(
            definition.resolve_initial_state(&Thief { skilled: false }).unwrap(),
            "jailed"
        );
    }

    #[test]
    fn resolver_returning_undeclared_state_fails() {
        let definition = DefinitionBuilder::new()
            .state("rich")
            .initial_resolver(|_: &Thief| Ok("famous".into()))
            .build()
            .unwrap();

        let result = definition.resolve_initial_state(&Thief { skilled: true });
        assert!(matches!(result, Err(FsmError::UnknownState(ref s)) if s == "famous"));
    }

    #[test]
    fn extending_appends_to_parent() {
        let parent = DefinitionBuilder::<Thief>::new()
            .attribute("status")
            .initial_state("sleeping")
            .state("running")
            .event(run_event())
            .build()
            .unwrap();

        let child = DefinitionBuilder::extending(&parent)
            .state("flying")
            .event(
                EventBuilder::new("fly")
                    .add_transition(guarded_transition("running", "flying", |t: &Thief| t.skilled)),
            )
            .build()
            .unwrap();

        assert_eq!(child.state_attribute(), "status");
        assert_eq!(child.event_names(), vec!["run", "fly"]);
        assert_eq!(child.states()[..2], parent.states()[..]);
        assert_ne!(child, parent);
    }

    #[test]
    fn extending_cannot_shadow_parent_events() {
        let parent = DefinitionBuilder::<Thief>::new()
            .state("sleeping")
            .state("running")
            .event(run_event())
            .build()
            .unwrap();

        let result = DefinitionBuilder::extending(&parent).event(run_event()).build();
        assert_eq!(result.unwrap_err(), BuildError::DuplicateEvent("run".into()));
    }

    #[test]
    fn policy_toggles_are_recorded() {
        let definition = DefinitionBuilder::<Thief>::new()
            .state("idle")
            .enforce_validity(false)
            .require_whole_transaction(false)
            .build()
            .unwrap();

        assert!(!definition.policy().enforce_validity_before_persist);
        assert!(!definition.policy().require_whole_transaction);
    }

    #[test]
    fn summary_serializes_shape() {
        let definition = DefinitionBuilder::<Thief>::new()
            .initial_state("sleeping")
            .state("running")
            .event(run_event())
            .build()
            .unwrap();

        let json = serde_json::to_value(definition.summary()).unwrap();
        assert_eq!(json["states"], serde_json::json!(["sleeping", "running"]));
        assert_eq!(json["initial"], serde_json::json!({ "fixed": "sleeping" }));
        assert_eq!(
            json["events"][0]["transitions"][0],
            serde_json::json!({ "from": ["sleeping"], "to": "running", "guarded": false })
        );
    }
}
