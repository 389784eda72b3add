//! Firing events against a record.

use crate::core::StateName;
use crate::definition::{Definition, Hook};
use crate::error::FsmError;
use crate::persistence::{assign_without_persistence, commit, Persistence, TransactionScope};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Clone, Copy, PartialEq, Eq)]
enum Write {
    Commit,
    InMemory,
}

/// Runtime operations available on every record carrying a definition.
///
/// Only [`definition`](Self::definition) must be implemented; every other
/// method is provided.
pub trait StateMachine: Persistence {
    /// The shared definition for this record's type, if it declares one.
    fn definition(&self) -> Option<Arc<Definition<Self>>>;

    /// Live state of the record.
    ///
    /// A new record with a blank attribute reports its initial state. A
    /// record that already exists reports exactly what the attribute holds,
    /// so a stored `null` reads back as `None`.
    fn current_state(&self) -> Result<Option<StateName>, FsmError> {
        let definition = self.definition().ok_or(FsmError::Undeclared)?;
        let stored = self.read_state(definition.state_attribute());

        if self.is_new_record() && StateName::from_value(&stored).is_none() {
            return definition.resolve_initial_state(self).map(Some);
        }
        Ok(StateName::from_stored(&stored))
    }

    /// Whether the record is currently in `state`.
    fn is_in(&self, state: impl Into<StateName>) -> Result<bool, FsmError> {
        let state = state.into();
        Ok(self.current_state()?.as_ref() == Some(&state))
    }

    /// Fire `event`, committing the new state according to the definition's
    /// policy.
    ///
    /// Returns `Ok(false)` when no transition matches or validation rejects
    /// the record. Persistence, guard and callback failures are returned as
    /// errors.
    ///
    /// When the policy requires a whole transaction, an existing record runs
    /// every hook and the write in one scope, so a failing hook also undoes
    /// the stored state and any writes earlier hooks made. The in-memory
    /// attribute keeps the new state.
    fn fire(&mut self, event: &str, args: &[Value]) -> Result<bool, FsmError> {
        lenient(run_event(self, event, args, Write::Commit))
    }

    /// Like [`fire`](Self::fire), but a missing transition is an error.
    ///
    /// Validation rejection still returns `Ok(false)`.
    fn fire_strict(&mut self, event: &str, args: &[Value]) -> Result<bool, FsmError> {
        run_event(self, event, args, Write::Commit)
    }

    /// Fire `event` and assign the new state in memory only.
    fn fire_without_persistence(&mut self, event: &str, args: &[Value]) -> Result<bool, FsmError> {
        lenient(run_event(self, event, args, Write::InMemory))
    }

    /// Whether `event` has a transition applicable right now.
    fn may_fire(&self, event: &str) -> Result<bool, FsmError> {
        let definition = self.definition().ok_or(FsmError::Undeclared)?;
        let event = definition
            .event(event)
            .ok_or_else(|| FsmError::UnknownEvent(event.to_string()))?;
        let current = self.current_state()?;
        Ok(event.select(self, current.as_ref())?.is_some())
    }

    /// Names of every event that may fire from the current state.
    fn permitted_events(&self) -> Result<Vec<String>, FsmError> {
        let definition = self.definition().ok_or(FsmError::Undeclared)?;
        let current = self.current_state()?;
        let mut permitted = Vec::new();
        for event in definition.events() {
            if event.select(self, current.as_ref())?.is_some() {
                permitted.push(event.name().to_string());
            }
        }
        Ok(permitted)
    }

    /// Assign the initial state to a new record whose attribute is blank.
    ///
    /// Meant to run from the record's creation-validation pipeline. Returns
    /// whether the attribute was assigned.
    fn ensure_initial_state(&mut self) -> Result<bool, FsmError> {
        if !self.is_new_record() {
            return Ok(false);
        }
        let definition = self.definition().ok_or(FsmError::Undeclared)?;
        let attribute = definition.state_attribute();
        if StateName::from_value(&self.read_state(attribute)).is_some() {
            return Ok(false);
        }

        let initial = definition.resolve_initial_state(self)?;
        debug!(%initial, attribute, "assigning initial state before create");
        self.write_state(attribute, initial.to_value());
        Ok(true)
    }
}

fn lenient(result: Result<bool, FsmError>) -> Result<bool, FsmError> {
    match result {
        Err(FsmError::NoMatchingTransition { .. }) => Ok(false),
        other => other,
    }
}

fn run_hooks<R>(record: &mut R, hooks: &[Hook<R>], args: &[Value], name: &str) -> Result<(), FsmError> {
    for hook in hooks {
        hook(record, args).map_err(|source| FsmError::callback(name, source))?;
    }
    Ok(())
}

fn run_event<R: StateMachine>(
    record: &mut R,
    event_name: &str,
    args: &[Value],
    write: Write,
) -> Result<bool, FsmError> {
    let definition = record.definition().ok_or(FsmError::Undeclared)?;
    let whole_transaction = write == Write::Commit
        && definition.policy().require_whole_transaction
        && !record.is_new_record();

    if whole_transaction {
        record.transaction(TransactionScope::RequiresNew, |record| {
            apply_event(record, &definition, event_name, args, write)
        })
    } else {
        apply_event(record, &definition, event_name, args, write)
    }
}

/// Hooks and commit for one firing. A failure anywhere returns `Err`, which
/// rolls back the enclosing scope when there is one.
fn apply_event<R: StateMachine>(
    record: &mut R,
    definition: &Definition<R>,
    event_name: &str,
    args: &[Value],
    write: Write,
) -> Result<bool, FsmError> {
    let event = definition
        .event(event_name)
        .ok_or_else(|| FsmError::UnknownEvent(event_name.to_string()))?;

    let current = record.current_state()?;
    let Some(transition) = event.select(record, current.as_ref())? else {
        debug!(event = event_name, from = ?current, "no matching transition");
        return Err(FsmError::NoMatchingTransition {
            event: event_name.to_string(),
            from: current,
        });
    };

    run_hooks(record, event.before_hooks(), args, &format!("{event_name}.before"))?;

    let target = transition
        .resolve_target(record, args)
        .map_err(|source| FsmError::callback(format!("{event_name}.target"), source))?;
    let target_decl = definition
        .state(target.as_str())
        .ok_or_else(|| FsmError::UnknownState(target.clone()))?;

    run_hooks(record, &target_decl.before_enter, args, &format!("{target}.before_enter"))?;

    let attribute = definition.state_attribute();
    let committed = match write {
        Write::Commit => commit(record, attribute, &target, definition.policy())?,
        Write::InMemory => {
            assign_without_persistence(record, attribute, &target);
            true
        }
    };
    if !committed {
        debug!(event = event_name, to = %target, "transition not committed");
        return Ok(false);
    }
    info!(event = event_name, from = ?current, to = %target, "transition applied");

    run_hooks(record, &target_decl.after_enter, args, &format!("{target}.after_enter"))?;
    run_hooks(record, event.after_hooks(), args, &format!("{event_name}.after"))?;
    Ok(true)
}
