//! Commit step applied after a transition has been resolved.

use super::{Persistence, PersistencePolicy, TransactionScope};
use crate::core::StateName;
use crate::error::FsmError;
use serde_json::Value;
use tracing::{debug, warn};

/// Write `new_state` to the record according to `policy`.
///
/// Returns `Ok(false)` when validation rejected the record. In that case
/// the nested scope has been rolled back and the in-memory attribute is
/// restored to the value it held before the call. Any other failure is
/// returned as an error, also with the attribute restored.
pub fn commit<R: Persistence>(
    record: &mut R,
    attribute: &str,
    new_state: &StateName,
    policy: PersistencePolicy,
) -> Result<bool, FsmError> {
    if record.is_new_record() {
        record.write_state(attribute, new_state.to_value());
        debug!(%new_state, attribute, "assigned state on new record; creation governs persistence");
        return Ok(true);
    }

    let previous = record.read_state(attribute);
    let outcome = if policy.require_whole_transaction {
        record.transaction(TransactionScope::RequiresNew, |record| {
            write(record, attribute, new_state, policy)
        })
    } else {
        write(record, attribute, new_state, policy)
    };

    match outcome {
        Ok(()) => {
            debug!(
                %new_state,
                attribute,
                whole_transaction = policy.require_whole_transaction,
                enforce_validity = policy.enforce_validity_before_persist,
                "state committed"
            );
            Ok(true)
        }
        Err(FsmError::ValidationFailed(errors)) => {
            record.write_state(attribute, previous);
            warn!(%new_state, attribute, failures = errors.len(), "state not persisted for invalid record");
            Ok(false)
        }
        Err(err) => {
            record.write_state(attribute, previous);
            Err(err)
        }
    }
}

fn write<R: Persistence>(
    record: &mut R,
    attribute: &str,
    new_state: &StateName,
    policy: PersistencePolicy,
) -> Result<(), FsmError> {
    let value = new_state.to_value();
    record.write_state(attribute, value.clone());

    if !policy.enforce_validity_before_persist {
        record.update_column(attribute, value)?;
        return Ok(());
    }

    let report = record.validate();
    if report.mutated {
        debug!(attribute, "validation mutated record before commit");
    }
    if !report.is_valid() {
        return Err(FsmError::ValidationFailed(report.errors()));
    }
    record.persist()?;
    Ok(())
}

/// Assign `new_state` in memory only, leaving storage untouched.
pub fn assign_without_persistence<R: Persistence>(
    record: &mut R,
    attribute: &str,
    new_state: &StateName,
) {
    record.write_state(attribute, new_state.to_value());
    debug!(%new_state, attribute, "assigned state without persistence");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::{PersistenceError, ValidationError, ValidationReport};
    use serde_json::json;
    use std::collections::BTreeMap;
    use stillwater::validation::Validation;

    /// Minimal collaborator that records every storage call.
    #[derive(Default)]
    struct Probe {
        attributes: BTreeMap<String, Value>,
        stored: BTreeMap<String, Value>,
        new_record: bool,
        valid: bool,
        calls: Vec<&'static str>,
        fail_writes: bool,
    }

    impl Probe {
        fn existing(state: &str) -> Self {
            let mut probe = Self {
                valid: true,
                ..Self::default()
            };
            probe.attributes.insert("state".into(), json!(state));
            probe.stored = probe.attributes.clone();
            probe
        }

        fn write_error(&self) -> Result<(), PersistenceError> {
            if self.fail_writes {
                Err(PersistenceError::ConstraintViolation {
                    table: "probes".into(),
                    column: "state".into(),
                    value: json!("running"),
                })
            } else {
                Ok(())
            }
        }
    }

    impl Persistence for Probe {
        fn read_attribute(&self, name: &str) -> Value {
            self.attributes.get(name).cloned().unwrap_or(Value::Null)
        }

        fn write_attribute(&mut self, name: &str, value: Value) {
            self.attributes.insert(name.to_string(), value);
        }

        fn is_new_record(&self) -> bool {
            self.new_record
        }

        fn validate(&mut self) -> ValidationReport {
            self.calls.push("validate");
            let result = if self.valid {
                Validation::success(())
            } else {
                Validation::fail(ValidationError::blank("name"))
            };
            ValidationReport::new(result, false)
        }

        fn persist(&mut self) -> Result<(), PersistenceError> {
            self.calls.push("persist");
            self.write_error()?;
            self.stored = self.attributes.clone();
            Ok(())
        }

        fn update_column(&mut self, name: &str, value: Value) -> Result<(), PersistenceError> {
            self.calls.push("update_column");
            self.write_error()?;
            self.stored.insert(name.to_string(), value);
            Ok(())
        }

        fn transaction<T, F>(&mut self, _scope: TransactionScope, body: F) -> Result<T, FsmError>
        where
            F: FnOnce(&mut Self) -> Result<T, FsmError>,
        {
            self.calls.push("begin");
            let snapshot = self.stored.clone();
            let result = body(self);
            if result.is_err() {
                self.stored = snapshot;
                self.calls.push("rollback");
            } else {
                self.calls.push("commit");
            }
            result
        }

        fn reload(&mut self) -> Result<(), PersistenceError> {
            self.attributes = self.stored.clone();
            Ok(())
        }
    }

    fn running() -> StateName {
        StateName::from("running")
    }

    #[test]
    fn new_record_is_assigned_without_write() {
        let mut probe = Probe {
            new_record: true,
            ..Probe::default()
        };

        let committed = commit(&mut probe, "state", &running(), PersistencePolicy::default());

        assert!(committed.unwrap());
        assert_eq!(probe.read_attribute("state"), json!("running"));
        assert!(probe.calls.is_empty());
    }

    #[test]
    fn valid_record_is_written_inside_scope() {
        let mut probe = Probe::existing("sleeping");

        let committed = commit(&mut probe, "state", &running(), PersistencePolicy::default());

        assert!(committed.unwrap());
        assert_eq!(probe.calls, vec!["begin", "validate", "persist", "commit"]);
        assert_eq!(probe.stored["state"], json!("running"));
    }

    #[test]
    fn invalid_record_rolls_back_and_reverts_attribute() {
        let mut probe = Probe::existing("sleeping");
        probe.valid = false;

        let committed = commit(&mut probe, "state", &running(), PersistencePolicy::default());

        assert!(!committed.unwrap());
        assert_eq!(probe.calls, vec!["begin", "validate", "rollback"]);
        assert_eq!(probe.read_attribute("state"), json!("sleeping"));
        assert_eq!(probe.stored["state"], json!("sleeping"));
    }

    #[test]
    fn disabled_enforcement_writes_column_despite_invalidity() {
        let mut probe = Probe::existing("sleeping");
        probe.valid = false;
        let policy = PersistencePolicy {
            enforce_validity_before_persist: false,
            ..PersistencePolicy::default()
        };

        let committed = commit(&mut probe, "state", &running(), policy);

        assert!(committed.unwrap());
        assert_eq!(probe.calls, vec!["begin", "update_column", "commit"]);
        assert_eq!(probe.stored["state"], json!("running"));
    }

    #[test]
    fn without_whole_transaction_no_scope_is_opened() {
        let mut probe = Probe::existing("sleeping");
        let policy = PersistencePolicy {
            require_whole_transaction: false,
            ..PersistencePolicy::default()
        };

        let committed = commit(&mut probe, "state", &running(), policy);

        assert!(committed.unwrap());
        assert_eq!(probe.calls, vec!["validate", "persist"]);
    }

    #[test]
    fn persistence_errors_propagate_and_revert() {
        let mut probe = Probe::existing("sleeping");
        probe.fail_writes = true;

        let result = commit(&mut probe, "state", &running(), PersistencePolicy::default());

        assert!(matches!(
            result,
            Err(FsmError::Persistence(PersistenceError::ConstraintViolation { .. }))
        ));
        assert_eq!(probe.read_attribute("state"), json!("sleeping"));
        assert_eq!(probe.stored["state"], json!("sleeping"));
    }

    #[test]
    fn transient_assignment_skips_storage() {
        let mut probe = Probe::existing("sleeping");

        assign_without_persistence(&mut probe, "state", &running());

        assert_eq!(probe.read_attribute("state"), json!("running"));
        assert_eq!(probe.stored["state"], json!("sleeping"));
        assert!(probe.calls.is_empty());
    }
}
