//! Run-time errors raised while firing events.

use crate::core::StateName;
use crate::persistence::{PersistenceError, ValidationError};
use thiserror::Error;

/// Error type returned by guards, resolvers and hooks.
pub type HookError = Box<dyn std::error::Error + Send + Sync>;

/// Errors that can occur when firing an event.
#[derive(Debug, Error)]
pub enum FsmError {
    #[error("Event '{event}' has no transition from state {}", display_state(.from))]
    NoMatchingTransition {
        event: String,
        from: Option<StateName>,
    },

    #[error("Unknown event '{0}'")]
    UnknownEvent(String),

    #[error("State '{0}' is not declared by this state machine")]
    UnknownState(StateName),

    #[error("Record type does not declare a state machine")]
    Undeclared,

    #[error("Validation failed: {}", join_messages(.0))]
    ValidationFailed(Vec<ValidationError>),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    #[error("Guard for event '{event}' failed: {source}")]
    Guard {
        event: String,
        #[source]
        source: HookError,
    },

    #[error("Callback '{hook}' failed: {source}")]
    Callback {
        hook: String,
        #[source]
        source: HookError,
    },

    #[error("Ambient transaction aborted: {0}")]
    AmbientTransactionFailure(#[source] HookError),
}

impl FsmError {
    /// Wrap a failure raised by caller code inside an ambient transaction.
    pub fn ambient(source: impl Into<HookError>) -> Self {
        Self::AmbientTransactionFailure(source.into())
    }

    pub(crate) fn callback(hook: impl Into<String>, source: HookError) -> Self {
        Self::Callback {
            hook: hook.into(),
            source,
        }
    }
}

fn display_state(state: &Option<StateName>) -> String {
    match state {
        Some(name) => format!("'{name}'"),
        None => "nil".to_string(),
    }
}

fn join_messages(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_matching_transition_names_nil_state() {
        let err = FsmError::NoMatchingTransition {
            event: "run".to_string(),
            from: None,
        };
        assert_eq!(err.to_string(), "Event 'run' has no transition from state nil");
    }

    #[test]
    fn validation_failed_lists_every_message() {
        let err = FsmError::ValidationFailed(vec![
            ValidationError::blank("name"),
            ValidationError::blank("email"),
        ]);
        assert_eq!(
            err.to_string(),
            "Validation failed: name can't be blank, email can't be blank"
        );
    }

    #[test]
    fn ambient_wraps_foreign_errors() {
        let err = FsmError::ambient("failed on purpose");
        assert!(matches!(err, FsmError::AmbientTransactionFailure(_)));
        assert_eq!(err.to_string(), "Ambient transaction aborted: failed on purpose");
    }
}
