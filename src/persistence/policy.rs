//! Definition-level persistence policy.

use serde::{Deserialize, Serialize};

/// Governs how a committed transition is written to storage.
///
/// Only the recognized options are accepted when loading from
/// configuration; unknown keys are rejected.
///
/// # Example
///
/// ```rust
/// use statehold::persistence::PersistencePolicy;
///
/// let policy = PersistencePolicy::from_json_str(
///     r#"{ "enforce_validity_before_persist": false }"#,
/// ).unwrap();
///
/// assert!(!policy.enforce_validity_before_persist);
/// assert!(policy.require_whole_transaction);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PersistencePolicy {
    /// Reject the write when the record fails validation.
    pub enforce_validity_before_persist: bool,

    /// Wrap the write in its own rollback-capable scope.
    pub require_whole_transaction: bool,
}

impl Default for PersistencePolicy {
    fn default() -> Self {
        Self {
            enforce_validity_before_persist: true,
            require_whole_transaction: true,
        }
    }
}

impl PersistencePolicy {
    pub fn from_json_str(source: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(source)
    }

    pub fn from_json_value(value: serde_json::Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn defaults_enforce_validity_inside_transaction() {
        let policy = PersistencePolicy::default();
        assert!(policy.enforce_validity_before_persist);
        assert!(policy.require_whole_transaction);
    }

    #[test]
    fn empty_config_yields_defaults() {
        let policy = PersistencePolicy::from_json_str("{}").unwrap();
        assert_eq!(policy, PersistencePolicy::default());
    }

    #[test]
    fn unknown_options_are_rejected() {
        let result = PersistencePolicy::from_json_value(json!({ "whiny": true }));
        assert!(result.is_err());
    }

    #[test]
    fn both_options_can_be_disabled() {
        let policy = PersistencePolicy::from_json_value(json!({
            "enforce_validity_before_persist": false,
            "require_whole_transaction": false,
        }))
        .unwrap();

        assert!(!policy.enforce_validity_before_persist);
        assert!(!policy.require_whole_transaction);
    }
}
