//! Scope Generator: one query filter per declared state.
//!
//! Scopes are generated once, when a type's state machine is registered.
//! A state whose name is already taken by a member of the type gets no
//! scope, so user-defined and built-in members are never replaced.

use crate::core::StateName;
use crate::definition::Definition;
use serde_json::Value;
use tracing::debug;

/// Filter selecting every record whose state attribute equals `state`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StateScope {
    pub state: StateName,
    pub attribute: String,
}

impl StateScope {
    pub fn name(&self) -> &str {
        self.state.as_str()
    }

    /// `(column, value)` equality filter this scope applies.
    pub fn filter(&self) -> (String, Value) {
        (self.attribute.clone(), self.state.to_value())
    }
}

/// Scopes for every declared state that `is_member` does not already claim.
pub fn generate_scopes<R, F>(definition: &Definition<R>, is_member: F) -> Vec<StateScope>
where
    F: Fn(&str) -> bool,
{
    let mut scopes = Vec::new();
    for state in definition.states() {
        let name = state.name();
        if is_member(name.as_str()) {
            debug!(state = %name, "member already defined; scope not generated");
            continue;
        }
        scopes.push(StateScope {
            state: name.clone(),
            attribute: definition.state_attribute().to_string(),
        });
    }
    scopes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::DefinitionBuilder;
    use serde_json::json;

    struct Simple;

    #[test]
    fn every_free_state_gets_a_scope() {
        let definition = DefinitionBuilder::<Simple>::new()
            .attribute("status")
            .state("unknown_scope")
            .state("another_state")
            .build()
            .unwrap();

        let scopes = generate_scopes(&definition, |_| false);

        assert_eq!(scopes.len(), 2);
        assert_eq!(scopes[0].name(), "unknown_scope");
        assert_eq!(scopes[0].filter(), ("status".to_string(), json!("unknown_scope")));
    }

    #[test]
    fn existing_members_are_skipped() {
        let definition = DefinitionBuilder::<Simple>::new()
            .state("unknown_scope")
            .state("new")
            .build()
            .unwrap();

        let scopes = generate_scopes(&definition, |name| name == "new");

        assert_eq!(scopes.len(), 1);
        assert_eq!(scopes[0].name(), "unknown_scope");
    }
}
