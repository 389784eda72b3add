//! State identifiers.
//!
//! States are stored in a single backing attribute as plain strings. A
//! `StateName` is that string; the `State` trait lets callers declare
//! typed enums whose variants map onto persisted names.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::borrow::Borrow;
use std::fmt::{self, Debug, Display};

/// Persisted identifier of a state.
///
/// # Example
///
/// ```rust
/// use statehold::core::StateName;
/// use serde_json::json;
///
/// let name = StateName::from("sleeping");
/// assert_eq!(name.as_str(), "sleeping");
/// assert_eq!(name.to_value(), json!("sleeping"));
/// assert_eq!(StateName::from_value(&json!("sleeping")), Some(name));
/// assert_eq!(StateName::from_value(&json!(null)), None);
/// ```
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StateName(String);

impl StateName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Attribute value used to persist this state.
    pub fn to_value(&self) -> Value {
        Value::String(self.0.clone())
    }

    /// Read a state back from an attribute value.
    ///
    /// Returns `None` for `null`, empty strings and non-string values.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) if !s.is_empty() => Some(Self(s.clone())),
            _ => None,
        }
    }

    /// Read a stored state verbatim. Only `null` is absent; an empty string
    /// stays empty and other scalars keep their JSON text.
    pub fn from_stored(value: &Value) -> Option<Self> {
        match value {
            Value::Null => None,
            Value::String(s) => Some(Self(s.clone())),
            other => Some(Self(other.to_string())),
        }
    }
}

impl Debug for StateName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, ":{}", self.0)
    }
}

impl Display for StateName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for StateName {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

impl From<String> for StateName {
    fn from(name: String) -> Self {
        Self(name)
    }
}

impl From<&StateName> for StateName {
    fn from(name: &StateName) -> Self {
        name.clone()
    }
}

impl Borrow<str> for StateName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for StateName {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for StateName {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// Trait for typed states.
///
/// Implement this (or use [`state_enum!`](crate::state_enum)) to declare a
/// machine with enum variants instead of bare strings.
///
/// # Example
///
/// ```rust
/// use statehold::core::{State, StateName};
///
/// #[derive(Clone, PartialEq, Debug)]
/// enum Door {
///     Opened,
///     Closed,
/// }
///
/// impl State for Door {
///     fn name(&self) -> &str {
///         match self {
///             Self::Opened => "opened",
///             Self::Closed => "closed",
///         }
///     }
/// }
///
/// assert_eq!(Door::Closed.state_name(), StateName::from("closed"));
/// ```
pub trait State: Clone + PartialEq + Debug + Send + Sync {
    /// Name stored in the backing attribute.
    fn name(&self) -> &str;

    fn state_name(&self) -> StateName {
        StateName::from(self.name())
    }
}
