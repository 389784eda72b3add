//! Guard predicates for controlling transitions.
//!
//! Guards are side-effect-free predicates over a record. They decide
//! whether a declared transition applies to the record's current data.

use crate::error::HookError;
use std::fmt;
use std::sync::Arc;

type Predicate<R> = Arc<dyn Fn(&R) -> Result<bool, HookError> + Send + Sync>;

/// Pure predicate that determines if a transition can execute.
///
/// A guard only sees an immutable borrow of the record, so it cannot
/// mutate the instance it inspects.
///
/// # Example
///
/// ```rust
/// use statehold::core::Guard;
///
/// struct Account {
///     balance: i64,
/// }
///
/// let solvent = Guard::new(|a: &Account| a.balance >= 0);
///
/// assert!(solvent.check(&Account { balance: 10 }).unwrap());
/// assert!(!solvent.check(&Account { balance: -1 }).unwrap());
/// ```
pub struct Guard<R> {
    predicate: Predicate<R>,
}

impl<R> Guard<R> {
    /// Create a guard from an infallible predicate.
    pub fn new<F>(predicate: F) -> Self
    where
        F: Fn(&R) -> bool + Send + Sync + 'static,
    {
        Self {
            predicate: Arc::new(move |record: &R| Ok(predicate(record))),
        }
    }

    /// Create a guard whose evaluation can fail.
    ///
    /// A failing guard aborts the transition attempt; the error is never
    /// treated as "guard not satisfied".
    pub fn fallible<F>(predicate: F) -> Self
    where
        F: Fn(&R) -> Result<bool, HookError> + Send + Sync + 'static,
    {
        Self {
            predicate: Arc::new(predicate),
        }
    }

    pub fn check(&self, record: &R) -> Result<bool, HookError> {
        (self.predicate)(record)
    }
}

impl<R> Clone for Guard<R> {
    fn clone(&self) -> Self {
        Self {
            predicate: Arc::clone(&self.predicate),
        }
    }
}

/// Guards are equal when they share one predicate, as clones do.
impl<R> PartialEq for Guard<R> {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.predicate, &other.predicate)
    }
}

impl<R> fmt::Debug for Guard<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Guard(..)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Thief {
        skilled: bool,
    }

    #[test]
    fn guard_allows_matching_records() {
        let guard = Guard::new(|t: &Thief| t.skilled);

        assert!(guard.check(&Thief { skilled: true }).unwrap());
        assert!(!guard.check(&Thief { skilled: false }).unwrap());
    }

    #[test]
    fn guard_is_deterministic() {
        let thief = Thief { skilled: true };
        let guard = Guard::new(|t: &Thief| t.skilled);

        assert_eq!(guard.check(&thief).unwrap(), guard.check(&thief).unwrap());
    }

    #[test]
    fn clones_share_identity() {
        let guard = Guard::new(|t: &Thief| t.skilled);
        let twin = Guard::new(|t: &Thief| t.skilled);

        assert_eq!(guard, guard.clone());
        assert_ne!(guard, twin);
    }

    #[test]
    fn fallible_guard_surfaces_errors() {
        let guard = Guard::fallible(|_: &Thief| Err("lookup failed".into()));

        let err = guard.check(&Thief { skilled: true }).unwrap_err();
        assert_eq!(err.to_string(), "lookup failed");
    }
}
