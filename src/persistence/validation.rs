//! Validation results reported by the persistence collaborator.

use stillwater::validation::Validation;
use stillwater::NonEmptyVec;
use thiserror::Error;

/// A single failed validation rule.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("{attribute} {message}")]
pub struct ValidationError {
    pub attribute: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(attribute: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            attribute: attribute.into(),
            message: message.into(),
        }
    }

    pub fn blank(attribute: impl Into<String>) -> Self {
        Self::new(attribute, "can't be blank")
    }
}

/// Accumulated outcome of validating a record.
pub type ValidationResult = Validation<(), NonEmptyVec<ValidationError>>;

/// Outcome of a validation pass.
///
/// `mutated` is set when the validation pipeline changed the record as a
/// side effect, e.g. a pre-creation hook assigned the initial state.
#[derive(Debug)]
pub struct ValidationReport {
    pub result: ValidationResult,
    pub mutated: bool,
}

impl ValidationReport {
    pub fn new(result: ValidationResult, mutated: bool) -> Self {
        Self { result, mutated }
    }

    pub fn is_valid(&self) -> bool {
        self.result.is_success()
    }

    /// All failed rules, in the order they were checked.
    pub fn errors(&self) -> Vec<ValidationError> {
        match &self.result {
            Validation::Success(_) => Vec::new(),
            Validation::Failure(errors) => errors.iter().cloned().collect(),
        }
    }
}
