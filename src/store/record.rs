//! Records backed by the in-memory database.

use super::database::{Attributes, RecordId};
use super::model::Model;
use crate::definition::Definition;
use crate::error::FsmError;
use crate::persistence::{
    Persistence, PersistenceError, TransactionScope, ValidationError, ValidationReport,
    ValidationResult,
};
use crate::runtime::StateMachine;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use stillwater::validation::Validation;

/// One row of a model, loaded or not yet created.
#[derive(Clone)]
pub struct Record {
    model: Arc<Model>,
    id: Option<RecordId>,
    attributes: Attributes,
    pre_create_ran: bool,
}

impl Record {
    pub(crate) fn new(model: Arc<Model>, mut attributes: Attributes) -> Self {
        if let Some((column, value)) = model.type_filter() {
            attributes.insert(column.clone(), value.clone());
        }
        Self {
            model,
            id: None,
            attributes,
            pre_create_ran: false,
        }
    }

    pub(crate) fn loaded(model: Arc<Model>, id: RecordId, attributes: Attributes) -> Self {
        Self {
            model,
            id: Some(id),
            attributes,
            pre_create_ran: false,
        }
    }

    pub fn model(&self) -> &Arc<Model> {
        &self.model
    }

    pub fn id(&self) -> Option<RecordId> {
        self.id
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    /// Attribute value, `Value::Null` when unset.
    pub fn get(&self, name: &str) -> Value {
        self.read_attribute(name)
    }

    pub fn set(&mut self, name: &str, value: impl Into<Value>) {
        self.write_attribute(name, value.into());
    }

    pub fn is_valid(&mut self) -> bool {
        self.validate().is_valid()
    }

    /// Validate and write the record. Returns `Ok(false)` when invalid.
    pub fn save(&mut self) -> Result<bool, PersistenceError> {
        if self.is_new_record() {
            self.pre_create_ran = false;
        }
        if !self.validate().is_valid() {
            return Ok(false);
        }
        self.persist()?;
        Ok(true)
    }

    /// Like [`save`](Self::save), but an invalid record is an error.
    pub fn save_strict(&mut self) -> Result<(), FsmError> {
        if self.is_new_record() {
            self.pre_create_ran = false;
        }
        let report = self.validate();
        if !report.is_valid() {
            return Err(FsmError::ValidationFailed(report.errors()));
        }
        self.persist()?;
        Ok(())
    }

    fn run_pre_create_hooks(&mut self) -> Vec<ValidationResult> {
        let model = Arc::clone(&self.model);
        let mut failures = Vec::new();
        for hook in model.pre_create_hooks() {
            if let Err(err) = hook(self) {
                failures.push(Validation::fail(ValidationError::new("base", err.to_string())));
            }
        }
        failures
    }
}

impl Persistence for Record {
    fn read_attribute(&self, name: &str) -> Value {
        self.attributes.get(name).cloned().unwrap_or(Value::Null)
    }

    fn write_attribute(&mut self, name: &str, value: Value) {
        self.attributes.insert(name.to_string(), value);
    }

    fn is_new_record(&self) -> bool {
        self.id.is_none()
    }

    /// Runs the pre-creation hooks once per creation attempt, then every
    /// validator, collecting all failures.
    fn validate(&mut self) -> ValidationReport {
        let mut checks = Vec::new();
        let mut mutated = false;

        if self.is_new_record() && !self.pre_create_ran {
            self.pre_create_ran = true;
            let before = self.attributes.clone();
            checks.extend(self.run_pre_create_hooks());
            mutated = self.attributes != before;
        }

        let model = Arc::clone(&self.model);
        for rule in model.validators() {
            checks.push(rule(self));
        }

        ValidationReport::new(Validation::all_vec(checks).map(|_| ()), mutated)
    }

    fn persist(&mut self) -> Result<(), PersistenceError> {
        let database = self.model.database();
        match self.id {
            Some(id) => {
                self.attributes = database.update(self.model.table(), id, self.attributes.clone())?;
            }
            None => {
                let (id, stored) = database.insert(self.model.table(), self.attributes.clone())?;
                self.id = Some(id);
                self.attributes = stored;
            }
        }
        Ok(())
    }

    fn update_column(&mut self, name: &str, value: Value) -> Result<(), PersistenceError> {
        let id = self.id.ok_or(PersistenceError::NotPersisted)?;
        self.model
            .database()
            .update_column(self.model.table(), id, name, value.clone())?;
        self.attributes.insert(name.to_string(), value);
        Ok(())
    }

    fn transaction<T, F>(&mut self, scope: TransactionScope, body: F) -> Result<T, FsmError>
    where
        F: FnOnce(&mut Self) -> Result<T, FsmError>,
    {
        let database = self.model.database().clone();
        database.transaction(scope, || body(self))
    }

    fn reload(&mut self) -> Result<(), PersistenceError> {
        let id = self.id.ok_or(PersistenceError::NotPersisted)?;
        self.attributes = self.model.database().fetch(self.model.table(), id)?;
        Ok(())
    }
}

impl StateMachine for Record {
    fn definition(&self) -> Option<Arc<Definition<Self>>> {
        self.model.definition().cloned()
    }
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Record")
            .field("model", &self.model.name())
            .field("id", &self.id)
            .field("attributes", &self.attributes)
            .finish()
    }
}
