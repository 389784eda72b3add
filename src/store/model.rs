//! Record type descriptors.

use super::database::{Attributes, Database, RecordId};
use super::record::Record;
use super::relation::Relation;
use crate::builder::{BuildError, DefinitionBuilder};
use crate::core::StateName;
use crate::definition::{Definition, Event};
use crate::error::{FsmError, HookError};
use crate::persistence::{PersistenceError, TransactionScope, ValidationError, ValidationResult};
use crate::runtime::StateMachine;
use crate::scope::{generate_scopes, StateScope};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;
use stillwater::validation::Validation;
use tracing::debug;

/// Members every model exposes; states with these names get no scope.
pub const BUILTIN_MEMBERS: &[&str] = &[
    "all",
    "count",
    "create",
    "find",
    "first",
    "name",
    "new",
    "scope",
    "table",
    "transaction",
    "where",
];

/// Column identifying the subtype a row was created as.
pub const TYPE_COLUMN: &str = "type";

/// Validation rule over a record.
pub type Validator = Arc<dyn Fn(&Record) -> ValidationResult + Send + Sync>;

/// Hook run by the creation-validation pipeline of new records.
pub type PreCreateHook = Arc<dyn Fn(&mut Record) -> Result<(), HookError> + Send + Sync>;

/// Type descriptor shared by every record of one model.
pub struct Model {
    name: String,
    table: String,
    database: Database,
    parent: Option<Arc<Model>>,
    type_filter: Option<(String, Value)>,
    members: BTreeSet<String>,
    validators: Vec<Validator>,
    pre_create_hooks: Vec<PreCreateHook>,
    definition: Option<Arc<Definition<Record>>>,
    scopes: BTreeMap<String, StateScope>,
}

impl Model {
    pub fn builder(name: impl Into<String>, database: &Database) -> ModelBuilder {
        ModelBuilder::new(name, database)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn database(&self) -> &Database {
        &self.database
    }

    pub fn parent(&self) -> Option<&Arc<Model>> {
        self.parent.as_ref()
    }

    /// `(column, value)` marking this subtype's rows. `None` for base models,
    /// which see the rows of every subtype.
    pub fn type_filter(&self) -> Option<&(String, Value)> {
        self.type_filter.as_ref()
    }

    pub fn definition(&self) -> Option<&Arc<Definition<Record>>> {
        self.definition.as_ref()
    }

    pub fn states(&self) -> Vec<StateName> {
        self.definition
            .as_ref()
            .map(|d| d.state_names())
            .unwrap_or_default()
    }

    pub fn events(&self) -> &[Event<Record>] {
        self.definition.as_ref().map(|d| d.events()).unwrap_or(&[])
    }

    pub fn state_attribute(&self) -> Option<&str> {
        self.definition.as_ref().map(|d| d.state_attribute())
    }

    /// Whether the model exposes a member or generated scope called `name`.
    pub fn responds_to(&self, name: &str) -> bool {
        self.members.contains(name) || self.scopes.contains_key(name)
    }

    pub fn scope_names(&self) -> Vec<&str> {
        self.scopes.keys().map(String::as_str).collect()
    }

    /// Generated scope for a state, as a query over this model.
    pub fn scope(self: &Arc<Self>, name: &str) -> Option<Relation> {
        let scope = self.scopes.get(name)?;
        let (column, value) = scope.filter();
        Some(self.query().where_eq(column, value))
    }

    /// Query over this model's rows. A subtype only sees rows created as
    /// that subtype.
    pub fn query(self: &Arc<Self>) -> Relation {
        let relation = Relation::new(Arc::clone(self));
        match &self.type_filter {
            Some((column, value)) => relation.where_eq(column.clone(), value.clone()),
            None => relation,
        }
    }

    pub fn new_record(self: &Arc<Self>) -> Record {
        Record::new(Arc::clone(self), Attributes::new())
    }

    /// New, unsaved record with the attributes of a JSON object.
    pub fn build(self: &Arc<Self>, attributes: Value) -> Record {
        let attributes = match attributes {
            Value::Object(map) => map.into_iter().collect(),
            _ => Attributes::new(),
        };
        Record::new(Arc::clone(self), attributes)
    }

    /// Build and save a record, failing when it is invalid.
    pub fn create(self: &Arc<Self>, attributes: Value) -> Result<Record, FsmError> {
        let mut record = self.build(attributes);
        record.save_strict()?;
        Ok(record)
    }

    pub fn find(self: &Arc<Self>, id: RecordId) -> Result<Record, PersistenceError> {
        let attributes = self.database.fetch(&self.table, id)?;
        if let Some((column, value)) = &self.type_filter {
            if attributes.get(column) != Some(value) {
                return Err(PersistenceError::RecordNotFound {
                    table: self.table.clone(),
                    id: id.to_string(),
                });
            }
        }
        Ok(Record::loaded(Arc::clone(self), id, attributes))
    }

    pub fn all(self: &Arc<Self>) -> Result<Vec<Record>, PersistenceError> {
        self.query().load()
    }

    /// Run `body` in a transaction on this model's database.
    pub fn transaction<T, E, F>(&self, scope: TransactionScope, body: F) -> Result<T, E>
    where
        F: FnOnce() -> Result<T, E>,
    {
        self.database.transaction(scope, body)
    }

    /// Subtype sharing this model's table and, by reference, its state
    /// machine definition.
    pub fn subclass(self: &Arc<Self>, name: impl Into<String>) -> Arc<Model> {
        let name = name.into();
        Arc::new(Model {
            type_filter: Some(subtype_marker(&name)),
            name,
            table: self.table.clone(),
            database: self.database.clone(),
            parent: Some(Arc::clone(self)),
            members: self.members.clone(),
            validators: self.validators.clone(),
            pre_create_hooks: self.pre_create_hooks.clone(),
            definition: self.definition.clone(),
            scopes: self.scopes.clone(),
        })
    }

    /// Subtype whose definition starts from this model's and adds to it.
    pub fn subclass_extending<F>(
        self: &Arc<Self>,
        name: impl Into<String>,
        extend: F,
    ) -> Result<Arc<Model>, BuildError>
    where
        F: FnOnce(DefinitionBuilder<Record>) -> DefinitionBuilder<Record>,
    {
        let base = match &self.definition {
            Some(definition) => DefinitionBuilder::extending(definition),
            None => DefinitionBuilder::new(),
        };
        let definition = extend(base).build()?;
        let needs_hook = self.definition.is_none();
        let scopes = scope_map(&definition, &self.members);

        let mut pre_create_hooks = self.pre_create_hooks.clone();
        if needs_hook {
            pre_create_hooks.push(ensure_initial_state_hook());
        }

        let name = name.into();
        Ok(Arc::new(Model {
            type_filter: Some(subtype_marker(&name)),
            name,
            table: self.table.clone(),
            database: self.database.clone(),
            parent: Some(Arc::clone(self)),
            members: self.members.clone(),
            validators: self.validators.clone(),
            pre_create_hooks,
            definition: Some(Arc::new(definition)),
            scopes,
        }))
    }

    pub(crate) fn validators(&self) -> &[Validator] {
        &self.validators
    }

    pub(crate) fn pre_create_hooks(&self) -> &[PreCreateHook] {
        &self.pre_create_hooks
    }
}

impl fmt::Debug for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Model")
            .field("name", &self.name)
            .field("table", &self.table)
            .field("definition", &self.definition)
            .field("scopes", &self.scope_names())
            .finish()
    }
}

fn subtype_marker(name: &str) -> (String, Value) {
    (TYPE_COLUMN.to_string(), Value::String(name.to_string()))
}

fn ensure_initial_state_hook() -> PreCreateHook {
    Arc::new(|record: &mut Record| {
        record.ensure_initial_state()?;
        Ok(())
    })
}

fn scope_map(
    definition: &Definition<Record>,
    members: &BTreeSet<String>,
) -> BTreeMap<String, StateScope> {
    generate_scopes(definition, |name| members.contains(name))
        .into_iter()
        .map(|scope| (scope.name().to_string(), scope))
        .collect()
}

/// Builder for a [`Model`].
///
/// Pre-creation hooks run in the order they are registered;
/// [`state_machine`](Self::state_machine) registers the hook that assigns
/// the initial state at the point where it is called.
pub struct ModelBuilder {
    name: String,
    table: String,
    database: Database,
    unique: Vec<String>,
    members: BTreeSet<String>,
    validators: Vec<Validator>,
    pre_create_hooks: Vec<PreCreateHook>,
    definition: Option<Definition<Record>>,
}

impl ModelBuilder {
    pub fn new(name: impl Into<String>, database: &Database) -> Self {
        let name = name.into();
        Self {
            table: format!("{}s", name.to_lowercase()),
            name,
            database: database.clone(),
            unique: Vec::new(),
            members: BUILTIN_MEMBERS.iter().map(|m| m.to_string()).collect(),
            validators: Vec::new(),
            pre_create_hooks: Vec::new(),
            definition: None,
        }
    }

    pub fn table(mut self, table: impl Into<String>) -> Self {
        self.table = table.into();
        self
    }

    /// Declare a type-level member that generated scopes must not replace.
    pub fn member(mut self, name: impl Into<String>) -> Self {
        self.members.insert(name.into());
        self
    }

    pub fn unique(mut self, column: impl Into<String>) -> Self {
        self.unique.push(column.into());
        self
    }

    pub fn validate<F>(mut self, rule: F) -> Self
    where
        F: Fn(&Record) -> ValidationResult + Send + Sync + 'static,
    {
        self.validators.push(Arc::new(rule));
        self
    }

    /// Require a non-blank value for `attribute`.
    pub fn validates_presence_of(self, attribute: impl Into<String>) -> Self {
        let attribute = attribute.into();
        self.validate(move |record: &Record| {
            let blank = match record.get(&attribute) {
                Value::Null => true,
                Value::String(s) => s.trim().is_empty(),
                _ => false,
            };
            if blank {
                Validation::fail(ValidationError::blank(attribute.clone()))
            } else {
                Validation::success(())
            }
        })
    }

    pub fn before_validation_on_create<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut Record) -> Result<(), HookError> + Send + Sync + 'static,
    {
        self.pre_create_hooks.push(Arc::new(hook));
        self
    }

    /// Attach a state machine and register its initial-state hook.
    pub fn state_machine(mut self, definition: Definition<Record>) -> Self {
        self.definition = Some(definition);
        self.pre_create_hooks.push(ensure_initial_state_hook());
        self
    }

    pub fn build(self) -> Arc<Model> {
        self.database.create_table(&self.table, &self.unique);

        let scopes = self
            .definition
            .as_ref()
            .map(|definition| scope_map(definition, &self.members))
            .unwrap_or_default();
        debug!(
            model = %self.name,
            table = %self.table,
            scopes = scopes.len(),
            "model registered"
        );

        Arc::new(Model {
            name: self.name,
            table: self.table,
            database: self.database,
            parent: None,
            type_filter: None,
            members: self.members,
            validators: self.validators,
            pre_create_hooks: self.pre_create_hooks,
            definition: self.definition.map(Arc::new),
            scopes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{simple_transition, EventBuilder};
    use serde_json::json;

    fn simple(db: &Database) -> Arc<Model> {
        Model::builder("Simple", db)
            .member("archived")
            .state_machine(
                DefinitionBuilder::new()
                    .attribute("status")
                    .initial_state("unknown_scope")
                    .state("new")
                    .state("archived")
                    .event(
                        EventBuilder::new("age")
                            .add_transition(simple_transition("unknown_scope", "archived")),
                    )
                    .build()
                    .unwrap(),
            )
            .build()
    }

    #[test]
    fn default_table_is_pluralized_name() {
        let model = simple(&Database::new());
        assert_eq!(model.table(), "simples");
        assert_eq!(model.state_attribute(), Some("status"));
    }

    #[test]
    fn scopes_skip_existing_members() {
        let model = simple(&Database::new());

        assert_eq!(model.scope_names(), vec!["unknown_scope"]);
        assert!(model.responds_to("unknown_scope"));
        assert!(model.responds_to("new"));
        assert!(model.scope("new").is_none());
        assert!(model.scope("archived").is_none());
    }

    #[test]
    fn builtin_new_still_builds_records() {
        let model = simple(&Database::new());
        let record = model.new_record();

        assert_eq!(record.model().name(), "Simple");
        assert!(record.is_in("unknown_scope").unwrap());
    }

    #[test]
    fn subclass_shares_definition_by_reference() {
        let model = simple(&Database::new());
        let derived = model.subclass("Derivate");

        assert!(Arc::ptr_eq(
            derived.definition().unwrap(),
            model.definition().unwrap()
        ));
        assert_eq!(derived.states(), model.states());
        assert_eq!(derived.events(), model.events());
        assert_eq!(derived.state_attribute(), Some("status"));
        assert_eq!(derived.parent().unwrap().name(), "Simple");
    }

    #[test]
    fn subclass_queries_only_see_their_own_rows() {
        let model = simple(&Database::new());
        let derived = model.subclass("Derivate");
        let base_row = model.create(json!({})).unwrap();
        let derived_row = derived.create(json!({})).unwrap();

        assert_eq!(derived_row.get(TYPE_COLUMN), json!("Derivate"));
        assert_eq!(derived.scope("unknown_scope").unwrap().count().unwrap(), 1);
        assert_eq!(derived.all().unwrap()[0].id(), derived_row.id());
        assert_eq!(model.scope("unknown_scope").unwrap().count().unwrap(), 2);
        assert!(matches!(
            derived.find(base_row.id().unwrap()),
            Err(PersistenceError::RecordNotFound { .. })
        ));
        assert!(model.find(derived_row.id().unwrap()).is_ok());
    }

    #[test]
    fn subclass_extending_adds_states_and_scopes() {
        let model = simple(&Database::new());
        let derived = model
            .subclass_extending("Premium", |builder| builder.state("gold"))
            .unwrap();

        assert_eq!(derived.states().len(), model.states().len() + 1);
        assert!(derived.scope("gold").is_some());
        assert!(model.scope("gold").is_none());
        assert_eq!(derived.state_attribute(), Some("status"));
    }

    #[test]
    fn create_rejects_invalid_records() {
        let db = Database::new();
        let model = Model::builder("Named", &db)
            .validates_presence_of("name")
            .build();

        let err = model.create(json!({ "name": "" })).unwrap_err();
        assert!(matches!(err, FsmError::ValidationFailed(ref errors) if errors.len() == 1));
        assert!(model.all().unwrap().is_empty());

        let record = model.create(json!({ "name": "ok" })).unwrap();
        assert_eq!(model.find(record.id().unwrap()).unwrap().get("name"), json!("ok"));
    }
}
