//! Equality-filtered queries over a model's table.

use super::model::Model;
use super::record::Record;
use crate::persistence::PersistenceError;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Lazily evaluated query: nothing is read until [`load`](Self::load).
#[derive(Clone)]
pub struct Relation {
    model: Arc<Model>,
    filters: Vec<(String, Value)>,
}

impl Relation {
    pub(crate) fn new(model: Arc<Model>) -> Self {
        Self {
            model,
            filters: Vec::new(),
        }
    }

    pub fn model(&self) -> &Arc<Model> {
        &self.model
    }

    pub fn filters(&self) -> &[(String, Value)] {
        &self.filters
    }

    pub fn where_eq(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.push((column.into(), value.into()));
        self
    }

    pub fn load(&self) -> Result<Vec<Record>, PersistenceError> {
        let rows = self
            .model
            .database()
            .select(self.model.table(), &self.filters)?;
        Ok(rows
            .into_iter()
            .map(|(id, attributes)| Record::loaded(Arc::clone(&self.model), id, attributes))
            .collect())
    }

    pub fn count(&self) -> Result<usize, PersistenceError> {
        Ok(self
            .model
            .database()
            .select(self.model.table(), &self.filters)?
            .len())
    }
}

impl fmt::Debug for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Relation")
            .field("model", &self.model.name())
            .field("filters", &self.filters)
            .finish()
    }
}
