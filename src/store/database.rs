//! In-memory tables with nested, snapshot-based transactions.

use crate::persistence::{PersistenceError, TransactionScope};
use chrono::Utc;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, trace};
use uuid::Uuid;

pub type RecordId = Uuid;

/// Attribute values of one row.
pub type Attributes = BTreeMap<String, Value>;

#[derive(Clone, Debug, Default)]
struct Table {
    rows: Vec<(RecordId, Attributes)>,
    unique: Vec<String>,
}

impl Table {
    fn position(&self, id: RecordId) -> Option<usize> {
        self.rows.iter().position(|(row_id, _)| *row_id == id)
    }

    fn check_unique(
        &self,
        table: &str,
        id: Option<RecordId>,
        attributes: &Attributes,
    ) -> Result<(), PersistenceError> {
        for column in &self.unique {
            let Some(value) = attributes.get(column).filter(|v| !v.is_null()) else {
                continue;
            };
            let clash = self
                .rows
                .iter()
                .any(|(row_id, row)| Some(*row_id) != id && row.get(column) == Some(value));
            if clash {
                return Err(PersistenceError::ConstraintViolation {
                    table: table.to_string(),
                    column: column.clone(),
                    value: value.clone(),
                });
            }
        }
        Ok(())
    }
}

#[derive(Default)]
struct Inner {
    tables: BTreeMap<String, Table>,
    savepoints: Vec<BTreeMap<String, Table>>,
    depth: usize,
}

/// Shared handle to an in-memory database.
///
/// Clones refer to the same data. Transactions nest: a
/// [`TransactionScope::Join`] scope inside an open transaction simply takes
/// part in it, while [`TransactionScope::RequiresNew`] takes a savepoint
/// that can be rolled back on its own.
#[derive(Clone, Default)]
pub struct Database {
    inner: Arc<Mutex<Inner>>,
}

impl Database {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Create `name` unless it already exists, adding unique constraints.
    pub fn create_table(&self, name: &str, unique: &[String]) {
        let mut inner = self.lock();
        let table = inner.tables.entry(name.to_string()).or_default();
        for column in unique {
            if !table.unique.contains(column) {
                table.unique.push(column.clone());
            }
        }
    }

    pub fn insert(
        &self,
        table: &str,
        mut attributes: Attributes,
    ) -> Result<(RecordId, Attributes), PersistenceError> {
        let mut inner = self.lock();
        let rows = inner
            .tables
            .get_mut(table)
            .ok_or_else(|| PersistenceError::UnknownTable(table.to_string()))?;
        rows.check_unique(table, None, &attributes)?;

        let id = Uuid::new_v4();
        let now = Value::String(Utc::now().to_rfc3339());
        attributes.insert("id".to_string(), Value::String(id.to_string()));
        attributes.insert("created_at".to_string(), now.clone());
        attributes.insert("updated_at".to_string(), now);
        rows.rows.push((id, attributes.clone()));
        trace!(table, %id, "inserted row");
        Ok((id, attributes))
    }

    /// Replace every attribute of an existing row.
    pub fn update(
        &self,
        table: &str,
        id: RecordId,
        mut attributes: Attributes,
    ) -> Result<Attributes, PersistenceError> {
        let mut inner = self.lock();
        let rows = inner
            .tables
            .get_mut(table)
            .ok_or_else(|| PersistenceError::UnknownTable(table.to_string()))?;
        let position = rows.position(id).ok_or_else(|| not_found(table, id))?;
        rows.check_unique(table, Some(id), &attributes)?;

        attributes.insert("updated_at".to_string(), Value::String(Utc::now().to_rfc3339()));
        rows.rows[position].1 = attributes.clone();
        trace!(table, %id, "updated row");
        Ok(attributes)
    }

    /// Write one column of an existing row, leaving the rest untouched.
    pub fn update_column(
        &self,
        table: &str,
        id: RecordId,
        column: &str,
        value: Value,
    ) -> Result<(), PersistenceError> {
        let mut inner = self.lock();
        let rows = inner
            .tables
            .get_mut(table)
            .ok_or_else(|| PersistenceError::UnknownTable(table.to_string()))?;
        let position = rows.position(id).ok_or_else(|| not_found(table, id))?;

        let mut candidate = rows.rows[position].1.clone();
        candidate.insert(column.to_string(), value);
        rows.check_unique(table, Some(id), &candidate)?;
        rows.rows[position].1 = candidate;
        trace!(table, %id, column, "updated column");
        Ok(())
    }

    pub fn fetch(&self, table: &str, id: RecordId) -> Result<Attributes, PersistenceError> {
        let inner = self.lock();
        let rows = inner
            .tables
            .get(table)
            .ok_or_else(|| PersistenceError::UnknownTable(table.to_string()))?;
        rows.position(id)
            .map(|position| rows.rows[position].1.clone())
            .ok_or_else(|| not_found(table, id))
    }

    /// Rows whose attributes equal every `(column, value)` filter, in
    /// insertion order.
    pub fn select(
        &self,
        table: &str,
        filters: &[(String, Value)],
    ) -> Result<Vec<(RecordId, Attributes)>, PersistenceError> {
        let inner = self.lock();
        let rows = inner
            .tables
            .get(table)
            .ok_or_else(|| PersistenceError::UnknownTable(table.to_string()))?;
        Ok(rows
            .rows
            .iter()
            .filter(|(_, row)| {
                filters
                    .iter()
                    .all(|(column, value)| row.get(column).unwrap_or(&Value::Null) == value)
            })
            .cloned()
            .collect())
    }

    pub fn in_transaction(&self) -> bool {
        self.lock().depth > 0
    }

    pub fn transaction_depth(&self) -> usize {
        self.lock().depth
    }

    /// Run `body` inside a transactional scope.
    ///
    /// When this call opened the scope (outermost transaction, or a
    /// `RequiresNew` savepoint), an `Err` restores every table to its state
    /// at entry. A joined scope leaves the rollback to the transaction it
    /// joined. The body's result is returned unchanged either way. A panic
    /// in `body` unwinds the scope like an `Err`.
    pub fn transaction<T, E, F>(&self, scope: TransactionScope, body: F) -> Result<T, E>
    where
        F: FnOnce() -> Result<T, E>,
    {
        let opened = {
            let mut inner = self.lock();
            let opened = inner.depth == 0 || scope == TransactionScope::RequiresNew;
            if opened {
                let snapshot = inner.tables.clone();
                inner.savepoints.push(snapshot);
            }
            inner.depth += 1;
            debug!(depth = inner.depth, ?scope, opened, "begin transaction");
            opened
        };

        let mut guard = ScopeGuard {
            database: self,
            opened,
            rollback: true,
        };
        let result = body();
        guard.rollback = result.is_err();
        result
    }
}

/// Closes one transactional scope when dropped, including during unwinding.
struct ScopeGuard<'a> {
    database: &'a Database,
    opened: bool,
    rollback: bool,
}

impl Drop for ScopeGuard<'_> {
    fn drop(&mut self) {
        let mut inner = self.database.lock();
        inner.depth = inner.depth.saturating_sub(1);
        if !self.opened {
            return;
        }
        let snapshot = inner.savepoints.pop();
        match snapshot {
            Some(snapshot) if self.rollback => {
                inner.tables = snapshot;
                debug!(depth = inner.depth, "rolled back transaction");
            }
            _ => debug!(depth = inner.depth, "committed transaction"),
        }
    }
}

fn not_found(table: &str, id: RecordId) -> PersistenceError {
    PersistenceError::RecordNotFound {
        table: table.to_string(),
        id: id.to_string(),
    }
}
