//! In-memory attribute store.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use fieldstack_model::{AttributeValue, FieldDefinition, Record};
use fieldstack_types::OwnerId;
use tracing::debug;

use crate::{sort_definitions, AttributeStore, ChangeSet, DefinitionProvider, StorageError, StorageResult};

#[derive(Debug, Clone, Default)]
struct State {
    definitions: Vec<FieldDefinition>,
    records: HashMap<OwnerId, Record>,
    /// All value rows, in insertion order.
    values: Vec<AttributeValue>,
}

#[derive(Debug, Default)]
struct Inner {
    state: State,
    fail_next_commit: bool,
    definition_lookups: usize,
    commits: usize,
}

/// Attribute store backed by process-local maps.
///
/// Commits are applied to a copy of the state which replaces the live
/// state only if every step succeeded. Cloning the store shares the
/// underlying state.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-populated with field definitions.
    pub fn with_definitions(definitions: impl IntoIterator<Item = FieldDefinition>) -> Self {
        let store = Self::new();
        if let Ok(mut inner) = store.inner.lock() {
            inner.state.definitions.extend(definitions);
        }
        store
    }

    fn lock(&self) -> StorageResult<MutexGuard<'_, Inner>> {
        self.inner.lock().map_err(|_| StorageError::LockPoisoned)
    }

    /// Adds or replaces a field definition.
    pub fn put_definition(&self, definition: FieldDefinition) -> StorageResult<()> {
        let mut inner = self.lock()?;
        inner.state.definitions.retain(|d| d.id != definition.id);
        inner.state.definitions.push(definition);
        Ok(())
    }

    /// Inserts a raw value row as-is, bypassing the engine. Lets tests
    /// reproduce legacy data such as duplicate rows.
    pub fn put_value(&self, value: AttributeValue) -> StorageResult<()> {
        self.lock()?.state.values.push(value);
        Ok(())
    }

    /// Inserts or replaces a record row.
    pub fn put_record(&self, record: Record) -> StorageResult<()> {
        self.lock()?.state.records.insert(record.id, record);
        Ok(())
    }

    /// Makes the next commit fail without applying anything.
    pub fn fail_next_commit(&self) -> StorageResult<()> {
        self.lock()?.fail_next_commit = true;
        Ok(())
    }

    /// Number of `definitions_for` calls served so far.
    pub fn definition_lookups(&self) -> usize {
        self.lock().map(|i| i.definition_lookups).unwrap_or_default()
    }

    /// Number of successful commits so far.
    pub fn commits(&self) -> usize {
        self.lock().map(|i| i.commits).unwrap_or_default()
    }

    /// Number of stored value rows across all owners.
    pub fn value_count(&self) -> usize {
        self.lock().map(|i| i.state.values.len()).unwrap_or_default()
    }
}

impl DefinitionProvider for MemoryStore {
    fn definitions_for(&self, entity_type: &str) -> StorageResult<Vec<FieldDefinition>> {
        let mut inner = self.lock()?;
        inner.definition_lookups += 1;
        let mut defs: Vec<FieldDefinition> = inner
            .state
            .definitions
            .iter()
            .filter(|d| d.entity_type == entity_type)
            .cloned()
            .collect();
        sort_definitions(&mut defs);
        Ok(defs)
    }
}

impl AttributeStore for MemoryStore {
    fn load_record(&self, id: &OwnerId) -> StorageResult<Option<Record>> {
        Ok(self.lock()?.state.records.get(id).cloned())
    }

    fn load_values(&self, owner: &OwnerId) -> StorageResult<Vec<AttributeValue>> {
        Ok(self
            .lock()?
            .state
            .values
            .iter()
            .filter(|v| v.owner_id.as_ref() == Some(owner))
            .cloned()
            .collect())
    }

    fn commit(&self, changes: &ChangeSet) -> StorageResult<()> {
        let mut inner = self.lock()?;
        if inner.fail_next_commit {
            inner.fail_next_commit = false;
            return Err(StorageError::CommitRejected("injected failure".into()));
        }

        let mut next = inner.state.clone();

        if let Some(record) = &changes.owner {
            next.records.insert(record.id, record.clone());
        }
        if !next.records.contains_key(&changes.owner_id) {
            return Err(StorageError::NotFound(changes.owner_id.to_string()));
        }
        if let Some(ts) = changes.touch {
            if let Some(record) = next.records.get_mut(&changes.owner_id) {
                record.updated_at = ts;
            }
        }

        next.values
            .retain(|v| !v.id.is_some_and(|id| changes.deletes.contains(&id)));
        for value in &changes.inserts {
            if value.id.is_none() || value.owner_id != Some(changes.owner_id) {
                return Err(StorageError::InvalidData(format!(
                    "value for field {} is not bound to owner {}",
                    value.field_id, changes.owner_id
                )));
            }
            next.values.push(value.clone());
        }

        inner.state = next;
        inner.commits += 1;
        debug!(
            "Committed owner {} (+{} / -{} values)",
            changes.owner_id,
            changes.inserts.len(),
            changes.deletes.len()
        );
        Ok(())
    }
}
