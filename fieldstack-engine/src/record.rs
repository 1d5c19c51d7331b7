//! A record together with its in-memory custom value state.

use fieldstack_model::{Errors, Record};
use fieldstack_types::OwnerId;
use serde_json::Value;

use crate::values::ValueStore;

/// A [`Record`] as seen by a [`Session`](crate::Session).
///
/// The value set is loaded on first access and dropped again after a
/// successful save or a reload, so the next access sees what storage
/// holds.
#[derive(Debug, Clone)]
pub struct CustomizableRecord {
    pub(crate) record: Record,
    pub(crate) persisted: bool,
    pub(crate) changed: bool,
    pub(crate) values: Option<ValueStore>,
    pub(crate) errors: Errors,
}

impl CustomizableRecord {
    pub(crate) fn new_unsaved(record: Record) -> Self {
        Self {
            record,
            persisted: false,
            changed: true,
            values: None,
            errors: Errors::new(),
        }
    }

    pub(crate) fn loaded(record: Record) -> Self {
        Self {
            record,
            persisted: true,
            changed: false,
            values: None,
            errors: Errors::new(),
        }
    }

    pub fn id(&self) -> OwnerId {
        self.record.id
    }

    pub fn entity_type(&self) -> &str {
        &self.record.entity_type
    }

    pub fn record(&self) -> &Record {
        &self.record
    }

    /// True once the record has been saved or was loaded from storage.
    pub fn is_persisted(&self) -> bool {
        self.persisted
    }

    /// True if the record's own columns changed since the last save.
    pub fn is_changed(&self) -> bool {
        self.changed
    }

    /// Sets one of the record's own columns.
    pub fn set_column(&mut self, key: &str, value: Value) {
        if self.record.set(key, value) {
            self.changed = true;
        }
    }

    /// Errors from the last validation.
    pub fn errors(&self) -> &Errors {
        &self.errors
    }

    /// The loaded value set, if any access loaded it yet.
    pub fn values(&self) -> Option<&ValueStore> {
        self.values.as_ref()
    }

    /// True if the loaded value set has unsaved row changes.
    pub fn has_value_changes(&self) -> bool {
        self.values.as_ref().is_some_and(ValueStore::has_changes)
    }

    /// True if a persisted value row was unstaged since the value set was
    /// loaded.
    pub fn value_destroyed(&self) -> bool {
        self.values.as_ref().is_some_and(ValueStore::destroyed)
    }
}
