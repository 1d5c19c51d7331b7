//! The value set of one record.
//!
//! Holds every attribute value row the record has, persisted or staged.
//! Rows are addressed by a store-local [`ValueHandle`] because staged rows
//! have no database id yet.
//!
//! Removal never deletes a row: `unstage` marks it and moves it out of
//! the live index. The marked rows are kept so a save can turn them into
//! deletions.

use std::collections::HashMap;

use fieldstack_model::AttributeValue;
use fieldstack_types::{FieldId, ValueId};

/// Store-local address of one row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ValueHandle(u64);

#[derive(Debug, Clone)]
struct Slot {
    handle: ValueHandle,
    value: AttributeValue,
}

/// Live values of one field grouped by raw value.
///
/// When several rows share a raw value, the first one in load/insertion
/// order represents the group and the others are reported as duplicates.
#[derive(Debug, Clone, Default)]
pub struct ValueGroups {
    order: Vec<Option<String>>,
    representatives: HashMap<Option<String>, ValueHandle>,
    duplicates: Vec<ValueHandle>,
}

impl ValueGroups {
    pub fn get(&self, value: &Option<String>) -> Option<ValueHandle> {
        self.representatives.get(value).copied()
    }

    pub fn contains_value(&self, value: &str) -> bool {
        self.representatives.contains_key(&Some(value.to_string()))
    }

    /// The placeholder row, if the field has one.
    pub fn nil(&self) -> Option<ValueHandle> {
        self.get(&None)
    }

    /// Groups in order of first appearance.
    pub fn iter(&self) -> impl Iterator<Item = (&Option<String>, ValueHandle)> {
        self.order
            .iter()
            .filter_map(|key| self.representatives.get(key).map(|h| (key, *h)))
    }

    /// Rows that repeat a raw value already represented by an earlier row.
    pub fn duplicates(&self) -> &[ValueHandle] {
        &self.duplicates
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// The attribute values of one record.
#[derive(Debug, Clone, Default)]
pub struct ValueStore {
    live: Vec<Slot>,
    removed: Vec<Slot>,
    next_handle: u64,
    destroyed: bool,
}

impl ValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a store from rows loaded from storage, keeping their order.
    pub fn from_persisted(values: impl IntoIterator<Item = AttributeValue>) -> Self {
        let mut store = Self::new();
        for value in values {
            store.push(value);
        }
        store
    }

    fn push(&mut self, value: AttributeValue) -> ValueHandle {
        let handle = ValueHandle(self.next_handle);
        self.next_handle += 1;
        self.live.push(Slot { handle, value });
        handle
    }

    /// Live values of a field, in load/insertion order.
    pub fn current_values(&self, field: FieldId) -> impl Iterator<Item = &AttributeValue> {
        self.live
            .iter()
            .filter(move |s| s.value.field_id == field)
            .map(|s| &s.value)
    }

    /// Live values of a field ordered by id. Unsaved rows sort first, in
    /// staging order.
    pub fn sorted_values(&self, field: FieldId) -> Vec<&AttributeValue> {
        let mut values: Vec<&AttributeValue> = self.current_values(field).collect();
        values.sort_by_key(|v| v.id);
        values
    }

    /// Handles of the live values of a field.
    pub fn handles_for(&self, field: FieldId) -> Vec<ValueHandle> {
        self.live
            .iter()
            .filter(|s| s.value.field_id == field)
            .map(|s| s.handle)
            .collect()
    }

    /// Looks up a live row.
    pub fn get(&self, handle: ValueHandle) -> Option<&AttributeValue> {
        self.live.iter().find(|s| s.handle == handle).map(|s| &s.value)
    }

    /// Groups the live values of a field by raw value, first row wins.
    pub fn group_by_value(&self, field: FieldId) -> ValueGroups {
        let mut groups = ValueGroups::default();
        for slot in self.live.iter().filter(|s| s.value.field_id == field) {
            let key = slot.value.value.clone();
            if groups.representatives.contains_key(&key) {
                groups.duplicates.push(slot.handle);
            } else {
                groups.representatives.insert(key.clone(), slot.handle);
                groups.order.push(key);
            }
        }
        groups
    }

    /// Adds a new, unpersisted row.
    pub fn stage(&mut self, field: FieldId, value: Option<String>) -> ValueHandle {
        self.push(AttributeValue::new(field, value))
    }

    /// Marks a live row for removal and takes it out of the live index.
    ///
    /// Returns false if the handle does not address a live row.
    pub fn unstage(&mut self, handle: ValueHandle) -> bool {
        let Some(pos) = self.live.iter().position(|s| s.handle == handle) else {
            return false;
        };
        let mut slot = self.live.remove(pos);
        slot.value.marked_for_removal = true;
        self.destroyed |= slot.value.is_persisted();
        self.removed.push(slot);
        true
    }

    /// Unstages every live row whose field matches `pred`. Returns the
    /// number of rows unstaged.
    pub fn unstage_where(&mut self, mut pred: impl FnMut(FieldId) -> bool) -> usize {
        let handles: Vec<ValueHandle> = self
            .live
            .iter()
            .filter(|s| pred(s.value.field_id))
            .map(|s| s.handle)
            .collect();
        handles.into_iter().filter(|h| self.unstage(*h)).count()
    }

    /// True if the field has any row at all, live or marked for removal.
    pub fn has_any(&self, field: FieldId) -> bool {
        self.live
            .iter()
            .chain(self.removed.iter())
            .any(|s| s.value.field_id == field)
    }

    /// All live rows, in load/insertion order.
    pub fn live(&self) -> impl Iterator<Item = &AttributeValue> {
        self.live.iter().map(|s| &s.value)
    }

    /// All rows marked for removal, persisted or not.
    pub fn removed(&self) -> impl Iterator<Item = &AttributeValue> {
        self.removed.iter().map(|s| &s.value)
    }

    /// Live rows that a save has to insert.
    pub fn pending_inserts(&self) -> impl Iterator<Item = &AttributeValue> {
        self.live().filter(|v| !v.is_persisted())
    }

    /// Persisted rows that a save has to delete.
    pub fn pending_deletes(&self) -> impl Iterator<Item = ValueId> + '_ {
        self.removed().filter_map(|v| v.id)
    }

    /// True if saving would insert or delete any row.
    pub fn has_changes(&self) -> bool {
        self.pending_inserts().next().is_some() || self.pending_deletes().next().is_some()
    }

    /// True once a persisted row has been unstaged.
    pub fn destroyed(&self) -> bool {
        self.destroyed
    }

    /// Number of live rows.
    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }
}
