//! Reconciles a desired value assignment against a record's value set.
//!
//! For every field named in the assignment the engine computes the
//! difference between what is stored and what is wanted, then stages the
//! missing values and unstages the surplus. Nothing is written here; the
//! staged rows are committed by the session's save.

use std::collections::HashSet;

use fieldstack_model::{DesiredValues, FieldDefinition, RawValue};
use fieldstack_types::FieldId;
use tracing::{debug, warn};

use crate::values::ValueStore;

/// Counts of the row changes one `assign` call staged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AssignReport {
    pub staged: usize,
    pub unstaged: usize,
}

impl AssignReport {
    /// True if the call changed nothing.
    pub fn is_noop(&self) -> bool {
        self.staged == 0 && self.unstaged == 0
    }
}

/// Diff-and-stage reconciliation over the definitions of one entity type.
#[derive(Debug, Clone, Copy)]
pub struct SyncEngine<'d> {
    definitions: &'d [FieldDefinition],
}

impl<'d> SyncEngine<'d> {
    pub fn new(definitions: &'d [FieldDefinition]) -> Self {
        Self { definitions }
    }

    fn definition(&self, id: FieldId) -> Option<&'d FieldDefinition> {
        self.definitions.iter().find(|d| d.id == id)
    }

    /// Applies `desired` to `store`, one field at a time in mapping order.
    ///
    /// Keys that do not name a known field are skipped. Applying the same
    /// assignment twice stages nothing the second time.
    pub fn assign(&self, store: &mut ValueStore, desired: &DesiredValues) -> AssignReport {
        let mut report = AssignReport::default();
        for (key, values) in desired.iter() {
            let Some(def) = key.field_id().and_then(|id| self.definition(id)) else {
                debug!("Ignoring assignment to unknown field key {}", key);
                continue;
            };
            self.assign_field(store, def, values, &mut report);
        }
        report
    }

    fn assign_field(
        &self,
        store: &mut ValueStore,
        def: &FieldDefinition,
        values: &[RawValue],
        report: &mut AssignReport,
    ) {
        let desired = normalize(def, values);
        let existing = store.group_by_value(def.id);

        for value in &desired {
            if !existing.contains_value(value) {
                store.stage(def.id, Some(value.clone()));
                report.staged += 1;
            }
        }

        for (raw, handle) in existing.iter() {
            let Some(raw) = raw else { continue };
            if !desired.iter().any(|v| v == raw) && store.unstage(handle) {
                report.unstaged += 1;
            }
        }

        if !existing.duplicates().is_empty() {
            warn!(
                "Field {} holds {} duplicate value row(s); collapsing",
                def.id,
                existing.duplicates().len()
            );
            for handle in existing.duplicates() {
                if store.unstage(*handle) {
                    report.unstaged += 1;
                }
            }
        }

        match existing.nil() {
            Some(nil) if !desired.is_empty() => {
                if store.unstage(nil) {
                    report.unstaged += 1;
                }
            }
            None if desired.is_empty() => {
                store.stage(def.id, None);
                report.staged += 1;
            }
            _ => {}
        }

        debug!(
            "Field {}: desired {} value(s), {} existing group(s)",
            def.id,
            desired.len(),
            existing.len()
        );
    }

    /// Stages the default value of every field the record has no row for,
    /// live or removed. Returns the number of rows staged.
    pub fn ensure_complete(&self, store: &mut ValueStore) -> usize {
        let mut staged = 0;
        for def in self.definitions {
            if !store.has_any(def.id) {
                store.stage(def.id, def.default_value.clone());
                staged += 1;
            }
        }
        if staged > 0 {
            debug!("Staged {} default value(s)", staged);
        }
        staged
    }
}

/// Drops nils and repeats (first occurrence wins). A single-valued field
/// keeps only the last value given.
fn normalize(def: &FieldDefinition, values: &[RawValue]) -> Vec<String> {
    let present = values.iter().filter_map(RawValue::as_str);
    if !def.is_multi_value() {
        return present.last().map(str::to_string).into_iter().collect();
    }
    let mut seen = HashSet::new();
    present
        .filter(|v| seen.insert(*v))
        .map(str::to_string)
        .collect()
}
