//! One logical operation against an attribute store.
//!
//! A session owns the definition cache and the accessor registry, so both
//! live exactly as long as the operation that created it. Sessions are
//! cheap; create one per request or batch job and drop it afterwards.

use std::sync::Arc;

use fieldstack_model::{
    AcceptAll, AttributeValue, DesiredValues, FieldDefinition, RawValue, Record, RecordValidator,
    ReferenceResolver, TypedValue, ACCESSOR_PREFIX,
};
use fieldstack_storage::{AttributeStore, ChangeSet};
use fieldstack_types::{FieldId, OwnerId, ValueId};
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::accessors::{AccessorKind, AccessorRegistry, FieldValue};
use crate::cache::FieldDefinitionCache;
use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::record::CustomizableRecord;
use crate::sync::{AssignReport, SyncEngine};
use crate::validation::ValidationBridge;
use crate::values::ValueStore;

/// What a successful save wrote.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SaveOutcome {
    /// The owner row was inserted rather than updated.
    pub created: bool,
    pub inserted: usize,
    pub deleted: usize,
    /// Only `updated_at` of the owner was bumped.
    pub touched: bool,
}

/// Reads, assigns, validates and saves custom values of records.
pub struct Session<'s, S: AttributeStore + ?Sized> {
    store: &'s S,
    config: EngineConfig,
    cache: FieldDefinitionCache,
    registry: AccessorRegistry,
    validator: Arc<dyn RecordValidator>,
    resolver: Arc<dyn ReferenceResolver>,
}

impl<'s, S: AttributeStore + ?Sized> Session<'s, S> {
    /// Creates a session with the default configuration.
    pub fn new(store: &'s S) -> Self {
        Self::with_config(store, EngineConfig::default())
    }

    pub fn with_config(store: &'s S, config: EngineConfig) -> Self {
        Self {
            store,
            config,
            cache: FieldDefinitionCache::new(),
            registry: AccessorRegistry::new(),
            validator: Arc::new(AcceptAll),
            resolver: Arc::new(AcceptAll),
        }
    }

    /// Sets the hook validating the record's own columns.
    #[must_use]
    pub fn with_validator(mut self, validator: Arc<dyn RecordValidator>) -> Self {
        self.validator = validator;
        self
    }

    /// Sets the resolver checking that referenced objects exist.
    #[must_use]
    pub fn with_resolver(mut self, resolver: Arc<dyn ReferenceResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Field definitions of `entity_type`, resolved once per session.
    pub fn definitions_for(&mut self, entity_type: &str) -> EngineResult<Arc<[FieldDefinition]>> {
        Ok(self.cache.definitions_for(self.store, entity_type)?)
    }

    fn definitions_of(&mut self, rec: &CustomizableRecord) -> EngineResult<Arc<[FieldDefinition]>> {
        self.definitions_for(&rec.record.entity_type)
    }

    // ── Records ──────────────────────────────────────────────────

    /// Creates an unsaved record of `entity_type`.
    pub fn build(&self, entity_type: &str, data: Value) -> CustomizableRecord {
        CustomizableRecord::new_unsaved(Record::new(entity_type, data))
    }

    /// Loads a saved record. Its values are loaded on first access.
    pub fn find(&self, id: &OwnerId) -> EngineResult<CustomizableRecord> {
        let record = self
            .store
            .load_record(id)?
            .ok_or(EngineError::RecordNotFound(*id))?;
        Ok(CustomizableRecord::loaded(record))
    }

    /// Re-reads the owner row and drops the loaded value set.
    pub fn reload(&self, rec: &mut CustomizableRecord) -> EngineResult<()> {
        let record = self
            .store
            .load_record(&rec.record.id)?
            .ok_or(EngineError::RecordNotFound(rec.record.id))?;
        rec.record = record;
        rec.changed = false;
        rec.values = None;
        rec.errors.clear();
        Ok(())
    }

    /// The record's value set, populating it on first access.
    ///
    /// A saved record loads its stored rows as they are. A new record
    /// starts with the default value of every known field staged.
    fn values_mut<'r>(&mut self, rec: &'r mut CustomizableRecord) -> EngineResult<&'r mut ValueStore> {
        if rec.values.is_none() {
            let populated = if rec.persisted {
                ValueStore::from_persisted(self.store.load_values(&rec.record.id)?)
            } else {
                let defs = self.definitions_of(rec)?;
                let mut store = ValueStore::new();
                SyncEngine::new(&defs).ensure_complete(&mut store);
                store
            };
            rec.values = Some(populated);
        }
        Ok(rec.values.get_or_insert_with(ValueStore::new))
    }

    // ── Assignment ───────────────────────────────────────────────

    /// Reconciles the record's values with `desired`.
    ///
    /// An empty assignment does nothing, not even load the values.
    pub fn assign(&mut self, rec: &mut CustomizableRecord, desired: &DesiredValues) -> EngineResult<AssignReport> {
        if desired.is_empty() {
            return Ok(AssignReport::default());
        }
        let defs = self.definitions_of(rec)?;
        let values = self.values_mut(rec)?;
        let report = SyncEngine::new(&defs).assign(values, desired);
        debug!(
            "Assigned {} field(s) on {}: +{} / -{}",
            desired.len(),
            rec.record.id,
            report.staged,
            report.unstaged
        );
        Ok(report)
    }

    /// Assigns from the mapping form `{"<field id>": value | [values]}`.
    pub fn assign_json(&mut self, rec: &mut CustomizableRecord, json: &Value) -> EngineResult<AssignReport> {
        self.assign(rec, &DesiredValues::from_json(json))
    }

    /// Assigns from the legacy list form `[{"id": .., "value": ..}]`.
    pub fn assign_legacy(&mut self, rec: &mut CustomizableRecord, json: &Value) -> EngineResult<AssignReport> {
        self.assign(rec, &DesiredValues::from_legacy_list(json))
    }

    /// Stages defaults for fields the record has no value for yet, e.g.
    /// fields made available after its values were first loaded.
    pub fn set_default_values(&mut self, rec: &mut CustomizableRecord) -> EngineResult<usize> {
        let defs = self.definitions_of(rec)?;
        let values = self.values_mut(rec)?;
        Ok(SyncEngine::new(&defs).ensure_complete(values))
    }

    /// Discards staged changes, then stages removal of every stored row
    /// whose field is no longer available for the record's entity type.
    /// The next save deletes them. Returns the number of rows staged.
    pub fn reset_custom_values(&mut self, rec: &mut CustomizableRecord) -> EngineResult<usize> {
        rec.values = None;
        let defs = self.definitions_of(rec)?;
        let values = self.values_mut(rec)?;
        let orphaned = values.unstage_where(|field| !defs.iter().any(|d| d.id == field));
        if orphaned > 0 {
            debug!("Staged removal of {} orphaned value(s) on {}", orphaned, rec.record.id);
        }
        Ok(orphaned)
    }

    // ── Accessors ────────────────────────────────────────────────

    /// True if `name` is a getter or setter of one of the record type's
    /// fields. A matching accessor is built right away.
    pub fn respond_to(&mut self, entity_type: &str, name: &str) -> EngineResult<bool> {
        if AccessorRegistry::parse_name(name).is_none() {
            return Ok(false);
        }
        let defs = self.definitions_for(entity_type)?;
        Ok(self.registry.resolve(entity_type, &defs, name).is_some())
    }

    /// Builds the accessors of every field of `entity_type`.
    pub fn define_all_accessors(&mut self, entity_type: &str) -> EngineResult<usize> {
        let defs = self.definitions_for(entity_type)?;
        Ok(self.registry.define_all(entity_type, &defs))
    }

    /// True if the accessor behind `name` has been built in this session.
    pub fn accessor_defined(&self, entity_type: &str, name: &str) -> bool {
        self.registry.is_defined(entity_type, name)
    }

    /// Calls the getter `name`, e.g. `custom_field_42`.
    ///
    /// Returns `None` if `name` is not a getter of a known field.
    pub fn read(&mut self, rec: &mut CustomizableRecord, name: &str) -> EngineResult<Option<FieldValue>> {
        let defs = self.definitions_of(rec)?;
        let Some((accessor, AccessorKind::Getter)) =
            self.registry.resolve(&rec.record.entity_type, &defs, name)
        else {
            return Ok(None);
        };
        let values = self.values_mut(rec)?;
        Ok(Some(accessor.get(values)))
    }

    /// Calls the setter `name`, e.g. `custom_field_42=`.
    ///
    /// Returns `None` if `name` is not a setter of a known field.
    pub fn write<I, V>(
        &mut self,
        rec: &mut CustomizableRecord,
        name: &str,
        values: I,
    ) -> EngineResult<Option<AssignReport>>
    where
        I: IntoIterator<Item = V>,
        V: Into<RawValue>,
    {
        let defs = self.definitions_of(rec)?;
        let Some((accessor, AccessorKind::Setter)) =
            self.registry.resolve(&rec.record.entity_type, &defs, name)
        else {
            return Ok(None);
        };
        let values_in: Vec<RawValue> = values.into_iter().map(Into::into).collect();
        let store = self.values_mut(rec)?;
        Ok(Some(accessor.set(&SyncEngine::new(&defs), store, values_in)))
    }

    /// Calls the setter `name` with a JSON scalar or array.
    pub fn write_json(
        &mut self,
        rec: &mut CustomizableRecord,
        name: &str,
        json: &Value,
    ) -> EngineResult<Option<AssignReport>> {
        self.write(rec, name, RawValue::list_from_json(json))
    }

    // ── Reading ──────────────────────────────────────────────────

    /// Live value rows of every known field, in field order.
    pub fn custom_field_values(&mut self, rec: &mut CustomizableRecord) -> EngineResult<Vec<AttributeValue>> {
        self.collect_values(rec, |_| true)
    }

    /// Like [`custom_field_values`](Self::custom_field_values), restricted
    /// to visible fields.
    pub fn visible_custom_field_values(
        &mut self,
        rec: &mut CustomizableRecord,
    ) -> EngineResult<Vec<AttributeValue>> {
        self.collect_values(rec, |def| def.visible)
    }

    fn collect_values(
        &mut self,
        rec: &mut CustomizableRecord,
        keep: impl Fn(&FieldDefinition) -> bool,
    ) -> EngineResult<Vec<AttributeValue>> {
        let defs = self.definitions_of(rec)?;
        let values = &*self.values_mut(rec)?;
        Ok(defs
            .iter()
            .filter(|&def| keep(def))
            .flat_map(|def| values.sorted_values(def.id))
            .cloned()
            .collect())
    }

    /// Live rows of one field ordered by id, unsaved rows first.
    pub fn custom_value_for(
        &mut self,
        rec: &mut CustomizableRecord,
        field: FieldId,
    ) -> EngineResult<Vec<AttributeValue>> {
        let defs = self.definitions_of(rec)?;
        if !defs.iter().any(|d| d.id == field) {
            return Ok(Vec::new());
        }
        let values = self.values_mut(rec)?;
        Ok(values.sorted_values(field).into_iter().cloned().collect())
    }

    /// Typed value(s) of one field; `None` for an unknown field.
    pub fn typed_custom_value_for(
        &mut self,
        rec: &mut CustomizableRecord,
        field: FieldId,
    ) -> EngineResult<Option<FieldValue>> {
        self.read(rec, &format!("{ACCESSOR_PREFIX}{field}"))
    }

    /// Display form of one field's value(s), joined with ", " for
    /// multi-valued fields. `None` if the field has no value.
    pub fn formatted_custom_value_for(
        &mut self,
        rec: &mut CustomizableRecord,
        field: FieldId,
    ) -> EngineResult<Option<String>> {
        let formatted = match self.typed_custom_value_for(rec, field)? {
            Some(FieldValue::Single(Some(value))) => Some(value.formatted()),
            Some(FieldValue::Multi(values)) if !values.is_empty() => Some(
                values
                    .iter()
                    .map(TypedValue::formatted)
                    .collect::<Vec<_>>()
                    .join(", "),
            ),
            _ => None,
        };
        Ok(formatted)
    }

    /// Raw values keyed by field id: a string (or null) for single-valued
    /// fields, an array for multi-valued ones.
    pub fn custom_value_attributes(&mut self, rec: &mut CustomizableRecord) -> EngineResult<Map<String, Value>> {
        let defs = self.definitions_of(rec)?;
        let values = self.values_mut(rec)?;
        let mut attrs = Map::new();
        for def in defs.iter() {
            let raws = values.sorted_values(def.id);
            let value = if def.is_multi_value() {
                Value::Array(
                    raws.iter()
                        .filter_map(|v| v.value.clone())
                        .map(Value::String)
                        .collect(),
                )
            } else {
                raws.iter()
                    .find_map(|v| v.value.clone())
                    .map_or(Value::Null, Value::String)
            };
            attrs.insert(def.id.to_string(), value);
        }
        Ok(attrs)
    }

    // ── Validation and saving ────────────────────────────────────

    /// Validates the record's own columns and its custom values. The
    /// result replaces the record's `errors`.
    ///
    /// A new record first gets defaults staged for fields it has no value
    /// for.
    pub fn validate(&mut self, rec: &mut CustomizableRecord) -> EngineResult<bool> {
        rec.errors.clear();
        self.validator.validate(&rec.record, &mut rec.errors);

        let defs = self.definitions_of(rec)?;
        let persisted = rec.persisted;
        let values = self.values_mut(rec)?;
        if !persisted {
            SyncEngine::new(&defs).ensure_complete(values);
        }

        let mut bridge = ValidationBridge::new(&defs);
        if self.config.validate_references {
            bridge = bridge.with_resolver(self.resolver.as_ref());
        }
        let found = bridge.validate(values);
        rec.errors.extend(found);
        Ok(rec.errors.is_empty())
    }

    /// Validates and saves the record with all staged value changes in
    /// one storage transaction.
    ///
    /// On a validation failure storage is not contacted. On any failure
    /// the record keeps its unsaved state.
    pub fn save(&mut self, rec: &mut CustomizableRecord) -> EngineResult<SaveOutcome> {
        if !self.validate(rec)? {
            debug!("Validation failed for {}: {} error(s)", rec.record.id, rec.errors.len());
            return Err(EngineError::Invalid(rec.errors.to_vec()));
        }

        let owner_id = rec.record.id;
        let mut changes = ChangeSet::new(owner_id);

        let mut owner = None;
        if !rec.persisted || rec.changed {
            let mut row = rec.record.clone();
            if rec.persisted {
                row.updated_at = row.updated_at.touch();
            }
            owner = Some(row);
        }
        changes.owner = owner.clone();

        if let Some(values) = &rec.values {
            changes.inserts = values
                .pending_inserts()
                .map(|v| AttributeValue {
                    id: Some(ValueId::new()),
                    owner_id: Some(owner_id),
                    ..v.clone()
                })
                .collect();
            changes.deletes = values.pending_deletes().collect();
        }

        let values_changed = !changes.inserts.is_empty() || rec.value_destroyed();
        if rec.persisted && !rec.changed && self.config.touch_on_value_change && values_changed {
            changes.touch = Some(rec.record.updated_at.touch());
        }

        let outcome = SaveOutcome {
            created: !rec.persisted,
            inserted: changes.inserts.len(),
            deleted: changes.deletes.len(),
            touched: changes.touch.is_some(),
        };

        if changes.is_empty() {
            debug!("Nothing to save for {}", owner_id);
            rec.values = None;
            return Ok(outcome);
        }

        self.store.commit(&changes)?;

        if let Some(row) = owner {
            rec.record = row;
        }
        if let Some(ts) = changes.touch {
            rec.record.updated_at = ts;
        }
        rec.persisted = true;
        rec.changed = false;
        rec.values = None;
        info!(
            "Saved {} {} (+{} / -{} values{})",
            rec.record.entity_type,
            owner_id,
            outcome.inserted,
            outcome.deleted,
            if outcome.touched { ", touched" } else { "" }
        );
        Ok(outcome)
    }
}
