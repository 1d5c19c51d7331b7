//! Named per-field accessors.
//!
//! Every custom field of an entity type is reachable through two names:
//! `custom_field_<id>` reads the field's typed value(s) and
//! `custom_field_<id>=` assigns new ones. Accessors are built on first
//! use from the entity type's definitions and cached per type for the
//! lifetime of the owning session.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use fieldstack_model::{DesiredValues, FieldDefinition, RawValue, TypedValue, ACCESSOR_PREFIX};
use fieldstack_types::FieldId;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::sync::{AssignReport, SyncEngine};
use crate::values::ValueStore;

/// What a getter returns: one value for single-valued fields, a list for
/// multi-valued ones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Single(Option<TypedValue>),
    Multi(Vec<TypedValue>),
}

impl FieldValue {
    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// Whether a name addresses the getter or the setter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessorKind {
    Getter,
    Setter,
}

type Getter = Arc<dyn Fn(&ValueStore) -> FieldValue + Send + Sync>;
type Setter = Arc<dyn Fn(Vec<RawValue>) -> DesiredValues + Send + Sync>;

/// The getter/setter pair of one field.
#[derive(Clone)]
pub struct Accessor {
    field_id: FieldId,
    getter: Getter,
    setter: Setter,
}

impl Accessor {
    fn for_definition(def: &FieldDefinition) -> Self {
        let field_id = def.id;
        let read_def = def.clone();
        Self {
            field_id,
            getter: Arc::new(move |store: &ValueStore| read(&read_def, store)),
            setter: Arc::new(move |values: Vec<RawValue>| DesiredValues::new().with(field_id, values)),
        }
    }

    pub fn field_id(&self) -> FieldId {
        self.field_id
    }

    pub fn get(&self, store: &ValueStore) -> FieldValue {
        (self.getter)(store)
    }

    pub fn set(&self, engine: &SyncEngine<'_>, store: &mut ValueStore, values: Vec<RawValue>) -> AssignReport {
        engine.assign(store, &(self.setter)(values))
    }
}

impl fmt::Debug for Accessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Accessor")
            .field("field_id", &self.field_id)
            .finish_non_exhaustive()
    }
}

fn read(def: &FieldDefinition, store: &ValueStore) -> FieldValue {
    let mut typed = store
        .sorted_values(def.id)
        .into_iter()
        .filter_map(|v| def.typed_value(v.value.as_deref()));
    if def.is_multi_value() {
        FieldValue::Multi(typed.collect())
    } else {
        FieldValue::Single(typed.next())
    }
}

/// Lazily populated accessor table, one per session.
#[derive(Debug, Default)]
pub struct AccessorRegistry {
    by_type: HashMap<String, HashMap<FieldId, Accessor>>,
    fully_defined: HashSet<String>,
}

impl AccessorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Splits an accessor name into its field id and kind.
    ///
    /// Only `custom_field_<digits>` and `custom_field_<digits>=` parse.
    pub fn parse_name(name: &str) -> Option<(FieldId, AccessorKind)> {
        let rest = name.strip_prefix(ACCESSOR_PREFIX)?;
        let (digits, kind) = match rest.strip_suffix('=') {
            Some(digits) => (digits, AccessorKind::Setter),
            None => (rest, AccessorKind::Getter),
        };
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        digits.parse().ok().map(|id| (FieldId::new(id), kind))
    }

    /// Resolves `name` against the definitions of `entity_type`, building
    /// and caching the accessor on first use.
    pub fn resolve(
        &mut self,
        entity_type: &str,
        definitions: &[FieldDefinition],
        name: &str,
    ) -> Option<(Accessor, AccessorKind)> {
        let (field_id, kind) = Self::parse_name(name)?;
        let table = self.by_type.entry(entity_type.to_string()).or_default();
        if let Some(accessor) = table.get(&field_id) {
            return Some((accessor.clone(), kind));
        }
        let def = definitions.iter().find(|d| d.id == field_id)?;
        let accessor = Accessor::for_definition(def);
        table.insert(field_id, accessor.clone());
        debug!("Defined accessor {} for {}", def.accessor_name(), entity_type);
        Some((accessor, kind))
    }

    /// Builds accessors for every definition of `entity_type` at once.
    /// Returns the number of accessors the type now has.
    pub fn define_all(&mut self, entity_type: &str, definitions: &[FieldDefinition]) -> usize {
        let table = self.by_type.entry(entity_type.to_string()).or_default();
        for def in definitions {
            table
                .entry(def.id)
                .or_insert_with(|| Accessor::for_definition(def));
        }
        self.fully_defined.insert(entity_type.to_string());
        table.len()
    }

    /// True if the accessor behind `name` has already been built.
    pub fn is_defined(&self, entity_type: &str, name: &str) -> bool {
        let Some((field_id, _)) = Self::parse_name(name) else {
            return false;
        };
        self.by_type
            .get(entity_type)
            .is_some_and(|table| table.contains_key(&field_id))
    }

    /// True once `define_all` ran for `entity_type`.
    pub fn is_fully_defined(&self, entity_type: &str) -> bool {
        self.fully_defined.contains(entity_type)
    }
}
