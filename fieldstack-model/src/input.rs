//! Inbound value assignments.
//!
//! A caller describes the values it wants as a mapping from field key to
//! one or more raw values. Keys that do not name a field are carried
//! along (the mapping may hold unrelated keys meant for the record's own
//! columns) and dropped when the assignment is applied.

use fieldstack_types::{FieldId, OwnerId};
use serde_json::Value;
use std::fmt;

/// An object that can stand in for its identity, e.g. a resolved user
/// assigned to a reference field.
pub trait Identified {
    fn identity(&self) -> String;
}

impl Identified for OwnerId {
    fn identity(&self) -> String {
        self.to_string()
    }
}

/// One element of an assignment, normalised to its string form.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RawValue {
    /// The nil sentinel. Never stored as a real value.
    Null,
    Value(String),
}

impl RawValue {
    /// Uses the identity of `item` as the raw value.
    pub fn identified<T: Identified + ?Sized>(item: &T) -> Self {
        Self::Value(item.identity())
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Null => None,
            Self::Value(s) => Some(s),
        }
    }

    /// Normalises one JSON element: objects with an `id` become that id,
    /// strings stay as they are, other scalars use their JSON text.
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::String(s) => Self::Value(s.clone()),
            Value::Object(obj) => match obj.get("id") {
                Some(Value::String(id)) => Self::Value(id.clone()),
                Some(Value::Null) | None => Self::Value(value.to_string()),
                Some(id) => Self::Value(id.to_string()),
            },
            other => Self::Value(other.to_string()),
        }
    }

    /// Normalises a JSON value that may be a scalar or an array.
    ///
    /// A scalar `null` means "no values"; `null` elements inside an array
    /// are kept as [`RawValue::Null`] and ignored when applied.
    pub fn list_from_json(value: &Value) -> Vec<Self> {
        match value {
            Value::Null => Vec::new(),
            Value::Array(items) => items.iter().map(Self::from_json).collect(),
            other => vec![Self::from_json(other)],
        }
    }
}

impl From<&str> for RawValue {
    fn from(s: &str) -> Self {
        Self::Value(s.to_string())
    }
}

impl From<String> for RawValue {
    fn from(s: String) -> Self {
        Self::Value(s)
    }
}

impl From<&String> for RawValue {
    fn from(s: &String) -> Self {
        Self::Value(s.clone())
    }
}

impl From<i64> for RawValue {
    fn from(i: i64) -> Self {
        Self::Value(i.to_string())
    }
}

impl From<u64> for RawValue {
    fn from(i: u64) -> Self {
        Self::Value(i.to_string())
    }
}

impl From<i32> for RawValue {
    fn from(i: i32) -> Self {
        Self::Value(i.to_string())
    }
}

impl From<bool> for RawValue {
    fn from(b: bool) -> Self {
        Self::Value(b.to_string())
    }
}

impl<T: Into<RawValue>> From<Option<T>> for RawValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

/// The key of one assignment entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FieldKey {
    Id(FieldId),
    /// A key that is not a field id; ignored when applied.
    Other(String),
}

impl FieldKey {
    pub fn field_id(&self) -> Option<FieldId> {
        match self {
            Self::Id(id) => Some(*id),
            Self::Other(_) => None,
        }
    }
}

impl From<FieldId> for FieldKey {
    fn from(id: FieldId) -> Self {
        Self::Id(id)
    }
}

impl From<u64> for FieldKey {
    fn from(id: u64) -> Self {
        Self::Id(FieldId::new(id))
    }
}

impl From<&str> for FieldKey {
    fn from(key: &str) -> Self {
        FieldId::parse(key).map_or_else(|_| Self::Other(key.to_string()), Self::Id)
    }
}

impl fmt::Display for FieldKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "{id}"),
            Self::Other(key) => f.write_str(key),
        }
    }
}

/// An ordered assignment: field key → desired raw values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DesiredValues {
    entries: Vec<(FieldKey, Vec<RawValue>)>,
}

impl DesiredValues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an entry. Entries are applied in insertion order.
    pub fn insert<K, I, V>(&mut self, key: K, values: I)
    where
        K: Into<FieldKey>,
        I: IntoIterator<Item = V>,
        V: Into<RawValue>,
    {
        self.entries
            .push((key.into(), values.into_iter().map(Into::into).collect()));
    }

    /// Builder form of [`insert`](Self::insert).
    #[must_use]
    pub fn with<K, I, V>(mut self, key: K, values: I) -> Self
    where
        K: Into<FieldKey>,
        I: IntoIterator<Item = V>,
        V: Into<RawValue>,
    {
        self.insert(key, values);
        self
    }

    /// An assignment of a single scalar; `None` clears the field.
    pub fn single<K: Into<FieldKey>, V: Into<RawValue>>(key: K, value: V) -> Self {
        let values: Vec<RawValue> = match value.into() {
            RawValue::Null => Vec::new(),
            v => vec![v],
        };
        Self::new().with(key, values)
    }

    /// Reads the mapping form `{"42": "a", "7": ["x", {"id": 3}]}`.
    ///
    /// Anything that is not a JSON object yields an empty assignment.
    pub fn from_json(value: &Value) -> Self {
        let mut desired = Self::new();
        if let Value::Object(map) = value {
            for (key, val) in map {
                desired.insert(key.as_str(), RawValue::list_from_json(val));
            }
        }
        desired
    }

    /// Reads the legacy list form `[{"id": 42, "value": "a"}, ...]`.
    ///
    /// Entries without an `id` or without a `value` key are skipped.
    pub fn from_legacy_list(value: &Value) -> Self {
        let mut desired = Self::new();
        let Value::Array(items) = value else {
            return desired;
        };
        for item in items {
            let Value::Object(obj) = item else { continue };
            let (Some(id), Some(val)) = (obj.get("id"), obj.get("value")) else {
                continue;
            };
            let key = match id {
                Value::String(s) => FieldKey::from(s.as_str()),
                Value::Number(n) => legacy_number_key(n),
                _ => continue,
            };
            desired.insert(key, RawValue::list_from_json(val));
        }
        desired
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&FieldKey, &[RawValue])> {
        self.entries.iter().map(|(k, v)| (k, v.as_slice()))
    }
}

/// Legacy payloads may carry ids as floats (`1.0`); integral ones name a field.
fn legacy_number_key(n: &serde_json::Number) -> FieldKey {
    if let Some(id) = n.as_u64() {
        return FieldKey::Id(FieldId::new(id));
    }
    match n.as_f64() {
        Some(f) if f >= 0.0 && f.fract() == 0.0 && f <= u64::MAX as f64 => FieldKey::Id(FieldId::new(f as u64)),
        _ => FieldKey::Other(n.to_string()),
    }
}
