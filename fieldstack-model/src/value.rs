use chrono::NaiveDate;
use fieldstack_types::{FieldId, OwnerId, ValueId};
use serde::{Deserialize, Serialize};

use crate::field::FieldFormat;

/// One stored (field, raw value) pair belonging to one record.
///
/// `id` and `owner_id` stay `None` until the row is persisted together
/// with its owner. A `value` of `None` is a placeholder: the field exists
/// for the record but is currently unset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeValue {
    pub id: Option<ValueId>,
    pub field_id: FieldId,
    pub owner_id: Option<OwnerId>,
    pub value: Option<String>,
    /// Staged for deletion on the next save. Never persisted.
    #[serde(skip)]
    pub marked_for_removal: bool,
}

impl AttributeValue {
    /// Creates an unpersisted value.
    pub fn new(field_id: FieldId, value: Option<String>) -> Self {
        Self {
            id: None,
            field_id,
            owner_id: None,
            value,
            marked_for_removal: false,
        }
    }

    /// Creates a value as loaded from storage.
    pub fn persisted(id: ValueId, owner_id: OwnerId, field_id: FieldId, value: Option<String>) -> Self {
        Self {
            id: Some(id),
            field_id,
            owner_id: Some(owner_id),
            value,
            marked_for_removal: false,
        }
    }

    pub fn is_persisted(&self) -> bool {
        self.id.is_some()
    }

    /// True for the nil-valued row that keeps an unset field present.
    pub fn is_placeholder(&self) -> bool {
        self.value.is_none()
    }
}

/// A raw value converted according to its field's format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TypedValue {
    Text(String),
    Integer(i64),
    Boolean(bool),
    Date(NaiveDate),
    /// Identity of the referenced object, as stored.
    Reference(String),
}

impl TypedValue {
    /// Converts `raw` for a field of `format`.
    ///
    /// Empty strings convert to `None` for every non-text format, as do
    /// values that are not well-formed for the format.
    pub fn parse(format: FieldFormat, raw: &str) -> Option<Self> {
        match format {
            FieldFormat::Text | FieldFormat::FormattableText => Some(Self::Text(raw.to_string())),
            _ if raw.trim().is_empty() => None,
            FieldFormat::Integer => raw.trim().parse().ok().map(Self::Integer),
            FieldFormat::Boolean => parse_bool(raw).map(Self::Boolean),
            FieldFormat::Date => NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
                .ok()
                .map(Self::Date),
            FieldFormat::SingleReference | FieldFormat::MultiReference => {
                Some(Self::Reference(raw.to_string()))
            }
        }
    }

    /// Display form: booleans as "Yes"/"No", dates as `YYYY-MM-DD`.
    pub fn formatted(&self) -> String {
        match self {
            Self::Text(s) | Self::Reference(s) => s.clone(),
            Self::Integer(i) => i.to_string(),
            Self::Boolean(true) => "Yes".to_string(),
            Self::Boolean(false) => "No".to_string(),
            Self::Date(d) => d.format("%Y-%m-%d").to_string(),
        }
    }
}

/// Accepted spellings of a boolean raw value.
fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim() {
        "1" | "t" | "true" => Some(true),
        "0" | "f" | "false" => Some(false),
        _ => None,
    }
}
