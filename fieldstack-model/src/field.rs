use fieldstack_types::FieldId;
use serde::{Deserialize, Serialize};

use crate::value::TypedValue;

/// Prefix of generated accessor names: field 42 is read through
/// `custom_field_42` and written through `custom_field_42=`.
pub const ACCESSOR_PREFIX: &str = "custom_field_";

/// An admin-defined attribute attachable to records of one entity type.
///
/// Definitions are read-only to the engine; creating or editing them is
/// the job of schema administration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDefinition {
    pub id: FieldId,
    /// Name of the entity type this field applies to (e.g. "work_package").
    pub entity_type: String,
    /// Human-readable label.
    pub name: String,
    pub format: FieldFormat,
    #[serde(default)]
    pub multi_value: bool,
    /// Raw value staged for new records that never assigned this field.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
    /// Sort key; definitions are always handed out ordered by position.
    #[serde(default)]
    pub position: i32,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
    /// Pattern a text value must match.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regexp: Option<String>,
    #[serde(default = "default_visible")]
    pub visible: bool,
}

fn default_visible() -> bool {
    true
}

impl FieldDefinition {
    fn simple(id: u64, entity_type: &str, name: &str, format: FieldFormat) -> Self {
        Self {
            id: FieldId::new(id),
            entity_type: entity_type.into(),
            name: name.into(),
            format,
            multi_value: format == FieldFormat::MultiReference,
            default_value: None,
            position: 0,
            required: false,
            min_length: None,
            max_length: None,
            regexp: None,
            visible: true,
        }
    }

    /// Shorthand for a plain text field.
    pub fn text(id: u64, entity_type: &str, name: &str) -> Self {
        Self::simple(id, entity_type, name, FieldFormat::Text)
    }

    /// Shorthand for an integer field.
    pub fn integer(id: u64, entity_type: &str, name: &str) -> Self {
        Self::simple(id, entity_type, name, FieldFormat::Integer)
    }

    /// Shorthand for a boolean field.
    pub fn boolean(id: u64, entity_type: &str, name: &str) -> Self {
        Self::simple(id, entity_type, name, FieldFormat::Boolean)
    }

    /// Shorthand for a date field.
    pub fn date(id: u64, entity_type: &str, name: &str) -> Self {
        Self::simple(id, entity_type, name, FieldFormat::Date)
    }

    /// Shorthand for a rich (formattable) text field.
    pub fn formattable(id: u64, entity_type: &str, name: &str) -> Self {
        Self::simple(id, entity_type, name, FieldFormat::FormattableText)
    }

    /// Shorthand for a field referencing one other object.
    pub fn single_reference(id: u64, entity_type: &str, name: &str) -> Self {
        Self::simple(id, entity_type, name, FieldFormat::SingleReference)
    }

    /// Shorthand for a field referencing any number of other objects.
    /// Always multi-valued.
    pub fn multi_reference(id: u64, entity_type: &str, name: &str) -> Self {
        Self::simple(id, entity_type, name, FieldFormat::MultiReference)
    }

    #[must_use]
    pub fn with_default(mut self, value: impl Into<String>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    #[must_use]
    pub fn with_position(mut self, position: i32) -> Self {
        self.position = position;
        self
    }

    #[must_use]
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    #[must_use]
    pub fn with_length(mut self, min: Option<usize>, max: Option<usize>) -> Self {
        self.min_length = min;
        self.max_length = max;
        self
    }

    #[must_use]
    pub fn with_regexp(mut self, pattern: impl Into<String>) -> Self {
        self.regexp = Some(pattern.into());
        self
    }

    /// Allows more than one simultaneous value per record.
    #[must_use]
    pub fn multi(mut self) -> Self {
        self.multi_value = true;
        self
    }

    #[must_use]
    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    /// True if a record may hold several live values for this field.
    pub fn is_multi_value(&self) -> bool {
        self.multi_value || self.format == FieldFormat::MultiReference
    }

    /// Name of the getter for this field, e.g. `custom_field_42`.
    pub fn accessor_name(&self) -> String {
        format!("{ACCESSOR_PREFIX}{}", self.id)
    }

    /// Name of the setter for this field, e.g. `custom_field_42=`.
    pub fn setter_name(&self) -> String {
        format!("{}=", self.accessor_name())
    }

    /// Converts a raw stored value into this field's typed form.
    pub fn typed_value(&self, raw: Option<&str>) -> Option<TypedValue> {
        TypedValue::parse(self.format, raw?)
    }
}

/// The data type of a custom field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldFormat {
    Text,
    Integer,
    Boolean,
    Date,
    FormattableText,
    SingleReference,
    MultiReference,
}

impl FieldFormat {
    /// True for formats whose raw values are identities of other objects.
    pub fn is_reference(&self) -> bool {
        matches!(self, Self::SingleReference | Self::MultiReference)
    }

    /// True for formats validated against length and pattern constraints.
    pub fn is_textual(&self) -> bool {
        matches!(self, Self::Text | Self::FormattableText)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Integer => "integer",
            Self::Boolean => "boolean",
            Self::Date => "date",
            Self::FormattableText => "formattable_text",
            Self::SingleReference => "single_reference",
            Self::MultiReference => "multi_reference",
        }
    }

    /// Parses the snake_case name used in storage and JSON.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "text" => Some(Self::Text),
            "integer" => Some(Self::Integer),
            "boolean" => Some(Self::Boolean),
            "date" => Some(Self::Date),
            "formattable_text" => Some(Self::FormattableText),
            "single_reference" => Some(Self::SingleReference),
            "multi_reference" => Some(Self::MultiReference),
            _ => None,
        }
    }
}
