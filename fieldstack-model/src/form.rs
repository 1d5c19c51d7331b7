use serde::{Deserialize, Serialize};

use crate::field::{FieldDefinition, FieldFormat};

/// The form control a renderer should use for a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputKind {
    TextInput,
    IntegerInput,
    BooleanInput,
    DateInput,
    FormattableInput,
    SelectInput,
}

impl From<FieldFormat> for InputKind {
    fn from(format: FieldFormat) -> Self {
        match format {
            FieldFormat::Text => Self::TextInput,
            FieldFormat::Integer => Self::IntegerInput,
            FieldFormat::Boolean => Self::BooleanInput,
            FieldFormat::Date => Self::DateInput,
            FieldFormat::FormattableText => Self::FormattableInput,
            FieldFormat::SingleReference | FieldFormat::MultiReference => Self::SelectInput,
        }
    }
}

/// One entry of the field list handed to a form renderer.
///
/// The renderer produces a value mapping keyed by `key`, which the
/// accessor registry accepts as a setter name once `=` is appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormFieldSchema {
    /// Accessor name, e.g. `custom_field_42`.
    pub key: String,
    pub label: String,
    pub field_type: FieldFormat,
    pub input: InputKind,
    pub required: bool,
    pub multiple: bool,
    pub writable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
}

impl From<&FieldDefinition> for FormFieldSchema {
    fn from(def: &FieldDefinition) -> Self {
        Self {
            key: def.accessor_name(),
            label: def.name.clone(),
            field_type: def.format,
            input: def.format.into(),
            required: def.required,
            multiple: def.is_multi_value(),
            writable: true,
            default_value: def.default_value.clone(),
        }
    }
}

/// Builds the form schema for the visible definitions, in position order.
pub fn form_schema(definitions: &[FieldDefinition]) -> Vec<FormFieldSchema> {
    let mut visible: Vec<&FieldDefinition> = definitions.iter().filter(|d| d.visible).collect();
    visible.sort_by_key(|d| (d.position, d.id));
    visible.into_iter().map(FormFieldSchema::from).collect()
}
