use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Why a value failed validation.
///
/// The snake_case names are what a presentation layer keys its localized
/// messages on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Blank,
    TooShort,
    TooLong,
    Invalid,
    NotAnInteger,
    NotADate,
    Inclusion,
    DoesNotExist,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Blank => "blank",
            Self::TooShort => "too_short",
            Self::TooLong => "too_long",
            Self::Invalid => "invalid",
            Self::NotAnInteger => "not_an_integer",
            Self::NotADate => "not_a_date",
            Self::Inclusion => "inclusion",
            Self::DoesNotExist => "does_not_exist",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One validation failure, keyed by the attribute it belongs to.
///
/// For custom fields `field` is the accessor name (`custom_field_42`).
/// `params` carries the validator's detail parameters verbatim, e.g.
/// `{"count": 10}` for `too_long`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub kind: ErrorKind,
    #[serde(default)]
    pub params: BTreeMap<String, serde_json::Value>,
}

impl FieldError {
    pub fn new(field: impl Into<String>, kind: ErrorKind) -> Self {
        Self {
            field: field.into(),
            kind,
            params: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_param(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.params.insert(key.to_string(), value.into());
        self
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.field, self.kind)?;
        if !self.params.is_empty() {
            let params: Vec<String> = self.params.iter().map(|(k, v)| format!("{k}={v}")).collect();
            write!(f, " ({})", params.join(", "))?;
        }
        Ok(())
    }
}

/// The error surface of one record: every failure from its own
/// validation and from its custom values, in the order they were added.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Errors {
    entries: Vec<FieldError>,
}

impl Errors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an error without parameters.
    pub fn add(&mut self, field: impl Into<String>, kind: ErrorKind) {
        self.entries.push(FieldError::new(field, kind));
    }

    pub fn push(&mut self, error: FieldError) {
        self.entries.push(error);
    }

    /// Errors recorded for one attribute.
    pub fn on<'a>(&'a self, field: &'a str) -> impl Iterator<Item = &'a FieldError> + 'a {
        self.entries.iter().filter(move |e| e.field == field)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldError> {
        self.entries.iter()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn to_vec(&self) -> Vec<FieldError> {
        self.entries.clone()
    }
}

impl Extend<FieldError> for Errors {
    fn extend<I: IntoIterator<Item = FieldError>>(&mut self, iter: I) {
        self.entries.extend(iter);
    }
}
