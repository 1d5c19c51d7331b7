//! Validation of live custom values against their field definitions.

use std::collections::HashMap;

use fieldstack_model::{ErrorKind, FieldDefinition, FieldError, FieldFormat, ReferenceResolver, TypedValue};
use regex_lite::Regex;
use tracing::warn;

use crate::values::ValueStore;

/// Checks every live value of a record and reports failures keyed by the
/// field's accessor name. Rows marked for removal are never checked.
pub struct ValidationBridge<'a> {
    definitions: &'a [FieldDefinition],
    resolver: Option<&'a dyn ReferenceResolver>,
}

impl<'a> ValidationBridge<'a> {
    pub fn new(definitions: &'a [FieldDefinition]) -> Self {
        Self {
            definitions,
            resolver: None,
        }
    }

    /// Checks reference values for existence through `resolver`.
    #[must_use]
    pub fn with_resolver(mut self, resolver: &'a dyn ReferenceResolver) -> Self {
        self.resolver = Some(resolver);
        self
    }

    pub fn validate(&self, store: &ValueStore) -> Vec<FieldError> {
        let mut patterns: HashMap<&str, Option<Regex>> = HashMap::new();
        let mut errors = Vec::new();

        for def in self.definitions {
            let field = def.accessor_name();
            let present: Vec<&str> = store
                .current_values(def.id)
                .filter_map(|v| v.value.as_deref())
                .filter(|v| !v.trim().is_empty())
                .collect();

            if present.is_empty() {
                if def.required {
                    errors.push(FieldError::new(&field, ErrorKind::Blank));
                }
                continue;
            }

            for raw in present {
                if let Some(error) = self.check_value(def, &field, raw, &mut patterns) {
                    errors.push(error);
                }
            }
        }
        errors
    }

    fn check_value<'p>(
        &self,
        def: &'p FieldDefinition,
        field: &str,
        raw: &str,
        patterns: &mut HashMap<&'p str, Option<Regex>>,
    ) -> Option<FieldError> {
        if def.format.is_textual() {
            return Self::check_text(def, field, raw, patterns);
        }
        if def.format.is_reference() {
            let resolver = self.resolver?;
            return (!resolver.exists(def, raw))
                .then(|| FieldError::new(field, ErrorKind::DoesNotExist).with_param("value", raw));
        }
        let (ok, kind) = match def.format {
            FieldFormat::Integer => (raw.trim().parse::<i64>().is_ok(), ErrorKind::NotAnInteger),
            FieldFormat::Boolean => (TypedValue::parse(def.format, raw).is_some(), ErrorKind::Inclusion),
            FieldFormat::Date => (TypedValue::parse(def.format, raw).is_some(), ErrorKind::NotADate),
            _ => return None,
        };
        (!ok).then(|| FieldError::new(field, kind))
    }

    /// Length limits, then the field's pattern.
    fn check_text<'p>(
        def: &'p FieldDefinition,
        field: &str,
        raw: &str,
        patterns: &mut HashMap<&'p str, Option<Regex>>,
    ) -> Option<FieldError> {
        let len = raw.chars().count();
        if let Some(min) = def.min_length.filter(|min| len < *min) {
            return Some(FieldError::new(field, ErrorKind::TooShort).with_param("count", min));
        }
        if let Some(max) = def.max_length.filter(|max| len > *max) {
            return Some(FieldError::new(field, ErrorKind::TooLong).with_param("count", max));
        }
        let pattern = def.regexp.as_deref().filter(|p| !p.is_empty())?;
        let regex = patterns
            .entry(pattern)
            .or_insert_with(|| compile(def, pattern))
            .as_ref()?;
        (!regex.is_match(raw)).then(|| FieldError::new(field, ErrorKind::Invalid))
    }
}

fn compile(def: &FieldDefinition, pattern: &str) -> Option<Regex> {
    match Regex::new(pattern) {
        Ok(regex) => Some(regex),
        Err(e) => {
            warn!("Skipping invalid pattern for field {}: {}", def.id, e);
            None
        }
    }
}
