use crate::{Errors, FieldDefinition, Record};

/// Optional hook for validating a record's own columns.
///
/// Runs on every save before custom values are validated; anything it
/// adds to `errors` aborts the save just like a custom value failure.
pub trait RecordValidator: Send + Sync {
    fn validate(&self, record: &Record, errors: &mut Errors) {
        let _ = (record, errors);
    }
}

/// Answers whether the object a reference-valued field points at exists.
///
/// The default implementation accepts every identity.
pub trait ReferenceResolver: Send + Sync {
    fn exists(&self, field: &FieldDefinition, identity: &str) -> bool {
        let _ = (field, identity);
        true
    }
}

/// Validator and resolver that accept everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAll;

impl RecordValidator for AcceptAll {}

impl ReferenceResolver for AcceptAll {}
