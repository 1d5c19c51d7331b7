//! Custom field model for fieldstack.
//!
//! Defines the types every other crate in the workspace speaks:
//! - [`FieldDefinition`] / [`FieldFormat`]: an admin-defined attribute
//!   attachable to records of one entity type
//! - [`AttributeValue`]: one stored (field, raw value) pair of a record
//! - [`TypedValue`]: a raw value converted according to its field format
//! - [`Record`]: the owning entity (id, type, JSON columns, timestamps)
//! - [`FieldError`] / [`Errors`]: validation results keyed by accessor name
//! - [`DesiredValues`]: an inbound value assignment
//! - [`RecordValidator`] / [`ReferenceResolver`]: host validation hooks
//! - [`FormFieldSchema`]: the field list a form renderer consumes

mod error;
mod field;
mod form;
mod handler;
mod input;
mod record;
mod value;

pub use error::{ErrorKind, Errors, FieldError};
pub use field::{FieldDefinition, FieldFormat, ACCESSOR_PREFIX};
pub use form::{form_schema, FormFieldSchema, InputKind};
pub use handler::{AcceptAll, RecordValidator, ReferenceResolver};
pub use input::{DesiredValues, FieldKey, Identified, RawValue};
pub use record::Record;
pub use value::{AttributeValue, TypedValue};
