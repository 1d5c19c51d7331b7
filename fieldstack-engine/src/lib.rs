//! Custom value synchronization engine for fieldstack.
//!
//! This crate keeps the custom attribute values of a record in line with
//! what a caller asks for:
//! - [`FieldDefinitionCache`]: per-operation lookup of field definitions
//! - [`ValueStore`]: the value rows of one record, with staged additions
//!   and removals
//! - [`SyncEngine`]: diff-and-stage reconciliation of desired values
//! - [`ValidationBridge`]: format and constraint checks of live values
//! - [`AccessorRegistry`]: `custom_field_<id>` getters and setters
//! - [`Session`]: ties the above to an [`AttributeStore`] and saves
//!   records with their value changes in one transaction
//!
//! # Example
//!
//! ```ignore
//! let store = MemoryStore::with_definitions([FieldDefinition::text(42, "issue", "Code")]);
//! let mut session = Session::new(&store);
//! let mut issue = session.build("issue", json!({"subject": "Crash"}));
//! session.assign(&mut issue, &DesiredValues::single(42u64, "Alpha"))?;
//! session.save(&mut issue)?;
//! ```
//!
//! [`AttributeStore`]: fieldstack_storage::AttributeStore

mod accessors;
mod cache;
mod config;
mod error;
mod record;
mod session;
mod sync;
mod validation;
mod values;

pub use accessors::{Accessor, AccessorKind, AccessorRegistry, FieldValue};
pub use cache::FieldDefinitionCache;
pub use config::EngineConfig;
pub use error::{EngineError, EngineResult};
pub use record::CustomizableRecord;
pub use session::{SaveOutcome, Session};
pub use sync::{AssignReport, SyncEngine};
pub use validation::ValidationBridge;
pub use values::{ValueGroups, ValueHandle, ValueStore};
