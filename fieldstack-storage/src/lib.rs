//! Storage collaborators for fieldstack.
//!
//! The engine never talks to a database directly. It needs two things
//! from storage:
//!
//! - a [`DefinitionProvider`] answering which field definitions apply to
//!   an entity type, and
//! - an [`AttributeStore`] that loads records and their attribute values
//!   and commits a [`ChangeSet`] atomically.
//!
//! Two implementations ship with the crate:
//!
//! - [`MemoryStore`]: process-local maps, used by tests and embedding hosts
//! - [`SqliteStore`]: a SQLite file (or in-memory database) via rusqlite
//!
//! # Commit contract
//!
//! A change set holds the owner row write, the value rows to insert, the
//! value rows to delete and an optional touch of the owner's
//! `updated_at`. Either all of it becomes visible or none of it does.

mod error;
mod memory;
mod sqlite;

pub use error::{StorageError, StorageResult};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use fieldstack_model::{AttributeValue, FieldDefinition, Record};
use fieldstack_types::{OwnerId, Timestamp, ValueId};

/// Source of field definitions.
pub trait DefinitionProvider {
    /// Definitions applying to `entity_type`, ordered by position then id.
    /// An unknown type yields an empty list.
    fn definitions_for(&self, entity_type: &str) -> StorageResult<Vec<FieldDefinition>>;
}

/// Transactional store of records and their attribute values.
pub trait AttributeStore: DefinitionProvider {
    /// Loads a record by id.
    fn load_record(&self, id: &OwnerId) -> StorageResult<Option<Record>>;

    /// Loads all attribute values of an owner in the order they were
    /// first persisted.
    fn load_values(&self, owner: &OwnerId) -> StorageResult<Vec<AttributeValue>>;

    /// Applies `changes` in a single transaction.
    fn commit(&self, changes: &ChangeSet) -> StorageResult<()>;
}

/// Everything one save writes, applied all-or-nothing.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeSet {
    pub owner_id: OwnerId,
    /// The owner row to insert or replace; `None` if its columns are unchanged.
    pub owner: Option<Record>,
    /// New value rows, with `id` and `owner_id` already assigned.
    pub inserts: Vec<AttributeValue>,
    /// Persisted value rows to delete.
    pub deletes: Vec<ValueId>,
    /// New `updated_at` for an owner whose columns did not change.
    pub touch: Option<Timestamp>,
}

impl ChangeSet {
    pub fn new(owner_id: OwnerId) -> Self {
        Self {
            owner_id,
            owner: None,
            inserts: Vec::new(),
            deletes: Vec::new(),
            touch: None,
        }
    }

    /// True if committing would write nothing.
    pub fn is_empty(&self) -> bool {
        self.owner.is_none() && self.inserts.is_empty() && self.deletes.is_empty() && self.touch.is_none()
    }
}

/// Sorts definitions the way every provider must hand them out.
pub(crate) fn sort_definitions(definitions: &mut [FieldDefinition]) {
    definitions.sort_by_key(|d| (d.position, d.id));
}
