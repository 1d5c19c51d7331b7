//! Per-operation cache of field definitions.

use std::collections::HashMap;
use std::sync::Arc;

use fieldstack_model::FieldDefinition;
use fieldstack_storage::{DefinitionProvider, StorageResult};
use tracing::debug;

/// Resolves which field definitions apply to an entity type, asking the
/// provider at most once per type name.
///
/// One cache lives exactly as long as one logical operation (a request,
/// a batch job). Definitions may change between operations, so a cache
/// must never be reused across them.
#[derive(Debug, Default)]
pub struct FieldDefinitionCache {
    entries: HashMap<String, Arc<[FieldDefinition]>>,
}

impl FieldDefinitionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Definitions for `entity_type`, ordered by position.
    ///
    /// The first call for a type name performs the lookup; later calls
    /// return the same list without touching the provider.
    pub fn definitions_for<P>(
        &mut self,
        provider: &P,
        entity_type: &str,
    ) -> StorageResult<Arc<[FieldDefinition]>>
    where
        P: DefinitionProvider + ?Sized,
    {
        if let Some(defs) = self.entries.get(entity_type) {
            return Ok(Arc::clone(defs));
        }
        let defs: Arc<[FieldDefinition]> = provider.definitions_for(entity_type)?.into();
        debug!("Cached {} field definitions for {}", defs.len(), entity_type);
        self.entries.insert(entity_type.to_string(), Arc::clone(&defs));
        Ok(defs)
    }

    /// Returns the cached list without performing a lookup.
    pub fn cached(&self, entity_type: &str) -> Option<Arc<[FieldDefinition]>> {
        self.entries.get(entity_type).cloned()
    }

    /// Number of entity types resolved so far.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
