//! Commands behind the `fieldstack` binary.
//!
//! Each command takes an open [`SqliteStore`] and returns JSON, so the
//! binary only parses arguments and prints.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use fieldstack_engine::{CustomizableRecord, EngineConfig, EngineError, SaveOutcome, Session};
use fieldstack_model::{form_schema, FieldDefinition, FieldError};
use fieldstack_storage::{DefinitionProvider, SqliteStore};
use fieldstack_types::OwnerId;
use serde_json::{json, Map, Value};
use tracing::info;

/// Result of a command that saves a record.
#[derive(Debug)]
pub enum SaveReport {
    Saved { id: OwnerId, outcome: SaveOutcome },
    /// Validation failed; nothing was written.
    Invalid(Vec<FieldError>),
}

impl SaveReport {
    pub fn to_json(&self) -> Value {
        match self {
            Self::Saved { id, outcome } => json!({
                "id": id.to_string(),
                "created": outcome.created,
                "inserted": outcome.inserted,
                "deleted": outcome.deleted,
                "touched": outcome.touched,
            }),
            Self::Invalid(errors) => json!({ "errors": errors }),
        }
    }
}

/// Reads an engine configuration file, or the defaults without one.
pub fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    let Some(path) = path else {
        return Ok(EngineConfig::default());
    };
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    EngineConfig::from_json_str(&text).context("Failed to parse config file")
}

/// Parses a JSON argument.
pub fn parse_json(text: &str, what: &str) -> Result<Value> {
    serde_json::from_str(text).with_context(|| format!("Invalid JSON for {what}"))
}

/// Stores the definitions of a JSON array file. Returns how many were stored.
pub fn load_fields(store: &SqliteStore, path: &Path) -> Result<usize> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read field file {}", path.display()))?;
    let defs: Vec<FieldDefinition> =
        serde_json::from_str(&text).context("Field file must hold an array of definitions")?;
    for def in &defs {
        store
            .put_definition(def)
            .with_context(|| format!("Failed to store field {}", def.id))?;
    }
    info!("Loaded {} field definitions", defs.len());
    Ok(defs.len())
}

/// The field definitions of an entity type.
pub fn fields(store: &SqliteStore, entity_type: &str) -> Result<Value> {
    let defs = store.definitions_for(entity_type)?;
    Ok(serde_json::to_value(defs)?)
}

/// The form field list of an entity type.
pub fn schema(store: &SqliteStore, entity_type: &str) -> Result<Value> {
    let defs = store.definitions_for(entity_type)?;
    Ok(serde_json::to_value(form_schema(&defs))?)
}

/// A record with its raw and formatted custom values.
pub fn show(store: &SqliteStore, config: EngineConfig, id: &str) -> Result<Value> {
    let id = OwnerId::parse(id).with_context(|| format!("Invalid record id {id:?}"))?;
    let mut session = Session::with_config(store, config);
    let mut rec = session.find(&id)?;

    let values = session.custom_value_attributes(&mut rec)?;
    let defs = session.definitions_for(rec.entity_type())?;
    let mut formatted = Map::new();
    for def in defs.iter() {
        if let Some(text) = session.formatted_custom_value_for(&mut rec, def.id)? {
            formatted.insert(def.name.clone(), Value::String(text));
        }
    }

    Ok(json!({
        "id": id.to_string(),
        "entity_type": rec.entity_type(),
        "data": rec.record().data,
        "created_at": rec.record().created_at,
        "updated_at": rec.record().updated_at,
        "custom_values": values,
        "formatted": formatted,
    }))
}

/// Creates a record of `entity_type` with own columns and custom values.
pub fn create(
    store: &SqliteStore,
    config: EngineConfig,
    entity_type: &str,
    data: Value,
    values: &Value,
) -> Result<SaveReport> {
    let mut session = Session::with_config(store, config);
    let mut rec = session.build(entity_type, data);
    assign(&mut session, &mut rec, values)?;
    finish(session.save(&mut rec), rec.id())
}

/// Assigns custom values to an existing record and saves it.
pub fn set(store: &SqliteStore, config: EngineConfig, id: &str, values: &Value) -> Result<SaveReport> {
    let id = OwnerId::parse(id).with_context(|| format!("Invalid record id {id:?}"))?;
    let mut session = Session::with_config(store, config);
    let mut rec = session.find(&id)?;
    assign(&mut session, &mut rec, values)?;
    finish(session.save(&mut rec), id)
}

/// Accepts both the mapping form and the legacy list form.
fn assign(
    session: &mut Session<'_, SqliteStore>,
    rec: &mut CustomizableRecord,
    values: &Value,
) -> Result<()> {
    if values.is_array() {
        session.assign_legacy(rec, values)?;
    } else {
        session.assign_json(rec, values)?;
    }
    Ok(())
}

fn finish(result: Result<SaveOutcome, EngineError>, id: OwnerId) -> Result<SaveReport> {
    match result {
        Ok(outcome) => Ok(SaveReport::Saved { id, outcome }),
        Err(EngineError::Invalid(errors)) => Ok(SaveReport::Invalid(errors)),
        Err(e) => Err(e).context("Failed to save record"),
    }
}
