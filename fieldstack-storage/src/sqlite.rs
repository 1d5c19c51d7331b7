//! SQLite attribute store.
//!
//! Field definitions, records and custom values live in three tables of
//! one database file. Commits run inside a rusqlite transaction.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use fieldstack_model::{AttributeValue, FieldDefinition, FieldFormat, Record};
use fieldstack_types::{FieldId, OwnerId, Timestamp, ValueId};
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::{debug, info};

use crate::{sort_definitions, AttributeStore, ChangeSet, DefinitionProvider, StorageError, StorageResult};

/// Attribute store backed by SQLite.
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Opens (or creates) a store at the given path.
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let conn = Connection::open(path.as_ref())?;
        info!("Opened attribute store at {}", path.as_ref().display());
        Self::init(conn)
    }

    /// Opens an in-memory store (for testing).
    pub fn open_in_memory() -> StorageResult<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> StorageResult<Self> {
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn conn(&self) -> StorageResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StorageError::LockPoisoned)
    }

    fn init_schema(&self) -> StorageResult<()> {
        let conn = self.conn()?;
        conn.execute_batch(
            "
            PRAGMA foreign_keys = ON;

            CREATE TABLE IF NOT EXISTS custom_fields (
                id INTEGER PRIMARY KEY,
                entity_type TEXT NOT NULL,
                name TEXT NOT NULL,
                format TEXT NOT NULL,
                multi_value INTEGER NOT NULL DEFAULT 0,
                default_value TEXT,
                position INTEGER NOT NULL DEFAULT 0,
                required INTEGER NOT NULL DEFAULT 0,
                min_length INTEGER,
                max_length INTEGER,
                regexp TEXT,
                visible INTEGER NOT NULL DEFAULT 1
            );

            CREATE TABLE IF NOT EXISTS records (
                id TEXT PRIMARY KEY,
                entity_type TEXT NOT NULL,
                data TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS custom_values (
                id TEXT PRIMARY KEY,
                owner_id TEXT NOT NULL REFERENCES records(id) ON DELETE CASCADE,
                field_id INTEGER NOT NULL,
                value TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_custom_values_owner ON custom_values(owner_id);
            ",
        )?;
        Ok(())
    }

    /// Inserts or replaces a field definition.
    pub fn put_definition(&self, def: &FieldDefinition) -> StorageResult<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT OR REPLACE INTO custom_fields
                (id, entity_type, name, format, multi_value, default_value, position,
                 required, min_length, max_length, regexp, visible)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            params![
                def.id.get() as i64,
                def.entity_type,
                def.name,
                def.format.as_str(),
                def.multi_value,
                def.default_value,
                def.position,
                def.required,
                def.min_length.map(|n| n as i64),
                def.max_length.map(|n| n as i64),
                def.regexp,
                def.visible,
            ],
        )?;
        Ok(())
    }

    /// Inserts a raw value row as-is, bypassing the engine.
    pub fn put_value(&self, value: &AttributeValue) -> StorageResult<()> {
        let (Some(id), Some(owner)) = (value.id, value.owner_id) else {
            return Err(StorageError::InvalidData(
                "raw value rows need an id and an owner".into(),
            ));
        };
        let conn = self.conn()?;
        insert_value(&conn, id, owner, value)?;
        Ok(())
    }

    /// Number of stored value rows for an owner.
    pub fn value_count(&self, owner: &OwnerId) -> StorageResult<usize> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM custom_values WHERE owner_id = ?1",
            params![owner.to_string()],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }
}

fn insert_value(
    conn: &Connection,
    id: ValueId,
    owner: OwnerId,
    value: &AttributeValue,
) -> rusqlite::Result<usize> {
    conn.execute(
        "INSERT INTO custom_values (id, owner_id, field_id, value) VALUES (?1, ?2, ?3, ?4)",
        params![
            id.to_string(),
            owner.to_string(),
            value.field_id.get() as i64,
            value.value
        ],
    )
}

fn upsert_record(conn: &Connection, record: &Record) -> StorageResult<()> {
    conn.execute(
        "INSERT INTO records (id, entity_type, data, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT(id) DO UPDATE SET
            entity_type = excluded.entity_type,
            data = excluded.data,
            updated_at = excluded.updated_at",
        params![
            record.id.to_string(),
            record.entity_type,
            serde_json::to_string(&record.data)?,
            record.created_at.as_millis() as i64,
            record.updated_at.as_millis() as i64,
        ],
    )?;
    Ok(())
}

fn definition_from_row(row: &Row<'_>) -> rusqlite::Result<(FieldDefinition, String)> {
    let format: String = row.get(3)?;
    let def = FieldDefinition {
        id: FieldId::new(row.get::<_, i64>(0)? as u64),
        entity_type: row.get(1)?,
        name: row.get(2)?,
        // Replaced below once the format string is validated.
        format: FieldFormat::Text,
        multi_value: row.get(4)?,
        default_value: row.get(5)?,
        position: row.get(6)?,
        required: row.get(7)?,
        min_length: row.get::<_, Option<i64>>(8)?.map(|n| n as usize),
        max_length: row.get::<_, Option<i64>>(9)?.map(|n| n as usize),
        regexp: row.get(10)?,
        visible: row.get(11)?,
    };
    Ok((def, format))
}

impl DefinitionProvider for SqliteStore {
    fn definitions_for(&self, entity_type: &str) -> StorageResult<Vec<FieldDefinition>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, entity_type, name, format, multi_value, default_value, position,
                    required, min_length, max_length, regexp, visible
             FROM custom_fields WHERE entity_type = ?1",
        )?;
        let rows = stmt.query_map(params![entity_type], definition_from_row)?;

        let mut defs = Vec::new();
        for row in rows {
            let (mut def, format) = row?;
            def.format = FieldFormat::parse(&format).ok_or_else(|| {
                StorageError::InvalidData(format!("unknown format {format:?} for field {}", def.id))
            })?;
            if def.format == FieldFormat::MultiReference {
                def.multi_value = true;
            }
            defs.push(def);
        }
        sort_definitions(&mut defs);
        debug!("Loaded {} field definitions for {}", defs.len(), entity_type);
        Ok(defs)
    }
}

impl AttributeStore for SqliteStore {
    fn load_record(&self, id: &OwnerId) -> StorageResult<Option<Record>> {
        let conn = self.conn()?;
        let row = conn
            .query_row(
                "SELECT entity_type, data, created_at, updated_at FROM records WHERE id = ?1",
                params![id.to_string()],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, i64>(2)?,
                        row.get::<_, i64>(3)?,
                    ))
                },
            )
            .optional()?;

        let Some((entity_type, data, created_at, updated_at)) = row else {
            return Ok(None);
        };
        Ok(Some(Record {
            id: *id,
            entity_type,
            data: serde_json::from_str(&data)?,
            created_at: Timestamp::from_millis(created_at as u64),
            updated_at: Timestamp::from_millis(updated_at as u64),
        }))
    }

    fn load_values(&self, owner: &OwnerId) -> StorageResult<Vec<AttributeValue>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, field_id, value FROM custom_values WHERE owner_id = ?1 ORDER BY rowid",
        )?;
        let rows = stmt.query_map(params![owner.to_string()], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, Option<String>>(2)?,
            ))
        })?;

        let mut values = Vec::new();
        for row in rows {
            let (id, field_id, value) = row?;
            let id = ValueId::parse(&id)
                .map_err(|e| StorageError::InvalidData(format!("invalid value id {id:?}: {e}")))?;
            values.push(AttributeValue::persisted(
                id,
                *owner,
                FieldId::new(field_id as u64),
                value,
            ));
        }
        Ok(values)
    }

    fn commit(&self, changes: &ChangeSet) -> StorageResult<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        if let Some(record) = &changes.owner {
            upsert_record(&tx, record)?;
        }
        if let Some(ts) = changes.touch {
            let touched = tx.execute(
                "UPDATE records SET updated_at = ?1 WHERE id = ?2",
                params![ts.as_millis() as i64, changes.owner_id.to_string()],
            )?;
            if touched == 0 {
                return Err(StorageError::NotFound(changes.owner_id.to_string()));
            }
        }
        for id in &changes.deletes {
            tx.execute("DELETE FROM custom_values WHERE id = ?1", params![id.to_string()])?;
        }
        for value in &changes.inserts {
            let (Some(id), Some(owner)) = (value.id, value.owner_id) else {
                return Err(StorageError::InvalidData(format!(
                    "value for field {} is not bound to owner {}",
                    value.field_id, changes.owner_id
                )));
            };
            insert_value(&tx, id, owner, value)?;
        }

        tx.commit()?;
        debug!(
            "Committed owner {} (+{} / -{} values)",
            changes.owner_id,
            changes.inserts.len(),
            changes.deletes.len()
        );
        Ok(())
    }
}
