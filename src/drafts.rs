//! Durable local store for playground drafts.
//!
//! Anonymous sessions persist generated entities here instead of the
//! backend. The store lives at `~/.gtmos/playground.db` and keeps the
//! key/value layout of the original client storage: one JSON text record
//! per draft under `draft_<entityType>_<tempId>`, plus a manifest record
//! under `draft_entities_list`. A draft's `data` field is the normalized
//! entity, field-for-field identical to what the server path produces, so
//! callers cannot tell a draft from a persisted entity except by the
//! `temp_` id prefix.
//!
//! Reads self-heal: a manifest entry whose record is missing or corrupt is
//! dropped, and the corrupt record deleted, rather than surfaced as an
//! error.

use std::path::PathBuf;

use chrono::Utc;
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::entity::{generate_temp_id, EntityType};

/// Manifest key listing every draft in the store.
pub const MANIFEST_KEY: &str = "draft_entities_list";

/// Drafts older than this are swept at open.
pub const DEFAULT_DRAFT_TTL_DAYS: i64 = 7;

/// Errors specific to the draft store.
#[derive(Debug, Error)]
pub enum DraftError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Home directory not found")]
    HomeDirNotFound,

    #[error("Failed to create store directory: {0}")]
    CreateDir(std::io::Error),

    #[error("Serialize error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// A draft entity awaiting either sign-up migration or expiry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Draft {
    pub temp_id: String,
    pub entity_type: EntityType,
    /// Normalized entity, same shape as the server path produces.
    pub data: Value,
    pub created_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ManifestEntry {
    temp_id: String,
    entity_type: EntityType,
}

pub struct DraftStore {
    conn: Mutex<Connection>,
}

impl DraftStore {
    /// Open (or create) the store at `~/.gtmos/playground.db`.
    pub fn open() -> Result<Self, DraftError> {
        Self::open_at(Self::default_path()?)
    }

    /// Open a store at an explicit path. Useful for testing.
    pub fn open_at(path: PathBuf) -> Result<Self, DraftError> {
        Self::open_with_ttl(path, DEFAULT_DRAFT_TTL_DAYS)
    }

    /// Resolve the default store path: `~/.gtmos/playground.db`.
    pub fn default_path() -> Result<PathBuf, DraftError> {
        let home = dirs::home_dir().ok_or(DraftError::HomeDirNotFound)?;
        Ok(home.join(".gtmos").join("playground.db"))
    }

    /// Open a store with an explicit expiry window for the sweep at open.
    pub fn open_with_ttl(path: PathBuf, ttl_days: i64) -> Result<Self, DraftError> {
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                std::fs::create_dir_all(parent).map_err(DraftError::CreateDir)?;
            }
        }

        let conn = Connection::open(&path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS draft_records (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );",
        )?;

        let store = Self {
            conn: Mutex::new(conn),
        };

        // Expired-draft sweep runs at every open. Best effort, like the
        // other startup repairs: a failed sweep never blocks the session.
        match store.cleanup_old_drafts(ttl_days) {
            Ok(0) => {}
            Ok(n) => log::info!("swept {n} expired playground draft(s)"),
            Err(e) => log::warn!("draft sweep failed: {e}"),
        }

        Ok(store)
    }

    fn record_key(entity_type: EntityType, temp_id: &str) -> String {
        format!("draft_{}_{}", entity_type.as_str(), temp_id)
    }

    // =========================================================================
    // Raw key/value access
    // =========================================================================

    fn get_raw(&self, key: &str) -> Result<Option<String>, DraftError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare("SELECT value FROM draft_records WHERE key = ?1")?;
        let row = stmt
            .query_row(params![key], |r| r.get::<_, String>(0))
            .optional()?;
        Ok(row)
    }

    fn put_raw(&self, key: &str, value: &str) -> Result<(), DraftError> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO draft_records (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value],
        )?;
        Ok(())
    }

    fn delete_raw(&self, key: &str) -> Result<(), DraftError> {
        let conn = self.conn.lock();
        conn.execute("DELETE FROM draft_records WHERE key = ?1", params![key])?;
        Ok(())
    }

    // =========================================================================
    // Manifest
    // =========================================================================

    fn read_manifest(&self) -> Result<Vec<ManifestEntry>, DraftError> {
        let Some(text) = self.get_raw(MANIFEST_KEY)? else {
            return Ok(Vec::new());
        };
        match serde_json::from_str(&text) {
            Ok(entries) => Ok(entries),
            Err(e) => {
                log::warn!("resetting corrupt draft manifest: {e}");
                self.delete_raw(MANIFEST_KEY)?;
                Ok(Vec::new())
            }
        }
    }

    fn write_manifest(&self, entries: &[ManifestEntry]) -> Result<(), DraftError> {
        self.put_raw(MANIFEST_KEY, &serde_json::to_string(entries)?)
    }

    fn prune_manifest_entry(&self, temp_id: &str) -> Result<(), DraftError> {
        let mut entries = self.read_manifest()?;
        let before = entries.len();
        entries.retain(|e| e.temp_id != temp_id);
        if entries.len() != before {
            self.write_manifest(&entries)?;
        }
        Ok(())
    }

    // =========================================================================
    // Draft operations
    // =========================================================================

    /// Persist a draft under a freshly generated temp id. Returns the id.
    pub fn save_draft(
        &self,
        entity_type: EntityType,
        data: &Value,
        parent_id: Option<&str>,
    ) -> Result<String, DraftError> {
        let temp_id = generate_temp_id(entity_type);
        self.save_draft_with_id(&temp_id, entity_type, data, parent_id)?;
        Ok(temp_id)
    }

    /// Persist a draft under a caller-generated temp id (the playground
    /// create path generates the id before synthesizing the record).
    pub fn save_draft_with_id(
        &self,
        temp_id: &str,
        entity_type: EntityType,
        data: &Value,
        parent_id: Option<&str>,
    ) -> Result<(), DraftError> {
        let draft = Draft {
            temp_id: temp_id.to_string(),
            entity_type,
            data: data.clone(),
            created_at: Utc::now().to_rfc3339(),
            parent_id: parent_id.map(str::to_string),
        };
        self.put_raw(
            &Self::record_key(entity_type, temp_id),
            &serde_json::to_string(&draft)?,
        )?;

        let mut entries = self.read_manifest()?;
        if !entries.iter().any(|e| e.temp_id == temp_id) {
            entries.push(ManifestEntry {
                temp_id: temp_id.to_string(),
                entity_type,
            });
            self.write_manifest(&entries)?;
        }
        Ok(())
    }

    /// Read one draft. A missing or corrupt record self-heals to `None`.
    pub fn get_draft(
        &self,
        entity_type: EntityType,
        temp_id: &str,
    ) -> Result<Option<Draft>, DraftError> {
        let key = Self::record_key(entity_type, temp_id);
        let Some(text) = self.get_raw(&key)? else {
            self.prune_manifest_entry(temp_id)?;
            return Ok(None);
        };
        match serde_json::from_str::<Draft>(&text) {
            Ok(draft) => Ok(Some(draft)),
            Err(e) => {
                log::warn!("removing corrupt draft record {key}: {e}");
                self.delete_raw(&key)?;
                self.prune_manifest_entry(temp_id)?;
                Ok(None)
            }
        }
    }

    /// All drafts of a type, newest first.
    pub fn get_drafts(&self, entity_type: EntityType) -> Result<Vec<Draft>, DraftError> {
        let entries = self.read_manifest()?;
        let mut drafts = Vec::new();
        for entry in entries.iter().filter(|e| e.entity_type == entity_type) {
            if let Some(draft) = self.get_draft(entity_type, &entry.temp_id)? {
                drafts.push(draft);
            }
        }
        drafts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(drafts)
    }

    /// Drafts of a type under a given parent, newest first.
    pub fn get_drafts_by_parent(
        &self,
        entity_type: EntityType,
        parent_id: &str,
    ) -> Result<Vec<Draft>, DraftError> {
        let mut drafts = self.get_drafts(entity_type)?;
        drafts.retain(|d| d.parent_id.as_deref() == Some(parent_id));
        Ok(drafts)
    }

    /// Delete a draft and its manifest entry.
    pub fn remove_draft(
        &self,
        entity_type: EntityType,
        temp_id: &str,
    ) -> Result<(), DraftError> {
        self.delete_raw(&Self::record_key(entity_type, temp_id))?;
        self.prune_manifest_entry(temp_id)
    }

    /// Merge `updates` over the draft's data (shallow, updates win).
    /// Returns `false` if the draft does not exist.
    pub fn update_draft_preserve_fields(
        &self,
        entity_type: EntityType,
        temp_id: &str,
        updates: &serde_json::Map<String, Value>,
    ) -> Result<bool, DraftError> {
        let Some(mut draft) = self.get_draft(entity_type, temp_id)? else {
            return Ok(false);
        };

        match draft.data.as_object_mut() {
            Some(data) => {
                for (key, value) in updates {
                    data.insert(key.clone(), value.clone());
                }
            }
            None => {
                draft.data = Value::Object(updates.clone());
            }
        }

        self.put_raw(
            &Self::record_key(entity_type, temp_id),
            &serde_json::to_string(&draft)?,
        )?;
        Ok(true)
    }

    /// Delete drafts older than `days_old` days. Returns how many were
    /// removed.
    pub fn cleanup_old_drafts(&self, days_old: i64) -> Result<usize, DraftError> {
        let cutoff = Utc::now() - chrono::Duration::days(days_old);
        let mut removed = 0;
        for entry in self.read_manifest()? {
            let Some(draft) = self.get_draft(entry.entity_type, &entry.temp_id)? else {
                continue;
            };
            let expired = chrono::DateTime::parse_from_rfc3339(&draft.created_at)
                .map(|t| t < cutoff)
                .unwrap_or(true);
            if expired {
                self.remove_draft(entry.entity_type, &entry.temp_id)?;
                removed += 1;
            }
        }
        Ok(removed)
    }

    /// Delete every draft of every type. Runs on auth transitions.
    pub fn clear_all_drafts(&self) -> Result<(), DraftError> {
        let conn = self.conn.lock();
        conn.execute("DELETE FROM draft_records", [])?;
        Ok(())
    }
}
