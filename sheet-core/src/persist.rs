//! Character persistence over a pluggable [`StorageBackend`].
//!
//! Handles the write path (record plus roster entry), the read path through
//! the migration pipeline, the self-healing roster, JSON export and import,
//! and the one-time move of a legacy single-character record.

use crate::character::{Character, CharacterId, CharacterPreview};
use crate::migrate;
use crate::storage::StorageBackend;
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tokio::fs;
use tracing::{debug, info};

/// Errors from persistence operations.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Storage backend error: {0}")]
    Backend(String),

    #[error("Import failed: {0}")]
    Import(#[from] ImportError),

    #[error("No character is open")]
    NoActiveCharacter,
}

/// Why an imported file was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ImportError {
    #[error("file is not valid JSON: {0}")]
    InvalidJson(String),

    #[error("expected a character object")]
    NotAnObject,

    #[error("character has no name")]
    MissingName,

    #[error("character has no attributes")]
    MissingAttributes,
}

/// Insert or replace the preview with the same id.
pub fn upsert_preview(roster: &mut Vec<CharacterPreview>, preview: CharacterPreview) {
    match roster.iter_mut().find(|p| p.id == preview.id) {
        Some(existing) => *existing = preview,
        None => roster.push(preview),
    }
}

/// Persistence adapter shared by the store.
#[derive(Clone)]
pub struct Persistence {
    backend: Arc<dyn StorageBackend>,
}

impl Persistence {
    pub fn new(backend: Arc<dyn StorageBackend>) -> Self {
        Self { backend }
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Write a character and upsert its roster entry.
    ///
    /// The record is normalized before it is written.
    pub async fn save(&self, character: &Character) -> Result<(), PersistError> {
        let normalized = migrate::normalize(character.clone());
        let record = serde_json::to_value(&normalized)?;
        self.backend.write(&normalized.id, &record).await?;
        debug!(id = %normalized.id, backend = self.backend.name(), "character written");

        if self.backend.keeps_roster() {
            let mut roster = self.roster().await?;
            upsert_preview(&mut roster, normalized.preview());
            self.backend.write_roster(&roster).await?;
        }
        Ok(())
    }

    /// Read a character through the migration pipeline.
    pub async fn load(&self, id: &CharacterId) -> Result<Option<Character>, PersistError> {
        let Some(record) = self.backend.read(id).await? else {
            return Ok(None);
        };
        Ok(migrate::load_value(record))
    }

    /// Remove a character's record and roster entry.
    pub async fn delete(&self, id: &CharacterId) -> Result<(), PersistError> {
        self.backend.remove(id).await?;
        if self.backend.keeps_roster() {
            let mut roster = self.roster().await?;
            roster.retain(|p| p.id != *id);
            self.backend.write_roster(&roster).await?;
        }
        info!(id = %id, "character deleted");
        Ok(())
    }

    /// The roster of previews.
    ///
    /// An empty or missing index is rebuilt from the stored records; when the
    /// backend keeps an index, the rebuilt one is written back.
    pub async fn roster(&self) -> Result<Vec<CharacterPreview>, PersistError> {
        if let Some(roster) = self.backend.read_roster().await? {
            if !roster.is_empty() {
                return Ok(roster);
            }
        }

        let mut rebuilt: Vec<CharacterPreview> = self
            .backend
            .scan()
            .await?
            .into_iter()
            .filter_map(migrate::load_value)
            .map(|c| c.preview())
            .collect();
        rebuilt.sort_by(|a, b| a.name.cmp(&b.name));

        if self.backend.keeps_roster() && !rebuilt.is_empty() {
            info!(count = rebuilt.len(), "rebuilt roster index from stored characters");
            self.backend.write_roster(&rebuilt).await?;
        }
        Ok(rebuilt)
    }

    /// Move a legacy single-character record into the per-id layout.
    ///
    /// Returns the migrated character's id, or `None` when there was nothing
    /// to migrate.
    pub async fn migrate_legacy(&self) -> Result<Option<CharacterId>, PersistError> {
        let Some(record) = self.backend.read_legacy().await? else {
            return Ok(None);
        };
        let Some(character) = migrate::load_value(record) else {
            debug!("legacy record is not a character; leaving it in place");
            return Ok(None);
        };
        self.save(&character).await?;
        self.backend.remove_legacy().await?;
        info!(id = %character.id, name = %character.name, "migrated legacy character");
        Ok(Some(character.id))
    }
}

/// The persisted JSON of a character, pretty printed.
pub fn export_json(character: &Character) -> Result<String, PersistError> {
    let normalized = migrate::normalize(character.clone());
    Ok(serde_json::to_string_pretty(&normalized)?)
}

/// Write [`export_json`] output to `path`.
pub async fn export_to_path(
    character: &Character,
    path: impl AsRef<Path>,
) -> Result<(), PersistError> {
    let content = export_json(character)?;
    fs::write(path, content).await?;
    Ok(())
}

/// Validate and load an imported character.
///
/// The file must hold an object with a non-empty `name` and an `attributes`
/// object. The result is migrated and normalized; it gets a fresh id when it
/// has none or its id is already on the roster.
pub fn parse_import(text: &str, roster: &[CharacterPreview]) -> Result<Character, ImportError> {
    let value: Value =
        serde_json::from_str(text).map_err(|e| ImportError::InvalidJson(e.to_string()))?;
    let Value::Object(record) = &value else {
        return Err(ImportError::NotAnObject);
    };
    let named = record
        .get("name")
        .and_then(Value::as_str)
        .is_some_and(|name| !name.trim().is_empty());
    if !named {
        return Err(ImportError::MissingName);
    }
    if !record.get("attributes").is_some_and(Value::is_object) {
        return Err(ImportError::MissingAttributes);
    }

    // Loading assigns an id to records without one.
    let mut character = migrate::load_value(value).ok_or(ImportError::NotAnObject)?;
    if roster.iter().any(|p| p.id == character.id) {
        character.id = CharacterId::new();
    }
    Ok(character)
}

/// Read and validate an import file from disk.
pub async fn import_from_path(
    path: impl AsRef<Path>,
    roster: &[CharacterPreview],
) -> Result<Character, PersistError> {
    let content = fs::read_to_string(path).await?;
    Ok(parse_import(&content, roster)?)
}
