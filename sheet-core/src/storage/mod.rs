//! Storage port for character records.
//!
//! A backend stores one JSON record per character and, optionally, a roster
//! index of previews. Records cross this boundary as raw JSON so that the
//! migration pipeline sees exactly what was persisted.

mod directory;
mod key_value;

pub use directory::{record_path, DirectoryBackend, NativeFs, TokioFs};
pub use key_value::{
    character_key, JsonFileKeyValue, KeyValueBackend, KeyValueStore, MemoryKeyValue,
    CHARACTER_PREFIX, LEGACY_KEY, ROSTER_KEY,
};

use crate::character::{CharacterId, CharacterPreview};
use crate::persist::PersistError;
use async_trait::async_trait;
use serde_json::Value;

/// Backend-agnostic character storage.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Whether the backend persists a roster index of its own. Backends
    /// without one have their roster rebuilt from [`scan`](Self::scan).
    fn keeps_roster(&self) -> bool;

    async fn write(&self, id: &CharacterId, record: &Value) -> Result<(), PersistError>;
    async fn read(&self, id: &CharacterId) -> Result<Option<Value>, PersistError>;
    async fn remove(&self, id: &CharacterId) -> Result<(), PersistError>;

    /// Every stored character record.
    async fn scan(&self) -> Result<Vec<Value>, PersistError>;

    async fn read_roster(&self) -> Result<Option<Vec<CharacterPreview>>, PersistError>;
    async fn write_roster(&self, roster: &[CharacterPreview]) -> Result<(), PersistError>;

    /// The record left under the pre-roster single-character layout, if any.
    async fn read_legacy(&self) -> Result<Option<Value>, PersistError> {
        Ok(None)
    }

    async fn remove_legacy(&self) -> Result<(), PersistError> {
        Ok(())
    }
}

/// Whether a raw record carries the id and name every roster entry needs.
pub(crate) fn has_identity(record: &Value) -> bool {
    let present = |key: &str| match record.get(key) {
        Some(Value::String(s)) => !s.trim().is_empty(),
        Some(Value::Number(_)) => key == "id",
        _ => false,
    };
    present("id") && present("name")
}
