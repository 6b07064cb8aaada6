use super::{has_identity, StorageBackend};
use crate::character::{CharacterId, CharacterPreview};
use crate::persist::PersistError;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use tracing::{debug, warn};

/// Prefix of per-character keys.
pub const CHARACTER_PREFIX: &str = "character_";

/// Key of the roster index.
pub const ROSTER_KEY: &str = "characters";

/// Key of the single record older releases stored.
pub const LEGACY_KEY: &str = "character";

pub fn character_key(id: &CharacterId) -> String {
    format!("{CHARACTER_PREFIX}{id}")
}

/// String key-value storage.
pub trait KeyValueStore: Send + Sync {
    fn save(&self, key: &str, value: &str) -> Result<(), PersistError>;
    fn load(&self, key: &str) -> Result<Option<String>, PersistError>;
    fn remove(&self, key: &str) -> Result<(), PersistError>;
    fn keys(&self) -> Result<Vec<String>, PersistError>;
}

fn poisoned<E>(_: E) -> PersistError {
    PersistError::Backend("storage lock poisoned".to_string())
}

/// Volatile store for tests and throwaway sessions.
#[derive(Debug, Default)]
pub struct MemoryKeyValue {
    entries: RwLock<BTreeMap<String, String>>,
}

impl MemoryKeyValue {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryKeyValue {
    fn save(&self, key: &str, value: &str) -> Result<(), PersistError> {
        self.entries
            .write()
            .map_err(poisoned)?
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn load(&self, key: &str) -> Result<Option<String>, PersistError> {
        Ok(self.entries.read().map_err(poisoned)?.get(key).cloned())
    }

    fn remove(&self, key: &str) -> Result<(), PersistError> {
        self.entries.write().map_err(poisoned)?.remove(key);
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, PersistError> {
        Ok(self.entries.read().map_err(poisoned)?.keys().cloned().collect())
    }
}

/// Key-value pairs cached in memory and mirrored to one JSON file.
///
/// The default location is the platform data directory:
/// - Linux: ~/.local/share/sheet/storage.json
/// - macOS: ~/Library/Application Support/io.sheet.sheet/storage.json
/// - Windows: C:\Users\<User>\AppData\Roaming\sheet\sheet\data\storage.json
#[derive(Debug)]
pub struct JsonFileKeyValue {
    path: PathBuf,
    cache: RwLock<BTreeMap<String, String>>,
}

impl JsonFileKeyValue {
    /// Open the store at `path`, loading whatever it already holds.
    ///
    /// An unreadable or corrupt file starts the store empty; it is
    /// overwritten on the next save.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let cache = if path.exists() {
            match fs::read_to_string(&path) {
                Ok(data) => match serde_json::from_str::<BTreeMap<String, String>>(&data) {
                    Ok(map) => map,
                    Err(e) => {
                        warn!("Failed to parse storage file: {}", e);
                        BTreeMap::new()
                    }
                },
                Err(e) => {
                    warn!("Failed to read storage file: {}", e);
                    BTreeMap::new()
                }
            }
        } else {
            BTreeMap::new()
        };

        debug!("Key-value storage opened at: {:?}", path);

        Self {
            path,
            cache: RwLock::new(cache),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write the cache to disk.
    fn persist(&self) -> Result<(), PersistError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = {
            let cache = self.cache.read().map_err(poisoned)?;
            serde_json::to_string_pretty(&*cache)?
        };
        fs::write(&self.path, data)?;
        Ok(())
    }
}

impl KeyValueStore for JsonFileKeyValue {
    fn save(&self, key: &str, value: &str) -> Result<(), PersistError> {
        self.cache
            .write()
            .map_err(poisoned)?
            .insert(key.to_string(), value.to_string());
        self.persist()
    }

    fn load(&self, key: &str) -> Result<Option<String>, PersistError> {
        Ok(self.cache.read().map_err(poisoned)?.get(key).cloned())
    }

    fn remove(&self, key: &str) -> Result<(), PersistError> {
        let removed = self.cache.write().map_err(poisoned)?.remove(key);
        if removed.is_some() {
            self.persist()?;
        }
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, PersistError> {
        Ok(self.cache.read().map_err(poisoned)?.keys().cloned().collect())
    }
}

/// [`StorageBackend`] over a key-value store: `character_<id>` per record
/// plus a `characters` roster index.
pub struct KeyValueBackend<S> {
    store: S,
}

impl<S: KeyValueStore> KeyValueBackend<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    fn load_json(&self, key: &str) -> Result<Option<Value>, PersistError> {
        match self.store.load(key)? {
            Some(text) => Ok(Some(serde_json::from_str(&text)?)),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl<S: KeyValueStore> StorageBackend for KeyValueBackend<S> {
    fn name(&self) -> &'static str {
        "local"
    }

    fn keeps_roster(&self) -> bool {
        true
    }

    async fn write(&self, id: &CharacterId, record: &Value) -> Result<(), PersistError> {
        self.store
            .save(&character_key(id), &serde_json::to_string(record)?)
    }

    async fn read(&self, id: &CharacterId) -> Result<Option<Value>, PersistError> {
        self.load_json(&character_key(id))
    }

    async fn remove(&self, id: &CharacterId) -> Result<(), PersistError> {
        self.store.remove(&character_key(id))
    }

    async fn scan(&self) -> Result<Vec<Value>, PersistError> {
        let mut records = Vec::new();
        for key in self.store.keys()? {
            if !key.starts_with(CHARACTER_PREFIX) {
                continue;
            }
            match self.load_json(&key) {
                Ok(Some(record)) if has_identity(&record) => records.push(record),
                Ok(_) => debug!(key = %key, "skipping entry without a character"),
                Err(e) => debug!(key = %key, error = %e, "skipping unreadable entry"),
            }
        }
        Ok(records)
    }

    async fn read_roster(&self) -> Result<Option<Vec<CharacterPreview>>, PersistError> {
        let Some(value) = self.load_json(ROSTER_KEY)? else {
            return Ok(Some(Vec::new()));
        };
        Ok(Some(crate::coerce::entries(value)?))
    }

    async fn write_roster(&self, roster: &[CharacterPreview]) -> Result<(), PersistError> {
        self.store.save(ROSTER_KEY, &serde_json::to_string(roster)?)
    }

    async fn read_legacy(&self) -> Result<Option<Value>, PersistError> {
        self.load_json(LEGACY_KEY)
    }

    async fn remove_legacy(&self) -> Result<(), PersistError> {
        self.store.remove(LEGACY_KEY)
    }
}
