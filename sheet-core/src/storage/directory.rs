use super::{has_identity, StorageBackend};
use crate::character::{CharacterId, CharacterPreview};
use crate::persist::PersistError;
use async_trait::async_trait;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tracing::debug;

/// Native filesystem capability consumed by [`DirectoryBackend`].
#[async_trait]
pub trait NativeFs: Send + Sync {
    /// Ask for a storage directory. `None` means the choice was cancelled.
    async fn choose_directory(&self) -> Result<Option<PathBuf>, PersistError>;

    async fn write_json(&self, path: &Path, contents: &str) -> Result<(), PersistError>;

    /// Parse every `.json` file in `dir`, skipping files that fail to parse
    /// or lack an id and name. Each record comes with the file it was read
    /// from.
    async fn read_all_json(&self, dir: &Path) -> Result<Vec<(PathBuf, Value)>, PersistError>;

    async fn delete_json(&self, path: &Path) -> Result<(), PersistError>;
}

/// [`NativeFs`] on top of `tokio::fs`.
///
/// There is no dialog here: `choose_directory` answers with the directory
/// the capability was configured with.
#[derive(Debug, Clone, Default)]
pub struct TokioFs {
    preferred: Option<PathBuf>,
}

impl TokioFs {
    pub fn new(preferred: impl Into<PathBuf>) -> Self {
        Self {
            preferred: Some(preferred.into()),
        }
    }

    /// A capability whose directory choice is always cancelled.
    pub fn unconfigured() -> Self {
        Self { preferred: None }
    }
}

#[async_trait]
impl NativeFs for TokioFs {
    async fn choose_directory(&self) -> Result<Option<PathBuf>, PersistError> {
        Ok(self.preferred.clone())
    }

    async fn write_json(&self, path: &Path, contents: &str) -> Result<(), PersistError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(path, contents).await?;
        Ok(())
    }

    async fn read_all_json(&self, dir: &Path) -> Result<Vec<(PathBuf, Value)>, PersistError> {
        let mut records = Vec::new();

        // Create the directory if it doesn't exist
        if !dir.exists() {
            fs::create_dir_all(dir).await?;
            return Ok(records);
        }

        let mut entries = fs::read_dir(dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if !path.extension().map(|e| e == "json").unwrap_or(false) {
                continue;
            }
            let Ok(content) = fs::read_to_string(&path).await else {
                debug!(path = %path.display(), "skipping unreadable file");
                continue;
            };
            match serde_json::from_str::<Value>(&content) {
                Ok(record) if has_identity(&record) => records.push((path, record)),
                _ => debug!(path = %path.display(), "skipping file without a character"),
            }
        }
        Ok(records)
    }

    async fn delete_json(&self, path: &Path) -> Result<(), PersistError> {
        match fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

fn file_stem(id: &CharacterId) -> String {
    id.as_str()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Path of a character's record inside `dir`.
pub fn record_path(dir: impl AsRef<Path>, id: &CharacterId) -> PathBuf {
    dir.as_ref().join(format!("{}.json", file_stem(id)))
}

fn record_id(record: &Value) -> Option<String> {
    match record.get("id")? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn is_record_of(record: &Value, id: &CharacterId) -> bool {
    record_id(record).as_deref() == Some(id.as_str())
}

/// Files in a scan holding the character `id`, whatever they are named.
fn files_of<'a>(
    entries: &'a [(PathBuf, Value)],
    id: &'a CharacterId,
) -> impl Iterator<Item = &'a PathBuf> + 'a {
    entries
        .iter()
        .filter(move |(_, record)| is_record_of(record, id))
        .map(|(path, _)| path)
}

/// Where `id` gets written: `<id>.json` unless another character owns that
/// file, then a file already holding `id`, then the first free `<id>-<n>.json`.
fn target_path(dir: &Path, id: &CharacterId, entries: &[(PathBuf, Value)]) -> PathBuf {
    let canonical = record_path(dir, id);
    let owned_by_other = entries
        .iter()
        .any(|(path, record)| *path == canonical && !is_record_of(record, id));
    if !owned_by_other {
        return canonical;
    }
    if let Some(path) = files_of(entries, id).next() {
        return path.clone();
    }
    let stem = file_stem(id);
    (2..)
        .map(|n: u32| dir.join(format!("{stem}-{n}.json")))
        .find(|candidate| entries.iter().all(|(path, _)| path != candidate))
        .unwrap_or(canonical)
}

/// One `<id>.json` file per character in a directory.
///
/// The directory is the roster: there is no index file, and listing always
/// scans. A record is found by the id inside it, not by its file name, so
/// sheets dropped into the directory under any name are read, rewritten and
/// deleted like the ones written here.
pub struct DirectoryBackend {
    fs: Arc<dyn NativeFs>,
    dir: PathBuf,
}

impl DirectoryBackend {
    pub fn new(fs: Arc<dyn NativeFs>, dir: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            dir: dir.into(),
        }
    }

    /// Build a backend in the directory the capability chooses, or `None`
    /// when the choice is cancelled.
    pub async fn choose(fs: Arc<dyn NativeFs>) -> Result<Option<Self>, PersistError> {
        let Some(dir) = fs.choose_directory().await? else {
            return Ok(None);
        };
        Ok(Some(Self::new(fs, dir)))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl StorageBackend for DirectoryBackend {
    fn name(&self) -> &'static str {
        "directory"
    }

    fn keeps_roster(&self) -> bool {
        false
    }

    async fn write(&self, id: &CharacterId, record: &Value) -> Result<(), PersistError> {
        let contents = serde_json::to_string_pretty(record)?;
        let entries = self.fs.read_all_json(&self.dir).await?;
        let target = target_path(&self.dir, id, &entries);
        self.fs.write_json(&target, &contents).await?;

        // Other copies of the same character would shadow this write.
        for stale in files_of(&entries, id).filter(|path| **path != target) {
            debug!(path = %stale.display(), %id, "removing duplicate record");
            self.fs.delete_json(stale).await?;
        }
        Ok(())
    }

    async fn read(&self, id: &CharacterId) -> Result<Option<Value>, PersistError> {
        Ok(self
            .fs
            .read_all_json(&self.dir)
            .await?
            .into_iter()
            .find(|(_, record)| is_record_of(record, id))
            .map(|(_, record)| record))
    }

    async fn remove(&self, id: &CharacterId) -> Result<(), PersistError> {
        let entries = self.fs.read_all_json(&self.dir).await?;
        for path in files_of(&entries, id) {
            self.fs.delete_json(path).await?;
        }
        Ok(())
    }

    async fn scan(&self) -> Result<Vec<Value>, PersistError> {
        Ok(self
            .fs
            .read_all_json(&self.dir)
            .await?
            .into_iter()
            .map(|(_, record)| record)
            .collect())
    }

    async fn read_roster(&self) -> Result<Option<Vec<CharacterPreview>>, PersistError> {
        Ok(None)
    }

    async fn write_roster(&self, _roster: &[CharacterPreview]) -> Result<(), PersistError> {
        Ok(())
    }
}
