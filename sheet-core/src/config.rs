//! Startup configuration: which storage backend to use and where.

use crate::persist::PersistError;
use crate::storage::{DirectoryBackend, JsonFileKeyValue, KeyValueBackend, StorageBackend, TokioFs};
use directories::ProjectDirs;
use std::env;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

/// File name of the key-value store inside the data directory.
pub const KEY_VALUE_FILE: &str = "storage.json";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("unknown storage backend '{0}' (expected 'directory' or 'local')")]
    UnknownBackend(String),
}

/// The two storage backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StorageKind {
    /// One JSON file per character in a directory.
    Directory,
    /// A key-value store mirrored to a single file.
    #[default]
    Local,
}

impl FromStr for StorageKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "directory" | "dir" => Ok(StorageKind::Directory),
            "local" | "kv" => Ok(StorageKind::Local),
            other => Err(ConfigError::UnknownBackend(other.to_string())),
        }
    }
}

impl fmt::Display for StorageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageKind::Directory => write!(f, "directory"),
            StorageKind::Local => write!(f, "local"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetConfig {
    pub storage: StorageKind,
    /// Character directory, or the directory holding the key-value file.
    pub dir: PathBuf,
}

impl Default for SheetConfig {
    fn default() -> Self {
        Self {
            storage: StorageKind::default(),
            dir: default_data_dir(),
        }
    }
}

/// Platform data directory, or `.sheet` in the working directory when the
/// platform has none.
pub fn default_data_dir() -> PathBuf {
    ProjectDirs::from("io", "sheet", "sheet")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from(".sheet"))
}

impl SheetConfig {
    pub fn new(storage: StorageKind, dir: impl Into<PathBuf>) -> Self {
        Self {
            storage,
            dir: dir.into(),
        }
    }

    /// Construct configuration from process environment variables.
    ///
    /// Environment variables:
    /// - `SHEET_STORAGE` - `directory` or `local` (default: local)
    /// - `SHEET_DIR` - storage directory (default: platform data dir)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an explicit lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(kind) = lookup("SHEET_STORAGE").filter(|v| !v.trim().is_empty()) {
            config.storage = kind.parse()?;
        }
        if let Some(dir) = lookup("SHEET_DIR").filter(|v| !v.trim().is_empty()) {
            config.dir = PathBuf::from(dir);
        }
        Ok(config)
    }

    /// Build the configured backend.
    pub async fn open_backend(&self) -> Result<Arc<dyn StorageBackend>, PersistError> {
        info!(storage = %self.storage, dir = %self.dir.display(), "opening storage");
        match self.storage {
            StorageKind::Directory => {
                let fs = Arc::new(TokioFs::new(&self.dir));
                let backend = DirectoryBackend::choose(fs).await?.ok_or_else(|| {
                    PersistError::Backend("no storage directory chosen".to_string())
                })?;
                Ok(Arc::new(backend))
            }
            StorageKind::Local => {
                let store = JsonFileKeyValue::open(self.dir.join(KEY_VALUE_FILE));
                Ok(Arc::new(KeyValueBackend::new(store)))
            }
        }
    }
}
