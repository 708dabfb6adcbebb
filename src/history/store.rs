use crate::history::config::HistoryEntry;
use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};

pub const HISTORY_KEY: &str = "dovekie_config_history";

/// Storage key, namespaced by an optional sketch name so documents never share
/// a history.
pub fn history_key(sketch: Option<&str>) -> String {
    match sketch.map(str::trim).filter(|name| !name.is_empty()) {
        Some(name) => format!("{HISTORY_KEY}.{name}"),
        None => HISTORY_KEY.to_string(),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("failed to read {path}: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("failed to write {path}: {source}")]
    Write { path: PathBuf, source: io::Error },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("failed to encode history: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("history storage is unavailable")]
    Unavailable,
}

/// Durable mirror of the config history. The in-memory list is authoritative;
/// storage only ever receives the full list.
pub trait HistoryStorage: Send {
    fn load(&self) -> Result<Vec<HistoryEntry>, StoreError>;
    fn save(&self, entries: &[HistoryEntry]) -> Result<(), StoreError>;
}

#[derive(Debug, Clone)]
pub struct FileHistoryStore {
    dir: PathBuf,
    key: String,
}

impl FileHistoryStore {
    pub fn new(dir: impl Into<PathBuf>, key: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            key: key.into(),
        }
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(format!("{}.json", self.key))
    }

    fn tmp_path(&self) -> PathBuf {
        self.dir.join(format!("{}.json.tmp", self.key))
    }
}

impl HistoryStorage for FileHistoryStore {
    fn load(&self) -> Result<Vec<HistoryEntry>, StoreError> {
        let path = self.path();
        if !path.exists() {
            return Ok(Vec::new());
        }
        let data = fs::read(&path).map_err(|source| StoreError::Read {
            path: path.clone(),
            source,
        })?;
        serde_json::from_slice(&data).map_err(|source| StoreError::Parse { path, source })
    }

    fn save(&self, entries: &[HistoryEntry]) -> Result<(), StoreError> {
        let final_path = self.path();
        let tmp_path = self.tmp_path();
        let write_error = |source| StoreError::Write {
            path: final_path.clone(),
            source,
        };

        fs::create_dir_all(&self.dir).map_err(write_error)?;
        let bytes = serde_json::to_vec_pretty(entries)?;
        fs::write(&tmp_path, bytes).map_err(write_error)?;
        match fs::rename(&tmp_path, &final_path) {
            Ok(()) => Ok(()),
            Err(rename_err) => {
                if final_path.exists() {
                    fs::remove_file(&final_path).map_err(write_error)?;
                    fs::rename(&tmp_path, &final_path).map_err(write_error)
                } else {
                    Err(write_error(rename_err))
                }
            }
        }
    }
}

/// Shared in-memory storage. Clones see the same entries, which lets a test
/// reopen a history against what an earlier instance persisted.
#[derive(Debug, Clone, Default)]
pub struct MemoryHistoryStore {
    entries: Arc<Mutex<Vec<HistoryEntry>>>,
    failing: bool,
}

impl MemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose writes always fail.
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    pub fn entries(&self) -> Vec<HistoryEntry> {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<HistoryEntry>> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl HistoryStorage for MemoryHistoryStore {
    fn load(&self) -> Result<Vec<HistoryEntry>, StoreError> {
        Ok(self.lock().clone())
    }

    fn save(&self, entries: &[HistoryEntry]) -> Result<(), StoreError> {
        if self.failing {
            return Err(StoreError::Unavailable);
        }
        *self.lock() = entries.to_vec();
        Ok(())
    }
}
