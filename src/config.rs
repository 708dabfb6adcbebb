use crate::history::store::{history_key, FileHistoryStore};
use crate::history::values::DEFAULT_CAPACITY;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

pub const CONFIG_ENV: &str = "DOVEKIE_CONFIG";
pub const SKETCH_ENV: &str = "DOVEKIE_SKETCH";
pub const HOME_ENV: &str = "DOVEKIE_HOME";

fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("USERPROFILE").map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("."))
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorOptions {
    /// Namespaces the persisted history so sketches never share one.
    pub sketch_name: Option<String>,
    pub keep_values_history: bool,
    pub storage_dir: PathBuf,
    /// Forwarded untouched to the model's schema request.
    pub schema_hints: Value,
    pub values_capacity: usize,
}

impl Default for EditorOptions {
    fn default() -> Self {
        Self {
            sketch_name: None,
            keep_values_history: true,
            storage_dir: home_dir().join(".dovekie"),
            schema_hints: Value::Object(serde_json::Map::new()),
            values_capacity: DEFAULT_CAPACITY,
        }
    }
}

impl EditorOptions {
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_env(|key| std::env::var_os(key))
    }

    /// Reads the optional config file named by `DOVEKIE_CONFIG`, then applies
    /// `DOVEKIE_SKETCH` and `DOVEKIE_HOME` on top.
    pub fn from_env(lookup: impl Fn(&str) -> Option<OsString>) -> Result<Self, ConfigError> {
        let mut options = match lookup(CONFIG_ENV) {
            Some(path) => Self::from_file(Path::new(&path))?,
            None => Self::default(),
        };
        if let Some(sketch) = lookup(SKETCH_ENV) {
            options.sketch_name = Some(sketch.to_string_lossy().into_owned());
        }
        if let Some(dir) = lookup(HOME_ENV) {
            options.storage_dir = PathBuf::from(dir);
        }
        Ok(options)
    }

    /// A missing file yields the defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file; using defaults");
            return Ok(Self::default());
        }
        let data = fs::read(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_slice(&data).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn history_key(&self) -> String {
        history_key(self.sketch_name.as_deref())
    }

    pub fn history_store(&self) -> FileHistoryStore {
        FileHistoryStore::new(&self.storage_dir, self.history_key())
    }
}
