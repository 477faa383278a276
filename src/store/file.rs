//! Variable store persisted as a JSON object on disk.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use super::{VarValue, VariableStore};

/// Variable store file errors.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    IoError(String),
    #[error("Parse error: {0}")]
    ParseError(String),
    #[error("Serialize error: {0}")]
    SerializeError(String),
}

/// Variable store backed by a JSON file.
///
/// Changes stay in memory until [`save`](Self::save) is called.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
    vars: BTreeMap<String, VarValue>,
}

impl JsonFileStore {
    /// Open a store file; a missing file yields an empty store.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        if !path.exists() {
            tracing::debug!("Variable store {} not found, starting empty", path.display());
            return Ok(Self {
                path,
                vars: BTreeMap::new(),
            });
        }

        let content =
            fs::read_to_string(&path).map_err(|e| StoreError::IoError(e.to_string()))?;
        let vars = serde_json::from_str(&content).map_err(|e| StoreError::ParseError(e.to_string()))?;

        Ok(Self { path, vars })
    }

    /// Write the store back to its file.
    pub fn save(&self) -> Result<(), StoreError> {
        // Create parent directories if needed
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| StoreError::IoError(e.to_string()))?;
            }
        }

        let content = serde_json::to_string_pretty(&self.vars)
            .map_err(|e| StoreError::SerializeError(e.to_string()))?;

        fs::write(&self.path, content).map_err(|e| StoreError::IoError(e.to_string()))?;
        tracing::debug!("Saved {} variables to {}", self.vars.len(), self.path.display());
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}

impl VariableStore for JsonFileStore {
    fn get(&self, key: &str) -> Option<VarValue> {
        self.vars.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: VarValue) {
        self.vars.insert(key.to_string(), value);
    }
}
