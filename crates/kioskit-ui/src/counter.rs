use std::path::{Path, PathBuf};

use log::warn;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize counter: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct CounterFile {
    count: i64,
}

/// Persisted counter backing the example page.
#[derive(Debug)]
pub struct CounterStore {
    path: PathBuf,
    count: i64,
}

impl CounterStore {
    /// Load the counter from `path`. A missing or unreadable file starts at zero.
    #[must_use]
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let count = match std::fs::read_to_string(&path) {
            Ok(content) => match serde_json::from_str::<CounterFile>(&content) {
                Ok(file) => file.count,
                Err(error) => {
                    warn!("Ignoring malformed counter file {}: {error}", path.display());
                    0
                }
            },
            Err(_) => 0,
        };
        Self { path, count }
    }

    #[must_use]
    pub fn count(&self) -> i64 {
        self.count
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// # Errors
    /// Returns an error if the new value cannot be persisted.
    pub fn increment(&mut self) -> Result<i64, StoreError> {
        self.store(self.count.saturating_add(1))
    }

    /// # Errors
    /// Returns an error if the new value cannot be persisted.
    pub fn reset(&mut self) -> Result<i64, StoreError> {
        self.store(0)
    }

    fn store(&mut self, count: i64) -> Result<i64, StoreError> {
        let content = serde_json::to_string_pretty(&CounterFile { count })?;
        let io = |source| StoreError::Io {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(io)?;
        }
        std::fs::write(&self.path, content).map_err(io)?;
        self.count = count;
        Ok(count)
    }
}
