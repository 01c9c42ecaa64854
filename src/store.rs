use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::StoreError;
use crate::state::AppState;

/// Whole-document persistence for [`AppState`].
///
/// `load` fills missing fields with defaults; `save` replaces the stored
/// document in one step.
pub trait StateStore {
    fn load(&self) -> Result<AppState, StoreError>;
    fn save(&mut self, state: &AppState) -> Result<(), StoreError>;
}

/// Pretty JSON file on disk, replaced atomically through a sibling temp file.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl StateStore for JsonFileStore {
    fn load(&self) -> Result<AppState, StoreError> {
        match fs::read_to_string(&self.path) {
            Ok(content) if content.trim().is_empty() => Ok(AppState::default()),
            Ok(content) => {
                debug!("Loaded state from {}", self.path.display());
                Ok(serde_json::from_str(&content)?)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No state at {}, starting fresh", self.path.display());
                Ok(AppState::default())
            }
            Err(e) => Err(self.io_error(e)),
        }
    }

    fn save(&mut self, state: &AppState) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(state)?;
        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let mut tmp = NamedTempFile::new_in(&dir).map_err(|e| self.io_error(e))?;
        tmp.write_all(json.as_bytes()).map_err(|e| self.io_error(e))?;
        tmp.persist(&self.path)?;
        debug!("Saved state to {}", self.path.display());
        Ok(())
    }
}

/// Keeps the serialized document in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    document: Option<String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn document(&self) -> Option<&str> {
        self.document.as_deref()
    }
}

impl StateStore for MemoryStore {
    fn load(&self) -> Result<AppState, StoreError> {
        match &self.document {
            Some(doc) => Ok(serde_json::from_str(doc)?),
            None => Ok(AppState::default()),
        }
    }

    fn save(&mut self, state: &AppState) -> Result<(), StoreError> {
        self.document = Some(serde_json::to_string(state)?);
        Ok(())
    }
}
