use std::path::PathBuf;
use thiserror::Error;
use uuid::Uuid;

use crate::api_connection::connection::ApiConnectionError;

/// Rejected edits to the state document.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("profile name must not be empty")]
    EmptyProfileName,
    #[error("a profile named '{0}' already exists")]
    DuplicateProfileName(String),
    #[error("profile name '{0}' must not contain control characters")]
    InvalidProfileName(String),
    #[error("no profile matches '{0}'")]
    UnknownProfile(String),
    #[error("'{0}' matches several profiles; use the exact name or the id")]
    AmbiguousProfile(String),
    #[error("profile '{0}' is inactive; activate it before planning meals")]
    InactiveProfile(String),
    #[error("no history entry with id {0}")]
    UnknownHistoryEntry(Uuid),
    #[error("no saved recipe with id {0}")]
    UnknownSavedRecipe(Uuid),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to access state file '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("state document is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("failed to replace state file: {0}")]
    Persist(#[from] tempfile::PersistError),
}

/// Failures of a generation attempt. Validation findings are not errors.
#[derive(Debug, Error)]
pub enum PlannerError {
    #[error("generation failed: {0}")]
    Generation(#[from] ApiConnectionError),
    #[error("generator output is not a valid plan: {0}")]
    Parse(#[source] serde_json::Error),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    State(#[from] StateError),
}
