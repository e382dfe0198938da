/// Error types for the clinic registry.
///
/// Validation, not-found and conflict errors are ordinary outcomes of
/// interactive use. Storage errors mean memory and disk may have diverged.

use crate::models::EntityKind;
use std::path::PathBuf;

/// Failures while writing a collection to disk.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("failed to create data directory {path}: {source}")]
    DirCreation {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to serialize collection '{name}': {source}")]
    Serialization {
        name: String,
        source: serde_json::Error,
    },
    #[error("failed to write {path}: {source}")]
    FileWrite {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to replace {path}: {source}")]
    FileReplace {
        path: PathBuf,
        source: std::io::Error,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum ClinicError {
    #[error("invalid input: {0}")]
    Validation(String),
    #[error("{kind} not found: {id}")]
    NotFound { kind: EntityKind, id: String },
    #[error("doctor {doctor_id} already has an appointment at {scheduled_at}")]
    Conflict {
        doctor_id: String,
        scheduled_at: String,
    },
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl ClinicError {
    /// Whether the caller can report the error and carry on.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, ClinicError::Storage(_))
    }
}

pub type ClinicResult<T> = std::result::Result<T, ClinicError>;
