/// JSON record store for the clinic registry.
///
/// Each collection lives in `<data_dir>/<name>.json` as a JSON array of flat
/// objects. Loading never fails: a missing, unreadable or undecodable file is
/// an empty collection. Saving replaces the whole file through a temporary
/// sibling and a rename.

use crate::config::ClinicConfig;
use crate::error::StorageError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct RecordStore {
    data_dir: PathBuf,
}

impl RecordStore {
    pub fn new(config: &ClinicConfig) -> Self {
        RecordStore {
            data_dir: config.data_dir().to_path_buf(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Path of the file backing a named collection.
    pub fn collection_path(&self, name: &str) -> PathBuf {
        self.data_dir.join(format!("{}.json", name))
    }

    /// Load a named collection, treating absence or corruption as empty.
    pub fn load_collection<T: DeserializeOwned>(&self, name: &str) -> Vec<T> {
        let path = self.collection_path(name);

        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!("no {} file at {}, starting empty", name, path.display());
                return Vec::new();
            }
            Err(e) => {
                tracing::warn!("could not read {}: {}; treating as empty", path.display(), e);
                return Vec::new();
            }
        };

        match serde_json::from_str::<Vec<T>>(&contents) {
            Ok(records) => {
                tracing::debug!("loaded {} {} from {}", records.len(), name, path.display());
                records
            }
            Err(e) => {
                tracing::warn!(
                    "{} is not a valid {} collection ({}); treating as empty",
                    path.display(),
                    name,
                    e
                );
                Vec::new()
            }
        }
    }

    /// Replace a named collection on disk with `records`.
    pub fn save_collection<T: Serialize>(&self, name: &str, records: &[T]) -> Result<(), StorageError> {
        fs::create_dir_all(&self.data_dir).map_err(|source| StorageError::DirCreation {
            path: self.data_dir.clone(),
            source,
        })?;

        let json = serde_json::to_string_pretty(records).map_err(|source| {
            StorageError::Serialization {
                name: name.to_string(),
                source,
            }
        })?;

        let path = self.collection_path(name);
        let tmp_path = self
            .data_dir
            .join(format!(".{}.{}.tmp", name, Uuid::new_v4().simple()));

        fs::write(&tmp_path, json).map_err(|source| StorageError::FileWrite {
            path: tmp_path.clone(),
            source,
        })?;

        if let Err(source) = fs::rename(&tmp_path, &path) {
            // Best effort; the rename error is the one reported.
            let _ = fs::remove_file(&tmp_path);
            return Err(StorageError::FileReplace { path, source });
        }

        tracing::debug!("saved {} {} to {}", records.len(), name, path.display());
        Ok(())
    }
}
