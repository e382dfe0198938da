/// Runtime configuration for the clinic registry.
///
/// Resolved once at startup and handed to the record store, so tests can
/// point each registry at its own temporary directory.

use crate::error::{ClinicError, ClinicResult};
use std::path::{Path, PathBuf};

/// Data directory used when none is configured.
pub const DEFAULT_DATA_DIR: &str = "hospital_data";

#[derive(Clone, Debug)]
pub struct ClinicConfig {
    data_dir: PathBuf,
}

impl ClinicConfig {
    pub fn new(data_dir: impl Into<PathBuf>) -> ClinicResult<Self> {
        let data_dir = data_dir.into();
        if data_dir.as_os_str().is_empty() {
            return Err(ClinicError::Validation(
                "data directory cannot be empty".into(),
            ));
        }
        Ok(Self { data_dir })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }
}

impl Default for ClinicConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
        }
    }
}
