use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use shared::InitializationStatus;

use crate::storage::sibling_temp_path;

#[derive(Debug, thiserror::Error)]
pub enum StatusError {
    #[error("Failed to read status file: {0}")]
    Read(std::io::Error),
    #[error("Corrupt status file: {0}")]
    Corrupt(#[from] serde_json::Error),
    #[error("Failed to write status file: {0}")]
    Write(std::io::Error),
}

/// The status artifact shared between the worker and the service.
///
/// Readers see either no file or a complete record: writes go to a sibling
/// temp file that is renamed over the final path.
#[derive(Debug, Clone)]
pub struct StatusStore {
    path: PathBuf,
}

impl StatusStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `Ok(None)` while initialization has not reported yet.
    pub fn read(&self) -> Result<Option<InitializationStatus>, StatusError> {
        match fs::read(&self.path) {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StatusError::Read(e)),
        }
    }

    pub fn publish(&self, status: &InitializationStatus) -> Result<(), StatusError> {
        let body = serde_json::to_vec(status)?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(StatusError::Write)?;
            }
        }

        let staging = sibling_temp_path(&self.path);
        let written = fs::File::create(&staging)
            .and_then(|mut file| {
                file.write_all(&body)?;
                file.sync_all()
            })
            .and_then(|_| fs::rename(&staging, &self.path));

        if let Err(e) = written {
            let _ = fs::remove_file(&staging);
            return Err(StatusError::Write(e));
        }

        log::info!(
            "Published initialization status '{}' to {}",
            status.state(),
            self.path.display()
        );
        Ok(())
    }

    /// Removes a record left behind by a previous run.
    pub fn clear(&self) -> Result<(), StatusError> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                log::info!("Removed stale status file {}", self.path.display());
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StatusError::Write(e)),
        }
    }
}
