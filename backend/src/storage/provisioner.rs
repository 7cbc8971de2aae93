use std::path::{Path, PathBuf};

use super::s3_service::{ObjectSource, S3ServiceError};
use super::sibling_temp_path;

#[derive(Debug, thiserror::Error)]
pub enum ProvisionError {
    #[error("Storage error: {0}")]
    Storage(#[from] S3ServiceError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("S3_BUCKET_NAME is not configured")]
    MissingBucket,
}

/// Makes sure the model weights exist locally, fetching them on a cache miss.
pub struct ModelProvisioner<S> {
    source: S,
    model_key: String,
    model_path: PathBuf,
}

impl<S: ObjectSource> ModelProvisioner<S> {
    pub fn new(source: S, model_key: impl Into<String>, model_path: impl Into<PathBuf>) -> Self {
        Self {
            source,
            model_key: model_key.into(),
            model_path: model_path.into(),
        }
    }

    /// Idempotent. The weights only become visible at `model_path` once the
    /// download has fully completed.
    pub async fn ensure_model_present(&self) -> Result<(), ProvisionError> {
        if tokio::fs::try_exists(&self.model_path).await? {
            log::info!("Model weights found at {}", self.model_path.display());
            return Ok(());
        }

        if let Some(parent) = self.model_path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        log::info!(
            "Downloading model weights '{}' to {}",
            self.model_key,
            self.model_path.display()
        );

        let staging = sibling_temp_path(&self.model_path);
        match self.source.download_to(&self.model_key, &staging).await {
            Ok(bytes) => {
                if let Err(e) = tokio::fs::rename(&staging, &self.model_path).await {
                    discard(&staging).await;
                    return Err(e.into());
                }
                log::info!("Model weights downloaded ({} bytes)", bytes);
                Ok(())
            }
            Err(e) => {
                log::error!("Error downloading model: {}", e);
                discard(&staging).await;
                Err(e.into())
            }
        }
    }
}

async fn discard(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            log::warn!("Failed to remove partial download {}: {}", path.display(), e);
        }
    }
}
