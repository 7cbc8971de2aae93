use std::path::Path;

use aws_config::BehaviorVersion;
use aws_credential_types::Credentials;
use aws_sdk_s3::Client;
use aws_sdk_s3::config::Region;
use tokio::io::AsyncWriteExt;

use crate::config::StorageConfig;

#[derive(Clone)]
pub struct S3Service {
    client: Client,
    bucket_name: String,
}

#[derive(Debug, thiserror::Error)]
pub enum S3ServiceError {
    #[error("S3 error: {0}")]
    S3(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A remote store that can copy one object to a local path.
pub trait ObjectSource {
    /// Streams `key` into `dest`, returning the number of bytes written.
    async fn download_to(&self, key: &str, dest: &Path) -> Result<u64, S3ServiceError>;
}

impl S3Service {
    pub fn new(client: Client, bucket_name: String) -> Self {
        Self {
            client,
            bucket_name,
        }
    }

    /// Builds a client from the configured credential pair, falling back to
    /// the default AWS provider chain when the pair is incomplete.
    pub async fn from_config(config: &StorageConfig, bucket_name: String) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()));

        if let (Some(access_key_id), Some(secret_access_key)) =
            (&config.access_key_id, &config.secret_access_key)
        {
            loader = loader.credentials_provider(Credentials::new(
                access_key_id.clone(),
                secret_access_key.clone(),
                None,
                None,
                "environment",
            ));
        } else {
            log::warn!("AWS credential pair not set, using the default provider chain");
        }

        let aws_config = loader.load().await;
        Self::new(Client::new(&aws_config), bucket_name)
    }
}

impl ObjectSource for S3Service {
    async fn download_to(&self, key: &str, dest: &Path) -> Result<u64, S3ServiceError> {
        let mut result = self
            .client
            .get_object()
            .bucket(&self.bucket_name)
            .key(key)
            .send()
            .await
            .map_err(|e| S3ServiceError::S3(e.to_string()))?;

        let mut file = tokio::fs::File::create(dest).await?;
        let mut written = 0u64;
        while let Some(bytes) = result
            .body
            .try_next()
            .await
            .map_err(|e| S3ServiceError::S3(e.to_string()))?
        {
            file.write_all(&bytes).await?;
            written += bytes.len() as u64;
        }
        file.sync_all().await?;

        Ok(written)
    }
}
