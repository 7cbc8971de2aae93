use std::time::Instant;

use shared::InitializationStatus;

use super::status_store::{StatusError, StatusStore};
use crate::config::AppConfig;
use crate::detector::{CommandDetector, Detector, DetectorError};
use crate::storage::provisioner::{ModelProvisioner, ProvisionError};
use crate::storage::s3_service::{ObjectSource, S3Service};

#[derive(Debug, thiserror::Error)]
pub enum InitError {
    #[error("Model download failed: {0}")]
    Provision(#[from] ProvisionError),
    #[error("Model initialization failed: {0}")]
    Detector(#[from] DetectorError),
}

/// Entry point of the worker process: provision, initialize, report.
pub async fn run(config: &AppConfig) -> Result<InitializationStatus, StatusError> {
    let store = StatusStore::new(&config.status_file);
    let detector = CommandDetector::from_config(config);
    let started = Instant::now();

    let outcome = if config.download_models {
        match &config.storage.bucket {
            Some(bucket) => {
                let source = S3Service::from_config(&config.storage, bucket.clone()).await;
                let provisioner =
                    ModelProvisioner::new(source, &config.storage.model_key, config.model_path());
                initialize(Some(&provisioner), &detector).await
            }
            None => Err(ProvisionError::MissingBucket.into()),
        }
    } else {
        initialize::<S3Service, _>(None, &detector).await
    };

    report(&store, started, outcome)
}

pub async fn initialize<S, D>(
    provisioner: Option<&ModelProvisioner<S>>,
    detector: &D,
) -> Result<(), InitError>
where
    S: ObjectSource,
    D: Detector,
{
    if let Some(provisioner) = provisioner {
        provisioner.ensure_model_present().await?;
    }
    detector.init()?;
    Ok(())
}

/// Writes the single, final status record for this initialization attempt.
pub fn report(
    store: &StatusStore,
    started: Instant,
    outcome: Result<(), InitError>,
) -> Result<InitializationStatus, StatusError> {
    let status = match outcome {
        Ok(()) => {
            let initialization_time = started.elapsed().as_secs_f64();
            log::info!("Model initialized in {:.2}s", initialization_time);
            InitializationStatus::Ready {
                initialization_time,
            }
        }
        Err(e) => {
            log::error!("{}", e);
            InitializationStatus::Error {
                error: e.to_string(),
            }
        }
    };

    store.publish(&status)?;
    Ok(status)
}
