mod command;

use std::path::Path;

pub use command::CommandDetector;

#[derive(Debug, thiserror::Error)]
pub enum DetectorError {
    #[error("Failed to launch detector: {0}")]
    Launch(#[from] std::io::Error),
    #[error("Detector failed: {0}")]
    Failed(String),
    #[error("Detector returned an invalid score: {0:?}")]
    InvalidScore(String),
}

/// The numeric deepfake model, seen from the service.
///
/// `init` is the heavy one-time setup and runs in the worker process only;
/// `process` may be called concurrently for independent files.
pub trait Detector: Send + Sync + 'static {
    fn init(&self) -> Result<(), DetectorError>;

    fn process(&self, video: &Path) -> Result<f64, DetectorError>;
}
