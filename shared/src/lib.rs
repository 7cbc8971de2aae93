use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

/// Score above which a video is reported as a deepfake.
pub const DEEPFAKE_THRESHOLD: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum InitState {
    /// Before the worker is launched. Never persisted, and reported to clients
    /// as `Initializing` since both mean "no status record yet".
    Uninitialized,
    Initializing,
    Ready,
    Error,
}

/// Outcome of the one-time model initialization, as persisted by the worker.
///
/// Only terminal outcomes are ever written; "initializing" is the absence of
/// the record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum InitializationStatus {
    Ready { initialization_time: f64 },
    Error { error: String },
}

impl InitializationStatus {
    pub fn state(&self) -> InitState {
        match self {
            InitializationStatus::Ready { .. } => InitState::Ready,
            InitializationStatus::Error { .. } => InitState::Error,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionResult {
    pub score: f64,
    pub is_deepfake: bool,
}

impl DetectionResult {
    pub fn from_score(score: f64) -> Self {
        Self {
            score,
            is_deepfake: score > DEEPFAKE_THRESHOLD,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceInfo {
    pub status: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: InitState,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initialization_time: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<InitState>,
}
