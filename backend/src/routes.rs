use std::path::Path;

use actix_multipart::{Field, Multipart};
use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError, web};
use futures_util::TryStreamExt;
use log::{error, info, warn};
use shared::{DetectionResult, ErrorResponse, InitState, ServiceInfo, StatusResponse};
use tokio::io::AsyncWriteExt;

use crate::detector::{Detector, DetectorError};
use crate::readiness::{Orchestrator, Readiness};
use crate::staging::{StagedUpload, UploadSettings, allowed_file};

const UPLOAD_FIELD: &str = "file";

#[derive(Debug, thiserror::Error)]
pub enum DetectError {
    #[error("Model is still initializing. Please try again later.")]
    Initializing,
    #[error("Model initialization error: {0}")]
    InitFailed(String),
    #[error("Failed to check model status: {0}")]
    StatusCheck(String),
    #[error("No file uploaded")]
    NoFile,
    #[error("Empty filename")]
    EmptyFilename,
    #[error("Invalid file type")]
    InvalidFileType,
    #[error("File too large")]
    FileTooLarge,
    #[error("Failed to store upload: {0}")]
    Staging(#[from] std::io::Error),
    #[error("Upload interrupted: {0}")]
    Upload(String),
    #[error("{0}")]
    Inference(#[from] DetectorError),
    #[error("Inference task failed: {0}")]
    Blocking(String),
}

impl ResponseError for DetectError {
    fn status_code(&self) -> StatusCode {
        match self {
            DetectError::Initializing => StatusCode::SERVICE_UNAVAILABLE,
            DetectError::NoFile | DetectError::EmptyFilename | DetectError::InvalidFileType => {
                StatusCode::BAD_REQUEST
            }
            DetectError::FileTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            DetectError::InitFailed(_)
            | DetectError::StatusCheck(_)
            | DetectError::Staging(_)
            | DetectError::Upload(_)
            | DetectError::Inference(_)
            | DetectError::Blocking(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = match self {
            DetectError::Initializing => Some(InitState::Initializing),
            DetectError::InitFailed(_) => Some(InitState::Error),
            _ => None,
        };
        HttpResponse::build(self.status_code()).json(ErrorResponse {
            error: self.to_string(),
            status,
        })
    }
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/").route(web::get().to(index)))
        .service(web::resource("/status").route(web::get().to(model_status)))
        .service(web::resource("/detect").route(web::post().to(detect_deepfake)));
}

async fn index() -> HttpResponse {
    HttpResponse::Ok().json(ServiceInfo {
        status: "online".into(),
        message: "DeepFake Detection API is running. Use the /detect endpoint with a POST request to analyze a video.".into(),
    })
}

async fn model_status(orchestrator: web::Data<Orchestrator>) -> HttpResponse {
    match orchestrator.readiness() {
        Readiness::Ready {
            initialization_time,
        } => HttpResponse::Ok().json(StatusResponse {
            status: InitState::Ready,
            message: "Model is ready".into(),
            initialization_time: Some(initialization_time),
            error: None,
        }),
        Readiness::Failed { error } => HttpResponse::InternalServerError().json(StatusResponse {
            status: InitState::Error,
            message: "Model initialization failed".into(),
            initialization_time: None,
            error: Some(error),
        }),
        Readiness::Uninitialized => HttpResponse::Accepted().json(StatusResponse {
            status: InitState::Initializing,
            message: "Model initialization has not started yet".into(),
            initialization_time: None,
            error: None,
        }),
        Readiness::Initializing => HttpResponse::Accepted().json(StatusResponse {
            status: InitState::Initializing,
            message: "Model is still initializing".into(),
            initialization_time: None,
            error: None,
        }),
        Readiness::Unknown { error } => {
            error!("Error checking model status: {}", error);
            HttpResponse::InternalServerError().json(StatusResponse {
                status: InitState::Initializing,
                message: "Error checking model status".into(),
                initialization_time: None,
                error: Some(error),
            })
        }
    }
}

fn ensure_ready(orchestrator: &Orchestrator) -> Result<(), DetectError> {
    match orchestrator.readiness() {
        Readiness::Ready { .. } => Ok(()),
        Readiness::Uninitialized | Readiness::Initializing => Err(DetectError::Initializing),
        Readiness::Failed { error } => Err(DetectError::InitFailed(error)),
        Readiness::Unknown { error } => Err(DetectError::StatusCheck(error)),
    }
}

async fn detect_deepfake(
    orchestrator: web::Data<Orchestrator>,
    detector: web::Data<dyn Detector>,
    uploads: web::Data<UploadSettings>,
    payload: Multipart,
) -> Result<HttpResponse, DetectError> {
    let result = detect(&orchestrator, detector, &uploads, payload).await;
    if let Err(e) = &result {
        warn!("Detection request rejected: {}", e);
    }
    result
}

async fn detect(
    orchestrator: &Orchestrator,
    detector: web::Data<dyn Detector>,
    uploads: &UploadSettings,
    payload: Multipart,
) -> Result<HttpResponse, DetectError> {
    ensure_ready(orchestrator)?;

    let staged = stage_upload(payload, uploads).await?;

    let detector = detector.into_inner();
    let video = staged.path().to_path_buf();
    let score = web::block(move || detector.process(&video))
        .await
        .map_err(|e| DetectError::Blocking(e.to_string()))??;

    drop(staged);

    let result = DetectionResult::from_score(score);
    info!(
        "Scored upload: score={:.4}, is_deepfake={}",
        result.score, result.is_deepfake
    );
    Ok(HttpResponse::Ok().json(result))
}

/// Finds the `file` part, validates its name, and streams it to a fresh
/// staged path.
async fn stage_upload(
    mut payload: Multipart,
    uploads: &UploadSettings,
) -> Result<StagedUpload, DetectError> {
    loop {
        let mut field = match payload.try_next().await {
            Ok(Some(field)) => field,
            Ok(None) => return Err(DetectError::NoFile),
            Err(e) => {
                warn!("Unreadable multipart payload: {}", e);
                return Err(DetectError::NoFile);
            }
        };

        let filename = match field.content_disposition() {
            Some(cd) if field.name() == Some(UPLOAD_FIELD) => {
                cd.get_filename().map(|name| name.to_string())
            }
            _ => None,
        };

        let Some(filename) = filename else {
            while field
                .try_next()
                .await
                .map_err(|e| DetectError::Upload(e.to_string()))?
                .is_some()
            {}
            continue;
        };

        if filename.is_empty() {
            return Err(DetectError::EmptyFilename);
        }
        if !allowed_file(&filename) {
            return Err(DetectError::InvalidFileType);
        }

        let staged = StagedUpload::new(&uploads.upload_dir, &filename);
        let size = save_field(&mut field, staged.path(), uploads.max_upload_bytes).await?;
        info!(
            "Staged upload '{}' ({} bytes) at {}",
            filename,
            size,
            staged.path().display()
        );
        return Ok(staged);
    }
}

async fn save_field(field: &mut Field, dest: &Path, limit: u64) -> Result<u64, DetectError> {
    let mut file = tokio::fs::File::create(dest).await?;
    let mut written = 0u64;

    while let Some(chunk) = field
        .try_next()
        .await
        .map_err(|e| DetectError::Upload(e.to_string()))?
    {
        written += chunk.len() as u64;
        if written > limit {
            return Err(DetectError::FileTooLarge);
        }
        file.write_all(&chunk).await?;
    }
    file.flush().await?;

    Ok(written)
}
