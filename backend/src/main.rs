mod config;
mod detector;
mod readiness;
mod routes;
mod staging;
mod storage;

use std::io;
use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{App, HttpServer, web};
use config::AppConfig;
use detector::{CommandDetector, Detector};
use readiness::{Orchestrator, StatusStore, WORKER_ARG};
use routes::configure_routes;
use staging::UploadSettings;

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = AppConfig::from_env()
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e.to_string()))?;

    if std::env::args().nth(1).as_deref() == Some(WORKER_ARG) {
        return run_worker(&config).await;
    }

    serve(config).await
}

async fn run_worker(config: &AppConfig) -> io::Result<()> {
    log::info!("Initialization worker started (pid {})", std::process::id());

    match readiness::worker::run(config).await {
        Ok(status) => {
            log::info!("Initialization finished with status '{}'", status.state());
            Ok(())
        }
        Err(e) => {
            log::error!("Failed to record initialization status: {}", e);
            Err(io::Error::other(e.to_string()))
        }
    }
}

async fn serve(config: AppConfig) -> io::Result<()> {
    std::fs::create_dir_all(&config.upload_dir)?;
    std::fs::create_dir_all(&config.weights_dir)?;

    let orchestrator = Orchestrator::for_current_exe(StatusStore::new(&config.status_file))?
        .with_init_timeout(config.init_timeout);
    orchestrator.start();

    let orchestrator = web::Data::new(orchestrator);
    let detector: Arc<dyn Detector> = Arc::new(CommandDetector::from_config(&config));
    let detector = web::Data::from(detector);
    let uploads = web::Data::new(UploadSettings::new(&config.upload_dir));

    let bind_address = config.bind_address();
    log::info!("Starting DeepFake Detection API server on {}", bind_address);
    log::info!("Use the /detect endpoint with a POST request and a video file");

    HttpServer::new(move || {
        App::new()
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allowed_methods(vec!["GET", "POST", "OPTIONS"])
                    .allowed_headers(vec![
                        actix_web::http::header::ACCEPT,
                        actix_web::http::header::CONTENT_TYPE,
                    ])
                    .max_age(3600),
            )
            .app_data(orchestrator.clone())
            .app_data(detector.clone())
            .app_data(uploads.clone())
            .configure(configure_routes)
    })
    .bind(&bind_address)?
    .run()
    .await
}
