use std::env;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {name}: {value}")]
    InvalidValue { name: &'static str, value: String },
}

/// Object-store coordinates of the model weights.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub region: String,
    pub bucket: Option<String>,
    pub model_key: String,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub device: String,
    pub download_models: bool,
    pub weights_dir: PathBuf,
    pub model_file: String,
    pub model_config: PathBuf,
    pub upload_dir: PathBuf,
    pub status_file: PathBuf,
    pub detector_command: String,
    pub init_timeout: Option<Duration>,
    pub storage: StorageConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var_or = |name: &str, default: &str| lookup(name).unwrap_or_else(|| default.to_string());

        let port = match lookup("PORT") {
            Some(value) => value
                .trim()
                .parse::<u16>()
                .map_err(|_| ConfigError::InvalidValue { name: "PORT", value })?,
            None => 5000,
        };

        let init_timeout = match lookup("INIT_TIMEOUT_SECS") {
            Some(value) => {
                let secs = value.trim().parse::<u64>().map_err(|_| ConfigError::InvalidValue {
                    name: "INIT_TIMEOUT_SECS",
                    value,
                })?;
                Some(Duration::from_secs(secs))
            }
            None => None,
        };

        Ok(Self {
            host: var_or("HOST", "0.0.0.0"),
            port,
            device: var_or("DEVICE", "cpu"),
            download_models: var_or("DOWNLOAD_MODELS", "False").eq_ignore_ascii_case("true"),
            weights_dir: PathBuf::from(var_or("WEIGHTS_DIR", "weights")),
            model_file: var_or("MODEL_FILE", "model.pt"),
            model_config: PathBuf::from(var_or("MODEL_CONFIG", "config.json")),
            upload_dir: PathBuf::from(var_or("UPLOAD_DIR", "temp")),
            status_file: PathBuf::from(var_or("STATUS_FILE", "model_status.json")),
            detector_command: var_or("DETECTOR_COMMAND", "deepfake-scan"),
            init_timeout,
            storage: StorageConfig {
                access_key_id: lookup("AWS_ACCESS_KEY_ID"),
                secret_access_key: lookup("AWS_SECRET_ACCESS_KEY"),
                region: var_or("AWS_REGION", "us-east-1"),
                bucket: lookup("S3_BUCKET_NAME"),
                model_key: var_or("MODEL_KEY", "model.pt"),
            },
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn model_path(&self) -> PathBuf {
        self.weights_dir.join(&self.model_file)
    }
}
