use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use super::{Detector, DetectorError};
use crate::config::AppConfig;

/// Drives an external scoring program that owns the model weights.
#[derive(Debug, Clone)]
pub struct CommandDetector {
    program: String,
    leading_args: Vec<String>,
    weights_dir: PathBuf,
    config_file: PathBuf,
    device: String,
}

impl CommandDetector {
    pub fn new(
        program: impl Into<String>,
        weights_dir: impl Into<PathBuf>,
        config_file: impl Into<PathBuf>,
        device: impl Into<String>,
    ) -> Self {
        Self {
            program: program.into(),
            leading_args: Vec::new(),
            weights_dir: weights_dir.into(),
            config_file: config_file.into(),
            device: device.into(),
        }
    }

    /// Arguments placed before the subcommand, e.g. `-m deepfake_scan`.
    pub fn with_leading_args(mut self, args: Vec<String>) -> Self {
        self.leading_args = args;
        self
    }

    /// `DETECTOR_COMMAND` is split on whitespace: the first word is the
    /// program, the rest are leading arguments.
    pub fn from_config(config: &AppConfig) -> Self {
        let mut words = config.detector_command.split_whitespace().map(str::to_string);
        let program = words.next().unwrap_or_default();
        Self::new(
            program,
            config.weights_dir.clone(),
            config.model_config.clone(),
            config.device.clone(),
        )
        .with_leading_args(words.collect())
    }

    fn common_args(&self, action: &str) -> Vec<OsString> {
        let subcommand: [OsString; 7] = [
            action.into(),
            "--weights".into(),
            self.weights_dir.clone().into_os_string(),
            "--config".into(),
            self.config_file.clone().into_os_string(),
            "--device".into(),
            self.device.clone().into(),
        ];
        self.leading_args
            .iter()
            .map(OsString::from)
            .chain(subcommand)
            .collect()
    }

    fn run(&self, args: Vec<OsString>) -> Result<Output, DetectorError> {
        let output = Command::new(&self.program).args(args).output()?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let reason = if stderr.is_empty() {
                format!("{} exited with {}", self.program, output.status)
            } else {
                stderr
            };
            return Err(DetectorError::Failed(reason));
        }
        Ok(output)
    }
}

impl Detector for CommandDetector {
    fn init(&self) -> Result<(), DetectorError> {
        log::info!(
            "Initializing detector '{}' on device {}",
            self.program,
            self.device
        );
        self.run(self.common_args("init"))?;
        Ok(())
    }

    fn process(&self, video: &Path) -> Result<f64, DetectorError> {
        let mut args = self.common_args("process");
        args.push("--input".into());
        args.push(video.as_os_str().to_owned());

        let output = self.run(args)?;
        parse_score(&String::from_utf8_lossy(&output.stdout))
    }
}

/// The score is the last non-empty line of the program's stdout.
fn parse_score(stdout: &str) -> Result<f64, DetectorError> {
    let line = stdout
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .last()
        .unwrap_or_default();

    match line.parse::<f64>() {
        Ok(score) if score.is_finite() => Ok(score),
        _ => Err(DetectorError::InvalidScore(line.to_string())),
    }
}
