use std::ffi::OsString;
use std::path::PathBuf;
use std::process::{Child, Command};
use std::sync::OnceLock;
use std::time::{Duration, Instant};

use shared::InitializationStatus;

use super::WORKER_ARG;
use super::status_store::{StatusError, StatusStore};

/// Readiness as seen by the request-serving process.
#[derive(Debug, Clone, PartialEq)]
pub enum Readiness {
    Uninitialized,
    Initializing,
    Ready { initialization_time: f64 },
    Failed { error: String },
    /// The status file exists but could not be read.
    Unknown { error: String },
}

/// Launches model initialization in a separate worker process and answers
/// readiness queries from the status file the worker leaves behind.
pub struct Orchestrator {
    store: StatusStore,
    program: PathBuf,
    args: Vec<OsString>,
    init_timeout: Option<Duration>,
    started_at: OnceLock<Instant>,
}

impl Orchestrator {
    pub fn new(store: StatusStore, program: impl Into<PathBuf>, args: Vec<OsString>) -> Self {
        Self {
            store,
            program: program.into(),
            args,
            init_timeout: None,
            started_at: OnceLock::new(),
        }
    }

    /// Worker is this same binary, re-executed in worker mode.
    pub fn for_current_exe(store: StatusStore) -> std::io::Result<Self> {
        let program = std::env::current_exe()?;
        Ok(Self::new(store, program, vec![WORKER_ARG.into()]))
    }

    pub fn with_init_timeout(mut self, init_timeout: Option<Duration>) -> Self {
        self.init_timeout = init_timeout;
        self
    }

    /// Spawns the worker and returns immediately. Spawn failures are reported
    /// through the status file, never to the caller.
    pub fn start(&self) {
        if self.started_at.set(Instant::now()).is_err() {
            log::warn!("Initialization worker already started, ignoring");
            return;
        }

        if let Err(e) = self.store.clear() {
            log::error!("Failed to remove stale status file: {}", e);
        }

        match Command::new(&self.program).args(&self.args).spawn() {
            Ok(child) => {
                log::info!(
                    "Started initialization worker (pid {}), reporting to {}",
                    child.id(),
                    self.store.path().display()
                );
                self.watch(child);
            }
            Err(e) => {
                log::error!("Failed to start initialization worker: {}", e);
                let status = InitializationStatus::Error {
                    error: format!("Failed to start initialization worker: {}", e),
                };
                if let Err(e) = self.store.publish(&status) {
                    log::error!("Failed to record worker spawn failure: {}", e);
                }
            }
        }
    }

    /// Reaps the worker so it does not linger as a zombie, and records an
    /// error if it exits without reporting.
    fn watch(&self, mut child: Child) {
        let store = self.store.clone();
        let spawned = std::thread::Builder::new()
            .name("init-worker-reaper".into())
            .spawn(move || match child.wait() {
                Ok(exit) => {
                    log::info!("Initialization worker exited with {}", exit);
                    if let Ok(None) = store.read() {
                        let status = InitializationStatus::Error {
                            error: format!(
                                "Initialization worker exited with {} before reporting",
                                exit
                            ),
                        };
                        if let Err(e) = store.publish(&status) {
                            log::error!("Failed to record worker exit: {}", e);
                        }
                    }
                }
                Err(e) => log::error!("Failed to wait for initialization worker: {}", e),
            });

        if let Err(e) = spawned {
            log::warn!("Failed to watch initialization worker: {}", e);
        }
    }

    /// Plain read of the status file.
    pub fn current_status(&self) -> Result<Option<InitializationStatus>, StatusError> {
        self.store.read()
    }

    pub fn readiness(&self) -> Readiness {
        match self.current_status() {
            Ok(Some(InitializationStatus::Ready {
                initialization_time,
            })) => Readiness::Ready {
                initialization_time,
            },
            Ok(Some(InitializationStatus::Error { error })) => Readiness::Failed { error },
            Ok(None) => match (self.started_at.get(), self.init_timeout) {
                (None, _) => Readiness::Uninitialized,
                (Some(started), Some(timeout)) if started.elapsed() > timeout => {
                    Readiness::Failed {
                        error: format!(
                            "Initialization did not complete within {} seconds",
                            timeout.as_secs()
                        ),
                    }
                }
                (Some(_), _) => Readiness::Initializing,
            },
            Err(e) => Readiness::Unknown {
                error: e.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use tempfile::TempDir;

    fn wait_for<F: Fn() -> bool>(condition: F) -> bool {
        for _ in 0..100 {
            if condition() {
                return true;
            }
            std::thread::sleep(Duration::from_millis(50));
        }
        false
    }

    fn shell(status_path: &Path, script: &str) -> Vec<OsString> {
        vec![
            "-c".into(),
            script.replace("{status}", &status_path.display().to_string()).into(),
        ]
    }

    #[test]
    fn not_started_is_uninitialized() {
        let dir = TempDir::new().unwrap();
        let orchestrator = Orchestrator::new(
            StatusStore::new(dir.path().join("status.json")),
            "/bin/sh",
            vec![],
        );
        assert_eq!(orchestrator.readiness(), Readiness::Uninitialized);
        assert!(orchestrator.current_status().unwrap().is_none());
    }

    #[test]
    fn worker_report_moves_initializing_to_ready() {
        let dir = TempDir::new().unwrap();
        let status_path = dir.path().join("status.json");
        let args = shell(
            &status_path,
            r#"sleep 0.5 && printf '%s' '{"status":"ready","initialization_time":12.3}' > '{status}.part' && mv '{status}.part' '{status}'"#,
        );
        let orchestrator = Orchestrator::new(StatusStore::new(&status_path), "/bin/sh", args);

        orchestrator.start();
        assert_eq!(orchestrator.readiness(), Readiness::Initializing);

        assert!(wait_for(|| orchestrator.readiness() != Readiness::Initializing));
        assert_eq!(
            orchestrator.readiness(),
            Readiness::Ready {
                initialization_time: 12.3
            }
        );
    }

    #[test]
    fn stale_status_from_previous_run_is_cleared() {
        let dir = TempDir::new().unwrap();
        let status_path = dir.path().join("status.json");
        let store = StatusStore::new(&status_path);
        store
            .publish(&InitializationStatus::Ready {
                initialization_time: 1.0,
            })
            .unwrap();

        let orchestrator = Orchestrator::new(store, "/bin/sh", shell(&status_path, "sleep 1"));
        orchestrator.start();

        assert_eq!(orchestrator.readiness(), Readiness::Initializing);
    }

    #[test]
    fn spawn_failure_is_reported_as_error() {
        let dir = TempDir::new().unwrap();
        let orchestrator = Orchestrator::new(
            StatusStore::new(dir.path().join("status.json")),
            "/nonexistent/deepfake-api",
            vec![WORKER_ARG.into()],
        );

        orchestrator.start();

        match orchestrator.readiness() {
            Readiness::Failed { error } => {
                assert!(error.starts_with("Failed to start initialization worker"))
            }
            other => panic!("unexpected readiness {:?}", other),
        }
    }

    #[test]
    fn worker_exiting_silently_is_reported_as_error() {
        let dir = TempDir::new().unwrap();
        let status_path = dir.path().join("status.json");
        let orchestrator = Orchestrator::new(
            StatusStore::new(&status_path),
            "/bin/sh",
            shell(&status_path, "exit 3"),
        );

        orchestrator.start();

        assert!(wait_for(|| matches!(
            orchestrator.readiness(),
            Readiness::Failed { .. }
        )));
        match orchestrator.readiness() {
            Readiness::Failed { error } => assert!(error.contains("before reporting")),
            other => panic!("unexpected readiness {:?}", other),
        }
    }

    #[test]
    fn init_timeout_reclassifies_a_stuck_worker() {
        let dir = TempDir::new().unwrap();
        let status_path = dir.path().join("status.json");
        let orchestrator = Orchestrator::new(
            StatusStore::new(&status_path),
            "/bin/sh",
            shell(&status_path, "sleep 5"),
        )
        .with_init_timeout(Some(Duration::ZERO));

        orchestrator.start();
        std::thread::sleep(Duration::from_millis(10));

        match orchestrator.readiness() {
            Readiness::Failed { error } => assert!(error.contains("did not complete within 0")),
            other => panic!("unexpected readiness {:?}", other),
        }
        assert!(orchestrator.current_status().unwrap().is_none());
    }

    #[test]
    fn unreadable_status_is_unknown() {
        let dir = TempDir::new().unwrap();
        let status_path = dir.path().join("status.json");
        std::fs::write(&status_path, b"not json").unwrap();

        let orchestrator = Orchestrator::new(StatusStore::new(&status_path), "/bin/sh", vec![]);
        assert!(matches!(
            orchestrator.readiness(),
            Readiness::Unknown { .. }
        ));
    }
}
