pub mod orchestrator;
pub mod status_store;
pub mod worker;

pub use orchestrator::{Orchestrator, Readiness};
pub use status_store::StatusStore;

/// Command-line argument that turns the service binary into the
/// initialization worker.
pub const WORKER_ARG: &str = "init-worker";
