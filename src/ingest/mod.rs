//! Ingestion: the per-pass orchestrator, the single-flight runner that
//! launches passes in the background, and the periodic scheduler.

pub mod orchestrator;
pub mod runner;
pub mod scheduler;

pub use orchestrator::{IngestionReport, LocationFailure, Orchestrator};
pub use runner::{IngestionRunner, PassHandle, RunnerStatus};
pub use scheduler::spawn_scheduler;
