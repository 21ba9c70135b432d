//! Display orchestrator: the download / resolve / render cycle.
//!
//! The orchestrator sequences one download at a time:
//! - **Request**: enqueue with the download service, superseding any prior ticket
//! - **Completion**: an untyped event triggers a re-check of the current ticket
//! - **Resolution**: single-flight, on a blocking thread, cancelled with the visible lifetime

mod config;
mod runner;
mod types;

pub use config::{OrchestratorConfig, EXTENSION_PLACEHOLDER};
pub use runner::{Activation, DisplayOrchestrator};
pub use types::{
    CompletionOutcome, DisplayPhase, OrchestratorError, OrchestratorSnapshot, OrchestratorStatus,
};
