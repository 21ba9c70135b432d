//! Types for the display orchestrator.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::attachment::AttachmentReference;
use crate::download::{DownloadServiceError, Ticket};

/// Errors that can occur during orchestration.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// The source URL could not be parsed.
    #[error("invalid url: {0}")]
    InvalidUrl(String),

    /// `activate` was called twice without a `deactivate` in between.
    #[error("orchestrator is already active")]
    AlreadyActive,

    /// The download service refused the request.
    #[error("enqueue failed: {0}")]
    Enqueue(#[from] DownloadServiceError),
}

/// Where the orchestrator is in its download/display cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayPhase {
    /// No ticket; the reference is empty or restored.
    #[default]
    Idle,
    /// Waiting for a completion event.
    Downloading,
    /// Resolution in flight on the background context.
    Resolving,
    /// Reference stored and rendered.
    Displayed,
}

impl DisplayPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            DisplayPhase::Idle => "idle",
            DisplayPhase::Downloading => "downloading",
            DisplayPhase::Resolving => "resolving",
            DisplayPhase::Displayed => "displayed",
        }
    }
}

/// The state kept across re-creation of the presentation surface.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrchestratorSnapshot {
    pub ticket: Ticket,
    pub reference: AttachmentReference,
}

/// Current status of the orchestrator.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrchestratorStatus {
    pub phase: DisplayPhase,
    pub ticket: Ticket,
    pub reference: AttachmentReference,
    /// Whether a listener subscription is live.
    pub active: bool,
}

/// What handling one completion event led to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionOutcome {
    /// The resolved reference (possibly empty) was stored and handed to the surface.
    Displayed(AttachmentReference),
    /// The visible lifetime ended mid-resolution; nothing was stored.
    Cancelled,
    /// No subscription is live; the event was ignored.
    Inactive,
    /// The background resolution task died.
    Failed,
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    #[test]
    fn test_snapshot_serialization() {
        let snapshot = OrchestratorSnapshot {
            ticket: Ticket::new(42),
            reference: AttachmentReference::Uri(
                Url::parse("content://org.imagedrop.provider/pictures/42.jpg").unwrap(),
            ),
        };

        let json = serde_json::to_string(&snapshot).unwrap();
        let parsed: OrchestratorSnapshot = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed, snapshot);
    }

    #[test]
    fn test_snapshot_default_has_no_ticket() {
        let snapshot = OrchestratorSnapshot::default();
        assert!(snapshot.ticket.is_none());
        assert!(snapshot.reference.is_empty());
    }

    #[test]
    fn test_orchestrator_status_default() {
        let status = OrchestratorStatus::default();
        assert_eq!(status.phase, DisplayPhase::Idle);
        assert!(status.ticket.is_none());
        assert!(!status.active);
    }

    #[test]
    fn test_error_display() {
        let err = OrchestratorError::InvalidUrl("relative URL without a base".to_string());
        assert_eq!(err.to_string(), "invalid url: relative URL without a base");

        let err = OrchestratorError::from(DownloadServiceError::Storage("full".to_string()));
        assert_eq!(err.to_string(), "enqueue failed: Storage unavailable: full");
    }
}
