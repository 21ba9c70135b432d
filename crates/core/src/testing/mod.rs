//! Testing utilities and mock implementations.
//!
//! Mocks stand in for the collaborators the orchestrator treats as opaque:
//! the download service, the presentation surface and the permission gate.
//!
//! # Example
//!
//! ```rust,ignore
//! use imagedrop_core::testing::{MockDownloadService, RecordingSurface};
//!
//! let completion = CompletionBroadcast::default();
//! let service = Arc::new(MockDownloadService::new().with_completion(completion.clone()));
//! let surface = Arc::new(RecordingSurface::new());
//!
//! // Drive a download to completion
//! service.succeed(ticket);
//! assert_eq!(surface.render_count(), 1);
//! ```

mod mock_download_service;
mod mock_permission_gate;
mod mock_surface;

pub use mock_download_service::{MockDownloadService, RecordedEnqueue};
pub use mock_permission_gate::MockPermissionGate;
pub use mock_surface::RecordingSurface;

/// Test fixtures and helper functions.
pub mod fixtures {
    use crate::download::{DownloadRecord, DownloadStatus, Ticket};

    pub const AUTHORITY: &str = "org.imagedrop.provider";
    pub const PICTURES_DIR: &str = "/storage/pictures";

    /// A succeeded record whose file sits under [`PICTURES_DIR`].
    pub fn succeeded_record(ticket: i64, file_name: &str) -> DownloadRecord {
        DownloadRecord::new(Ticket::new(ticket), DownloadStatus::Succeeded)
            .with_local_uri(format!("file://{}/{}", PICTURES_DIR, file_name))
    }

    /// A failed record with no location.
    pub fn failed_record(ticket: i64) -> DownloadRecord {
        DownloadRecord::new(Ticket::new(ticket), DownloadStatus::Failed)
            .with_reason("HTTP 404 Not Found")
    }
}
