//! Display API handlers.
//!
//! The HTTP surface stands in for the visible screen: attach and detach
//! bracket its lifetime, and the image route serves whatever it last rendered.

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tracing::warn;

use imagedrop_core::{
    AttachmentReference, DisplayOrchestrator, DisplayPhase, Ticket, DENIED_NOTICE,
};

use super::handlers::{ApiError, ErrorResponse};
use crate::state::{AppState, DisplayError};

// ============================================================================
// Request/Response Types
// ============================================================================

/// Current state of the display
#[derive(Debug, Serialize)]
pub struct DisplayResponse {
    /// False when storage permission was denied.
    pub available: bool,
    pub active: bool,
    pub phase: DisplayPhase,
    pub ticket: Ticket,
    pub reference: AttachmentReference,
    /// How many times the surface has rendered.
    pub rendered: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AttachResponse {
    pub active: bool,
    /// Whether a previously displayed image was rendered again.
    pub restored: bool,
}

#[derive(Debug, Serialize)]
pub struct DetachResponse {
    pub active: bool,
}

// ============================================================================
// Helpers
// ============================================================================

/// The orchestrator, or 403 with the permission notice.
pub(crate) fn require_orchestrator(state: &AppState) -> Result<&Arc<DisplayOrchestrator>, ApiError> {
    state
        .orchestrator()
        .ok_or_else(|| (StatusCode::FORBIDDEN, ErrorResponse::new(DENIED_NOTICE)))
}

fn display_error(error: DisplayError) -> ApiError {
    match error {
        DisplayError::Unavailable => (StatusCode::FORBIDDEN, ErrorResponse::new(DENIED_NOTICE)),
        DisplayError::AlreadyAttached => (
            StatusCode::CONFLICT,
            ErrorResponse::new("Display is already attached"),
        ),
        DisplayError::NotAttached => (
            StatusCode::CONFLICT,
            ErrorResponse::new("Display is not attached"),
        ),
    }
}

fn content_type_for(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match extension.as_deref() {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("bmp") => "image/bmp",
        Some("svg") => "image/svg+xml",
        _ => "application/octet-stream",
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// Get the display state
pub async fn get_display(State(state): State<Arc<AppState>>) -> Json<DisplayResponse> {
    let rendered = state.surface().render_count();
    match state.orchestrator() {
        Some(orchestrator) => {
            let status = orchestrator.status();
            Json(DisplayResponse {
                available: true,
                active: status.active,
                phase: status.phase,
                ticket: status.ticket,
                reference: status.reference,
                rendered,
                notice: None,
            })
        }
        None => Json(DisplayResponse {
            available: false,
            active: false,
            phase: DisplayPhase::Idle,
            ticket: Ticket::NONE,
            reference: AttachmentReference::Empty,
            rendered,
            notice: Some(DENIED_NOTICE.to_string()),
        }),
    }
}

/// Begin a visible lifetime
pub async fn attach(
    State(state): State<Arc<AppState>>,
) -> Result<Json<AttachResponse>, impl IntoResponse> {
    match state.attach().await {
        Ok(restored) => Ok(Json(AttachResponse {
            active: true,
            restored,
        })),
        Err(e) => Err(display_error(e)),
    }
}

/// End the visible lifetime
pub async fn detach(
    State(state): State<Arc<AppState>>,
) -> Result<Json<DetachResponse>, impl IntoResponse> {
    match state.detach().await {
        Ok(()) => Ok(Json(DetachResponse { active: false })),
        Err(e) => Err(display_error(e)),
    }
}

/// Serve the bytes of the rendered image
pub async fn get_image(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    require_orchestrator(&state)?;

    let reference = state.surface().current();
    let Some(uri) = reference.as_url() else {
        return Err((
            StatusCode::NOT_FOUND,
            ErrorResponse::new("Nothing has been displayed"),
        ));
    };

    let path = state.provider().path_for_uri(uri).map_err(|e| {
        warn!(reference = %reference, "Rendered reference does not resolve: {}", e);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            ErrorResponse::new(e.to_string()),
        )
    })?;

    match tokio::fs::read(&path).await {
        Ok(bytes) => Ok(([(header::CONTENT_TYPE, content_type_for(&path))], bytes)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err((
            StatusCode::NOT_FOUND,
            ErrorResponse::new(format!("Image file is gone: {}", reference)),
        )),
        Err(e) => Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            ErrorResponse::new(format!("Failed to read image: {}", e)),
        )),
    }
}
