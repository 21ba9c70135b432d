//! Download API handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use imagedrop_core::{DownloadServiceError, OrchestratorError, Ticket};

use super::display::require_orchestrator;
use super::handlers::{ApiError, ErrorResponse};
use crate::state::AppState;

/// Request body for starting a download
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CreateDownloadBody {
    /// Image to fetch; the configured image when absent.
    pub url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DownloadResponse {
    pub ticket: Ticket,
    pub url: String,
}

#[derive(Debug, Serialize)]
pub struct CancelResponse {
    pub ticket: Ticket,
    pub cancelled: bool,
}

/// Start downloading an image
pub async fn create_download(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateDownloadBody>,
) -> Result<(StatusCode, Json<DownloadResponse>), ApiError> {
    let orchestrator = require_orchestrator(&state)?;
    let url = body
        .url
        .unwrap_or_else(|| orchestrator.config().image_url.clone());

    match orchestrator.request_download(&url).await {
        Ok(ticket) => Ok((
            StatusCode::ACCEPTED,
            Json(DownloadResponse { ticket, url }),
        )),
        Err(e @ OrchestratorError::InvalidUrl(_)) => Err((
            StatusCode::BAD_REQUEST,
            ErrorResponse::new(e.to_string()),
        )),
        Err(e) => Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            ErrorResponse::new(e.to_string()),
        )),
    }
}

/// Cancel a download through the download service
pub async fn cancel_download(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<CancelResponse>, ApiError> {
    require_orchestrator(&state)?;
    let ticket = Ticket::new(id);

    match state.download_service().cancel(ticket).await {
        Ok(()) => {
            info!(ticket = %ticket, "Download cancelled");
            Ok(Json(CancelResponse {
                ticket,
                cancelled: true,
            }))
        }
        Err(DownloadServiceError::NotFound(_)) => Err((
            StatusCode::NOT_FOUND,
            ErrorResponse::new(format!("Download not found: {}", ticket)),
        )),
        Err(e) => Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            ErrorResponse::new(e.to_string()),
        )),
    }
}
