use axum::{
    middleware,
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::{display, downloads, handlers, middleware::metrics_middleware};
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    // API routes
    let api_routes = Router::new()
        // Health and config
        .route("/health", get(handlers::health))
        .route("/config", get(handlers::get_config))
        // Display
        .route("/display", get(display::get_display))
        .route("/display/attach", post(display::attach))
        .route("/display/detach", post(display::detach))
        .route("/display/image", get(display::get_image))
        // Downloads
        .route("/downloads", post(downloads::create_download))
        .route("/downloads/{ticket}", delete(downloads::cancel_download));

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/metrics", get(handlers::metrics))
        .with_state(state)
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
}
