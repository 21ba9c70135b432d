//! Request metrics for the HTTP API.

use std::time::Instant;

use axum::{
    body::Body,
    extract::MatchedPath,
    http::Request,
    middleware::Next,
    response::Response,
};

use crate::metrics::{
    normalize_path, HTTP_REQUESTS_IN_FLIGHT, HTTP_REQUESTS_TOTAL, HTTP_REQUEST_DURATION,
};

/// Holds one slot of the in-flight gauge until dropped.
struct InFlight;

impl InFlight {
    fn enter() -> Self {
        HTTP_REQUESTS_IN_FLIGHT.inc();
        InFlight
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        HTTP_REQUESTS_IN_FLIGHT.dec();
    }
}

/// Route label for a request: the route template when one matched,
/// otherwise the raw path with numeric segments collapsed.
fn route_label(request: &Request<Body>) -> String {
    match request.extensions().get::<MatchedPath>() {
        Some(matched) => matched.as_str().to_string(),
        None => normalize_path(request.uri().path()),
    }
}

/// Count and time every request by method, route and status.
pub async fn metrics_middleware(request: Request<Body>, next: Next) -> Response {
    let labels = [request.method().as_str().to_string(), route_label(&request)];
    let started = Instant::now();

    let response = {
        let _slot = InFlight::enter();
        next.run(request).await
    };

    let status = response.status().as_u16().to_string();
    let values = [labels[0].as_str(), labels[1].as_str(), status.as_str()];
    HTTP_REQUEST_DURATION
        .with_label_values(&values)
        .observe(started.elapsed().as_secs_f64());
    HTTP_REQUESTS_TOTAL.with_label_values(&values).inc();

    response
}
