//! Prometheus metrics for observability.
//!
//! This module provides metrics for monitoring the imagedrop server:
//! - HTTP request metrics (latency, counts, in flight)
//! - Display lifetime and surface render counts
//! - Core download and resolution metrics (registered from `imagedrop_core`)

use once_cell::sync::Lazy;
use prometheus::{
    self, Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};

/// Global metrics registry.
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

// =============================================================================
// HTTP Request Metrics
// =============================================================================

/// HTTP request duration in seconds.
pub static HTTP_REQUEST_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "imagedrop_http_request_duration_seconds",
            "HTTP request duration in seconds",
        )
        .buckets(vec![
            0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
        ]),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests total count.
pub static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("imagedrop_http_requests_total", "Total HTTP requests"),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests currently in flight.
pub static HTTP_REQUESTS_IN_FLIGHT: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "imagedrop_http_requests_in_flight",
        "Number of HTTP requests currently being processed",
    )
    .unwrap()
});

// =============================================================================
// Display Metrics
// =============================================================================

/// Whether the display is attached (1) or detached (0).
pub static DISPLAY_ACTIVE: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "imagedrop_display_active",
        "Whether the display is attached (1) or detached (0)",
    )
    .unwrap()
});

/// Renders performed by the HTTP surface (collected dynamically).
pub static SURFACE_RENDERS: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "imagedrop_surface_renders",
        "Number of references rendered by the HTTP surface",
    )
    .unwrap()
});

// =============================================================================
// Registration
// =============================================================================

fn register_metrics(registry: &Registry) {
    // HTTP
    registry
        .register(Box::new(HTTP_REQUEST_DURATION.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_TOTAL.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_IN_FLIGHT.clone()))
        .unwrap();

    // Display
    registry.register(Box::new(DISPLAY_ACTIVE.clone())).unwrap();
    registry
        .register(Box::new(SURFACE_RENDERS.clone()))
        .unwrap();

    // Core metrics (downloads, resolution)
    for metric in imagedrop_core::metrics::all_metrics() {
        registry.register(metric).unwrap();
    }
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer).unwrap();
    String::from_utf8(buffer).unwrap()
}

/// Update gauges that mirror application state before encoding.
pub fn collect_dynamic_metrics(state: &crate::state::AppState) {
    SURFACE_RENDERS.set(state.surface().render_count() as i64);
}

static NUMERIC_SEGMENT: Lazy<regex_lite::Regex> =
    Lazy::new(|| regex_lite::Regex::new(r"/-?\d+(/|$)").unwrap());

/// Normalize a path for metric labels (replace tickets with placeholders).
pub fn normalize_path(path: &str) -> String {
    NUMERIC_SEGMENT.replace_all(path, "/{id}$1").to_string()
}
