//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Download requests and transfers
//! - Completion events and their resolution into attachment references

use once_cell::sync::Lazy;
use prometheus::{Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts};

// =============================================================================
// Download Metrics
// =============================================================================

/// Downloads requested by the orchestrator.
pub static DOWNLOADS_REQUESTED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "imagedrop_downloads_requested_total",
        "Total downloads handed to the download service",
    )
    .unwrap()
});

/// Transfers finished by the bundled download service, by status.
pub static TRANSFERS_FINISHED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "imagedrop_transfers_finished_total",
            "Total transfers finished by the download service",
        ),
        &["status"], // "succeeded", "failed", "cancelled"
    )
    .unwrap()
});

// =============================================================================
// Resolution Metrics
// =============================================================================

/// Completion events handled while a display was active.
pub static COMPLETION_EVENTS: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "imagedrop_completion_events_total",
        "Total completion events handled",
    )
    .unwrap()
});

/// Resolutions by outcome.
pub static RESOLUTIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("imagedrop_resolutions_total", "Total ticket resolutions"),
        &["outcome"], // "displayed", "empty", "cancelled", "failed"
    )
    .unwrap()
});

/// Time spent resolving a ticket on the background context.
pub static RESOLUTION_DURATION: Lazy<Histogram> = Lazy::new(|| {
    Histogram::with_opts(
        HistogramOpts::new(
            "imagedrop_resolution_duration_seconds",
            "Duration of ticket resolution",
        )
        .buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0]),
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        Box::new(DOWNLOADS_REQUESTED.clone()),
        Box::new(TRANSFERS_FINISHED.clone()),
        Box::new(COMPLETION_EVENTS.clone()),
        Box::new(RESOLUTIONS.clone()),
        Box::new(RESOLUTION_DURATION.clone()),
    ]
}
