//! Download service abstraction.
//!
//! This module provides a `DownloadService` trait for the platform download
//! manager the display orchestrator delegates transfers to, plus a bundled
//! HTTP implementation.

mod config;
mod extension;
mod http;
mod types;

pub use config::{DownloadServiceConfig, NetworkConditions};
pub use extension::{extension_or, file_extension_from_url};
pub use http::HttpDownloadService;
pub use types::*;
