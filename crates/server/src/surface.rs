//! Presentation surface served over HTTP.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use imagedrop_core::{AttachmentReference, PresentationSurface};
use tracing::debug;

/// Holds whatever was last rendered so clients can fetch it.
#[derive(Debug, Default)]
pub struct HttpSurface {
    current: RwLock<AttachmentReference>,
    renders: AtomicU64,
}

impl HttpSurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// The last rendered reference, empty if nothing was rendered yet.
    pub fn current(&self) -> AttachmentReference {
        self.current
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
    }

    pub fn render_count(&self) -> u64 {
        self.renders.load(Ordering::Relaxed)
    }
}

impl PresentationSurface for HttpSurface {
    fn render(&self, reference: &AttachmentReference) {
        if reference.is_empty() {
            return;
        }
        *self.current.write().unwrap_or_else(|p| p.into_inner()) = reference.clone();
        let count = self.renders.fetch_add(1, Ordering::Relaxed) + 1;
        debug!(reference = %reference, count, "Surface rendered");
    }
}
