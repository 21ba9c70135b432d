//! Presentation surface that records what it was asked to render.

use std::sync::Mutex;

use crate::attachment::AttachmentReference;
use crate::presentation::PresentationSurface;

/// Records every non-empty render call.
#[derive(Debug, Default)]
pub struct RecordingSurface {
    renders: Mutex<Vec<AttachmentReference>>,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// References rendered so far, oldest first.
    pub fn renders(&self) -> Vec<AttachmentReference> {
        self.renders.lock().unwrap().clone()
    }

    pub fn render_count(&self) -> usize {
        self.renders.lock().unwrap().len()
    }

    pub fn last(&self) -> Option<AttachmentReference> {
        self.renders.lock().unwrap().last().cloned()
    }
}

impl PresentationSurface for RecordingSurface {
    fn render(&self, reference: &AttachmentReference) {
        if reference.is_empty() {
            return;
        }
        self.renders.lock().unwrap().push(reference.clone());
    }
}
