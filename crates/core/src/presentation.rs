//! The surface downloaded images are shown on.

use crate::attachment::AttachmentReference;

/// A view that can render a reference to an image.
///
/// Rendering [`AttachmentReference::Empty`] must be a no-op.
pub trait PresentationSurface: Send + Sync {
    fn render(&self, reference: &AttachmentReference);
}
