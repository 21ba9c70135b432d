//! Attachment references and the provider that turns local files into them.

mod provider;
mod types;

pub use provider::{FileProvider, ProviderError};
pub use types::AttachmentReference;
