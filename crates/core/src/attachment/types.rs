//! Attachment reference type.

use std::fmt;

use serde::{Deserialize, Serialize};
use url::Url;

/// Renderable handle to a downloaded resource, or nothing to display.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "uri", rename_all = "snake_case")]
pub enum AttachmentReference {
    #[default]
    Empty,
    Uri(Url),
}

impl AttachmentReference {
    pub fn is_empty(&self) -> bool {
        matches!(self, AttachmentReference::Empty)
    }

    pub fn as_url(&self) -> Option<&Url> {
        match self {
            AttachmentReference::Empty => None,
            AttachmentReference::Uri(url) => Some(url),
        }
    }
}

impl From<Url> for AttachmentReference {
    fn from(url: Url) -> Self {
        AttachmentReference::Uri(url)
    }
}

impl fmt::Display for AttachmentReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttachmentReference::Empty => Ok(()),
            AttachmentReference::Uri(url) => write!(f, "{}", url),
        }
    }
}
