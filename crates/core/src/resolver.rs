//! Resolution of a download ticket into an attachment reference.

use std::sync::Arc;

use tracing::{debug, warn};
use url::Url;

use crate::attachment::{AttachmentReference, FileProvider};
use crate::download::{DownloadRecord, DownloadService, DownloadStatus, RecordCursor, Ticket};

const FILE_SCHEME: &str = "file";

/// Closes the wrapped cursor exactly once, when dropped.
struct CursorGuard(Box<dyn RecordCursor>);

impl CursorGuard {
    fn first(&mut self) -> Option<DownloadRecord> {
        self.0.first()
    }
}

impl Drop for CursorGuard {
    fn drop(&mut self) {
        self.0.close();
    }
}

/// Turns a finished ticket into an attachment reference by querying the download service.
pub struct FileResolver {
    service: Arc<dyn DownloadService>,
    provider: FileProvider,
}

impl FileResolver {
    pub fn new(service: Arc<dyn DownloadService>, provider: FileProvider) -> Self {
        Self { service, provider }
    }

    pub fn provider(&self) -> &FileProvider {
        &self.provider
    }

    /// Resolve `ticket` into something displayable.
    ///
    /// Performs one synchronous query, so run it off the rendering context.
    /// Every failure yields the empty reference.
    pub fn resolve(&self, ticket: Ticket) -> AttachmentReference {
        let cursor = match self.service.query(ticket) {
            Ok(cursor) => cursor,
            Err(e) => {
                warn!(%ticket, "Download record query failed: {}", e);
                return AttachmentReference::Empty;
            }
        };
        let mut cursor = CursorGuard(cursor);

        let Some(record) = cursor.first() else {
            debug!(%ticket, "No download record");
            return AttachmentReference::Empty;
        };

        if record.status != DownloadStatus::Succeeded {
            debug!(%ticket, status = record.status.as_str(), "Download did not succeed");
            return AttachmentReference::Empty;
        }

        let Some(location) = record.local_uri.as_deref() else {
            debug!(%ticket, "Download succeeded without a local location");
            return AttachmentReference::Empty;
        };

        let path = match Url::parse(location) {
            Ok(uri) if uri.scheme() == FILE_SCHEME => match uri.to_file_path() {
                Ok(path) => path,
                Err(()) => {
                    debug!(%ticket, location, "Local location has no file path");
                    return AttachmentReference::Empty;
                }
            },
            Ok(uri) => {
                debug!(%ticket, scheme = uri.scheme(), "Local location is not a file");
                return AttachmentReference::Empty;
            }
            Err(e) => {
                debug!(%ticket, location, "Unparseable local location: {}", e);
                return AttachmentReference::Empty;
            }
        };

        match self.provider.uri_for_file(&path) {
            Ok(uri) => AttachmentReference::Uri(uri),
            Err(e) => {
                warn!(%ticket, "Cannot share downloaded file: {}", e);
                AttachmentReference::Empty
            }
        }
    }
}
