//! Types for download service operations.

use std::collections::VecDeque;
use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// Errors that can occur during download service operations.
#[derive(Debug, Error)]
pub enum DownloadServiceError {
    #[error("Invalid download request: {0}")]
    InvalidRequest(String),

    #[error("Storage unavailable: {0}")]
    Storage(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Download not found: {0}")]
    NotFound(Ticket),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Opaque identifier the download service assigns to an accepted request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Ticket(i64);

impl Ticket {
    /// Sentinel meaning "no active download".
    pub const NONE: Ticket = Ticket(-1);

    pub fn new(id: i64) -> Self {
        Self(id)
    }

    pub fn id(&self) -> i64 {
        self.0
    }

    pub fn is_none(&self) -> bool {
        *self == Self::NONE
    }
}

impl Default for Ticket {
    fn default() -> Self {
        Self::NONE
    }
}

impl fmt::Display for Ticket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Well-known public directories a download can land in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PublicDirectory {
    Pictures,
}

/// Where the downloaded file should be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Destination {
    pub directory: PublicDirectory,
    /// File name; `{ticket}` is substituted by the service with the ticket it assigns.
    pub file_name: String,
}

impl Destination {
    pub const TICKET_PLACEHOLDER: &'static str = "{ticket}";

    pub fn pictures(file_name: impl Into<String>) -> Self {
        Self {
            directory: PublicDirectory::Pictures,
            file_name: file_name.into(),
        }
    }

    /// Render the file name for an assigned ticket.
    pub fn file_name_for(&self, ticket: Ticket) -> String {
        self.file_name
            .replace(Self::TICKET_PLACEHOLDER, &ticket.to_string())
    }
}

/// Transport types a download may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkTypes {
    #[serde(default = "default_true")]
    pub unmetered: bool,
    #[serde(default = "default_true")]
    pub metered: bool,
}

fn default_true() -> bool {
    true
}

impl NetworkTypes {
    pub const ANY: NetworkTypes = NetworkTypes {
        unmetered: true,
        metered: true,
    };

    pub fn is_empty(&self) -> bool {
        !self.unmetered && !self.metered
    }
}

impl Default for NetworkTypes {
    fn default() -> Self {
        Self::ANY
    }
}

/// Request handed to the download service.
#[derive(Debug, Clone)]
pub struct DownloadRequest {
    /// Source URL.
    pub url: Url,
    /// Title shown by the service's own progress UI.
    pub title: Option<String>,
    pub destination: Destination,
    pub allowed_networks: NetworkTypes,
    pub allow_roaming: bool,
}

impl DownloadRequest {
    /// Create a request with default network policy (any transport, no roaming).
    pub fn new(url: Url, destination: Destination) -> Self {
        Self {
            url,
            title: None,
            destination,
            allowed_networks: NetworkTypes::ANY,
            allow_roaming: false,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_allowed_networks(mut self, networks: NetworkTypes) -> Self {
        self.allowed_networks = networks;
        self
    }

    pub fn with_roaming(mut self, allowed: bool) -> Self {
        self.allow_roaming = allowed;
        self
    }
}

/// Status of a download record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DownloadStatus {
    Pending,
    Running,
    /// Waiting for a permitted network.
    Paused,
    Succeeded,
    Failed,
}

impl DownloadStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DownloadStatus::Pending => "pending",
            DownloadStatus::Running => "running",
            DownloadStatus::Paused => "paused",
            DownloadStatus::Succeeded => "succeeded",
            DownloadStatus::Failed => "failed",
        }
    }

    /// Whether the service will publish no further completion for this record.
    pub fn is_finished(&self) -> bool {
        matches!(self, DownloadStatus::Succeeded | DownloadStatus::Failed)
    }
}

/// A row in the download service's record store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DownloadRecord {
    pub ticket: Ticket,
    pub status: DownloadStatus,
    /// Location of the downloaded file, e.g. `file:///storage/pictures/42.jpg`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local_uri: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub bytes_downloaded: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_bytes: Option<u64>,
    /// Failure or pause reason.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl DownloadRecord {
    pub fn new(ticket: Ticket, status: DownloadStatus) -> Self {
        Self {
            ticket,
            status,
            local_uri: None,
            title: None,
            bytes_downloaded: 0,
            total_bytes: None,
            reason: None,
            updated_at: Utc::now(),
        }
    }

    pub fn with_local_uri(mut self, uri: impl Into<String>) -> Self {
        self.local_uri = Some(uri.into());
        self
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }
}

/// Handle over the result of a record query.
///
/// Must be closed once the caller is done with it.
pub trait RecordCursor: Send {
    /// Move to the first row, if any.
    fn first(&mut self) -> Option<DownloadRecord>;

    /// Release the handle.
    fn close(&mut self);
}

/// Cursor over rows already copied out of the record store.
#[derive(Debug, Default)]
pub struct SnapshotCursor {
    rows: VecDeque<DownloadRecord>,
    closed: bool,
}

impl SnapshotCursor {
    pub fn new(rows: impl IntoIterator<Item = DownloadRecord>) -> Self {
        Self {
            rows: rows.into_iter().collect(),
            closed: false,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl RecordCursor for SnapshotCursor {
    fn first(&mut self) -> Option<DownloadRecord> {
        if self.closed {
            return None;
        }
        self.rows.front().cloned()
    }

    fn close(&mut self) {
        self.closed = true;
        self.rows.clear();
    }
}

/// The platform download manager the orchestrator delegates transfers to.
#[async_trait]
pub trait DownloadService: Send + Sync {
    /// Name of this implementation.
    fn name(&self) -> &str;

    /// Accept a request and return its ticket. The transfer proceeds asynchronously.
    async fn enqueue(&self, request: DownloadRequest) -> Result<Ticket, DownloadServiceError>;

    /// Query the record store filtered by ticket.
    ///
    /// Synchronous; callers run it off the rendering context.
    fn query(&self, ticket: Ticket) -> Result<Box<dyn RecordCursor>, DownloadServiceError>;

    /// Cancel and forget a download, as the service's own notification UI would.
    async fn cancel(&self, ticket: Ticket) -> Result<(), DownloadServiceError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ticket_sentinel() {
        assert!(Ticket::NONE.is_none());
        assert!(Ticket::default().is_none());
        assert!(!Ticket::new(42).is_none());
        assert_eq!(Ticket::new(42).to_string(), "42");
    }

    #[test]
    fn test_ticket_serializes_as_number() {
        let json = serde_json::to_string(&Ticket::new(7)).unwrap();
        assert_eq!(json, "7");
        let parsed: Ticket = serde_json::from_str("-1").unwrap();
        assert!(parsed.is_none());
    }

    #[test]
    fn test_destination_substitutes_ticket() {
        let destination = Destination::pictures("image_{ticket}.png");
        assert_eq!(destination.file_name_for(Ticket::new(12)), "image_12.png");
        assert_eq!(destination.directory, PublicDirectory::Pictures);
    }

    #[test]
    fn test_request_defaults_disallow_roaming() {
        let url = Url::parse("https://example.com/a.jpg").unwrap();
        let request = DownloadRequest::new(url, Destination::pictures("a.jpg"));
        assert!(!request.allow_roaming);
        assert_eq!(request.allowed_networks, NetworkTypes::ANY);
        assert!(request.title.is_none());
    }

    #[test]
    fn test_network_types_empty() {
        let none = NetworkTypes {
            unmetered: false,
            metered: false,
        };
        assert!(none.is_empty());
        assert!(!NetworkTypes::ANY.is_empty());
    }

    #[test]
    fn test_snapshot_cursor_close_releases_rows() {
        let mut cursor = SnapshotCursor::new(vec![DownloadRecord::new(
            Ticket::new(1),
            DownloadStatus::Running,
        )]);
        assert!(cursor.first().is_some());
        cursor.close();
        assert!(cursor.is_closed());
        assert!(cursor.first().is_none());
    }

    #[test]
    fn test_status_finished() {
        assert!(DownloadStatus::Succeeded.is_finished());
        assert!(DownloadStatus::Failed.is_finished());
        assert!(!DownloadStatus::Paused.is_finished());
        assert_eq!(DownloadStatus::Running.as_str(), "running");
    }
}
