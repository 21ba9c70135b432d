//! Mock download service for testing.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use url::Url;

use crate::completion::CompletionBroadcast;
use crate::download::{
    DownloadRecord, DownloadRequest, DownloadService, DownloadServiceError, DownloadStatus,
    RecordCursor, SnapshotCursor, Ticket,
};

/// A recorded enqueue call for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedEnqueue {
    /// The request that was made.
    pub request: DownloadRequest,
    /// Ticket handed back.
    pub ticket: Ticket,
    /// When the request was made.
    pub timestamp: chrono::DateTime<Utc>,
}

/// Cursor that counts how many times it was closed.
struct CountingCursor {
    inner: SnapshotCursor,
    closes: Arc<AtomicUsize>,
}

impl RecordCursor for CountingCursor {
    fn first(&mut self) -> Option<DownloadRecord> {
        self.inner.first()
    }

    fn close(&mut self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
        self.inner.close();
    }
}

/// Mock implementation of the DownloadService trait.
///
/// Provides controllable behavior for testing:
/// - Track enqueued requests for assertions
/// - Drive records to any status and publish completion events
/// - Count queries and closed cursors
/// - Simulate failures and slow lookups
///
/// # Example
///
/// ```rust,ignore
/// let completion = CompletionBroadcast::default();
/// let service = MockDownloadService::new().with_completion(completion.clone());
///
/// let ticket = service.enqueue(request).await?;
/// service.succeed(ticket); // record -> Succeeded, completion published
///
/// assert_eq!(service.enqueued().len(), 1);
/// ```
pub struct MockDownloadService {
    records: Mutex<HashMap<Ticket, DownloadRecord>>,
    enqueued: Mutex<Vec<RecordedEnqueue>>,
    next_ticket: Mutex<i64>,
    next_error: Mutex<Option<DownloadServiceError>>,
    next_query_error: Mutex<Option<String>>,
    query_delay: Mutex<Option<Duration>>,
    queries: AtomicUsize,
    closes: Arc<AtomicUsize>,
    pictures_dir: PathBuf,
    completion: Option<CompletionBroadcast>,
}

impl Default for MockDownloadService {
    fn default() -> Self {
        Self::new()
    }
}

impl MockDownloadService {
    /// Create a mock writing (notionally) into `/storage/pictures`.
    pub fn new() -> Self {
        Self {
            records: Mutex::new(HashMap::new()),
            enqueued: Mutex::new(Vec::new()),
            next_ticket: Mutex::new(1),
            next_error: Mutex::new(None),
            next_query_error: Mutex::new(None),
            query_delay: Mutex::new(None),
            queries: AtomicUsize::new(0),
            closes: Arc::new(AtomicUsize::new(0)),
            pictures_dir: PathBuf::from("/storage/pictures"),
            completion: None,
        }
    }

    /// Publish completion events on `completion` when downloads finish.
    pub fn with_completion(mut self, completion: CompletionBroadcast) -> Self {
        self.completion = Some(completion);
        self
    }

    /// Use a different notional pictures directory.
    pub fn with_pictures_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.pictures_dir = dir.into();
        self
    }

    /// Start ticket numbering at `first`.
    pub fn with_first_ticket(self, first: i64) -> Self {
        *self.next_ticket.lock().unwrap() = first;
        self
    }

    /// Insert or replace a record.
    pub fn set_record(&self, record: DownloadRecord) {
        self.records.lock().unwrap().insert(record.ticket, record);
    }

    pub fn record(&self, ticket: Ticket) -> Option<DownloadRecord> {
        self.records.lock().unwrap().get(&ticket).cloned()
    }

    /// All recorded enqueue calls.
    pub fn enqueued(&self) -> Vec<RecordedEnqueue> {
        self.enqueued.lock().unwrap().clone()
    }

    /// Configure the next enqueue to fail with the given error.
    pub fn set_next_error(&self, error: DownloadServiceError) {
        *self.next_error.lock().unwrap() = Some(error);
    }

    /// Configure the next query to fail.
    pub fn fail_next_query(&self, message: impl Into<String>) {
        *self.next_query_error.lock().unwrap() = Some(message.into());
    }

    /// Make every query block for `delay` (simulates a slow record store).
    pub fn set_query_delay(&self, delay: Duration) {
        *self.query_delay.lock().unwrap() = Some(delay);
    }

    /// Number of queries performed.
    pub fn queries(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    /// Number of cursor close calls.
    pub fn closed_cursors(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    /// Local location a ticket's file would have.
    pub fn local_uri_for(&self, file_name: &str) -> String {
        Url::from_file_path(self.pictures_dir.join(file_name))
            .map(String::from)
            .unwrap_or_else(|_| format!("file://{}/{}", self.pictures_dir.display(), file_name))
    }

    /// Mark a download as succeeded and publish a completion event.
    pub fn succeed(&self, ticket: Ticket) {
        let file_name = self
            .enqueued
            .lock()
            .unwrap()
            .iter()
            .find(|e| e.ticket == ticket)
            .map(|e| e.request.destination.file_name_for(ticket))
            .unwrap_or_else(|| format!("{}.jpg", ticket));
        let local_uri = self.local_uri_for(&file_name);
        self.finish(
            DownloadRecord::new(ticket, DownloadStatus::Succeeded).with_local_uri(local_uri),
        );
    }

    /// Mark a download as failed and publish a completion event.
    pub fn fail(&self, ticket: Ticket) {
        self.finish(DownloadRecord::new(ticket, DownloadStatus::Failed).with_reason("mock failure"));
    }

    /// Store `record` and publish a completion event.
    pub fn finish(&self, record: DownloadRecord) {
        self.set_record(record);
        self.publish();
    }

    /// Publish a completion event without touching any record.
    pub fn publish(&self) {
        if let Some(ref completion) = self.completion {
            completion.publish();
        }
    }
}

#[async_trait]
impl DownloadService for MockDownloadService {
    fn name(&self) -> &str {
        "mock"
    }

    async fn enqueue(&self, request: DownloadRequest) -> Result<Ticket, DownloadServiceError> {
        if let Some(err) = self.next_error.lock().unwrap().take() {
            return Err(err);
        }

        let ticket = {
            let mut next = self.next_ticket.lock().unwrap();
            let ticket = Ticket::new(*next);
            *next += 1;
            ticket
        };

        let mut record = DownloadRecord::new(ticket, DownloadStatus::Pending);
        record.title = request.title.clone();
        self.set_record(record);

        self.enqueued.lock().unwrap().push(RecordedEnqueue {
            request,
            ticket,
            timestamp: Utc::now(),
        });

        Ok(ticket)
    }

    fn query(&self, ticket: Ticket) -> Result<Box<dyn RecordCursor>, DownloadServiceError> {
        self.queries.fetch_add(1, Ordering::SeqCst);

        let delay = *self.query_delay.lock().unwrap();
        if let Some(delay) = delay {
            std::thread::sleep(delay);
        }

        if let Some(message) = self.next_query_error.lock().unwrap().take() {
            return Err(DownloadServiceError::Internal(message));
        }

        let rows = self.records.lock().unwrap().get(&ticket).cloned();
        Ok(Box::new(CountingCursor {
            inner: SnapshotCursor::new(rows),
            closes: Arc::clone(&self.closes),
        }))
    }

    async fn cancel(&self, ticket: Ticket) -> Result<(), DownloadServiceError> {
        if self.records.lock().unwrap().remove(&ticket).is_none() {
            return Err(DownloadServiceError::NotFound(ticket));
        }
        self.publish();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::download::Destination;

    fn request() -> DownloadRequest {
        DownloadRequest::new(
            Url::parse("https://example.com/a.png").unwrap(),
            Destination::pictures("image_{ticket}.png"),
        )
    }

    #[tokio::test]
    async fn test_enqueue_records_and_assigns_tickets() {
        let service = MockDownloadService::new().with_first_ticket(40);

        let first = service.enqueue(request()).await.unwrap();
        let second = service.enqueue(request()).await.unwrap();

        assert_eq!(first, Ticket::new(40));
        assert_eq!(second, Ticket::new(41));
        assert_eq!(service.enqueued().len(), 2);
        assert_eq!(
            service.record(first).unwrap().status,
            DownloadStatus::Pending
        );
    }

    #[tokio::test]
    async fn test_next_error_applies_once() {
        let service = MockDownloadService::new();
        service.set_next_error(DownloadServiceError::Storage("full".to_string()));

        assert!(service.enqueue(request()).await.is_err());
        assert!(service.enqueue(request()).await.is_ok());
    }

    #[tokio::test]
    async fn test_succeed_uses_destination_file_name() {
        let completion = CompletionBroadcast::default();
        let service = MockDownloadService::new().with_completion(completion.clone());
        let mut subscription = completion.subscribe();

        let ticket = service.enqueue(request()).await.unwrap();
        service.succeed(ticket);

        let record = service.record(ticket).unwrap();
        assert_eq!(record.status, DownloadStatus::Succeeded);
        assert_eq!(
            record.local_uri.as_deref(),
            Some("file:///storage/pictures/image_1.png")
        );
        assert!(subscription.recv().await.is_some());
    }

    #[test]
    fn test_cursor_close_is_counted() {
        let service = MockDownloadService::new();
        let mut cursor = service.query(Ticket::new(1)).unwrap();
        assert!(cursor.first().is_none());
        cursor.close();
        assert_eq!(service.queries(), 1);
        assert_eq!(service.closed_cursors(), 1);
    }
}
