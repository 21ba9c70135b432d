//! HTTP download service implementation.
//!
//! Plays the part of the platform download manager: it owns the record
//! store, performs transfers in the background and publishes a completion
//! event whenever a download finishes, fails or is cancelled.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex, RwLock, RwLockWriteGuard};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use url::Url;

use crate::completion::CompletionBroadcast;
use crate::metrics::TRANSFERS_FINISHED;

use super::config::{DownloadServiceConfig, NetworkConditions};
use super::types::{
    DownloadRecord, DownloadRequest, DownloadService, DownloadServiceError, DownloadStatus,
    PublicDirectory, RecordCursor, SnapshotCursor, Ticket,
};

type RecordMap = Arc<RwLock<HashMap<Ticket, DownloadRecord>>>;

/// Download service backed by reqwest, writing into the public pictures directory.
pub struct HttpDownloadService {
    client: Client,
    pictures_dir: PathBuf,
    network: NetworkConditions,
    records: RecordMap,
    transfers: Mutex<HashMap<Ticket, JoinHandle<()>>>,
    next_ticket: AtomicI64,
    completion: CompletionBroadcast,
}

impl HttpDownloadService {
    /// Create a new service writing into `pictures_dir`.
    pub fn new(
        config: &DownloadServiceConfig,
        pictures_dir: &Path,
        completion: CompletionBroadcast,
    ) -> Result<Self, DownloadServiceError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| DownloadServiceError::Internal(e.to_string()))?;

        let pictures_dir = std::path::absolute(pictures_dir)
            .map_err(|e| DownloadServiceError::Storage(e.to_string()))?;

        Ok(Self {
            client,
            pictures_dir,
            network: config.network,
            records: Arc::new(RwLock::new(HashMap::new())),
            transfers: Mutex::new(HashMap::new()),
            next_ticket: AtomicI64::new(1),
            completion,
        })
    }

    /// Start numbering tickets at `first` instead of 1.
    ///
    /// Used to carry ticket identity across restarts; values below 1 are ignored.
    pub fn with_first_ticket(self, first: i64) -> Self {
        self.next_ticket.store(first.max(1), Ordering::SeqCst);
        self
    }

    /// Absolute directory downloads land in.
    pub fn pictures_dir(&self) -> &Path {
        &self.pictures_dir
    }

    fn directory_for(&self, directory: PublicDirectory) -> &Path {
        match directory {
            PublicDirectory::Pictures => &self.pictures_dir,
        }
    }

    fn write_records(records: &RecordMap) -> RwLockWriteGuard<'_, HashMap<Ticket, DownloadRecord>> {
        records.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn update_record(records: &RecordMap, ticket: Ticket, update: impl FnOnce(&mut DownloadRecord)) {
        if let Some(record) = Self::write_records(records).get_mut(&ticket) {
            update(record);
            record.updated_at = Utc::now();
        }
    }

    /// Perform one transfer and publish its completion.
    async fn run_transfer(
        client: Client,
        records: RecordMap,
        completion: CompletionBroadcast,
        ticket: Ticket,
        url: Url,
        path: PathBuf,
    ) {
        Self::update_record(&records, ticket, |r| r.status = DownloadStatus::Running);

        let outcome = match Self::claim_destination(&records, ticket, &path).await {
            Ok(file) => {
                let result = Self::transfer(&client, &records, ticket, &url, file).await;
                if result.is_err() {
                    // Only reached when this transfer created the file.
                    let _ = tokio::fs::remove_file(&path).await;
                }
                result
            }
            Err(e) => Err(e),
        };

        match outcome {
            Ok(bytes) => {
                info!(%ticket, bytes, path = %path.display(), "Download succeeded");
                Self::update_record(&records, ticket, |r| r.status = DownloadStatus::Succeeded);
                TRANSFERS_FINISHED.with_label_values(&["succeeded"]).inc();
            }
            Err(e) => {
                warn!(%ticket, "Download failed: {}", e);
                Self::update_record(&records, ticket, |r| {
                    r.status = DownloadStatus::Failed;
                    r.reason = Some(e.to_string());
                });
                TRANSFERS_FINISHED.with_label_values(&["failed"]).inc();
            }
        }

        completion.publish();
    }

    /// Create the destination file, refusing to touch one that already exists.
    ///
    /// The location is recorded first so a cancel racing the create still
    /// finds the file to delete.
    async fn claim_destination(
        records: &RecordMap,
        ticket: Ticket,
        path: &Path,
    ) -> Result<File, DownloadServiceError> {
        let local_uri = Url::from_file_path(path).ok().map(String::from);
        Self::update_record(records, ticket, |r| r.local_uri = local_uri);

        match OpenOptions::new().write(true).create_new(true).open(path).await {
            Ok(file) => Ok(file),
            Err(e) => {
                Self::update_record(records, ticket, |r| r.local_uri = None);
                Err(DownloadServiceError::Storage(format!(
                    "{}: {}",
                    path.display(),
                    e
                )))
            }
        }
    }

    async fn transfer(
        client: &Client,
        records: &RecordMap,
        ticket: Ticket,
        url: &Url,
        mut file: File,
    ) -> Result<u64, DownloadServiceError> {
        let mut response = client
            .get(url.clone())
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| DownloadServiceError::Http(e.to_string()))?;

        let total = response.content_length();
        Self::update_record(records, ticket, |r| r.total_bytes = total);

        let mut written = 0u64;
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| DownloadServiceError::Http(e.to_string()))?
        {
            file.write_all(&chunk)
                .await
                .map_err(|e| DownloadServiceError::Storage(e.to_string()))?;
            written += chunk.len() as u64;
            Self::update_record(records, ticket, |r| r.bytes_downloaded = written);
        }

        file.flush()
            .await
            .map_err(|e| DownloadServiceError::Storage(e.to_string()))?;

        Ok(written)
    }
}

#[async_trait]
impl DownloadService for HttpDownloadService {
    fn name(&self) -> &str {
        "http"
    }

    async fn enqueue(&self, request: DownloadRequest) -> Result<Ticket, DownloadServiceError> {
        if request.allowed_networks.is_empty() {
            return Err(DownloadServiceError::InvalidRequest(
                "no network types allowed".to_string(),
            ));
        }
        if !matches!(request.url.scheme(), "http" | "https") {
            return Err(DownloadServiceError::InvalidRequest(format!(
                "unsupported scheme: {}",
                request.url.scheme()
            )));
        }

        let directory = self.directory_for(request.destination.directory).to_path_buf();
        tokio::fs::create_dir_all(&directory)
            .await
            .map_err(|e| DownloadServiceError::Storage(format!("{}: {}", directory.display(), e)))?;

        // Never hand out a ticket whose file is already on disk.
        let (ticket, path) = loop {
            let ticket = Ticket::new(self.next_ticket.fetch_add(1, Ordering::SeqCst));
            let path = directory.join(request.destination.file_name_for(ticket));
            if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
                break (ticket, path);
            }
            debug!(%ticket, path = %path.display(), "Destination taken, skipping ticket");
        };

        let mut record = DownloadRecord::new(ticket, DownloadStatus::Pending);
        record.title = request.title.clone();

        let permitted = self.network.permits(&request);
        if !permitted {
            record.status = DownloadStatus::Paused;
            record.reason = Some("waiting for a permitted network".to_string());
        }
        Self::write_records(&self.records).insert(ticket, record);

        info!(
            %ticket,
            url = %request.url,
            destination = %path.display(),
            "Download enqueued"
        );

        if !permitted {
            debug!(%ticket, "Current network not permitted, download paused");
            return Ok(ticket);
        }

        let handle = tokio::spawn(Self::run_transfer(
            self.client.clone(),
            Arc::clone(&self.records),
            self.completion.clone(),
            ticket,
            request.url,
            path,
        ));

        let mut transfers = self.transfers.lock().unwrap_or_else(|p| p.into_inner());
        transfers.retain(|_, h| !h.is_finished());
        transfers.insert(ticket, handle);

        Ok(ticket)
    }

    fn query(&self, ticket: Ticket) -> Result<Box<dyn RecordCursor>, DownloadServiceError> {
        let records = self.records.read().unwrap_or_else(|p| p.into_inner());
        let rows = records.get(&ticket).cloned();
        Ok(Box::new(SnapshotCursor::new(rows)))
    }

    async fn cancel(&self, ticket: Ticket) -> Result<(), DownloadServiceError> {
        let handle = self
            .transfers
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .remove(&ticket);
        if let Some(handle) = handle {
            handle.abort();
        }

        let removed = Self::write_records(&self.records).remove(&ticket);
        let Some(record) = removed else {
            return Err(DownloadServiceError::NotFound(ticket));
        };

        let partial = record
            .local_uri
            .as_deref()
            .and_then(|uri| Url::parse(uri).ok())
            .and_then(|uri| uri.to_file_path().ok());
        if let Some(path) = partial {
            let _ = tokio::fs::remove_file(path).await;
        }

        info!(%ticket, "Download cancelled");
        TRANSFERS_FINISHED.with_label_values(&["cancelled"]).inc();

        // The platform reports a cancelled download as finished too.
        self.completion.publish();
        Ok(())
    }
}
