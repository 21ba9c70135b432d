//! Common test utilities for in-process API testing with mocks.
//!
//! This module provides a test fixture that wires the router to a mock
//! download service and a real snapshot store in a temp dir, so the whole
//! display flow can be driven without network access.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::body::{Body, Bytes};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use imagedrop_core::{
    config::{PermissionConfig, ServerConfig, StorageConfig},
    testing::MockDownloadService,
    CompletionBroadcast, Config, DisplayOrchestrator, DownloadService, FileProvider, FileResolver,
    PermissionMethod, PermissionStatus, PresentationSurface, SnapshotStore, SqliteSnapshotStore,
    Ticket,
};
use imagedrop_server::state::AppState;
use imagedrop_server::surface::HttpSurface;

/// Re-export fixtures for test convenience
pub use imagedrop_core::testing::fixtures;

/// Test fixture for API testing with mock dependencies.
///
/// # Example
///
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_download() {
///     let fixture = TestFixture::new().await;
///
///     let response = fixture.post("/api/v1/downloads", json!({})).await;
///
///     assert_eq!(response.status, 202);
/// }
/// ```
pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    /// Shared state behind the router
    pub state: Arc<AppState>,
    /// Mock download service - drive downloads to completion
    pub service: Arc<MockDownloadService>,
    /// Snapshot store the state saves into
    pub snapshot_store: Arc<SqliteSnapshotStore>,
    /// Directory downloads (notionally) land in
    pub pictures_dir: PathBuf,
    /// Temporary directory for the database and pictures
    pub temp_dir: TempDir,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

/// Response with a raw body
#[derive(Debug)]
pub struct RawResponse {
    pub status: StatusCode,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

impl TestFixture {
    /// Create a new test fixture with storage permission granted.
    pub async fn new() -> Self {
        Self::with_config(TestConfig::default()).await
    }

    /// Create a test fixture with custom configuration.
    pub async fn with_config(test_config: TestConfig) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let pictures_dir = temp_dir.path().join("pictures");
        std::fs::create_dir_all(&pictures_dir).expect("Failed to create pictures dir");
        let state_path = temp_dir.path().join("state.db");

        let config = Config {
            server: ServerConfig {
                host: std::net::IpAddr::V4(std::net::Ipv4Addr::LOCALHOST),
                port: 0, // Not used for in-process testing
            },
            storage: StorageConfig {
                pictures_dir: pictures_dir.clone(),
                state_path: state_path.clone(),
            },
            permission: PermissionConfig {
                method: PermissionMethod::Granted,
            },
            ..Default::default()
        };

        let completion = CompletionBroadcast::new(config.download.completion_buffer);
        let service = Arc::new(
            MockDownloadService::new()
                .with_pictures_dir(&pictures_dir)
                .with_completion(completion.clone()),
        );
        let download_service = Arc::clone(&service) as Arc<dyn DownloadService>;
        let provider = FileProvider::new(fixtures::AUTHORITY).with_root("pictures", &pictures_dir);
        let surface = Arc::new(HttpSurface::new());
        let snapshot_store = Arc::new(
            SqliteSnapshotStore::new(&state_path).expect("Failed to create snapshot store"),
        );

        let orchestrator = if test_config.permission.is_granted() {
            Some(Arc::new(DisplayOrchestrator::new(
                config.orchestrator.clone(),
                Arc::clone(&download_service),
                completion,
                FileResolver::new(Arc::clone(&download_service), provider.clone()),
                Arc::clone(&surface) as Arc<dyn PresentationSurface>,
            )))
        } else {
            None
        };

        let state = Arc::new(AppState::new(
            config,
            test_config.permission,
            download_service,
            provider,
            surface,
            Arc::clone(&snapshot_store) as Arc<dyn SnapshotStore>,
            orchestrator,
        ));

        let router = imagedrop_server::api::create_router(Arc::clone(&state));

        Self {
            router,
            state,
            service,
            snapshot_store,
            pictures_dir,
            temp_dir,
        }
    }

    /// Write the bytes a finished download would have left behind.
    pub fn write_picture(&self, file_name: &str, bytes: &[u8]) {
        std::fs::write(self.pictures_dir.join(file_name), bytes).expect("Failed to write picture");
    }

    /// Finish `ticket` successfully and wait until the display shows it.
    pub async fn complete_download(&self, ticket: Ticket) -> bool {
        self.service.succeed(ticket);
        self.wait_for_phase("displayed", Duration::from_secs(2)).await
    }

    /// Wait until `GET /api/v1/display` reports `phase`.
    pub async fn wait_for_phase(&self, phase: &str, timeout: Duration) -> bool {
        let start = std::time::Instant::now();
        let poll_interval = Duration::from_millis(10);

        while start.elapsed() < timeout {
            let response = self.get("/api/v1/display").await;
            if response.body["phase"] == phase {
                return true;
            }
            tokio::time::sleep(poll_interval).await;
        }
        false
    }

    /// Send a GET request to the test server.
    pub async fn get(&self, path: &str) -> TestResponse {
        self.request("GET", path, None).await
    }

    /// Send a POST request with JSON body.
    pub async fn post(&self, path: &str, body: Value) -> TestResponse {
        self.request("POST", path, Some(body)).await
    }

    /// Send a POST request without a body.
    pub async fn post_empty(&self, path: &str) -> TestResponse {
        self.request("POST", path, None).await
    }

    /// Send a DELETE request.
    pub async fn delete(&self, path: &str) -> TestResponse {
        self.request("DELETE", path, None).await
    }

    /// Send a GET request and keep the raw body.
    pub async fn get_raw(&self, path: &str) -> RawResponse {
        let request = Request::builder()
            .method("GET")
            .uri(path)
            .body(Body::empty())
            .unwrap();

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        RawResponse {
            status,
            content_type,
            bytes,
        }
    }

    /// Send a request to the test server.
    async fn request(&self, method: &str, path: &str, body: Option<Value>) -> TestResponse {
        let mut request_builder = Request::builder().method(method).uri(path);

        let body = if let Some(json_body) = body {
            request_builder = request_builder.header("Content-Type", "application/json");
            Body::from(serde_json::to_vec(&json_body).unwrap())
        } else {
            Body::empty()
        };

        let request = request_builder.body(body).unwrap();

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        let body: Value = if body_bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
        };

        TestResponse { status, body }
    }
}

/// Configuration for test fixture.
#[derive(Debug, Clone)]
pub struct TestConfig {
    /// Outcome of the storage permission request
    pub permission: PermissionStatus,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            permission: PermissionStatus::Granted,
        }
    }
}

impl TestConfig {
    /// Create config where storage permission was refused.
    pub fn denied() -> Self {
        Self {
            permission: PermissionStatus::Denied {
                reason: "read-only storage".to_string(),
            },
        }
    }
}
