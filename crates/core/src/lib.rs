pub mod attachment;
pub mod completion;
pub mod config;
pub mod download;
pub mod metrics;
pub mod orchestrator;
pub mod permission;
pub mod presentation;
pub mod resolver;
pub mod snapshot;
pub mod testing;

pub use attachment::{AttachmentReference, FileProvider, ProviderError};
pub use completion::{CompletionBroadcast, CompletionEvent, CompletionSubscription};
pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, PermissionMethod,
    SanitizedConfig,
};
pub use download::{
    DownloadRecord, DownloadRequest, DownloadService, DownloadServiceConfig, DownloadServiceError,
    DownloadStatus, HttpDownloadService, Ticket,
};
pub use orchestrator::{
    Activation, CompletionOutcome, DisplayOrchestrator, DisplayPhase, OrchestratorConfig,
    OrchestratorError, OrchestratorSnapshot, OrchestratorStatus,
};
pub use permission::{
    create_permission_gate, Permission, PermissionError, PermissionGate, PermissionStatus,
    DENIED_NOTICE,
};
pub use presentation::PresentationSurface;
pub use resolver::FileResolver;
pub use snapshot::{SnapshotError, SnapshotStore, SqliteSnapshotStore};
