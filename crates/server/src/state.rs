use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use imagedrop_core::{
    Activation, Config, DisplayOrchestrator, DownloadService, FileProvider, PermissionStatus,
    SanitizedConfig, SnapshotStore,
};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::metrics::DISPLAY_ACTIVE;
use crate::surface::HttpSurface;

/// Key the single HTTP surface's snapshot is stored under.
pub const SURFACE_KEY: &str = "http";

/// Why a display lifetime transition was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayError {
    /// Storage permission was denied; there is no orchestrator.
    Unavailable,
    AlreadyAttached,
    NotAttached,
}

/// Shared application state
pub struct AppState {
    config: Config,
    permission: PermissionStatus,
    download_service: Arc<dyn DownloadService>,
    provider: FileProvider,
    surface: Arc<HttpSurface>,
    snapshot_store: Arc<dyn SnapshotStore>,
    orchestrator: Option<Arc<DisplayOrchestrator>>,
    activation: Mutex<Option<Activation>>,
    snapshot_restored: AtomicBool,
}

impl AppState {
    pub fn new(
        config: Config,
        permission: PermissionStatus,
        download_service: Arc<dyn DownloadService>,
        provider: FileProvider,
        surface: Arc<HttpSurface>,
        snapshot_store: Arc<dyn SnapshotStore>,
        orchestrator: Option<Arc<DisplayOrchestrator>>,
    ) -> Self {
        Self {
            config,
            permission,
            download_service,
            provider,
            surface,
            snapshot_store,
            orchestrator,
            activation: Mutex::new(None),
            snapshot_restored: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn permission(&self) -> &PermissionStatus {
        &self.permission
    }

    pub fn download_service(&self) -> &Arc<dyn DownloadService> {
        &self.download_service
    }

    pub fn provider(&self) -> &FileProvider {
        &self.provider
    }

    pub fn surface(&self) -> &HttpSurface {
        &self.surface
    }

    pub fn orchestrator(&self) -> Option<&Arc<DisplayOrchestrator>> {
        self.orchestrator.as_ref()
    }

    pub async fn is_attached(&self) -> bool {
        self.activation.lock().await.is_some()
    }

    /// Start a visible lifetime and re-render the current image.
    ///
    /// The persisted snapshot is applied on the first attach only; later
    /// attaches keep whatever the live orchestrator holds. Returns whether
    /// an image was rendered.
    pub async fn attach(&self) -> Result<bool, DisplayError> {
        let orchestrator = self.orchestrator().ok_or(DisplayError::Unavailable)?;
        let mut activation = self.activation.lock().await;
        if activation.is_some() {
            return Err(DisplayError::AlreadyAttached);
        }

        if !self.snapshot_restored.swap(true, Ordering::SeqCst) {
            match self.snapshot_store.load(SURFACE_KEY) {
                Ok(Some(snapshot)) => orchestrator.restore_snapshot(snapshot),
                Ok(None) => {}
                Err(e) => warn!("Failed to load display snapshot: {}", e),
            }
        }

        let handle = orchestrator
            .activate()
            .map_err(|_| DisplayError::AlreadyAttached)?;
        *activation = Some(handle);
        DISPLAY_ACTIVE.set(1);

        let restored = orchestrator.restore_display();
        info!(restored, "Display attached");
        Ok(restored)
    }

    /// End the visible lifetime and persist the orchestrator's state.
    pub async fn detach(&self) -> Result<(), DisplayError> {
        let orchestrator = self.orchestrator().ok_or(DisplayError::Unavailable)?;
        let handle = self
            .activation
            .lock()
            .await
            .take()
            .ok_or(DisplayError::NotAttached)?;

        orchestrator.deactivate(handle);
        DISPLAY_ACTIVE.set(0);

        self.save_snapshot();
        info!("Display detached");
        Ok(())
    }

    /// Persist the orchestrator's ticket and reference, attached or not.
    ///
    /// Returns false when there is no orchestrator or the store failed.
    pub fn save_snapshot(&self) -> bool {
        let Some(orchestrator) = self.orchestrator() else {
            return false;
        };
        match self
            .snapshot_store
            .save(SURFACE_KEY, &orchestrator.snapshot())
        {
            Ok(()) => true,
            Err(e) => {
                warn!("Failed to save display snapshot: {}", e);
                false
            }
        }
    }

    /// Wind down on process exit: detach if attached, then persist.
    pub async fn shutdown(&self) {
        if self.is_attached().await {
            if let Err(e) = self.detach().await {
                warn!("Failed to detach display: {:?}", e);
            }
        } else if self.save_snapshot() {
            debug!("Display snapshot saved while detached");
        }
    }
}
