//! Storage write permission checked against the real filesystem.

use std::path::PathBuf;

use async_trait::async_trait;
use tracing::{debug, warn};

use super::{Permission, PermissionError, PermissionGate, PermissionStatus};

const PROBE_FILE: &str = ".imagedrop-probe";

/// Grants `WriteStorage` if the pictures directory can be created and written.
pub struct StorageProbeGate {
    pictures_dir: PathBuf,
}

impl StorageProbeGate {
    pub fn new(pictures_dir: impl Into<PathBuf>) -> Self {
        Self {
            pictures_dir: pictures_dir.into(),
        }
    }

    async fn probe(&self) -> std::io::Result<()> {
        tokio::fs::create_dir_all(&self.pictures_dir).await?;
        let probe = self.pictures_dir.join(PROBE_FILE);
        tokio::fs::write(&probe, b"").await?;
        tokio::fs::remove_file(&probe).await
    }
}

#[async_trait]
impl PermissionGate for StorageProbeGate {
    async fn request(&self, permission: Permission) -> Result<PermissionStatus, PermissionError> {
        match permission {
            Permission::WriteStorage => match self.probe().await {
                Ok(()) => {
                    debug!(dir = %self.pictures_dir.display(), "Storage is writable");
                    Ok(PermissionStatus::Granted)
                }
                Err(e) => {
                    warn!(dir = %self.pictures_dir.display(), "Storage write refused: {}", e);
                    Ok(PermissionStatus::Denied {
                        reason: format!("{}: {}", self.pictures_dir.display(), e),
                    })
                }
            },
        }
    }

    fn method_name(&self) -> &'static str {
        "storage_probe"
    }
}
