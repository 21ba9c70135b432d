//! Snapshot storage trait and error type.

use thiserror::Error;

use crate::orchestrator::OrchestratorSnapshot;

/// Error type for snapshot operations.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Corrupt snapshot for {key}: {message}")]
    Corrupt { key: String, message: String },
}

/// Persists orchestrator state across re-creation of the presentation surface.
///
/// Snapshots are keyed by surface so several surfaces can share one store.
pub trait SnapshotStore: Send + Sync {
    /// Load the snapshot saved under `key`, if any.
    fn load(&self, key: &str) -> Result<Option<OrchestratorSnapshot>, SnapshotError>;

    /// Save `snapshot` under `key`, replacing any previous one.
    fn save(&self, key: &str, snapshot: &OrchestratorSnapshot) -> Result<(), SnapshotError>;

    /// Forget the snapshot under `key`. Returns whether one existed.
    fn clear(&self, key: &str) -> Result<bool, SnapshotError>;
}
