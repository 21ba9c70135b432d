//! Persistence of orchestrator state across re-creation.

mod sqlite_store;
mod store;

pub use sqlite_store::SqliteSnapshotStore;
pub use store::{SnapshotError, SnapshotStore};
