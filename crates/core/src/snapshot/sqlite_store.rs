//! SQLite-backed snapshot store implementation.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};

use crate::attachment::AttachmentReference;
use crate::download::Ticket;
use crate::orchestrator::OrchestratorSnapshot;

use super::{SnapshotError, SnapshotStore};

/// SQLite-backed snapshot store.
pub struct SqliteSnapshotStore {
    conn: Mutex<Connection>,
}

impl SqliteSnapshotStore {
    /// Create a new SQLite snapshot store, creating the database file and table if needed.
    pub fn new(path: &Path) -> Result<Self, SnapshotError> {
        let conn = Connection::open(path).map_err(|e| SnapshotError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory SQLite snapshot store (useful for testing).
    pub fn in_memory() -> Result<Self, SnapshotError> {
        let conn =
            Connection::open_in_memory().map_err(|e| SnapshotError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), SnapshotError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS display_snapshots (
                surface_key TEXT PRIMARY KEY,
                ticket INTEGER NOT NULL,
                reference TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            "#,
        )
        .map_err(|e| SnapshotError::Database(e.to_string()))
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|p| p.into_inner())
    }
}

impl SnapshotStore for SqliteSnapshotStore {
    fn load(&self, key: &str) -> Result<Option<OrchestratorSnapshot>, SnapshotError> {
        let conn = self.conn();
        let row: Option<(i64, String)> = conn
            .query_row(
                "SELECT ticket, reference FROM display_snapshots WHERE surface_key = ?1",
                params![key],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()
            .map_err(|e| SnapshotError::Database(e.to_string()))?;

        let Some((ticket, reference_json)) = row else {
            return Ok(None);
        };

        let reference: AttachmentReference =
            serde_json::from_str(&reference_json).map_err(|e| SnapshotError::Corrupt {
                key: key.to_string(),
                message: e.to_string(),
            })?;

        Ok(Some(OrchestratorSnapshot {
            ticket: Ticket::new(ticket),
            reference,
        }))
    }

    fn save(&self, key: &str, snapshot: &OrchestratorSnapshot) -> Result<(), SnapshotError> {
        let reference_json = serde_json::to_string(&snapshot.reference)
            .map_err(|e| SnapshotError::Database(e.to_string()))?;

        self.conn()
            .execute(
                r#"
                INSERT INTO display_snapshots (surface_key, ticket, reference, updated_at)
                VALUES (?1, ?2, ?3, ?4)
                ON CONFLICT(surface_key) DO UPDATE SET
                    ticket = excluded.ticket,
                    reference = excluded.reference,
                    updated_at = excluded.updated_at
                "#,
                params![
                    key,
                    snapshot.ticket.id(),
                    reference_json,
                    Utc::now().to_rfc3339()
                ],
            )
            .map_err(|e| SnapshotError::Database(e.to_string()))?;

        Ok(())
    }

    fn clear(&self, key: &str) -> Result<bool, SnapshotError> {
        let removed = self
            .conn()
            .execute(
                "DELETE FROM display_snapshots WHERE surface_key = ?1",
                params![key],
            )
            .map_err(|e| SnapshotError::Database(e.to_string()))?;
        Ok(removed > 0)
    }
}
