use async_trait::async_trait;
use chrono::Utc;
use log::warn;
use rusqlite::{Connection, Row, params};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use super::timestamps::utc_from_epoch_seconds_lossy;
use crate::domains::sessions::entity::{Session, SessionStatus};
use crate::domains::sessions::identifier::SessionId;
use crate::domains::sessions::ports::SessionLedger;
use crate::errors::WerkError;

const SESSION_COLUMNS: &str = "id, status, worktree_path, branch_name, created_at, updated_at";

/// Durable ledger backend over a single WAL-mode sqlite connection. Every
/// operation is one statement with immediate-commit semantics, and the
/// connection mutex serializes concurrent saves to the same id, so no two
/// writers race a row into a torn state.
pub struct SqliteLedger {
    conn: Mutex<Connection>,
}

impl SqliteLedger {
    pub fn new(path: &Path) -> anyhow::Result<Self> {
        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.busy_timeout(Duration::from_secs(5))?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS sessions (
                id TEXT PRIMARY KEY,
                status TEXT NOT NULL,
                worktree_path TEXT NOT NULL,
                branch_name TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            )",
            [],
        )?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self, operation: &str) -> Result<MutexGuard<'_, Connection>, WerkError> {
        self.conn
            .lock()
            .map_err(|_| WerkError::ledger(operation, "connection mutex poisoned"))
    }
}

#[async_trait]
impl SessionLedger for SqliteLedger {
    async fn save(&self, session: &Session) -> Result<(), WerkError> {
        let conn = self.conn("save")?;
        conn.execute(
            "INSERT INTO sessions (id, status, worktree_path, branch_name, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(id) DO UPDATE SET
                status = excluded.status,
                worktree_path = excluded.worktree_path,
                branch_name = excluded.branch_name,
                created_at = excluded.created_at,
                updated_at = excluded.updated_at",
            params![
                session.id.as_str(),
                session.status.as_str(),
                session.worktree_path.to_string_lossy(),
                session.branch,
                session.created_at.timestamp(),
                Utc::now().timestamp(),
            ],
        )
        .map_err(|e| WerkError::ledger("save", e))?;
        Ok(())
    }

    async fn find_by_id(&self, id: &SessionId) -> Result<Option<Session>, WerkError> {
        let conn = self.conn("find_by_id")?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {SESSION_COLUMNS} FROM sessions WHERE id = ?1"
            ))
            .map_err(|e| WerkError::ledger("find_by_id", e))?;

        match stmt.query_row(params![id.as_str()], row_to_record) {
            Ok(record) => Ok(Some(record_to_session(record, "find_by_id")?)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(WerkError::ledger("find_by_id", e)),
        }
    }

    async fn find_all(&self) -> Result<Vec<Session>, WerkError> {
        let conn = self.conn("find_all")?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {SESSION_COLUMNS} FROM sessions ORDER BY created_at ASC, id ASC"
            ))
            .map_err(|e| WerkError::ledger("find_all", e))?;

        let rows = stmt
            .query_map([], row_to_record)
            .map_err(|e| WerkError::ledger("find_all", e))?;

        let mut sessions = Vec::new();
        for row in rows {
            let record = row.map_err(|e| WerkError::ledger("find_all", e))?;
            sessions.push(record_to_session(record, "find_all")?);
        }
        Ok(sessions)
    }

    async fn exists(&self, id: &SessionId) -> Result<bool, WerkError> {
        let conn = self.conn("exists")?;
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sessions WHERE id = ?1",
                params![id.as_str()],
                |row| row.get(0),
            )
            .map_err(|e| WerkError::ledger("exists", e))?;
        Ok(count > 0)
    }

    async fn delete(&self, id: &SessionId) -> Result<(), WerkError> {
        let conn = self.conn("delete")?;
        let affected = conn
            .execute("DELETE FROM sessions WHERE id = ?1", params![id.as_str()])
            .map_err(|e| WerkError::ledger("delete", e))?;

        if affected == 0 {
            return Err(WerkError::SessionNotFound {
                session_id: id.to_string(),
            });
        }
        Ok(())
    }
}

struct SessionRow {
    id: String,
    status: String,
    worktree_path: String,
    branch_name: String,
    created_at: i64,
    updated_at: i64,
}

fn row_to_record(row: &Row<'_>) -> rusqlite::Result<SessionRow> {
    Ok(SessionRow {
        id: row.get(0)?,
        status: row.get(1)?,
        worktree_path: row.get(2)?,
        branch_name: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

fn record_to_session(record: SessionRow, operation: &str) -> Result<Session, WerkError> {
    let id = SessionId::parse(&record.id)
        .map_err(|e| WerkError::ledger(operation, format!("corrupt session id in ledger: {e}")))?;

    let status = SessionStatus::parse(&record.status).unwrap_or_else(|| {
        warn!(
            "Unknown session status '{}' for '{}'; treating as open",
            record.status, record.id
        );
        SessionStatus::Open
    });

    Ok(Session {
        id,
        status,
        worktree_path: PathBuf::from(record.worktree_path),
        branch: record.branch_name,
        created_at: utc_from_epoch_seconds_lossy(record.created_at),
        updated_at: utc_from_epoch_seconds_lossy(record.updated_at),
    })
}
