use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;

use super::identifier::SessionId;
use crate::errors::WerkError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Open,
    Reviewed,
    Merged,
    Removed,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Open => "open",
            SessionStatus::Reviewed => "reviewed",
            SessionStatus::Merged => "merged",
            SessionStatus::Removed => "removed",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "open" => Some(SessionStatus::Open),
            "reviewed" => Some(SessionStatus::Reviewed),
            "merged" => Some(SessionStatus::Merged),
            "removed" => Some(SessionStatus::Removed),
            _ => None,
        }
    }
}

/// One provisioned workspace: an isolated branch plus working directory tied
/// to a session identifier. The ledger owns the persisted record; use cases
/// only hold transient copies for the duration of a request.
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub id: SessionId,
    pub status: SessionStatus,
    pub worktree_path: PathBuf,
    pub branch: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    pub fn new(id: SessionId, worktree_path: PathBuf) -> Result<Self, WerkError> {
        if worktree_path.as_os_str().is_empty() {
            return Err(WerkError::invalid_input("worktree_path", "cannot be empty"));
        }

        let branch = id.branch_name();
        let now = Utc::now();
        Ok(Self {
            id,
            status: SessionStatus::Open,
            worktree_path,
            branch,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn mark_reviewed(&mut self) {
        self.transition(SessionStatus::Reviewed);
    }

    pub fn mark_merged(&mut self) {
        self.transition(SessionStatus::Merged);
    }

    pub fn mark_removed(&mut self) {
        self.transition(SessionStatus::Removed);
    }

    fn transition(&mut self, status: SessionStatus) {
        self.status = status;
        self.updated_at = Utc::now();
    }
}

/// Added/removed line counts against the base branch. Zeroed when retrieval
/// fails during listing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GitDiffStats {
    pub lines_added: u64,
    pub lines_removed: u64,
}
