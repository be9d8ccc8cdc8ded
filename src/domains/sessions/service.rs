use chrono::{DateTime, Utc};
use log::{info, warn};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

use super::entity::{GitDiffStats, Session, SessionStatus};
use super::identifier::SessionId;
use super::ports::{GitOperations, SessionLedger};
use super::reconcile::{self, ReconcileReport};
use crate::errors::WerkError;

/// Directory under the repository root holding all session worktrees.
pub const WORKTREES_DIR: &str = ".worktrees";

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedSession {
    pub session_id: String,
    pub worktree_path: String,
    pub branch_name: String,
    pub status: SessionStatus,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemovalOutcome {
    pub session_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub removed_at: Option<DateTime<Utc>>,
    pub has_unmerged_changes: bool,
    pub unmerged_commits: usize,
    pub uncommitted_files: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub session_id: String,
    pub worktree_path: String,
    pub branch_name: String,
    pub status: SessionStatus,
    pub lines_added: u64,
    pub lines_removed: u64,
}

/// Session lifecycle use cases, orchestrating the git backend and the session
/// ledger. Invocations run as independent concurrent tasks; two overlapping
/// creates for one id may both pass the existence check, in which case the
/// duplicate-branch failure from git is the safety net.
#[derive(Clone)]
pub struct SessionManager {
    git: Arc<dyn GitOperations>,
    ledger: Arc<dyn SessionLedger>,
    worktree_root: PathBuf,
    base_branch: String,
}

impl SessionManager {
    pub fn new(
        git: Arc<dyn GitOperations>,
        ledger: Arc<dyn SessionLedger>,
        repo_root: PathBuf,
        base_branch: String,
    ) -> Self {
        Self {
            git,
            ledger,
            worktree_root: repo_root.join(WORKTREES_DIR),
            base_branch,
        }
    }

    /// Provisions an isolated workspace: a new branch at HEAD plus a worktree
    /// directory, recorded in the ledger with status `open`.
    pub async fn create_session(&self, raw_id: &str) -> Result<CreatedSession, WerkError> {
        let id = SessionId::parse(raw_id)?;

        if self.ledger.exists(&id).await? {
            return Err(WerkError::SessionAlreadyExists {
                session_id: id.to_string(),
            });
        }

        let branch = id.branch_name();
        if self.git.branch_exists(&branch).await? {
            return Err(WerkError::BranchAlreadyExists { branch });
        }

        let worktree_path = self.worktree_root.join(id.worktree_dir_name());
        self.git.create_worktree(&worktree_path, &branch).await?;

        let session = Session::new(id.clone(), worktree_path)?;
        if let Err(err) = self.ledger.save(&session).await {
            // Known inconsistency window: the worktree now exists on disk
            // without a ledger record. The reconcile scan surfaces it.
            warn!(
                "Worktree for session '{id}' exists at '{}' but the ledger save failed: {err}",
                session.worktree_path.display()
            );
            return Err(err);
        }

        info!("Created session '{id}' on branch '{branch}'");
        Ok(CreatedSession {
            session_id: session.id.to_string(),
            worktree_path: session.worktree_path.to_string_lossy().to_string(),
            branch_name: session.branch,
            status: session.status,
        })
    }

    /// Tears a session down. Without `force`, unmerged work blocks the
    /// removal and is reported as a successful outcome carrying a warning, so
    /// callers can distinguish "blocked, retry with force" from a failure.
    /// The blocked path performs no destructive action and is idempotent.
    pub async fn remove_session(
        &self,
        raw_id: &str,
        force: bool,
    ) -> Result<RemovalOutcome, WerkError> {
        let id = SessionId::parse(raw_id)?;

        let Some(session) = self.ledger.find_by_id(&id).await? else {
            return Err(WerkError::SessionNotFound {
                session_id: id.to_string(),
            });
        };

        if !force {
            let (has_uncommitted, file_count) = self
                .git
                .has_uncommitted_changes(&session.worktree_path)
                .await?;
            let unpushed = self
                .git
                .unpushed_commit_count(&self.base_branch, &session.branch)
                .await?;

            if has_uncommitted || unpushed > 0 {
                info!(
                    "Refusing to remove session '{id}': {unpushed} unpushed commits, {file_count} uncommitted files"
                );
                return Ok(RemovalOutcome {
                    session_id: id.to_string(),
                    removed_at: None,
                    has_unmerged_changes: true,
                    unmerged_commits: unpushed,
                    uncommitted_files: file_count,
                    warning: Some(format!(
                        "Session has {unpushed} unpushed commits and {file_count} uncommitted files. Call with force=true to remove anyway."
                    )),
                });
            }
        }

        self.git
            .remove_worktree(&session.worktree_path, force)
            .await?;

        // Branch cleanup is best-effort and never blocks the removal.
        if let Err(err) = self.git.delete_branch(&session.branch, true).await {
            warn!(
                "Failed to delete branch '{}' for session '{id}': {err}",
                session.branch
            );
        }

        if let Err(err) = self.ledger.delete(&id).await {
            // Counterpart inconsistency window: worktree gone, record kept.
            warn!("Worktree for session '{id}' is removed but its ledger record remains: {err}");
            return Err(err);
        }

        info!("Removed session '{id}'");
        Ok(RemovalOutcome {
            session_id: id.to_string(),
            removed_at: Some(Utc::now()),
            has_unmerged_changes: false,
            unmerged_commits: 0,
            uncommitted_files: 0,
            warning: None,
        })
    }

    /// Lists every recorded session together with live diff statistics. A
    /// per-session stats failure is reported as zeros and never aborts the
    /// listing of the others.
    pub async fn list_sessions(&self) -> Result<Vec<SessionSummary>, WerkError> {
        let sessions = self.ledger.find_all().await?;

        let mut summaries = Vec::with_capacity(sessions.len());
        for session in sessions {
            let stats = match self
                .git
                .diff_stats(&session.worktree_path, &self.base_branch)
                .await
            {
                Ok(stats) => stats,
                Err(err) => {
                    warn!(
                        "Failed to compute diff stats for session '{}', reporting zeros: {err}",
                        session.id
                    );
                    GitDiffStats::default()
                }
            };

            summaries.push(SessionSummary {
                session_id: session.id.to_string(),
                worktree_path: session.worktree_path.to_string_lossy().to_string(),
                branch_name: session.branch,
                status: session.status,
                lines_added: stats.lines_added,
                lines_removed: stats.lines_removed,
            });
        }

        Ok(summaries)
    }

    /// Compares on-disk worktrees against ledger records to make the two
    /// partial-failure windows detectable.
    pub async fn reconcile(&self) -> Result<ReconcileReport, WerkError> {
        reconcile::scan(&self.worktree_root, self.ledger.as_ref()).await
    }
}
