use async_trait::async_trait;
use std::path::Path;

use super::entity::{GitDiffStats, Session};
use super::identifier::SessionId;
use crate::errors::WerkError;

/// Version-control backend consumed by the session use cases. The concrete
/// adapter shells out to the `git` binary per call; use cases never touch the
/// filesystem or parse command output themselves.
#[async_trait]
pub trait GitOperations: Send + Sync {
    /// Creates `branch` at the current HEAD and a working directory at
    /// `worktree_path` checked out to it. Fails if either already exists.
    async fn create_worktree(&self, worktree_path: &Path, branch: &str) -> Result<(), WerkError>;

    /// Deletes the working directory and detaches it from git bookkeeping.
    /// Without `force` this refuses to discard local modifications.
    async fn remove_worktree(&self, worktree_path: &Path, force: bool) -> Result<(), WerkError>;

    /// Never fails on "not found"; that is a `false` result.
    async fn branch_exists(&self, branch: &str) -> Result<bool, WerkError>;

    /// Reports whether the worktree is dirty and how many files are affected,
    /// counting modified and untracked files alike.
    async fn has_uncommitted_changes(
        &self,
        worktree_path: &Path,
    ) -> Result<(bool, usize), WerkError>;

    /// Commits reachable from `session_branch` but not from `base_branch`.
    async fn unpushed_commit_count(
        &self,
        base_branch: &str,
        session_branch: &str,
    ) -> Result<usize, WerkError>;

    /// Safe delete unless `force`; a safe delete fails on unmerged branches.
    async fn delete_branch(&self, branch: &str, force: bool) -> Result<(), WerkError>;

    /// Line counts for the worktree's current state against `base_branch`.
    async fn diff_stats(
        &self,
        worktree_path: &Path,
        base_branch: &str,
    ) -> Result<GitDiffStats, WerkError>;
}

/// Durable storage for session records. The volatile map and the sqlite file
/// backend both honor these semantics and pass the same conformance suite.
#[async_trait]
pub trait SessionLedger: Send + Sync {
    /// Full-record upsert; `updated_at` is refreshed on every save.
    async fn save(&self, session: &Session) -> Result<(), WerkError>;

    async fn find_by_id(&self, id: &SessionId) -> Result<Option<Session>, WerkError>;

    /// All records in creation order.
    async fn find_all(&self) -> Result<Vec<Session>, WerkError>;

    async fn exists(&self, id: &SessionId) -> Result<bool, WerkError>;

    /// Fails with `SessionNotFound` when no record exists.
    async fn delete(&self, id: &SessionId) -> Result<(), WerkError>;
}
