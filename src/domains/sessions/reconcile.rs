use log::warn;
use serde::Serialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use super::ports::SessionLedger;
use crate::errors::WerkError;

/// Result of comparing on-disk worktrees with ledger records. Detection only;
/// repair stays a manual decision.
#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileReport {
    /// Worktree directories with no ledger record.
    pub orphaned_worktrees: Vec<String>,
    /// Ledger records whose worktree directory is gone.
    pub missing_worktrees: Vec<String>,
}

impl ReconcileReport {
    pub fn is_clean(&self) -> bool {
        self.orphaned_worktrees.is_empty() && self.missing_worktrees.is_empty()
    }
}

/// Scans the worktree root for `session-*` directories and cross-checks them
/// against the ledger. Both partial-failure windows (worktree created but the
/// save failed; worktree removed but the delete failed) show up here.
pub async fn scan(
    worktree_root: &Path,
    ledger: &dyn SessionLedger,
) -> Result<ReconcileReport, WerkError> {
    let sessions = ledger.find_all().await?;
    let mut report = ReconcileReport::default();

    for session in &sessions {
        if !session.worktree_path.exists() {
            report
                .missing_worktrees
                .push(session.worktree_path.display().to_string());
        }
    }

    let recorded: HashSet<PathBuf> = sessions
        .iter()
        .map(|session| session.worktree_path.clone())
        .collect();

    match std::fs::read_dir(worktree_root) {
        Ok(entries) => {
            for entry in entries.flatten() {
                let path = entry.path();
                if !path.is_dir() {
                    continue;
                }
                let is_session_dir = path
                    .file_name()
                    .and_then(|name| name.to_str())
                    .is_some_and(|name| name.starts_with("session-"));
                if is_session_dir && !recorded.contains(&path) {
                    report.orphaned_worktrees.push(path.display().to_string());
                }
            }
        }
        // No worktree root yet means no sessions were ever provisioned.
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
        Err(err) => {
            warn!(
                "Could not scan worktree root '{}': {err}",
                worktree_root.display()
            );
        }
    }

    report.orphaned_worktrees.sort();
    report.missing_worktrees.sort();
    Ok(report)
}
