use async_trait::async_trait;
use log::debug;
use std::path::{Path, PathBuf};
use std::process::Output;
use std::time::Duration;
use tokio::process::Command;

use super::parse;
use crate::domains::sessions::entity::GitDiffStats;
use crate::domains::sessions::ports::GitOperations;
use crate::errors::WerkError;

/// Subprocess adapter for [`GitOperations`]. Every call is a fresh `git`
/// invocation scoped to the repository root or a specific worktree, so the
/// underlying tool's own locking covers concurrent use. Dropping an in-flight
/// call kills the child process; an optional per-client timeout aborts slow
/// invocations and surfaces them as `OperationCancelled`.
pub struct GitClient {
    repo_root: PathBuf,
    timeout: Option<Duration>,
}

impl GitClient {
    pub fn new(repo_root: PathBuf) -> Self {
        Self {
            repo_root,
            timeout: None,
        }
    }

    pub fn with_timeout(repo_root: PathBuf, timeout: Duration) -> Self {
        Self {
            repo_root,
            timeout: Some(timeout),
        }
    }

    async fn run_git(
        &self,
        operation: &str,
        cwd: &Path,
        args: &[&str],
    ) -> Result<Output, WerkError> {
        debug!("Running git {} in {}", args.join(" "), cwd.display());

        let mut command = Command::new("git");
        command.args(args).current_dir(cwd).kill_on_drop(true);

        let invocation = command.output();
        let result = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, invocation)
                .await
                .map_err(|_| WerkError::cancelled(operation))?,
            None => invocation.await,
        };

        result.map_err(|e| WerkError::git(operation, format!("failed to invoke git: {e}")))
    }

    /// Runs git and fails on a non-zero exit, carrying the combined
    /// stdout/stderr as the diagnostic message.
    async fn run_checked(
        &self,
        operation: &str,
        cwd: &Path,
        args: &[&str],
    ) -> Result<Output, WerkError> {
        let output = self.run_git(operation, cwd, args).await?;
        if !output.status.success() {
            return Err(WerkError::git(operation, combined_output(&output)));
        }
        Ok(output)
    }
}

fn combined_output(output: &Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);

    let mut message = format!("git exited with {}", output.status);
    for stream in [stdout.trim(), stderr.trim()] {
        if !stream.is_empty() {
            message.push('\n');
            message.push_str(stream);
        }
    }
    message
}

fn stdout_text(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

#[async_trait]
impl GitOperations for GitClient {
    async fn create_worktree(&self, worktree_path: &Path, branch: &str) -> Result<(), WerkError> {
        let path = worktree_path.to_string_lossy();
        self.run_checked(
            "create worktree",
            &self.repo_root,
            &["worktree", "add", "-b", branch, path.as_ref()],
        )
        .await?;
        Ok(())
    }

    async fn remove_worktree(&self, worktree_path: &Path, force: bool) -> Result<(), WerkError> {
        let path = worktree_path.to_string_lossy();
        let mut args = vec!["worktree", "remove"];
        if force {
            args.push("--force");
        }
        args.push(path.as_ref());

        self.run_checked("remove worktree", &self.repo_root, &args)
            .await?;
        Ok(())
    }

    async fn branch_exists(&self, branch: &str) -> Result<bool, WerkError> {
        let output = self
            .run_checked(
                "check branch",
                &self.repo_root,
                &["branch", "--list", branch],
            )
            .await?;
        Ok(!stdout_text(&output).trim().is_empty())
    }

    async fn has_uncommitted_changes(
        &self,
        worktree_path: &Path,
    ) -> Result<(bool, usize), WerkError> {
        let output = self
            .run_checked("check status", worktree_path, &["status", "--porcelain"])
            .await?;
        let count = parse::count_porcelain_entries(&stdout_text(&output));
        Ok((count > 0, count))
    }

    async fn unpushed_commit_count(
        &self,
        base_branch: &str,
        session_branch: &str,
    ) -> Result<usize, WerkError> {
        let range = format!("{base_branch}..{session_branch}");
        let output = self
            .run_checked(
                "count commits",
                &self.repo_root,
                &["rev-list", &range, "--count"],
            )
            .await?;

        let text = stdout_text(&output);
        parse::parse_rev_list_count(&text).ok_or_else(|| {
            WerkError::git("count commits", format!("unparseable rev-list output: {text:?}"))
        })
    }

    async fn delete_branch(&self, branch: &str, force: bool) -> Result<(), WerkError> {
        let flag = if force { "-D" } else { "-d" };
        self.run_checked("delete branch", &self.repo_root, &["branch", flag, branch])
            .await?;
        Ok(())
    }

    async fn diff_stats(
        &self,
        worktree_path: &Path,
        base_branch: &str,
    ) -> Result<GitDiffStats, WerkError> {
        let output = self
            .run_checked("diff stats", worktree_path, &["diff", "--numstat", base_branch])
            .await?;
        Ok(parse::parse_diff_numstat(&stdout_text(&output)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::process::Command as StdCommand;
    use tempfile::TempDir;

    fn run(dir: &Path, args: &[&str]) {
        let output = StdCommand::new("git")
            .args(args)
            .current_dir(dir)
            .output()
            .expect("run git");
        assert!(
            output.status.success(),
            "git {args:?} failed: {}",
            String::from_utf8_lossy(&output.stderr)
        );
    }

    fn init_repo() -> (TempDir, PathBuf) {
        let temp = TempDir::new().expect("temp dir");
        let root = temp.path().to_path_buf();
        run(&root, &["init", "-b", "main"]);
        run(&root, &["config", "user.email", "werkbank@example.com"]);
        run(&root, &["config", "user.name", "werkbank"]);
        fs::write(root.join("README.md"), "readme\n").expect("write readme");
        run(&root, &["add", "."]);
        run(&root, &["commit", "-m", "initial commit"]);
        (temp, root)
    }

    fn commit_file(dir: &Path, name: &str, content: &str) {
        fs::write(dir.join(name), content).expect("write file");
        run(dir, &["add", name]);
        run(dir, &["commit", "-m", &format!("add {name}")]);
    }

    #[tokio::test]
    async fn branch_exists_reports_only_real_branches() {
        let (_temp, root) = init_repo();
        let client = GitClient::new(root);

        assert!(client.branch_exists("main").await.expect("check main"));
        assert!(!client
            .branch_exists("session-missing")
            .await
            .expect("check missing"));
    }

    #[tokio::test]
    async fn create_worktree_provisions_branch_and_directory() {
        let (_temp, root) = init_repo();
        let client = GitClient::new(root.clone());
        let worktree = root.join(".worktrees").join("session-alpha");

        client
            .create_worktree(&worktree, "session-alpha")
            .await
            .expect("create worktree");

        assert!(worktree.is_dir());
        assert!(client
            .branch_exists("session-alpha")
            .await
            .expect("check branch"));
    }

    #[tokio::test]
    async fn duplicate_worktree_fails_with_diagnostics() {
        let (_temp, root) = init_repo();
        let client = GitClient::new(root.clone());
        let worktree = root.join(".worktrees").join("session-alpha");

        client
            .create_worktree(&worktree, "session-alpha")
            .await
            .expect("create worktree");
        let err = client
            .create_worktree(&worktree, "session-alpha")
            .await
            .expect_err("duplicate create");

        match err {
            WerkError::GitOperationFailed { message, .. } => {
                assert!(!message.is_empty(), "diagnostic output missing");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn uncommitted_changes_count_untracked_files() {
        let (_temp, root) = init_repo();
        let client = GitClient::new(root.clone());
        let worktree = root.join(".worktrees").join("session-alpha");
        client
            .create_worktree(&worktree, "session-alpha")
            .await
            .expect("create worktree");

        let clean = client
            .has_uncommitted_changes(&worktree)
            .await
            .expect("check clean");
        assert_eq!(clean, (false, 0));

        fs::write(worktree.join("a.txt"), "a\n").expect("write a");
        fs::write(worktree.join("b.txt"), "b\n").expect("write b");

        let dirty = client
            .has_uncommitted_changes(&worktree)
            .await
            .expect("check dirty");
        assert_eq!(dirty, (true, 2));
    }

    #[tokio::test]
    async fn unpushed_commit_count_uses_asymmetric_range() {
        let (_temp, root) = init_repo();
        let client = GitClient::new(root.clone());
        let worktree = root.join(".worktrees").join("session-alpha");
        client
            .create_worktree(&worktree, "session-alpha")
            .await
            .expect("create worktree");

        assert_eq!(
            client
                .unpushed_commit_count("main", "session-alpha")
                .await
                .expect("count before commit"),
            0
        );

        commit_file(&worktree, "feature.txt", "feature\n");

        assert_eq!(
            client
                .unpushed_commit_count("main", "session-alpha")
                .await
                .expect("count after commit"),
            1
        );
        assert_eq!(
            client
                .unpushed_commit_count("session-alpha", "main")
                .await
                .expect("reverse range"),
            0
        );
    }

    #[tokio::test]
    async fn diff_stats_sum_changes_against_base() {
        let (_temp, root) = init_repo();
        let client = GitClient::new(root.clone());
        let worktree = root.join(".worktrees").join("session-alpha");
        client
            .create_worktree(&worktree, "session-alpha")
            .await
            .expect("create worktree");

        commit_file(&worktree, "feature.txt", "one\ntwo\nthree\n");

        let stats = client
            .diff_stats(&worktree, "main")
            .await
            .expect("diff stats");
        assert_eq!(stats.lines_added, 3);
        assert_eq!(stats.lines_removed, 0);
    }

    #[tokio::test]
    async fn safe_branch_delete_fails_on_unmerged_work() {
        let (_temp, root) = init_repo();
        let client = GitClient::new(root.clone());
        let worktree = root.join(".worktrees").join("session-alpha");
        client
            .create_worktree(&worktree, "session-alpha")
            .await
            .expect("create worktree");
        commit_file(&worktree, "feature.txt", "feature\n");

        client
            .remove_worktree(&worktree, true)
            .await
            .expect("remove worktree");

        let err = client
            .delete_branch("session-alpha", false)
            .await
            .expect_err("safe delete of unmerged branch");
        assert!(matches!(err, WerkError::GitOperationFailed { .. }));

        client
            .delete_branch("session-alpha", true)
            .await
            .expect("forced delete");
        assert!(!client
            .branch_exists("session-alpha")
            .await
            .expect("check branch"));
    }

    #[tokio::test]
    async fn remove_worktree_without_force_keeps_dirty_trees() {
        let (_temp, root) = init_repo();
        let client = GitClient::new(root.clone());
        let worktree = root.join(".worktrees").join("session-alpha");
        client
            .create_worktree(&worktree, "session-alpha")
            .await
            .expect("create worktree");
        fs::write(worktree.join("scratch.txt"), "scratch\n").expect("write scratch");

        let err = client
            .remove_worktree(&worktree, false)
            .await
            .expect_err("remove dirty worktree");
        assert!(matches!(err, WerkError::GitOperationFailed { .. }));
        assert!(worktree.is_dir());

        client
            .remove_worktree(&worktree, true)
            .await
            .expect("forced remove");
        assert!(!worktree.exists());
    }

    #[tokio::test]
    async fn elapsed_timeout_surfaces_as_cancellation() {
        let (_temp, root) = init_repo();
        let client = GitClient::with_timeout(root, Duration::from_nanos(1));

        let err = client
            .branch_exists("main")
            .await
            .expect_err("timed-out invocation");
        assert!(matches!(err, WerkError::OperationCancelled { .. }));
    }
}
