use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "werkbank", version, about = "Git worktree session service for isolated agent workspaces")]
pub struct Cli {
    /// Path to the git repository. Falls back to WERKBANK_REPO_PATH, then to
    /// git discovery from the current directory.
    #[arg(long)]
    pub repo: Option<PathBuf>,

    /// Base branch used for unmerged-work checks and diff stats.
    #[arg(long, default_value = "main")]
    pub base_branch: String,

    /// Ledger database file. Omit to keep session records in memory.
    #[arg(long)]
    pub ledger: Option<PathBuf>,

    /// Address for the HTTP tool API.
    #[arg(long, default_value = "127.0.0.1:8547")]
    pub listen: String,

    /// Abort git invocations that run longer than this many seconds.
    #[arg(long)]
    pub git_timeout_secs: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_keep_memory_ledger_and_main_base() {
        let cli = Cli::try_parse_from(["werkbank"]).expect("parse");
        assert!(cli.repo.is_none());
        assert!(cli.ledger.is_none());
        assert_eq!(cli.base_branch, "main");
        assert_eq!(cli.listen, "127.0.0.1:8547");
        assert!(cli.git_timeout_secs.is_none());
    }

    #[test]
    fn flags_override_every_default() {
        let cli = Cli::try_parse_from([
            "werkbank",
            "--repo",
            "/projects/alpha",
            "--base-branch",
            "develop",
            "--ledger",
            "/var/lib/werkbank/sessions.db",
            "--listen",
            "0.0.0.0:9000",
            "--git-timeout-secs",
            "30",
        ])
        .expect("parse");

        assert_eq!(cli.repo, Some(PathBuf::from("/projects/alpha")));
        assert_eq!(cli.base_branch, "develop");
        assert_eq!(cli.ledger, Some(PathBuf::from("/var/lib/werkbank/sessions.db")));
        assert_eq!(cli.listen, "0.0.0.0:9000");
        assert_eq!(cli.git_timeout_secs, Some(30));
    }
}
