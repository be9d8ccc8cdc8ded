use anyhow::Context;
use clap::Parser;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use log::{info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

use werkbank::cli::Cli;
use werkbank::domains::git::GitClient;
use werkbank::domains::sessions::ports::{GitOperations, SessionLedger};
use werkbank::domains::sessions::service::SessionManager;
use werkbank::infrastructure::ledger::{InMemoryLedger, SqliteLedger};
use werkbank::{api, startup};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let repo_root = startup::resolve_repository_root(cli.repo.as_deref())
        .context("no git repository found; pass --repo or run inside a repository")?;
    let repo_root = startup::validate_repository_root(&repo_root)?;

    let git: Arc<dyn GitOperations> = match cli.git_timeout_secs {
        Some(secs) => Arc::new(GitClient::with_timeout(
            repo_root.clone(),
            Duration::from_secs(secs),
        )),
        None => Arc::new(GitClient::new(repo_root.clone())),
    };

    let ledger: Arc<dyn SessionLedger> = match &cli.ledger {
        Some(path) => {
            info!("Using sqlite ledger at {}", path.display());
            Arc::new(SqliteLedger::new(path).context("failed to open session ledger")?)
        }
        None => {
            info!("Using in-memory ledger; session records will not survive a restart");
            Arc::new(InMemoryLedger::new())
        }
    };

    let manager = Arc::new(SessionManager::new(
        git,
        ledger,
        repo_root.clone(),
        cli.base_branch.clone(),
    ));

    match manager.reconcile().await {
        Ok(report) if report.is_clean() => info!("Ledger and worktrees are consistent"),
        Ok(report) => warn!(
            "Ledger/worktree mismatch: {} orphaned worktree(s), {} missing worktree(s)",
            report.orphaned_worktrees.len(),
            report.missing_worktrees.len()
        ),
        Err(err) => warn!("Startup reconciliation scan failed: {err}"),
    }

    let listener = TcpListener::bind(&cli.listen)
        .await
        .with_context(|| format!("failed to bind {}", cli.listen))?;
    info!(
        "Serving session API on http://{} for repository {}",
        cli.listen,
        repo_root.display()
    );

    loop {
        let (stream, _) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(err) => {
                warn!("Failed to accept connection: {err}");
                continue;
            }
        };

        let io = TokioIo::new(stream);
        let manager = Arc::clone(&manager);
        tokio::spawn(async move {
            let service = service_fn(move |req| {
                let manager = Arc::clone(&manager);
                async move { api::handle_request(req, manager).await }
            });

            if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                warn!("Connection error: {err}");
            }
        });
    }
}
