//! netconverge - converge a cluster's GCP network resources.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use cto_network::{ClusterScope, ClusterStatus, Compute, ComputeApi, Engine, WaitConfig};

/// netconverge - GCP network convergence for CTO Platform.
#[derive(Parser)]
#[command(name = "netconverge")]
#[command(about = "Converge a cluster's VPC, subnets, Cloud NAT, firewalls and bastion")]
struct Cli {
    /// `OAuth2` access token (or set `GCP_ACCESS_TOKEN` env var).
    #[arg(long, env = "GCP_ACCESS_TOKEN", hide_env_values = true)]
    access_token: String,

    /// Override the project declared in the cluster file (or set `GCP_PROJECT_ID`).
    #[arg(long, env = "GCP_PROJECT_ID")]
    project_id: Option<String>,

    /// Cluster declaration (YAML).
    #[arg(long, short)]
    config: PathBuf,

    /// Status file (JSON). Read before the pass and rewritten after it.
    #[arg(long)]
    status: Option<PathBuf>,

    /// Seconds between operation polls.
    #[arg(long, default_value = "2")]
    poll_interval: u64,

    /// Seconds to wait for a single operation.
    #[arg(long, default_value = "300")]
    timeout: u64,

    /// Enable verbose logging.
    #[arg(short, long, default_value = "false")]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or adopt every declared resource.
    Reconcile,

    /// Delete every resource owned by the cluster.
    Delete,
}

fn load_scope(path: &Path) -> Result<ClusterScope> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read cluster file {}", path.display()))?;
    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse cluster file {}", path.display()))
}

fn load_status(path: Option<&Path>) -> Result<ClusterStatus> {
    let Some(path) = path else {
        return Ok(ClusterStatus::default());
    };
    if !path.exists() {
        return Ok(ClusterStatus::default());
    }

    let content = std::fs::read_to_string(path).context("Failed to read status file")?;
    serde_json::from_str(&content).context("Failed to parse status file")
}

fn save_status(path: &Path, status: &ClusterStatus) -> Result<()> {
    let content = serde_json::to_string_pretty(status).context("Failed to serialize status")?;
    std::fs::write(path, content).context("Failed to write status file")
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let mut scope = load_scope(&cli.config)?;
    if let Some(project) = cli.project_id {
        scope.project = project;
    }

    let api = ComputeApi::new(&scope.project, &cli.access_token)
        .context("Failed to create Compute Engine client")?;
    let host = match &scope.shared_vpc {
        Some(shared) => {
            let host_api = ComputeApi::new(&shared.host_project, &cli.access_token)
                .context("Failed to create host project client")?;
            Some(Compute::from_api(Arc::new(host_api)))
        }
        None => None,
    };

    let wait = WaitConfig {
        poll_interval: Duration::from_secs(cli.poll_interval),
        timeout: Duration::from_secs(cli.timeout),
    };
    let engine = Engine::new(scope, Compute::from_api(Arc::new(api)), host, wait)
        .context("Invalid cluster declaration")?;

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling");
            on_signal.cancel();
        }
    });

    let mut status = load_status(cli.status.as_deref())?;
    let outcome = match cli.command {
        Commands::Reconcile => engine.reconcile(&cancel, &mut status).await,
        Commands::Delete => engine.delete(&cancel, &mut status).await,
    };

    // Partial progress is recorded even when the pass fails.
    if let Some(path) = &cli.status {
        save_status(path, &status)?;
        info!(path = %path.display(), "Status written");
    }

    outcome.with_context(|| format!("Convergence failed for cluster {}", engine.scope().name))?;

    println!(
        "{}",
        serde_json::to_string_pretty(&status).context("Failed to serialize status")?
    );
    Ok(())
}
