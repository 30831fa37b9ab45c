//! kready CLI
//!
//! Checks whether a cluster can host the workload, plans its sizing and
//! tolerations, and waits for a rollout to converge.

mod client;
mod commands;
mod config;
mod kube_collector;
mod output;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use commands::{check, wait};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Cluster deployment readiness CLI
#[derive(Parser)]
#[command(name = "kready")]
#[command(author, version, about = "Cluster deployment readiness checks", long_about = None)]
pub struct Cli {
    /// Settings file (TOML, YAML or JSON); KREADY_* variables override it
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Path to kubeconfig file (uses default if not specified)
    #[arg(long, env = "KUBECONFIG", global = true)]
    pub kubeconfig: Option<PathBuf>,

    /// Namespace the workload is installed into
    #[arg(long, short, global = true)]
    pub namespace: Option<String>,

    /// Output format
    #[arg(long, short, default_value = "table", global = true)]
    pub format: output::OutputFormat,

    /// Log output format
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(long, short, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Validate nodes and print the rollout plan
    Check {
        /// Serialized toleration the workload carries (repeatable)
        #[arg(long = "tolerate", value_name = "TOLERATION")]
        tolerate: Vec<String>,
    },

    /// Wait for a rollout to converge
    #[command(subcommand)]
    Wait(WaitCommands),
}

#[derive(Subcommand)]
pub enum WaitCommands {
    /// Wait for pods to be running
    Pods {
        /// Label selector (defaults to the release's instance label)
        #[arg(long, short)]
        selector: Option<String>,

        /// Number of running pods to wait for
        #[arg(long, short)]
        expected: usize,

        /// Only count pods annotated with this version
        #[arg(long)]
        version: Option<String>,
    },

    /// Wait for persistent volume claims to be bound
    Volumes {
        /// Label selector (defaults to the release's instance label)
        #[arg(long, short)]
        selector: Option<String>,

        /// Number of bound claims to wait for
        #[arg(long, short)]
        expected: usize,
    },

    /// Wait for an HTTP endpoint to answer
    Connectivity {
        /// Endpoint URL (defaults to the configured connectivity_url)
        #[arg(long)]
        url: Option<String>,
    },
}

/// Timeout for a single connectivity request
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

fn init_tracing(verbose: u8, log_format: LogFormat) {
    let default_level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let registry = tracing_subscriber::registry().with(filter);
    match log_format {
        LogFormat::Json => registry.with(fmt::layer().json().with_writer(std::io::stderr)).init(),
        LogFormat::Text => registry.with(fmt::layer().with_writer(std::io::stderr)).init(),
    }
}

async fn connect(kubeconfig: Option<&Path>) -> Result<kube_collector::KubeCollector> {
    let client = kube_collector::create_client(kubeconfig).await?;
    Ok(kube_collector::KubeCollector::new(client))
}

/// Cancel waits on Ctrl-C; the current probe finishes first
fn cancel_on_interrupt() -> CancellationToken {
    let cancel = CancellationToken::new();
    let token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::debug!("interrupt received, cancelling");
            token.cancel();
        }
    });
    cancel
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.log_format);

    let mut settings = config::Settings::load(cli.config.as_deref())?;
    if let Some(namespace) = cli.namespace {
        settings.namespace = namespace;
    }

    match cli.command {
        Commands::Check { tolerate } => {
            let collector = connect(cli.kubeconfig.as_deref()).await?;
            check::run_check(&collector, &settings, &tolerate, cli.format).await?;
        }
        Commands::Wait(WaitCommands::Pods {
            selector,
            expected,
            version,
        }) => {
            let collector = connect(cli.kubeconfig.as_deref()).await?;
            let cancel = cancel_on_interrupt();
            wait::run_pods(
                &collector, &settings, selector, expected, version, cancel, cli.format,
            )
            .await?;
        }
        Commands::Wait(WaitCommands::Volumes { selector, expected }) => {
            let collector = connect(cli.kubeconfig.as_deref()).await?;
            let cancel = cancel_on_interrupt();
            wait::run_volumes(&collector, &settings, selector, expected, cancel, cli.format)
                .await?;
        }
        Commands::Wait(WaitCommands::Connectivity { url }) => {
            let url = url
                .or_else(|| settings.connectivity_url.clone())
                .context("No URL given and connectivity_url is not configured")?;
            let probe = client::HttpConnectivityProbe::new(&url, REQUEST_TIMEOUT)?;
            wait::run_connectivity(&probe, &settings, cancel_on_interrupt(), cli.format).await?;
        }
    }

    Ok(())
}
