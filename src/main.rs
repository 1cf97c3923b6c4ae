//! Kong Docker daemon entry point.
//!
//! Keeps Kong upstream targets in sync with the running Docker containers
//! labeled with an upstream name.

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use log::{debug, error, info};
use tokio::signal;

mod config;
mod diff;
mod error;
mod events;
mod gateway;
mod orphan;
mod reconciler;
mod resolver;
mod runtime;
#[cfg(test)]
mod testing;
mod types;

use config::Config;
use events::EventListener;
use gateway::{Gateway, KongClient};
use reconciler::Reconciler;
use runtime::{ContainerRuntime, DockerRuntime};

/// Kong upstream synchronization daemon
#[derive(Parser, Debug)]
#[command(name = "kong-docker-daemon", version, about, long_about = None)]
struct Cli {
    /// Kong admin API URL
    #[arg(short = 'k', long)]
    kong_admin_url: Option<String>,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<String>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Debug output
    #[arg(short, long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let mut cfg = Config::load(cli.config.as_deref())?;
    if let Some(url) = cli.kong_admin_url {
        cfg.kong_admin_url = url;
    }

    // Initialize logging
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(cfg.log_filter(cli.verbose, cli.debug)),
    )
    .target(env_logger::Target::Stdout)
    .init();
    debug!("Starting Kong Docker daemon with config: {:?}", cfg);

    // Container runtime (Docker)
    let docker = DockerRuntime::connect(cfg.upstream_label.clone())
        .context("unable to connect to Docker")?;
    let version = docker
        .version()
        .await
        .context("unable to reach the Docker daemon")?;
    debug!(
        "connection established with Docker {} (API {})",
        version.version, version.api_version
    );

    // Gateway (Kong)
    let kong = KongClient::new(&cfg.kong_admin_url)?;
    let node = kong
        .node_information()
        .await
        .with_context(|| format!("unable to reach Kong at {}", cfg.kong_admin_url))?;
    debug!(
        "connection established with Kong {} on {}",
        node.version, node.hostname
    );

    let reconciler = Reconciler::new(
        Arc::new(docker),
        Arc::new(kong),
        cfg.upstream_label.clone(),
        cfg.target_weight,
    );

    // Startup synchronization
    let report = reconciler
        .synchronize()
        .await
        .context("unable to synchronize upstreams at startup")?;
    info!(
        "startup synchronization done: {} upstreams synchronized, {} failed",
        report.upstreams.len(),
        report.failed.len()
    );

    // Event loop until a fatal stream error or Ctrl+C
    let listener = EventListener::new(reconciler);
    tokio::select! {
        result = listener.run() => {
            result.context("Docker event stream failed")?;
        }
        result = signal::ctrl_c() => match result {
            Ok(()) => info!("Received Ctrl+C, shutting down..."),
            Err(err) => error!("Unable to listen for shutdown signal: {}", err),
        },
    }

    info!("Shutdown complete.");
    Ok(())
}
