//! ripsim - distance-vector routing protocol simulator
//!
//! Headless entry point: runs the engine and logs the event stream until
//! interrupted or until an optional duration elapses. Front-ends connect
//! through the snapshot and event APIs of the library crate.

use anyhow::{Context, Result};
use clap::Parser;
use ripsim::{EngineConfig, Network, NetworkEvent, Topology};
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "ripsim", about = "Distance-vector routing protocol simulator")]
struct Args {
    /// Seed for the random stream, for reproducible runs.
    #[arg(long)]
    seed: Option<u64>,

    /// Path to a topology JSON file; the built-in 4-router topology is used
    /// when omitted.
    #[arg(long)]
    topology: Option<PathBuf>,

    /// Stop after this many seconds instead of running until interrupted.
    #[arg(long)]
    duration: Option<f64>,

    /// Display width hint, passed through to front-ends.
    #[arg(long, default_value_t = 1200)]
    width: u32,

    /// Display height hint, passed through to front-ends.
    #[arg(long, default_value_t = 800)]
    height: u32,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive("ripsim=info".parse()?),
        )
        .init();

    let args = Args::parse();
    info!(
        seed = ?args.seed,
        width = args.width,
        height = args.height,
        "starting ripsim"
    );

    let topology = match &args.topology {
        Some(path) => Topology::from_path(path)
            .with_context(|| format!("loading topology from {}", path.display()))?,
        None => Topology::default(),
    };

    let config = EngineConfig {
        seed: args.seed,
        ..EngineConfig::default()
    };
    let network = Network::new(&topology, config).context("building network")?;
    network.start().context("starting network")?;

    let mut events = network.subscribe();
    let logger = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            match event {
                NetworkEvent::MessageSent { .. } => {}
                other => info!(event = ?other, missed = events.missed(), "event"),
            }
        }
    });

    match args.duration {
        Some(seconds) => {
            tokio::time::sleep(Duration::from_secs_f64(seconds)).await;
            info!("run duration elapsed");
        }
        None => {
            tokio::signal::ctrl_c()
                .await
                .context("waiting for interrupt")?;
            info!("interrupt received");
        }
    }

    let stats = network.snapshot_stats();
    info!(
        total_messages = stats.total_messages,
        route_changes = stats.total_route_changes,
        state = %stats.convergence_state,
        "final statistics"
    );

    network.shutdown().await;
    logger.abort();
    Ok(())
}
