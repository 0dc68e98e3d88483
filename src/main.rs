//! Regatta Race Server
//!
//! Runs one race and serves it to clients until interrupted.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use regatta::{Config, RaceServer, VERSION};

/// Command line overrides. Applied after the config file and environment.
#[derive(Debug, Parser)]
#[command(name = "regatta-server", version, about)]
struct Args {
    /// JSON configuration file.
    #[arg(long, env = "REGATTA_CONFIG")]
    config: Option<PathBuf>,

    /// Address to listen on.
    #[arg(long)]
    bind: Option<SocketAddr>,

    /// Maximum concurrent clients.
    #[arg(long)]
    max_clients: Option<usize>,

    /// Race seed.
    #[arg(long)]
    seed: Option<u64>,
}

impl Args {
    fn apply(&self, config: &mut Config) {
        if let Some(bind) = self.bind {
            config.server.bind_addr = bind;
        }
        if let Some(max) = self.max_clients {
            config.server.max_clients = max;
        }
        if let Some(seed) = self.seed {
            config.race.seed = seed;
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("regatta=info,regatta_server=info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args = Args::parse();
    let mut config = match &args.config {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => Config::default(),
    };
    config.apply_env().context("invalid environment override")?;
    args.apply(&mut config);

    info!("Regatta Server v{}", VERSION);
    info!(
        "Race {} with {} boat slots, seed {}",
        config.race.race_id,
        config.race.course.participants.len(),
        config.race.seed
    );

    let server = RaceServer::bind(config.server, config.race)
        .await
        .context("failed to start server")?;
    info!("Listening on {}", server.local_addr()?);

    let handle = server.handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupted, shutting down");
            handle.shutdown();
        }
    });

    server.run().await.context("server failed")?;
    info!("Server stopped");
    Ok(())
}
