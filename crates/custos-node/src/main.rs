//! Custos node: entry point.
//!
//! Starts an issuer or verifier node with configuration from a TOML file or
//! defaults.

use clap::Parser;
use custos_core::Mode;
use custos_node::{CustosConfig, CustosNode};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Custos Node
#[derive(Parser, Debug)]
#[command(name = "custos-node", version, about = "Custos credential service node")]
struct Args {
    /// Path to the configuration file (TOML).
    #[arg(short, long, default_value = "custos.toml")]
    config: PathBuf,

    /// Operating mode (issuer, verifier).
    #[arg(long)]
    mode: Option<Mode>,

    /// Override the HTTP port.
    #[arg(long)]
    port: Option<u16>,

    /// Override the public base URL.
    #[arg(long)]
    host_url: Option<String>,

    /// Override the data directory.
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Override the log level (trace, debug, info, warn, error).
    #[arg(long)]
    log_level: Option<String>,

    /// Generate a default config file and exit.
    #[arg(long)]
    init: bool,
}

fn init_tracing(level: &str, format: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);
    if format == "json" {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Handle --init flag
    if args.init {
        init_tracing(args.log_level.as_deref().unwrap_or("info"), "text");
        let config = CustosConfig::default();
        config.save(&args.config)?;
        tracing::info!(path = %args.config.display(), "wrote default config");
        return Ok(());
    }

    // Load configuration
    let mut config = CustosConfig::load(&args.config)?;

    // Apply CLI overrides
    if let Some(mode) = args.mode {
        config.server.mode = mode;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(host_url) = args.host_url {
        config.server.host_url = host_url;
    }
    if let Some(data_dir) = args.data_dir {
        config.storage.data_dir = data_dir;
    }
    if let Some(level) = args.log_level {
        config.logging.level = level;
    }

    init_tracing(&config.logging.level, &config.logging.format);
    tracing::info!("Custos node v{}", env!("CARGO_PKG_VERSION"));

    let node = CustosNode::new(config)?;

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
        }
        tracing::info!("received shutdown signal");
    };

    node.run(shutdown).await?;
    tracing::info!("Custos node exited cleanly");
    Ok(())
}
