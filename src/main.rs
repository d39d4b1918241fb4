//! Fingerprinted HTTP request bridge.
//!
//! # Architecture Overview
//!
//! ```text
//!   Controller (WebSocket server)
//!        ▲   │ {"requestId","options":{...}}
//!        │   ▼
//!   ┌──────────────────────────────────────────────────────────┐
//!   │ net::Server ── dial / redial with backoff                 │
//!   │     └─ channel::ChannelSession                            │
//!   │           ├─ frame decode ──▶ dispatch::RequestDispatcher │
//!   │           │                       └─ task per request     │
//!   │           │                           └─ executor ──────────────▶ Upstream
//!   │           │                               └─ fingerprint  │        (direct or
//!   │           │                                  ProfileCache │         via proxy)
//!   │           └─ writer task ◀── completions                  │
//!   │                                                           │
//!   │ config · observability · lifecycle · resilience           │
//!   └──────────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;

use ja3_bridge::config::{apply_overrides, load_config, BridgeConfig};
use ja3_bridge::fingerprint::{Ja3ProfileBuilder, ProfileCache};
use ja3_bridge::executor::RequestExecutor;
use ja3_bridge::lifecycle::{spawn_signal_handler, Shutdown};
use ja3_bridge::observability::{logging, metrics};
use ja3_bridge::Server;

#[derive(Parser)]
#[command(name = "ja3-bridge")]
#[command(about = "Executes HTTP requests with chosen TLS fingerprints for a WebSocket controller", long_about = None)]
struct Cli {
    /// Path to a TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Controller address as host:port (overrides config and WS_PORT).
    #[arg(long)]
    addr: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => BridgeConfig::default(),
    };

    // Logging first so override warnings are visible.
    logging::init_logging(&config.observability);
    tracing::info!("ja3-bridge v{} starting", env!("CARGO_PKG_VERSION"));

    let config = apply_overrides(config, cli.addr.as_deref())?;

    tracing::info!(
        endpoint = %config.channel.endpoint(),
        max_concurrency = config.dispatcher.max_concurrency,
        request_timeout_secs = config.executor.request_timeout_secs,
        profiles = config.fingerprints.profiles.len(),
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        if let Ok(addr) = config.observability.metrics_address.parse() {
            metrics::init_metrics(addr);
        } else {
            tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            );
        }
    }

    let builder = Ja3ProfileBuilder::new(&config.fingerprints, config.executor.connect_timeout());
    let profiles = Arc::new(ProfileCache::new(Arc::new(builder)));
    let executor = Arc::new(RequestExecutor::new(profiles, &config.executor));

    let shutdown = Shutdown::new();
    spawn_signal_handler(shutdown.clone());

    let server = Server::new(config, executor);
    server.run(&shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
