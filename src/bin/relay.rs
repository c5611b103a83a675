//! construct-relay binary
//!
//! Serves the room relay over WebSocket (`/ws`) with HTTP status routes.
//!
//! ## Configuration (CLI / env / TOML via `config` crate)
//!
//! | Flag / key      | Env                          | Default   | Description              |
//! |-----------------|------------------------------|-----------|--------------------------|
//! | `--host`        | `CONSTRUCT_HOST`             | `0.0.0.0` | Interface to bind        |
//! | `--port`        | `CONSTRUCT_PORT`, then `PORT`| `3001`    | WebSocket + HTTP port    |
//! | `--config`      | `CONSTRUCT_CONFIG`           | –         | TOML file with host/port |
//!
//! Flags and env win over the file; the file wins over defaults.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use construct_sync::gateway::{GatewayConfig, Hub, RelayGateway};

// ---------------------------------------------------------------------------
// CLI
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(name = "construct-relay", about = "Construct room relay", version)]
struct Args {
    /// Interface to bind
    #[arg(long, env = "CONSTRUCT_HOST")]
    host: Option<String>,

    /// Port for WebSocket and HTTP
    #[arg(long, env = "CONSTRUCT_PORT")]
    port: Option<u16>,

    /// Optional TOML config file
    #[arg(long, env = "CONSTRUCT_CONFIG")]
    config: Option<PathBuf>,
}

impl Args {
    fn gateway_config(&self) -> Result<GatewayConfig> {
        let mut config = GatewayConfig::load(self.config.as_deref())
            .context("Failed to load relay config")?;
        if let Some(host) = &self.host {
            config.host = host.clone();
        }
        // Hosting platforms hand out the port as plain `PORT`.
        let port = match self.port {
            Some(port) => Some(port),
            None => match std::env::var("PORT") {
                Ok(raw) => Some(raw.parse().with_context(|| format!("Invalid PORT '{raw}'"))?),
                Err(_) => None,
            },
        };
        if let Some(port) = port {
            config.port = port;
        }
        Ok(config)
    }
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    // Initialise logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("construct_sync=debug".parse()?),
        )
        .init();

    let args = Args::parse();
    let config = args.gateway_config()?;

    log::info!("Starting construct-relay on {}", config.bind_addr());

    let hub = Arc::new(Hub::default());
    RelayGateway::new(config, hub).run().await
}
