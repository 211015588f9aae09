//! Serve command: start the REST API.

use anyhow::Result;
use clap::Args;
use sentibar_core::ConfigLoader;
use sentibar_web_api::{ApiServer, AppState};

/// Arguments for the serve command.
#[derive(Args, Debug, Clone)]
pub struct ServeArgs {
    /// Config file path
    #[arg(
        short,
        long,
        default_value = "config/Config.toml",
        env = "SENTIBAR_CONFIG"
    )]
    pub config: String,

    /// Listen address override (defaults to the configured host:port)
    #[arg(short, long)]
    pub addr: Option<String>,
}

/// Starts the web API and serves until the process is stopped.
///
/// # Errors
/// Returns an error when the configuration is invalid or the listener
/// cannot bind.
pub async fn run_serve(args: ServeArgs) -> Result<()> {
    let config = ConfigLoader::load_from(&args.config)?;
    let addr = args
        .addr
        .unwrap_or_else(|| format!("{}:{}", config.server.host, config.server.port));

    let state = AppState::new(config)?;
    ApiServer::new(state).serve(&addr).await
}
