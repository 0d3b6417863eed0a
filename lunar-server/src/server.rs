// ========================================================
// File: lunar-server/src/server.rs
// ========================================================
//! Startup, the wait for Ctrl-C, and ordered shutdown.

use anyhow::Context;
use tracing::{error, info};

use lunar_common::models::BotConfig;

use crate::context::ServerContext;
use crate::Args;

pub fn load_config(args: &Args) -> anyhow::Result<BotConfig> {
    let mut config = BotConfig::load(&args.config)
        .with_context(|| format!("reading {}", args.config.display()))?;
    config.apply_env_overrides();
    config.validate()?;
    Ok(config)
}

pub async fn run_server(args: Args) -> anyhow::Result<()> {
    let config = load_config(&args)?;

    let mut ctx = ServerContext::new(&config).await?;
    ctx.start_stream_pollers(&config)?;
    info!("Lunar is up. Press Ctrl-C to stop.");

    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Ctrl-C handler error: {e:?}");
    }
    info!("Ctrl-C detected; shutting down.");

    ctx.shutdown().await;
    info!("Server shutdown complete.");
    Ok(())
}
