// ========================================================
// File: lunar-server/src/main.rs
// ========================================================
use std::path::PathBuf;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

mod context;
mod server;

#[derive(Parser, Debug, Clone)]
#[command(name = "lunar")]
#[command(author, version, about = "Lunar - Discord bot announcing Twitch and YouTube streams")]
pub struct Args {
    /// Path to the JSON configuration file.
    #[arg(long, short = 'c', default_value = "config.json")]
    config: PathBuf,

    /// Load `.env` from this file instead of the working directory.
    #[arg(long)]
    env_file: Option<PathBuf>,
}

fn init_tracing() {
    let filter = EnvFilter::from_default_env()
        .add_directive("lunar_core=info".parse().unwrap_or_default())
        .add_directive("lunar_server=info".parse().unwrap_or_default());
    let sub = fmt().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(sub)
        .expect("Failed to set global subscriber");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Missing .env is fine; the config file may carry everything.
    match &args.env_file {
        Some(path) => {
            dotenv::from_path(path).ok();
        }
        None => {
            dotenv::dotenv().ok();
        }
    }

    init_tracing();
    info!("Lunar starting. config={}", args.config.display());

    if let Err(e) = server::run_server(args).await {
        error!("Server error: {e:?}");
        return Err(e);
    }
    Ok(())
}
