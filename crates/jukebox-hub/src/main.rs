mod api;
mod config;
mod controller;
mod error;
mod events;
mod lavalink;
mod models;
mod openapi;
mod player_backend;
mod search;
mod session_registry;
mod startup;
mod state;
mod track_queue;
mod voice;

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "jukebox-hub", version)]
pub(crate) struct Args {
    /// HTTP bind address, e.g. 0.0.0.0:8080
    #[arg(long)]
    bind: Option<SocketAddr>,

    /// Optional server config file (TOML)
    #[arg(long)]
    config: Option<PathBuf>,
}

#[actix_web::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("info,actix_web=info,jukebox_hub=info")
        }))
        .init();

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        build = env!("GIT_SHA"),
        built_at = env!("BUILD_DATE"),
        "jukebox-hub"
    );
    startup::run(args).await
}
