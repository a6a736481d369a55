mod config;
mod encoding;
mod server;
mod store;

use std::sync::Arc;

use clap::Parser;
use config::Config;
use server::Server;
use store::Store;
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "snapkv", about = "HTTP key-value store with snapshot persistence")]
struct Args {
    /// Path to a TOML configuration file
    #[arg(long)]
    config: Option<String>,

    /// File name used for the store (overrides the config file)
    #[arg(short, long)]
    file: Option<String>,

    /// Listen address (overrides the config file)
    #[arg(long)]
    addr: Option<String>,
}

impl Args {
    fn resolve(self) -> anyhow::Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::from_file(path)?,
            None => Config::default(),
        };
        if let Some(file) = self.file {
            config.store_file = file;
        }
        if let Some(addr) = self.addr {
            config.listen_addr = addr;
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let config = Args::parse().resolve()?;

    info!("Starting snapkv - HTTP KV store with snapshot persistence");
    info!("Store file: {}", config.store_file);

    // Load the snapshot once, before any request is served
    let store = Arc::new(Store::open(&config.store_file).await);

    let server = Server::bind(&config.listen_addr, store).await?;
    info!("Server listening on: {}", server.local_addr());

    // Serve requests (blocking)
    server.run().await?;

    Ok(())
}
