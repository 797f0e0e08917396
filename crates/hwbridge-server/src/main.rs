//! Bridge engine binary. Listens for a plugin client and echoes its audio.

use hwbridge_server::{BridgeServer, Result, ServerConfig};
use std::env;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut config = ServerConfig::default();
    if let Some(addr) = env::args().nth(1) {
        config.bind_addr = addr;
    }

    let server = BridgeServer::bind(config).await?;
    tracing::info!("bridge engine listening on {}", server.local_addr()?);
    server.run().await
}
