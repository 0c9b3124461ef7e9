//! `tunnelgate serve`: run the gateway.

use super::ConfigArgs;
use anyhow::{Context, Result};
use std::path::PathBuf;
use tunnelgate_proxy::GatewayServer;

pub async fn run(
    args: &ConfigArgs,
    listen_addr: Option<String>,
    port: Option<u16>,
    static_dir: Option<PathBuf>,
) -> Result<()> {
    let mut config = args.load()?;
    if let Some(addr) = listen_addr {
        config.server.listen_addr = addr;
    }
    if let Some(port) = port {
        config.server.listen_port = port;
    }
    if static_dir.is_some() {
        config.server.static_dir = static_dir;
    }

    config
        .validate()
        .context("configuration is invalid; run `tunnelgate check` for details")?;

    if config.access.allowed_tunnels.is_empty() {
        tracing::warn!("no tunnel allowlist configured; every registered tunnel is reachable");
    }

    GatewayServer::new(config).run().await?;
    Ok(())
}
