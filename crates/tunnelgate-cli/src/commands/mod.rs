//! CLI command implementations.

pub mod check;
pub mod serve;
pub mod tunnels;

use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;
use tunnelgate_core::GatewayConfig;

/// Configuration sources shared by every command. Precedence, lowest first:
/// YAML file, environment variables, command-line flags.
#[derive(Args, Debug, Clone, Default)]
pub struct ConfigArgs {
    /// YAML configuration file
    #[arg(long, short, env = "TUNNELGATE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Registry base URL (overrides registry.url and TUNNEL_REGISTRY_URL)
    #[arg(long)]
    pub registry_url: Option<String>,

    /// Comma-separated identity allowlist (replaces access.allowed_tunnels)
    #[arg(long)]
    pub allowed_tunnels: Option<String>,

    /// Comma-separated identity=url endpoint overrides (merged)
    #[arg(long)]
    pub tunnel_overrides: Option<String>,
}

impl ConfigArgs {
    /// Load and layer the configuration. Not validated.
    pub fn load(&self) -> Result<GatewayConfig> {
        let mut config = match &self.config {
            Some(path) => GatewayConfig::from_file(path)
                .with_context(|| format!("failed to load {}", path.display()))?,
            None => GatewayConfig::default(),
        };

        config
            .apply_env()
            .context("invalid gateway environment variables")?;

        if let Some(url) = &self.registry_url {
            config.set_registry_url(url)?;
        }
        if let Some(allowed) = &self.allowed_tunnels {
            config.set_allowed_tunnels(allowed);
        }
        if let Some(overrides) = &self.tunnel_overrides {
            config.merge_overrides(overrides)?;
        }
        Ok(config)
    }
}
