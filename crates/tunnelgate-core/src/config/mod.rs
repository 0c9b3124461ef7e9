//! Configuration types for the Tunnelgate gateway.
//!
//! Configuration is loaded from a YAML file into a single [`GatewayConfig`].
//! Every section is optional and falls back to defaults. A small set of
//! environment variables can then be layered on top with
//! [`GatewayConfig::apply_env`]:
//!
//! - `ALLOWED_TUNNELS`: comma-separated identity allowlist
//! - `TUNNEL_OVERRIDES`: comma-separated `identity=url` endpoint overrides
//! - `TUNNEL_REGISTRY_URL`: base address of the registry authority

pub mod registry;
pub mod rpc;
pub mod server;

use crate::access::AccessList;
use crate::resolve::{EndpointOverrides, OverrideError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use url::Url;

pub use registry::{RegistryConfig, UpstreamConfig};
pub use rpc::{PayloadEncoding, RpcConfig};
pub use server::{CorsConfig, ServerConfig};

pub const ENV_ALLOWED_TUNNELS: &str = "ALLOWED_TUNNELS";
pub const ENV_TUNNEL_OVERRIDES: &str = "TUNNEL_OVERRIDES";
pub const ENV_REGISTRY_URL: &str = "TUNNEL_REGISTRY_URL";

/// Complete gateway configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Inbound server settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Registry authority.
    #[serde(default)]
    pub registry: RegistryConfig,

    /// Calls to resolved tunnel endpoints.
    #[serde(default)]
    pub upstream: UpstreamConfig,

    /// Identity allowlist.
    #[serde(default)]
    pub access: AccessConfig,

    /// Per-identity endpoint overrides (identity -> url).
    #[serde(default)]
    pub overrides: HashMap<String, String>,

    /// RPC invocation settings.
    #[serde(default)]
    pub rpc: RpcConfig,
}

/// Identity allowlist configuration. Empty means every identity is allowed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccessConfig {
    #[serde(default)]
    pub allowed_tunnels: Vec<String>,
}

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid endpoint override: {0}")]
    Override(#[from] OverrideError),

    #[error("invalid url in {field}: {source}")]
    Url {
        field: &'static str,
        #[source]
        source: url::ParseError,
    },

    #[error("Configuration error: {0}")]
    Config(String),
}

impl GatewayConfig {
    /// Load configuration from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML content.
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(content).map_err(ConfigError::from)
    }

    /// Layer the process environment on top of this configuration.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_env_from(|key| std::env::var(key).ok())
    }

    /// Layer variables from `lookup` on top of this configuration.
    ///
    /// An allowlist from the environment replaces the configured one; overrides
    /// are merged, with the environment winning on conflicts.
    pub fn apply_env_from<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup(ENV_ALLOWED_TUNNELS) {
            self.set_allowed_tunnels(&raw);
        }
        if let Some(raw) = lookup(ENV_TUNNEL_OVERRIDES) {
            self.merge_overrides(&raw)?;
        }
        if let Some(raw) = lookup(ENV_REGISTRY_URL) {
            self.set_registry_url(&raw)?;
        }
        Ok(())
    }

    /// Replace the allowlist with a comma-separated list of identities.
    pub fn set_allowed_tunnels(&mut self, raw: &str) {
        self.access.allowed_tunnels = raw
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
    }

    /// Merge comma-separated `identity=url` pairs into the overrides. A
    /// malformed value leaves the config untouched.
    pub fn merge_overrides(&mut self, raw: &str) -> Result<(), ConfigError> {
        let parsed = EndpointOverrides::from_csv(raw)?;
        for (identity, url) in parsed.iter() {
            self.overrides.insert(identity.to_string(), url.to_string());
        }
        Ok(())
    }

    pub fn set_registry_url(&mut self, raw: &str) -> Result<(), ConfigError> {
        let url = Url::parse(raw.trim()).map_err(|source| ConfigError::Url {
            field: "registry.url",
            source,
        })?;
        self.registry.url = Some(url);
        Ok(())
    }

    /// The identity allowlist described by this configuration.
    pub fn access_list(&self) -> AccessList {
        AccessList::new(&self.access.allowed_tunnels)
    }

    /// The endpoint overrides described by this configuration.
    pub fn endpoint_overrides(&self) -> Result<EndpointOverrides, ConfigError> {
        EndpointOverrides::from_map(&self.overrides).map_err(ConfigError::from)
    }

    /// Check the configuration for problems that would only surface at
    /// request time.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.registry.is_configured() {
            return Err(ConfigError::Config(
                "no registry configured: set registry.url, registry.static_tunnels or TUNNEL_REGISTRY_URL"
                    .to_string(),
            ));
        }
        if self.registry.timeout_seconds == 0 || self.upstream.timeout_seconds == 0 {
            return Err(ConfigError::Config(
                "timeouts must be at least one second".to_string(),
            ));
        }

        let registry_path = self.rpc.registry_path();
        let invoke_path = self.rpc.invoke_path();
        if registry_path.is_empty() || invoke_path.is_empty() {
            return Err(ConfigError::Config(
                "rpc.registry_path and rpc.invoke_path must not be empty".to_string(),
            ));
        }
        if registry_path == invoke_path {
            return Err(ConfigError::Config(format!(
                "rpc.registry_path and rpc.invoke_path must differ (both are '{registry_path}')"
            )));
        }

        self.endpoint_overrides()?;
        Ok(())
    }
}
