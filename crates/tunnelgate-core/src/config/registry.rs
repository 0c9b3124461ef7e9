//! Registry authority and upstream call configuration.
//!
//! The registry can be reached over the network (`url`) or, when it is
//! colocated with the gateway, served from an in-process snapshot
//! (`static_tunnels`). When both are set the network registry is used.

use crate::tunnel::TunnelRecord;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

/// Where and how the gateway fetches the live tunnel set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Base address of the registry authority. `GET {url}/tunnels` is called
    /// on every resolution.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<Url>,

    /// Timeout for a single registry call, in seconds.
    #[serde(default = "default_registry_timeout")]
    pub timeout_seconds: u64,

    /// `Cache-Control` value attached to the sanitized `GET /tunnels` listing.
    /// The gateway itself never caches.
    #[serde(default = "default_list_cache_control")]
    pub list_cache_control: String,

    /// In-process tunnel snapshot used when no `url` is configured.
    #[serde(default)]
    pub static_tunnels: Vec<TunnelRecord>,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            url: None,
            timeout_seconds: default_registry_timeout(),
            list_cache_control: default_list_cache_control(),
            static_tunnels: Vec::new(),
        }
    }
}

impl RegistryConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    /// Whether any registry source is configured.
    pub fn is_configured(&self) -> bool {
        self.url.is_some() || !self.static_tunnels.is_empty()
    }
}

/// Settings for calls to resolved tunnel endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    /// Time allowed for a tunnel endpoint to start answering, in seconds.
    #[serde(default = "default_upstream_timeout")]
    pub timeout_seconds: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: default_upstream_timeout(),
        }
    }
}

impl UpstreamConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

fn default_registry_timeout() -> u64 {
    10
}

fn default_upstream_timeout() -> u64 {
    30
}

fn default_list_cache_control() -> String {
    "public, max-age=60".to_string()
}
