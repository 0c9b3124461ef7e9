//! Inbound HTTP server configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for the gateway's listening socket and inbound limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address to listen on.
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Port to listen on.
    #[serde(default = "default_listen_port")]
    pub listen_port: u16,

    /// Largest request body buffered for forwarding, in bytes.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,

    /// Directory of static assets served for paths outside the tunnel routes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub static_dir: Option<PathBuf>,

    /// CORS settings applied to every response.
    #[serde(default)]
    pub cors: CorsConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            listen_port: default_listen_port(),
            max_body_bytes: default_max_body_bytes(),
            static_dir: None,
            cors: CorsConfig::default(),
        }
    }
}

impl ServerConfig {
    /// `addr:port` string suitable for binding.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.listen_addr, self.listen_port)
    }
}

/// Cross-origin settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    /// Allowed origins. `"*"` allows any origin.
    #[serde(default = "default_allow_origins")]
    pub allow_origins: Vec<String>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allow_origins: default_allow_origins(),
        }
    }
}

impl CorsConfig {
    pub fn allows_any_origin(&self) -> bool {
        self.allow_origins.is_empty() || self.allow_origins.iter().any(|o| o.trim() == "*")
    }
}

fn default_listen_addr() -> String {
    "0.0.0.0".to_string()
}

fn default_listen_port() -> u16 {
    8787
}

fn default_max_body_bytes() -> usize {
    10 * 1024 * 1024
}

fn default_allow_origins() -> Vec<String> {
    vec!["*".to_string()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_address(), "0.0.0.0:8787");
        assert!(config.cors.allows_any_origin());
        assert!(config.static_dir.is_none());
    }

    #[test]
    fn test_explicit_origins() {
        let cors = CorsConfig {
            allow_origins: vec!["https://app.example".to_string()],
        };
        assert!(!cors.allows_any_origin());
    }
}
