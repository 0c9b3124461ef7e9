//! Reserved sub-paths and wire conventions for the RPC invocation path.

use serde::{Deserialize, Serialize};

/// Configuration for the per-tunnel process registry and invoke endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcConfig {
    /// Sub-path (under `/tunnel/{id}/`) of the process registry probe.
    #[serde(default = "default_registry_path")]
    pub registry_path: String,

    /// Sub-path (under `/tunnel/{id}/`) of the invoke endpoint.
    #[serde(default = "default_invoke_path")]
    pub invoke_path: String,

    /// How the caller payload is placed in the `data` field of invoke calls.
    #[serde(default)]
    pub payload_encoding: PayloadEncoding,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            registry_path: default_registry_path(),
            invoke_path: default_invoke_path(),
            payload_encoding: PayloadEncoding::default(),
        }
    }
}

impl RpcConfig {
    /// Registry sub-path without surrounding slashes.
    pub fn registry_path(&self) -> &str {
        self.registry_path.trim_matches('/')
    }

    /// Invoke sub-path without surrounding slashes.
    pub fn invoke_path(&self) -> &str {
        self.invoke_path.trim_matches('/')
    }
}

/// Encoding of the invocation payload. The upstream contract fixes one of
/// these per deployment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PayloadEncoding {
    /// `data` is the payload as a nested JSON value.
    #[default]
    Json,
    /// `data` is the payload serialized to a JSON string.
    String,
}

fn default_registry_path() -> String {
    "grpc/registry".to_string()
}

fn default_invoke_path() -> String {
    "grpc/invoke".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_are_normalized() {
        let config = RpcConfig {
            registry_path: "/rpc/registry/".to_string(),
            invoke_path: "rpc/invoke".to_string(),
            ..Default::default()
        };
        assert_eq!(config.registry_path(), "rpc/registry");
        assert_eq!(config.invoke_path(), "rpc/invoke");
    }

    #[test]
    fn test_payload_encoding_names() {
        let enc: PayloadEncoding = serde_yaml::from_str("string").unwrap();
        assert_eq!(enc, PayloadEncoding::String);
        assert_eq!(PayloadEncoding::default(), PayloadEncoding::Json);
    }
}
