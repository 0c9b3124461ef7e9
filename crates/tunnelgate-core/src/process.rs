//! Per-tunnel process registry used by the RPC invocation path.
//!
//! Each tunnel endpoint can host several processes, each exposing a set of
//! services. The gateway consults this document to decide which process an
//! invocation for a given service is addressed to.

use serde::{Deserialize, Serialize};

/// Document served by a tunnel endpoint on its registry sub-path.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessRegistry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy_base_url: Option<String>,

    #[serde(default)]
    pub available_processes: Vec<ProcessDescriptor>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessDescriptor {
    pub name: String,
    #[serde(default)]
    pub services: Vec<ServiceDescriptor>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceDescriptor {
    pub name: String,
    #[serde(default)]
    pub methods: Vec<MethodDescriptor>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MethodDescriptor {
    pub name: String,
    #[serde(default)]
    pub input_type: String,
    #[serde(default)]
    pub output_type: String,
    #[serde(default)]
    pub client_streaming: bool,
    #[serde(default)]
    pub server_streaming: bool,
}

impl MethodDescriptor {
    pub fn kind(&self) -> MethodKind {
        match (self.client_streaming, self.server_streaming) {
            (false, false) => MethodKind::Unary,
            (true, false) => MethodKind::ClientStreaming,
            (false, true) => MethodKind::ServerStreaming,
            (true, true) => MethodKind::BidiStreaming,
        }
    }
}

/// Call shape of an RPC method. Only [`MethodKind::Unary`] can be invoked
/// through the gateway.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MethodKind {
    #[default]
    Unary,
    ClientStreaming,
    ServerStreaming,
    BidiStreaming,
}

impl MethodKind {
    pub fn is_streaming(self) -> bool {
        self != MethodKind::Unary
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MethodKind::Unary => "unary",
            MethodKind::ClientStreaming => "client_streaming",
            MethodKind::ServerStreaming => "server_streaming",
            MethodKind::BidiStreaming => "bidi_streaming",
        }
    }
}

/// Result of looking a service up in a [`ProcessRegistry`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceLocation<'a> {
    pub process: &'a ProcessDescriptor,
    pub service: &'a ServiceDescriptor,
}

impl<'a> ServiceLocation<'a> {
    pub fn method(&self, name: &str) -> Option<&'a MethodDescriptor> {
        self.service.methods.iter().find(|m| m.name == name)
    }
}

impl ProcessRegistry {
    /// Find the first process (in registry order) that hosts `service`.
    pub fn locate(&self, service: &str) -> Option<ServiceLocation<'_>> {
        self.available_processes.iter().find_map(|process| {
            process
                .services
                .iter()
                .find(|s| s.name == service)
                .map(|service| ServiceLocation { process, service })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn registry() -> ProcessRegistry {
        serde_json::from_value(json!({
            "proxyBaseUrl": "http://localhost:7000",
            "availableProcesses": [
                {
                    "name": "P2",
                    "services": [{ "name": "Other", "methods": [] }]
                },
                {
                    "name": "P1",
                    "services": [{
                        "name": "S",
                        "methods": [
                            { "name": "M", "inputType": "In", "outputType": "Out" },
                            { "name": "Watch", "inputType": "In", "outputType": "Out", "serverStreaming": true }
                        ]
                    }]
                },
                {
                    "name": "P3",
                    "services": [{ "name": "S", "methods": [] }]
                }
            ],
            "timestamp": 1700000000000u64
        }))
        .unwrap()
    }

    #[test]
    fn test_locate_first_owning_process() {
        let registry = registry();
        let loc = registry.locate("S").unwrap();
        assert_eq!(loc.process.name, "P1");
    }

    #[test]
    fn test_locate_unknown_service() {
        assert!(registry().locate("S2").is_none());
    }

    #[test]
    fn test_method_kind_from_descriptor() {
        let registry = registry();
        let loc = registry.locate("S").unwrap();
        assert_eq!(loc.method("M").unwrap().kind(), MethodKind::Unary);
        assert_eq!(loc.method("Watch").unwrap().kind(), MethodKind::ServerStreaming);
        assert!(loc.method("Missing").is_none());
    }

    #[test]
    fn test_missing_processes_defaults_to_empty() {
        let registry: ProcessRegistry = serde_json::from_value(json!({})).unwrap();
        assert!(registry.available_processes.is_empty());
        assert!(registry.locate("S").is_none());
    }

    #[test]
    fn test_method_kind_wire_names() {
        let kind: MethodKind = serde_json::from_value(json!("bidi_streaming")).unwrap();
        assert_eq!(kind, MethodKind::BidiStreaming);
        assert!(kind.is_streaming());
        assert!(!MethodKind::default().is_streaming());
    }
}
