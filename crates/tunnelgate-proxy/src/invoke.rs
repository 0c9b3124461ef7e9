//! RPC invocation over a tunnel.
//!
//! A tunnel endpoint may host several processes. The invoke sub-route takes a
//! service name, finds the process that owns it through the endpoint's
//! process registry, and sends one fixed-shape JSON request:
//!
//! ```json
//! {"process": "P1", "service": "S", "method": "M", "data": {...}}
//! ```
//!
//! Only unary methods are supported.

use crate::error::GatewayError;
use crate::forward::{BufferedReply, Forwarder};
use axum::http::HeaderMap;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tunnelgate_core::{MethodKind, PayloadEncoding, ProcessRegistry, RpcConfig, proxy_target};
use url::Url;

/// Body accepted on the invoke sub-route.
#[derive(Debug, Clone, Deserialize)]
pub struct InvokeRequest {
    pub service: String,
    pub method: String,
    #[serde(default)]
    pub data: Value,
    #[serde(default)]
    pub kind: MethodKind,
}

/// Body expected back from the tunnel endpoint.
#[derive(Debug, Deserialize)]
struct InvokeReply {
    success: bool,
    #[serde(default)]
    data: Value,
    #[serde(default)]
    error: Option<String>,
}

/// Successful invocation, returned to the caller as-is.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InvokeResult {
    pub success: bool,
    pub data: Value,
}

/// Performs invocations against resolved tunnel endpoints.
#[derive(Clone)]
pub struct Invoker {
    forwarder: Forwarder,
    registry_path: String,
    invoke_path: String,
    encoding: PayloadEncoding,
}

impl Invoker {
    pub fn new(forwarder: Forwarder, rpc: &RpcConfig) -> Self {
        Self {
            forwarder,
            registry_path: format!("/{}", rpc.registry_path()),
            invoke_path: format!("/{}", rpc.invoke_path()),
            encoding: rpc.payload_encoding,
        }
    }

    /// Reject call shapes the gateway cannot carry, before any traffic.
    pub fn check_kind(kind: MethodKind) -> Result<(), GatewayError> {
        if kind.is_streaming() {
            return Err(GatewayError::NotImplemented { kind });
        }
        Ok(())
    }

    /// Run an invocation against `endpoint`. `identity` is only used in
    /// error messages.
    pub async fn invoke(
        &self,
        identity: &str,
        endpoint: &Url,
        inbound: &HeaderMap,
        request: InvokeRequest,
    ) -> Result<InvokeResult, GatewayError> {
        Self::check_kind(request.kind)?;

        let processes = self.process_registry(endpoint, inbound).await?;
        let location =
            processes
                .locate(&request.service)
                .ok_or_else(|| GatewayError::ServiceNotFound {
                    identity: identity.to_string(),
                    service: request.service.clone(),
                })?;
        if let Some(descriptor) = location.method(&request.method) {
            Self::check_kind(descriptor.kind())?;
        }
        let process = location.process.name.clone();

        tracing::debug!(
            process = %process,
            service = %request.service,
            method = %request.method,
            "invoking tunnel service"
        );

        let payload = json!({
            "process": process,
            "service": request.service,
            "method": request.method,
            "data": self.encode(request.data),
        });
        let target = proxy_target(endpoint, &self.invoke_path, None);
        let reply = self.forwarder.post_json(inbound, target, &payload).await?;
        interpret(reply)
    }

    async fn process_registry(
        &self,
        endpoint: &Url,
        inbound: &HeaderMap,
    ) -> Result<ProcessRegistry, GatewayError> {
        let target = proxy_target(endpoint, &self.registry_path, None);
        let reply = self.forwarder.get_buffered(inbound, target).await?;
        if !reply.status.is_success() {
            return Err(GatewayError::InvalidUpstreamResponse(format!(
                "process registry returned {}",
                reply.status
            )));
        }
        serde_json::from_slice(&reply.body).map_err(|e| {
            GatewayError::InvalidUpstreamResponse(format!("process registry: {e}"))
        })
    }

    fn encode(&self, data: Value) -> Value {
        match self.encoding {
            PayloadEncoding::Json => data,
            PayloadEncoding::String => Value::String(data.to_string()),
        }
    }
}

fn interpret(reply: BufferedReply) -> Result<InvokeResult, GatewayError> {
    let parsed: InvokeReply = match serde_json::from_slice(&reply.body) {
        Ok(parsed) => parsed,
        Err(e) if reply.status.is_success() => {
            return Err(GatewayError::InvalidUpstreamResponse(format!(
                "invoke reply: {e}"
            )));
        }
        Err(_) => {
            return Err(GatewayError::InvocationFailed {
                status: reply.status,
                message: format!("invocation returned {}", reply.status),
            });
        }
    };

    if parsed.success {
        return Ok(InvokeResult {
            success: true,
            data: parsed.data,
        });
    }

    Err(GatewayError::InvocationFailed {
        status: reply.status,
        message: parsed
            .error
            .unwrap_or_else(|| "invocation failed".to_string()),
    })
}
