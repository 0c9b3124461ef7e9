//! Error types for the gateway crate.
//!
//! Every failure is turned into a JSON body of the form
//! `{"success": false, "error": "<code>", "message": "..."}` at the request
//! boundary. The `error` code is stable and meant for machines.

use crate::registry::RegistryError;
use axum::http::{HeaderValue, Method, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use tunnelgate_core::{ConfigError, MethodKind};

/// Errors that can occur while serving a gateway request.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Identity is not in the allowlist.
    #[error("tunnel '{identity}' is not allowed")]
    Forbidden { identity: String },

    /// Identity is not present in the registry.
    #[error("tunnel '{identity}' not found")]
    TunnelNotFound { identity: String },

    /// No process behind the tunnel hosts the requested service.
    #[error("service '{service}' not found on tunnel '{identity}'")]
    ServiceNotFound { identity: String, service: String },

    /// Reserved sub-path called with the wrong verb.
    #[error("method {method} not allowed on {path}")]
    MethodNotAllowed {
        method: Method,
        allowed: Method,
        path: String,
    },

    /// Request body larger than the configured limit.
    #[error("request body exceeds {limit} bytes")]
    PayloadTooLarge { limit: usize },

    /// Malformed request.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Streaming RPC kinds are not supported.
    #[error("{} methods are not implemented", .kind.as_str())]
    NotImplemented { kind: MethodKind },

    /// The registry authority could not be queried.
    #[error("registry unavailable: {0}")]
    Registry(#[from] RegistryError),

    /// Transport failure towards a resolved tunnel endpoint.
    #[error("connection to tunnel failed: {0}")]
    ConnectionFailed(String),

    /// Tunnel endpoint answered with something that could not be understood.
    #[error("invalid response from tunnel: {0}")]
    InvalidUpstreamResponse(String),

    /// Tunnel endpoint reported `success: false` for an invocation.
    #[error("{message}")]
    InvocationFailed { status: StatusCode, message: String },

    /// Configuration problem detected while building the gateway.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Failed to start the server.
    #[error("failed to start gateway: {0}")]
    StartupFailed(String),

    /// Internal error.
    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl GatewayError {
    /// Stable, machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            GatewayError::Forbidden { .. } => "forbidden",
            GatewayError::TunnelNotFound { .. } => "tunnel_not_found",
            GatewayError::ServiceNotFound { .. } => "service_not_found",
            GatewayError::MethodNotAllowed { .. } => "method_not_allowed",
            GatewayError::PayloadTooLarge { .. } => "payload_too_large",
            GatewayError::InvalidRequest(_) => "invalid_request",
            GatewayError::NotImplemented { .. } => "not_implemented",
            GatewayError::Registry(_) => "upstream_unreachable",
            GatewayError::ConnectionFailed(_) => "connection_failed",
            GatewayError::InvalidUpstreamResponse(_) => "invalid_upstream_response",
            GatewayError::InvocationFailed { .. } => "invocation_failed",
            GatewayError::Config(_)
            | GatewayError::StartupFailed(_)
            | GatewayError::Internal(_) => "internal_error",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::Forbidden { .. } => StatusCode::FORBIDDEN,
            GatewayError::TunnelNotFound { .. } | GatewayError::ServiceNotFound { .. } => {
                StatusCode::NOT_FOUND
            }
            GatewayError::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
            GatewayError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            GatewayError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            GatewayError::NotImplemented { .. } => StatusCode::NOT_IMPLEMENTED,
            GatewayError::InvalidUpstreamResponse(_) => StatusCode::BAD_GATEWAY,
            GatewayError::InvocationFailed { status, .. } => *status,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::warn!(code = self.code(), error = %self, "request failed");
        } else {
            tracing::debug!(code = self.code(), error = %self, "request rejected");
        }

        let body = Json(json!({
            "success": false,
            "error": self.code(),
            "message": self.to_string(),
        }));

        let mut response = (status, body).into_response();
        if let GatewayError::MethodNotAllowed { allowed, .. } = &self
            && let Ok(value) = HeaderValue::from_str(allowed.as_str())
        {
            response.headers_mut().insert(header::ALLOW, value);
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_and_statuses() {
        let cases = [
            (
                GatewayError::Forbidden { identity: "x".into() },
                "forbidden",
                StatusCode::FORBIDDEN,
            ),
            (
                GatewayError::TunnelNotFound { identity: "x".into() },
                "tunnel_not_found",
                StatusCode::NOT_FOUND,
            ),
            (
                GatewayError::ServiceNotFound {
                    identity: "x".into(),
                    service: "S".into(),
                },
                "service_not_found",
                StatusCode::NOT_FOUND,
            ),
            (
                GatewayError::ConnectionFailed("refused".into()),
                "connection_failed",
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                GatewayError::Registry(RegistryError::Transport("refused".into())),
                "upstream_unreachable",
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                GatewayError::NotImplemented {
                    kind: MethodKind::ServerStreaming,
                },
                "not_implemented",
                StatusCode::NOT_IMPLEMENTED,
            ),
        ];

        for (err, code, status) in cases {
            assert_eq!(err.code(), code);
            assert_eq!(err.status(), status);
        }
    }

    #[test]
    fn test_invocation_failure_relays_status() {
        let err = GatewayError::InvocationFailed {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            message: "bad input".into(),
        };
        assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(err.to_string(), "bad input");
    }

    #[test]
    fn test_method_not_allowed_sets_allow_header() {
        let response = GatewayError::MethodNotAllowed {
            method: Method::DELETE,
            allowed: Method::POST,
            path: "/tunnel/x/grpc/invoke".into(),
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(response.headers()[header::ALLOW], "POST");
    }

    #[test]
    fn test_not_implemented_message_names_kind() {
        let err = GatewayError::NotImplemented {
            kind: MethodKind::BidiStreaming,
        };
        assert_eq!(err.to_string(), "bidi_streaming methods are not implemented");
    }
}
