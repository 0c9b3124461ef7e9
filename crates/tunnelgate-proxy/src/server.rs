//! Gateway server implementation.

use crate::error::GatewayError;
use crate::handlers;
use crate::state::GatewayState;
use axum::Router;
use axum::http::HeaderValue;
use axum::routing::get;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tunnelgate_core::{CorsConfig, GatewayConfig};

const CORS_MAX_AGE: Duration = Duration::from_secs(24 * 60 * 60);

/// Create the gateway router over prepared state.
///
/// CORS is the outermost layer so that error responses carry the headers too.
pub fn create_router(state: Arc<GatewayState>, cors: &CorsConfig) -> Result<Router, GatewayError> {
    Ok(Router::new()
        .route("/healthz", get(handlers::healthz))
        .fallback(handlers::dispatch)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(cors)?))
}

/// Build the complete router described by `config`.
pub fn build_router(config: &GatewayConfig) -> Result<Router, GatewayError> {
    let state = GatewayState::from_config(config)?;
    create_router(Arc::new(state), &config.server.cors)
}

fn cors_layer(config: &CorsConfig) -> Result<CorsLayer, GatewayError> {
    let origin = if config.allows_any_origin() {
        AllowOrigin::any()
    } else {
        let origins = config
            .allow_origins
            .iter()
            .map(|o| HeaderValue::from_str(o.trim()))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| GatewayError::StartupFailed(format!("invalid CORS origin: {e}")))?;
        AllowOrigin::list(origins)
    };

    Ok(CorsLayer::new()
        .allow_origin(origin)
        .allow_methods(Any)
        .allow_headers(Any)
        .expose_headers(Any)
        .max_age(CORS_MAX_AGE))
}

/// The gateway server.
pub struct GatewayServer {
    config: GatewayConfig,
}

impl GatewayServer {
    pub fn new(config: GatewayConfig) -> Self {
        Self { config }
    }

    /// Validate configuration, bind and serve until Ctrl-C.
    pub async fn run(&self) -> Result<(), GatewayError> {
        self.config.validate()?;
        let app = build_router(&self.config)?;

        let addr = self.config.server.bind_address();
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| GatewayError::StartupFailed(format!("failed to bind {addr}: {e}")))?;

        tracing::info!(
            address = %addr,
            allowlist = self.config.access.allowed_tunnels.len(),
            overrides = self.config.overrides.len(),
            "tunnel gateway listening"
        );

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| GatewayError::Internal(e.into()))?;

        tracing::info!("tunnel gateway stopped");
        Ok(())
    }

    pub fn listen_port(&self) -> u16 {
        self.config.server.listen_port
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to install Ctrl-C handler");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::StaticTunnelRegistry;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    fn router(cors: &CorsConfig) -> Router {
        let state = GatewayState::new(
            &GatewayConfig::default(),
            Arc::new(StaticTunnelRegistry::default()),
        )
        .unwrap();
        create_router(Arc::new(state), cors).unwrap()
    }

    #[test]
    fn test_server_creation() {
        let server = GatewayServer::new(GatewayConfig::default());
        assert_eq!(server.listen_port(), 8787);
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let response = router(&CorsConfig::default())
            .oneshot(Request::builder().uri("/healthz").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["access-control-allow-origin"], "*");
    }

    #[tokio::test]
    async fn test_preflight() {
        let response = router(&CorsConfig::default())
            .oneshot(
                Request::builder()
                    .method("OPTIONS")
                    .uri("/tunnel/a/grpc/invoke")
                    .header("origin", "https://app.example")
                    .header("access-control-request-method", "POST")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert!(response.status().is_success());
        assert_eq!(response.headers()["access-control-allow-origin"], "*");
        assert!(response.headers().contains_key("access-control-allow-methods"));
    }

    #[tokio::test]
    async fn test_origin_list() {
        let cors = CorsConfig {
            allow_origins: vec!["https://app.example".to_string()],
        };
        let response = router(&cors)
            .oneshot(
                Request::builder()
                    .uri("/healthz")
                    .header("origin", "https://app.example")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(
            response.headers()["access-control-allow-origin"],
            "https://app.example"
        );
    }

    #[test]
    fn test_invalid_origin_rejected() {
        let cors = CorsConfig {
            allow_origins: vec!["bad\norigin".to_string()],
        };
        assert!(cors_layer(&cors).is_err());
    }
}
