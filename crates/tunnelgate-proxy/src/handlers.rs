//! HTTP handlers.
//!
//! Everything except `/healthz` goes through [`dispatch`], which classifies
//! the request with the [`RouteTable`](crate::routes::RouteTable) and hands it
//! to the matching handler.

use crate::assets;
use crate::error::GatewayError;
use crate::invoke::{InvokeRequest, Invoker};
use crate::routes::{Route, TunnelPath};
use crate::state::GatewayState;
use axum::Json;
use axum::body::{Body, Bytes};
use axum::extract::{Request, State};
use axum::http::request::Parts;
use axum::http::{Method, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde_json::json;
use std::sync::Arc;
use tracing::Instrument;
use tunnelgate_core::{TunnelList, proxy_target};
use uuid::Uuid;

const SERVICE_NAME: &str = "tunnelgate";

/// Router fallback: classify and serve every request.
pub async fn dispatch(State(state): State<Arc<GatewayState>>, request: Request) -> Response {
    let route = state
        .routes
        .classify(request.method(), request.uri().path());
    let span = tracing::info_span!(
        "gateway",
        request_id = %Uuid::new_v4(),
        route = route.name(),
        tunnel = route.tunnel().map(|t| t.identity.as_str()).unwrap_or(""),
    );

    async move {
        match handle(&state, route, request).await {
            Ok(response) => response,
            Err(err) => err.into_response(),
        }
    }
    .instrument(span)
    .await
}

async fn handle(
    state: &GatewayState,
    route: Route,
    request: Request,
) -> Result<Response, GatewayError> {
    let (parts, body) = request.into_parts();
    match route {
        Route::Preflight => Ok(StatusCode::NO_CONTENT.into_response()),
        Route::ListTunnels => list_tunnels(state, &parts).await,
        Route::RegistryProbe(tunnel) => registry_probe(state, &parts, &tunnel).await,
        Route::Invoke(tunnel) => invoke(state, &parts, body, &tunnel).await,
        Route::ReservedMethod { tunnel, allowed } => {
            state.authorize(&tunnel.identity)?;
            Err(GatewayError::MethodNotAllowed {
                method: parts.method,
                allowed,
                path: parts.uri.path().to_string(),
            })
        }
        Route::Forward(tunnel) => forward(state, parts, body, &tunnel).await,
        Route::Fallback => Ok(fallback(state, &parts).await),
    }
}

/// `GET /tunnels`: allowed identities without their endpoints.
async fn list_tunnels(state: &GatewayState, parts: &Parts) -> Result<Response, GatewayError> {
    let records = state.registry.list_tunnels(&parts.headers).await?;
    let listing = TunnelList::visible(&records, &state.access);

    tracing::debug!(count = listing.count, "listing tunnels");

    let mut response = Json(listing).into_response();
    if let Some(value) = &state.list_cache_control {
        response
            .headers_mut()
            .insert(header::CACHE_CONTROL, value.clone());
    }
    Ok(response)
}

async fn registry_probe(
    state: &GatewayState,
    parts: &Parts,
    tunnel: &TunnelPath,
) -> Result<Response, GatewayError> {
    let endpoint = state
        .authorize_and_resolve(&tunnel.identity, &parts.headers)
        .await?;
    let path = format!("/{}", state.routes.registry_path());
    let target = proxy_target(&endpoint, &path, None);
    state.forwarder.probe(&parts.headers, target).await
}

async fn invoke(
    state: &GatewayState,
    parts: &Parts,
    body: Body,
    tunnel: &TunnelPath,
) -> Result<Response, GatewayError> {
    state.authorize(&tunnel.identity)?;

    let body = read_body(state, parts, body).await?;
    let request: InvokeRequest = serde_json::from_slice(&body)
        .map_err(|e| GatewayError::InvalidRequest(format!("invoke body: {e}")))?;
    Invoker::check_kind(request.kind)?;

    let endpoint = state
        .resolve_endpoint(&tunnel.identity, &parts.headers)
        .await?;
    let result = state
        .invoker
        .invoke(&tunnel.identity, &endpoint, &parts.headers, request)
        .await?;
    Ok(Json(result).into_response())
}

async fn forward(
    state: &GatewayState,
    parts: Parts,
    body: Body,
    tunnel: &TunnelPath,
) -> Result<Response, GatewayError> {
    let endpoint = state
        .authorize_and_resolve(&tunnel.identity, &parts.headers)
        .await?;
    let body = read_body(state, &parts, body).await?;
    let target = proxy_target(&endpoint, &tunnel.rest, parts.uri.query());
    state
        .forwarder
        .forward(parts.method, &parts.headers, body, target)
        .await
}

/// Buffer the request body, enforcing `max_body_bytes`.
async fn read_body(state: &GatewayState, parts: &Parts, body: Body) -> Result<Bytes, GatewayError> {
    let limit = state.max_body_bytes;
    let declared = parts
        .headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<usize>().ok());
    if declared.is_some_and(|len| len > limit) {
        return Err(GatewayError::PayloadTooLarge { limit });
    }
    axum::body::to_bytes(body, limit)
        .await
        .map_err(|_| GatewayError::PayloadTooLarge { limit })
}

async fn fallback(state: &GatewayState, parts: &Parts) -> Response {
    if let Some(root) = &state.static_dir
        && (parts.method == Method::GET || parts.method == Method::HEAD)
        && let Some(response) = assets::serve(root, parts.uri.path()).await
    {
        return response;
    }
    info(state).into_response()
}

/// Default payload describing the gateway's routes.
fn info(state: &GatewayState) -> Json<serde_json::Value> {
    Json(json!({
        "service": SERVICE_NAME,
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "list": "GET /tunnels",
            "forward": "ANY /tunnel/{identity}/{path}",
            "registry": format!("GET /tunnel/{{identity}}/{}", state.routes.registry_path()),
            "invoke": format!("POST /tunnel/{{identity}}/{}", state.routes.invoke_path()),
        }
    }))
}

/// Liveness probe.
pub async fn healthz() -> Json<serde_json::Value> {
    Json(json!({
        "ok": true,
        "service": SERVICE_NAME,
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
