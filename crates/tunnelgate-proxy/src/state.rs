//! Shared, immutable per-process gateway state.

use crate::error::GatewayError;
use crate::forward::Forwarder;
use crate::invoke::Invoker;
use crate::registry::{self, TunnelRegistry};
use crate::routes::RouteTable;
use axum::http::{HeaderMap, HeaderValue};
use std::path::PathBuf;
use std::sync::Arc;
use tunnelgate_core::{AccessList, EndpointOverrides, GatewayConfig, resolve};
use url::Url;

/// Everything a request handler needs. Built once at startup and shared
/// through an `Arc`; nothing in here changes while serving.
pub struct GatewayState {
    pub registry: Arc<dyn TunnelRegistry>,
    pub access: AccessList,
    pub overrides: EndpointOverrides,
    pub routes: RouteTable,
    pub forwarder: Forwarder,
    pub invoker: Invoker,
    pub max_body_bytes: usize,
    pub static_dir: Option<PathBuf>,
    pub list_cache_control: Option<HeaderValue>,
}

impl GatewayState {
    /// Build state from configuration, creating the registry strategy it
    /// describes.
    pub fn from_config(config: &GatewayConfig) -> Result<Self, GatewayError> {
        let client = http_client()?;
        let registry = registry::from_config(&config.registry, client.clone());
        Self::assemble(config, registry, client)
    }

    /// Build state from configuration with an explicit registry.
    pub fn new(
        config: &GatewayConfig,
        registry: Arc<dyn TunnelRegistry>,
    ) -> Result<Self, GatewayError> {
        Self::assemble(config, registry, http_client()?)
    }

    fn assemble(
        config: &GatewayConfig,
        registry: Arc<dyn TunnelRegistry>,
        client: reqwest::Client,
    ) -> Result<Self, GatewayError> {
        let forwarder = Forwarder::new(client, config.upstream.timeout());
        let list_cache_control = match config.registry.list_cache_control.trim() {
            "" => None,
            value => Some(HeaderValue::from_str(value).map_err(|e| {
                GatewayError::StartupFailed(format!("invalid list_cache_control: {e}"))
            })?),
        };

        Ok(Self {
            registry,
            access: config.access_list(),
            overrides: config.endpoint_overrides()?,
            routes: RouteTable::new(&config.rpc),
            invoker: Invoker::new(forwarder.clone(), &config.rpc),
            forwarder,
            max_body_bytes: config.server.max_body_bytes,
            static_dir: config.server.static_dir.clone(),
            list_cache_control,
        })
    }

    /// Gate `identity` against the allowlist.
    pub fn authorize(&self, identity: &str) -> Result<(), GatewayError> {
        if self.access.check(identity).is_allowed() {
            return Ok(());
        }
        tracing::warn!(identity = %identity, "tunnel access denied");
        Err(GatewayError::Forbidden {
            identity: identity.to_string(),
        })
    }

    /// Gate, resolve and apply overrides, returning the endpoint base to call.
    pub async fn authorize_and_resolve(
        &self,
        identity: &str,
        headers: &HeaderMap,
    ) -> Result<Url, GatewayError> {
        self.authorize(identity)?;
        self.resolve_endpoint(identity, headers).await
    }

    /// Resolve an already authorized identity. An override only redirects an
    /// identity the registry knows about.
    pub async fn resolve_endpoint(
        &self,
        identity: &str,
        headers: &HeaderMap,
    ) -> Result<Url, GatewayError> {
        let records = self.registry.list_tunnels(headers).await?;
        let record = resolve(identity, &records).ok_or_else(|| GatewayError::TunnelNotFound {
            identity: identity.to_string(),
        })?;

        let endpoint = self.overrides.apply(identity, &record.endpoint_base);
        if self.overrides.get(identity).is_some() {
            tracing::debug!(identity = %identity, "using endpoint override");
        }
        Ok(endpoint)
    }
}

fn http_client() -> Result<reqwest::Client, GatewayError> {
    reqwest::Client::builder()
        .build()
        .map_err(|e| GatewayError::StartupFailed(format!("failed to build HTTP client: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::StaticTunnelRegistry;
    use chrono::{TimeZone, Utc};
    use tunnelgate_core::TunnelRecord;

    fn record(identity: &str, endpoint: &str) -> TunnelRecord {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
        TunnelRecord {
            identity: identity.to_string(),
            endpoint_base: Url::parse(endpoint).unwrap(),
            created_at: at,
            updated_at: at,
        }
    }

    fn state(config: GatewayConfig) -> GatewayState {
        let registry = StaticTunnelRegistry::new(vec![
            record("alpha", "http://10.0.0.1:7000"),
            record("alpha", "http://10.0.0.9:7000"),
            record("beta", "http://10.0.0.2:7000"),
        ]);
        GatewayState::new(&config, Arc::new(registry)).unwrap()
    }

    #[tokio::test]
    async fn test_first_record_wins() {
        let state = state(GatewayConfig::default());
        let endpoint = state
            .authorize_and_resolve("alpha", &HeaderMap::new())
            .await
            .unwrap();
        assert_eq!(endpoint.as_str(), "http://10.0.0.1:7000/");
    }

    #[tokio::test]
    async fn test_denied_and_unknown() {
        let mut config = GatewayConfig::default();
        config.set_allowed_tunnels("alpha, gamma");
        let state = state(config);

        let err = state
            .authorize_and_resolve("beta", &HeaderMap::new())
            .await
            .unwrap_err();
        assert_eq!(err.code(), "forbidden");

        let err = state
            .authorize_and_resolve("gamma", &HeaderMap::new())
            .await
            .unwrap_err();
        assert_eq!(err.code(), "tunnel_not_found");
    }

    #[tokio::test]
    async fn test_override_applies_after_resolution() {
        let mut config = GatewayConfig::default();
        config
            .merge_overrides("beta=http://localhost:9000,ghost=http://localhost:9001")
            .unwrap();
        let state = state(config);

        let endpoint = state
            .authorize_and_resolve("beta", &HeaderMap::new())
            .await
            .unwrap();
        assert_eq!(endpoint.as_str(), "http://localhost:9000/");

        let err = state
            .authorize_and_resolve("ghost", &HeaderMap::new())
            .await
            .unwrap_err();
        assert_eq!(err.code(), "tunnel_not_found");
    }

    #[test]
    fn test_empty_cache_control_disables_header() {
        let mut config = GatewayConfig::default();
        config.registry.list_cache_control = "  ".to_string();
        assert!(state(config).list_cache_control.is_none());
        assert_eq!(
            state(GatewayConfig::default()).list_cache_control.unwrap(),
            "public, max-age=60"
        );
    }
}
