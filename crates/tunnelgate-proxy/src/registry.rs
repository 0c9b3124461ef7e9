//! Registry client.
//!
//! The registry authority owns the live identity → endpoint mapping. The
//! gateway asks it once per resolution and keeps nothing between requests.
//! Two strategies implement [`TunnelRegistry`]:
//!
//! - [`HttpTunnelRegistry`]: `GET {base}/tunnels` over the network
//! - [`StaticTunnelRegistry`]: an in-process snapshot, for a colocated
//!   registry or local development

use crate::headers;
use async_trait::async_trait;
use axum::http::{HeaderMap, StatusCode};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tunnelgate_core::{RegistryConfig, TunnelList, TunnelRecord};
use url::Url;

/// Failure to obtain a tunnel snapshot.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The registry answered with a non-success status.
    #[error("registry returned {status} {status_text}")]
    Status {
        status: StatusCode,
        status_text: String,
    },

    /// The registry could not be reached (DNS, refused, timeout, ...).
    #[error("registry request failed: {0}")]
    Transport(String),

    /// The registry answered with a body that is not a tunnel list.
    #[error("registry response could not be decoded: {0}")]
    Decode(String),

    /// The registry answered `success: false`.
    #[error("registry reported failure")]
    Rejected,
}

/// Source of the current tunnel set.
#[async_trait]
pub trait TunnelRegistry: Send + Sync {
    /// Fetch the current tunnel records. `headers` are the caller's request
    /// headers, forwarded so the registry can authenticate the caller.
    async fn list_tunnels(&self, headers: &HeaderMap) -> Result<Vec<TunnelRecord>, RegistryError>;
}

/// Registry reached over HTTP.
#[derive(Clone)]
pub struct HttpTunnelRegistry {
    client: reqwest::Client,
    tunnels_url: Url,
    timeout: Duration,
}

impl HttpTunnelRegistry {
    pub fn new(client: reqwest::Client, base: &Url, timeout: Duration) -> Self {
        Self {
            client,
            tunnels_url: tunnels_url(base),
            timeout,
        }
    }
}

/// `{base}/tunnels`, keeping any path prefix on the base.
fn tunnels_url(base: &Url) -> Url {
    let mut url = base.clone();
    let path = format!("{}/tunnels", base.path().trim_end_matches('/'));
    url.set_path(&path);
    url.set_query(None);
    url
}

#[async_trait]
impl TunnelRegistry for HttpTunnelRegistry {
    async fn list_tunnels(&self, headers: &HeaderMap) -> Result<Vec<TunnelRecord>, RegistryError> {
        tracing::debug!(url = %self.tunnels_url, "fetching tunnel registry");

        let response = self
            .client
            .get(self.tunnels_url.clone())
            .headers(headers::registry_outbound(headers))
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| RegistryError::Transport(e.without_url().to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RegistryError::Status {
                status,
                status_text: status.canonical_reason().unwrap_or_default().to_string(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| RegistryError::Transport(e.without_url().to_string()))?;
        let list: TunnelList<TunnelRecord> =
            serde_json::from_slice(&body).map_err(|e| RegistryError::Decode(e.to_string()))?;

        if !list.success {
            return Err(RegistryError::Rejected);
        }
        Ok(list.data)
    }
}

/// Registry served from memory.
#[derive(Debug, Clone, Default)]
pub struct StaticTunnelRegistry {
    records: Vec<TunnelRecord>,
}

impl StaticTunnelRegistry {
    pub fn new(records: Vec<TunnelRecord>) -> Self {
        Self { records }
    }
}

#[async_trait]
impl TunnelRegistry for StaticTunnelRegistry {
    async fn list_tunnels(&self, _headers: &HeaderMap) -> Result<Vec<TunnelRecord>, RegistryError> {
        Ok(self.records.clone())
    }
}

/// Pick the registry strategy described by `config`. A configured `url` wins
/// over `static_tunnels`.
pub fn from_config(config: &RegistryConfig, client: reqwest::Client) -> Arc<dyn TunnelRegistry> {
    match &config.url {
        Some(url) => {
            tracing::info!(registry = %url, "using network tunnel registry");
            Arc::new(HttpTunnelRegistry::new(client, url, config.timeout()))
        }
        None => {
            tracing::info!(
                tunnels = config.static_tunnels.len(),
                "using in-process tunnel registry"
            );
            Arc::new(StaticTunnelRegistry::new(config.static_tunnels.clone()))
        }
    }
}
