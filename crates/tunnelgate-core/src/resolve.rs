//! Identity resolution, endpoint overrides and proxy target construction.
//!
//! Resolution is a pure lookup over a registry snapshot. Deployment overrides
//! are applied afterwards through [`EndpointOverrides::apply`] so the lookup
//! itself stays independent of local configuration.

use crate::tunnel::TunnelRecord;
use std::collections::HashMap;
use url::Url;

/// Find the record for `identity`. When the registry returns duplicates the
/// first one in registry order wins.
pub fn resolve<'a>(identity: &str, records: &'a [TunnelRecord]) -> Option<&'a TunnelRecord> {
    records.iter().find(|r| r.identity == identity)
}

/// Error produced while parsing override configuration.
#[derive(Debug, thiserror::Error)]
pub enum OverrideError {
    #[error("override entry '{0}' is not of the form identity=url")]
    Malformed(String),

    #[error("override for '{identity}' has an invalid url: {source}")]
    InvalidUrl {
        identity: String,
        #[source]
        source: url::ParseError,
    },
}

/// Locally configured endpoint bases that replace the registry's endpoint for
/// specific identities (e.g. for local development).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EndpointOverrides {
    by_identity: HashMap<String, Url>,
}

impl EndpointOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `identity=url` pairs separated by commas, e.g.
    /// `"alpha=http://localhost:3000, beta=http://127.0.0.1:4000"`.
    pub fn from_csv(raw: &str) -> Result<Self, OverrideError> {
        let mut overrides = Self::new();
        for entry in raw.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let (identity, url) = entry
                .split_once('=')
                .ok_or_else(|| OverrideError::Malformed(entry.to_string()))?;
            let identity = identity.trim();
            if identity.is_empty() {
                return Err(OverrideError::Malformed(entry.to_string()));
            }
            overrides.insert(identity, url.trim())?;
        }
        Ok(overrides)
    }

    /// Build from a configured map of identity to url.
    pub fn from_map(map: &HashMap<String, String>) -> Result<Self, OverrideError> {
        let mut overrides = Self::new();
        for (identity, url) in map {
            overrides.insert(identity.trim(), url.trim())?;
        }
        Ok(overrides)
    }

    pub fn insert(&mut self, identity: &str, url: &str) -> Result<(), OverrideError> {
        let url = Url::parse(url).map_err(|source| OverrideError::InvalidUrl {
            identity: identity.to_string(),
            source,
        })?;
        self.by_identity.insert(identity.to_string(), url);
        Ok(())
    }

    /// Identity and endpoint pairs, in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Url)> {
        self.by_identity.iter().map(|(id, url)| (id.as_str(), url))
    }

    pub fn get(&self, identity: &str) -> Option<&Url> {
        self.by_identity.get(identity)
    }

    pub fn len(&self) -> usize {
        self.by_identity.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_identity.is_empty()
    }

    /// The endpoint to use for `identity`: the override if one exists,
    /// otherwise the canonical endpoint from the registry.
    pub fn apply(&self, identity: &str, canonical: &Url) -> Url {
        self.get(identity).unwrap_or(canonical).clone()
    }
}

/// Build the outbound URL for a tunnel request.
///
/// The endpoint's path is replaced by `path` and its query by `query`. Neither
/// is merged: a caller without a query string produces a target without one.
pub fn proxy_target(endpoint: &Url, path: &str, query: Option<&str>) -> Url {
    let mut target = endpoint.clone();
    target.set_path(path);
    target.set_query(query.filter(|q| !q.is_empty()));
    target.set_fragment(None);
    target
}
