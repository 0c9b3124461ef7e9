//! Tunnel records as published by the registry authority.
//!
//! The registry is the only producer of [`TunnelRecord`]s. The gateway reads
//! them per request and never mutates or stores them.

use crate::access::AccessList;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

/// A live tunnel: the identity callers route by and the hidden endpoint it
/// currently maps to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TunnelRecord {
    pub identity: String,
    pub endpoint_base: Url,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TunnelRecord {
    /// The caller-safe view of this record.
    pub fn summary(&self) -> TunnelSummary {
        TunnelSummary {
            identity: self.identity.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Sanitized tunnel entry returned to callers of `GET /tunnels`. Carries no
/// endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TunnelSummary {
    pub identity: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Envelope used by the registry's `GET /tunnels` and by the gateway's own
/// sanitized listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TunnelList<T> {
    pub success: bool,
    pub data: Vec<T>,
    #[serde(default)]
    pub count: usize,
}

impl<T> TunnelList<T> {
    pub fn new(data: Vec<T>) -> Self {
        Self {
            success: true,
            count: data.len(),
            data,
        }
    }
}

impl TunnelList<TunnelSummary> {
    /// The listing a caller of `GET /tunnels` sees: allowed identities only,
    /// in registry order, without endpoints.
    pub fn visible(records: &[TunnelRecord], access: &AccessList) -> Self {
        Self::new(
            records
                .iter()
                .filter(|r| access.check(&r.identity).is_allowed())
                .map(TunnelRecord::summary)
                .collect(),
        )
    }
}
