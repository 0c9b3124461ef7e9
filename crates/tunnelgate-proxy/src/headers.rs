//! Header selection for outbound requests and relayed responses.

use axum::http::header::{self, HeaderMap, HeaderName};

/// Connection-scoped headers that must not cross the proxy.
const HOP_BY_HOP: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-connection",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

fn is_hop_by_hop(name: &HeaderName, connection_listed: &[String]) -> bool {
    let name = name.as_str();
    HOP_BY_HOP.contains(&name) || connection_listed.iter().any(|n| n == name)
}

/// Header names nominated as hop-by-hop through the `Connection` header.
fn connection_listed(headers: &HeaderMap) -> Vec<String> {
    headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .map(|n| n.trim().to_ascii_lowercase())
        .filter(|n| !n.is_empty())
        .collect()
}

/// Headers to send upstream for a request received from a caller.
///
/// `host` is derived from the target URL and `content-length` from the body,
/// so neither is copied.
pub fn outbound(inbound: &HeaderMap) -> HeaderMap {
    let listed = connection_listed(inbound);
    let mut out = HeaderMap::with_capacity(inbound.len());
    for (name, value) in inbound {
        if is_hop_by_hop(name, &listed) || name == header::HOST || name == header::CONTENT_LENGTH {
            continue;
        }
        out.append(name.clone(), value.clone());
    }
    out
}

/// Caller headers that would change the shape of the registry's answer. The
/// registry client needs an uncompressed, complete `200` body to decode.
const REGISTRY_EXCLUDED: &[HeaderName] = &[
    header::ACCEPT_ENCODING,
    header::IF_NONE_MATCH,
    header::IF_MODIFIED_SINCE,
    header::IF_MATCH,
    header::IF_UNMODIFIED_SINCE,
    header::IF_RANGE,
    header::RANGE,
];

/// Headers to send to the registry: the caller's credentials and metadata,
/// without content negotiation or conditional headers.
pub fn registry_outbound(inbound: &HeaderMap) -> HeaderMap {
    let mut out = outbound(inbound);
    for name in REGISTRY_EXCLUDED {
        out.remove(name);
    }
    out
}

/// Only the caller's `Content-Type`, for sub-routes that must not leak caller
/// credentials upstream.
pub fn content_type_only(inbound: &HeaderMap) -> HeaderMap {
    let mut out = HeaderMap::new();
    if let Some(value) = inbound.get(header::CONTENT_TYPE) {
        out.insert(header::CONTENT_TYPE, value.clone());
    }
    out
}

/// Headers to relay back to the caller from an upstream response.
pub fn relayed(upstream: &HeaderMap) -> HeaderMap {
    let listed = connection_listed(upstream);
    let mut out = HeaderMap::with_capacity(upstream.len());
    for (name, value) in upstream {
        if is_hop_by_hop(name, &listed) {
            continue;
        }
        out.append(name.clone(), value.clone());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn map(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut headers = HeaderMap::new();
        for (k, v) in pairs {
            headers.append(*k, HeaderValue::from_static(v));
        }
        headers
    }

    #[test]
    fn test_outbound_strips_connection_scoped_headers() {
        let inbound = map(&[
            ("host", "gateway.example"),
            ("content-length", "12"),
            ("connection", "keep-alive, x-drop-me"),
            ("x-drop-me", "1"),
            ("transfer-encoding", "chunked"),
            ("authorization", "Bearer abc"),
            ("accept", "application/json"),
            ("x-multi", "a"),
            ("x-multi", "b"),
        ]);
        let out = outbound(&inbound);
        assert!(out.get("host").is_none());
        assert!(out.get("content-length").is_none());
        assert!(out.get("connection").is_none());
        assert!(out.get("x-drop-me").is_none());
        assert!(out.get("transfer-encoding").is_none());
        assert_eq!(out["authorization"], "Bearer abc");
        assert_eq!(out["accept"], "application/json");
        assert_eq!(out.get_all("x-multi").iter().count(), 2);
    }

    #[test]
    fn test_registry_outbound_drops_negotiation() {
        let inbound = map(&[
            ("authorization", "Bearer abc"),
            ("cookie", "session=1"),
            ("accept-encoding", "gzip, deflate, br"),
            ("if-none-match", "\"v1\""),
            ("if-modified-since", "Sat, 01 Jun 2024 08:00:00 GMT"),
            ("range", "bytes=0-10"),
            ("host", "gateway.example"),
        ]);
        let out = registry_outbound(&inbound);
        assert_eq!(out.len(), 2);
        assert_eq!(out["authorization"], "Bearer abc");
        assert_eq!(out["cookie"], "session=1");
    }

    #[test]
    fn test_content_type_only() {
        let inbound = map(&[
            ("content-type", "application/json"),
            ("authorization", "Bearer abc"),
            ("cookie", "session=1"),
        ]);
        let out = content_type_only(&inbound);
        assert_eq!(out.len(), 1);
        assert_eq!(out["content-type"], "application/json");
    }

    #[test]
    fn test_relayed_keeps_end_to_end_headers() {
        let upstream = map(&[
            ("content-type", "text/plain"),
            ("content-length", "5"),
            ("set-cookie", "a=1"),
            ("keep-alive", "timeout=5"),
            ("upgrade", "h2c"),
        ]);
        let out = relayed(&upstream);
        assert_eq!(out["content-type"], "text/plain");
        assert_eq!(out["content-length"], "5");
        assert_eq!(out["set-cookie"], "a=1");
        assert!(out.get("keep-alive").is_none());
        assert!(out.get("upgrade").is_none());
    }
}
