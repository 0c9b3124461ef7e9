//! Request classification.
//!
//! Inbound requests are matched against an ordered list of rules; the first
//! rule that matches decides the route. Later rules are textually more general
//! than earlier ones (the generic tunnel forward would also match the reserved
//! sub-paths), so the order in [`PRECEDENCE`] is significant.

use axum::http::Method;
use std::borrow::Cow;
use tunnelgate_core::RpcConfig;

const TUNNEL_PREFIX: &str = "/tunnel/";
const TUNNELS_PATH: &str = "/tunnels";

/// A `/tunnel/{identity}{rest}` path split into its parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TunnelPath {
    /// Percent-decoded identity segment.
    pub identity: String,
    /// Remainder of the path, always starting with `/`, still percent-encoded.
    pub rest: String,
}

impl TunnelPath {
    pub fn parse(path: &str) -> Option<Self> {
        let tail = path.strip_prefix(TUNNEL_PREFIX)?;
        let (raw_identity, rest) = match tail.find('/') {
            Some(idx) => (&tail[..idx], &tail[idx..]),
            None => (tail, "/"),
        };
        if raw_identity.is_empty() {
            return None;
        }
        let identity = urlencoding::decode(raw_identity)
            .map(Cow::into_owned)
            .unwrap_or_else(|_| raw_identity.to_string());
        Some(Self {
            identity,
            rest: rest.to_string(),
        })
    }

    /// The remainder without leading or trailing slashes, used to recognise
    /// reserved sub-paths.
    pub fn sub_path(&self) -> &str {
        self.rest.trim_matches('/')
    }
}

/// Outcome of classifying a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// CORS preflight.
    Preflight,
    /// Sanitized tunnel listing.
    ListTunnels,
    /// Process registry probe on a tunnel.
    RegistryProbe(TunnelPath),
    /// RPC invocation on a tunnel.
    Invoke(TunnelPath),
    /// A reserved sub-path requested with a verb it does not accept.
    ReservedMethod { tunnel: TunnelPath, allowed: Method },
    /// Generic transparent forward.
    Forward(TunnelPath),
    /// Nothing matched.
    Fallback,
}

impl Route {
    pub fn name(&self) -> &'static str {
        match self {
            Route::Preflight => "preflight",
            Route::ListTunnels => "list_tunnels",
            Route::RegistryProbe(_) => "registry_probe",
            Route::Invoke(_) => "invoke",
            Route::ReservedMethod { .. } => "reserved_method",
            Route::Forward(_) => "forward",
            Route::Fallback => "fallback",
        }
    }

    pub fn tunnel(&self) -> Option<&TunnelPath> {
        match self {
            Route::RegistryProbe(t)
            | Route::Invoke(t)
            | Route::Forward(t)
            | Route::ReservedMethod { tunnel: t, .. } => Some(t),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rule {
    Preflight,
    ListTunnels,
    RegistryProbe,
    Invoke,
    ReservedGuard,
    Forward,
}

/// Evaluation order. First match wins.
const PRECEDENCE: [Rule; 6] = [
    Rule::Preflight,
    Rule::ListTunnels,
    Rule::RegistryProbe,
    Rule::Invoke,
    Rule::ReservedGuard,
    Rule::Forward,
];

/// Classifier for inbound requests, configured with the reserved sub-paths.
#[derive(Debug, Clone)]
pub struct RouteTable {
    registry_path: String,
    invoke_path: String,
}

impl RouteTable {
    pub fn new(rpc: &RpcConfig) -> Self {
        Self {
            registry_path: rpc.registry_path().to_string(),
            invoke_path: rpc.invoke_path().to_string(),
        }
    }

    pub fn classify(&self, method: &Method, path: &str) -> Route {
        let tunnel = TunnelPath::parse(path);
        PRECEDENCE
            .iter()
            .find_map(|rule| self.apply(*rule, method, path, tunnel.as_ref()))
            .unwrap_or(Route::Fallback)
    }

    fn apply(
        &self,
        rule: Rule,
        method: &Method,
        path: &str,
        tunnel: Option<&TunnelPath>,
    ) -> Option<Route> {
        match rule {
            Rule::Preflight => (method == Method::OPTIONS).then_some(Route::Preflight),
            Rule::ListTunnels => {
                (method == Method::GET && path == TUNNELS_PATH).then_some(Route::ListTunnels)
            }
            Rule::RegistryProbe => tunnel
                .filter(|t| method == Method::GET && t.sub_path() == self.registry_path)
                .map(|t| Route::RegistryProbe(t.clone())),
            Rule::Invoke => tunnel
                .filter(|t| method == Method::POST && t.sub_path() == self.invoke_path)
                .map(|t| Route::Invoke(t.clone())),
            Rule::ReservedGuard => {
                let tunnel = tunnel?;
                self.reserved_method(tunnel.sub_path())
                    .map(|allowed| Route::ReservedMethod {
                        tunnel: tunnel.clone(),
                        allowed,
                    })
            }
            Rule::Forward => tunnel.map(|t| Route::Forward(t.clone())),
        }
    }

    /// The only verb accepted on a reserved sub-path, if `sub_path` is one.
    fn reserved_method(&self, sub_path: &str) -> Option<Method> {
        if sub_path == self.registry_path {
            Some(Method::GET)
        } else if sub_path == self.invoke_path {
            Some(Method::POST)
        } else {
            None
        }
    }

    pub fn registry_path(&self) -> &str {
        &self.registry_path
    }

    pub fn invoke_path(&self) -> &str {
        &self.invoke_path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> RouteTable {
        RouteTable::new(&RpcConfig::default())
    }

    fn tunnel(identity: &str, rest: &str) -> TunnelPath {
        TunnelPath {
            identity: identity.to_string(),
            rest: rest.to_string(),
        }
    }

    #[test]
    fn test_parse_tunnel_path() {
        assert_eq!(TunnelPath::parse("/tunnel/abc/x/y"), Some(tunnel("abc", "/x/y")));
        assert_eq!(TunnelPath::parse("/tunnel/abc"), Some(tunnel("abc", "/")));
        assert_eq!(TunnelPath::parse("/tunnel/abc/"), Some(tunnel("abc", "/")));
        assert_eq!(TunnelPath::parse("/tunnel/my%20app/a%2Fb"), Some(tunnel("my app", "/a%2Fb")));
        assert_eq!(TunnelPath::parse("/tunnel/"), None);
        assert_eq!(TunnelPath::parse("/tunnel//x"), None);
        assert_eq!(TunnelPath::parse("/tunnels"), None);
        assert_eq!(TunnelPath::parse("/other/abc"), None);
    }

    #[test]
    fn test_options_always_preflight() {
        let t = table();
        assert_eq!(t.classify(&Method::OPTIONS, "/tunnels"), Route::Preflight);
        assert_eq!(t.classify(&Method::OPTIONS, "/tunnel/a/grpc/invoke"), Route::Preflight);
        assert_eq!(t.classify(&Method::OPTIONS, "/anything"), Route::Preflight);
    }

    #[test]
    fn test_list_is_exact() {
        let t = table();
        assert_eq!(t.classify(&Method::GET, "/tunnels"), Route::ListTunnels);
        assert_eq!(t.classify(&Method::POST, "/tunnels"), Route::Fallback);
        assert_eq!(t.classify(&Method::GET, "/tunnels/x"), Route::Fallback);
    }

    #[test]
    fn test_reserved_sub_paths() {
        let t = table();
        assert_eq!(
            t.classify(&Method::GET, "/tunnel/a/grpc/registry"),
            Route::RegistryProbe(tunnel("a", "/grpc/registry"))
        );
        assert_eq!(
            t.classify(&Method::POST, "/tunnel/a/grpc/invoke"),
            Route::Invoke(tunnel("a", "/grpc/invoke"))
        );
        assert_eq!(
            t.classify(&Method::POST, "/tunnel/a/grpc/invoke/"),
            Route::Invoke(tunnel("a", "/grpc/invoke/"))
        );
    }

    #[test]
    fn test_reserved_sub_paths_reject_other_verbs() {
        let t = table();
        assert_eq!(
            t.classify(&Method::DELETE, "/tunnel/a/grpc/invoke"),
            Route::ReservedMethod {
                tunnel: tunnel("a", "/grpc/invoke"),
                allowed: Method::POST
            }
        );
        assert_eq!(
            t.classify(&Method::GET, "/tunnel/a/grpc/invoke"),
            Route::ReservedMethod {
                tunnel: tunnel("a", "/grpc/invoke"),
                allowed: Method::POST
            }
        );
        assert_eq!(
            t.classify(&Method::POST, "/tunnel/a/grpc/registry"),
            Route::ReservedMethod {
                tunnel: tunnel("a", "/grpc/registry"),
                allowed: Method::GET
            }
        );
    }

    #[test]
    fn test_generic_forward() {
        let t = table();
        assert_eq!(
            t.classify(&Method::DELETE, "/tunnel/a/api/items/1"),
            Route::Forward(tunnel("a", "/api/items/1"))
        );
        assert_eq!(
            t.classify(&Method::GET, "/tunnel/a/grpc/registry/extra"),
            Route::Forward(tunnel("a", "/grpc/registry/extra"))
        );
        assert_eq!(t.classify(&Method::GET, "/tunnel/a"), Route::Forward(tunnel("a", "/")));
    }

    #[test]
    fn test_fallback() {
        let t = table();
        assert_eq!(t.classify(&Method::GET, "/"), Route::Fallback);
        assert_eq!(t.classify(&Method::GET, "/index.html"), Route::Fallback);
        assert_eq!(t.classify(&Method::GET, "/tunnel/"), Route::Fallback);
    }

    #[test]
    fn test_custom_reserved_paths() {
        let rpc = RpcConfig {
            registry_path: "/rpc/list/".to_string(),
            invoke_path: "rpc/call".to_string(),
            ..Default::default()
        };
        let t = RouteTable::new(&rpc);
        assert_eq!(t.registry_path(), "rpc/list");
        assert!(matches!(
            t.classify(&Method::GET, "/tunnel/a/rpc/list"),
            Route::RegistryProbe(_)
        ));
        assert!(matches!(
            t.classify(&Method::POST, "/tunnel/a/grpc/invoke"),
            Route::Forward(_)
        ));
    }
}
