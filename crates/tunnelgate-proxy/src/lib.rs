//! # tunnelgate-proxy
//!
//! HTTP gateway that resolves an opaque tunnel identity to a live endpoint and
//! forwards the request to it, without revealing the endpoint to callers.
//!
//! ## Routes
//!
//! | Route | Behaviour |
//! |-------|-----------|
//! | `OPTIONS *` | CORS preflight |
//! | `GET /tunnels` | Allowed identities, without endpoints |
//! | `GET /tunnel/{id}/grpc/registry` | Process registry probe |
//! | `POST /tunnel/{id}/grpc/invoke` | Unary RPC invocation |
//! | `ANY /tunnel/{id}/{path}` | Transparent forward |
//! | `GET /healthz` | Liveness |
//!
//! Every resolution fetches the tunnel set from the registry again; the
//! gateway holds no per-tunnel state.
//!
//! ## Example
//!
//! ```ignore
//! use tunnelgate_core::GatewayConfig;
//! use tunnelgate_proxy::GatewayServer;
//!
//! let mut config = GatewayConfig::from_file("tunnelgate.yaml")?;
//! config.apply_env()?;
//! GatewayServer::new(config).run().await?;
//! ```

pub mod assets;
pub mod error;
pub mod forward;
pub mod handlers;
pub mod headers;
pub mod invoke;
pub mod registry;
pub mod routes;
pub mod server;
pub mod state;

pub use error::GatewayError;
pub use forward::Forwarder;
pub use invoke::{InvokeRequest, InvokeResult, Invoker};
pub use registry::{HttpTunnelRegistry, RegistryError, StaticTunnelRegistry, TunnelRegistry};
pub use routes::{Route, RouteTable, TunnelPath};
pub use server::{GatewayServer, build_router, create_router};
pub use state::GatewayState;
