//! # tunnelgate-core
//!
//! Shared types and pure logic for the Tunnelgate gateway:
//!
//! - [`tunnel`]: registry records and the sanitized listing form
//! - [`process`]: per-tunnel process/service registry used for RPC invocation
//! - [`access`]: identity allowlist
//! - [`resolve`]: identity resolution, endpoint overrides, proxy targets
//! - [`config`]: YAML + environment configuration
//!
//! Nothing in this crate performs I/O apart from reading configuration files.

pub mod access;
pub mod config;
pub mod process;
pub mod resolve;
pub mod tunnel;

pub use access::{AccessDecision, AccessList};
pub use config::{
    AccessConfig, ConfigError, CorsConfig, GatewayConfig, PayloadEncoding, RegistryConfig,
    RpcConfig, ServerConfig, UpstreamConfig,
};
pub use process::{
    MethodDescriptor, MethodKind, ProcessDescriptor, ProcessRegistry, ServiceDescriptor,
    ServiceLocation,
};
pub use resolve::{EndpointOverrides, OverrideError, proxy_target, resolve};
pub use tunnel::{TunnelList, TunnelRecord, TunnelSummary};
