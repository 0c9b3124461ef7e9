//! `tunnelgate check`: validate configuration.
//!
//! Runs the same validation as `serve` and adds warnings for setups that
//! work but are probably not intended, such as an open allowlist.

use super::ConfigArgs;
use anyhow::{Result, bail};
use std::fmt;
use tunnelgate_core::GatewayConfig;

/// Severity level for check results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Info => write!(f, "INFO"),
            Severity::Warning => write!(f, "WARN"),
            Severity::Error => write!(f, "ERROR"),
        }
    }
}

/// A single check finding.
#[derive(Debug, Clone)]
pub struct CheckFinding {
    pub severity: Severity,
    /// Configuration section the finding refers to.
    pub section: &'static str,
    pub message: String,
}

impl CheckFinding {
    fn error(section: &'static str, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            section,
            message: message.into(),
        }
    }

    fn warning(section: &'static str, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            section,
            message: message.into(),
        }
    }

    fn info(section: &'static str, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Info,
            section,
            message: message.into(),
        }
    }
}

impl fmt::Display for CheckFinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.severity, self.section, self.message)
    }
}

/// Inspect a loaded configuration.
pub fn inspect(config: &GatewayConfig) -> Vec<CheckFinding> {
    let mut findings = Vec::new();

    if let Err(e) = config.validate() {
        findings.push(CheckFinding::error("config", e.to_string()));
    }

    match &config.registry.url {
        Some(url) => {
            findings.push(CheckFinding::info("registry", format!("network registry at {url}")));
            let loopback = matches!(url.host_str(), Some("localhost" | "127.0.0.1" | "[::1]"));
            if url.scheme() != "https" && !loopback {
                findings.push(CheckFinding::warning(
                    "registry",
                    "registry is reached over plain HTTP; forwarded caller credentials are exposed",
                ));
            }
        }
        None if !config.registry.static_tunnels.is_empty() => {
            findings.push(CheckFinding::warning(
                "registry",
                format!(
                    "using an in-process snapshot of {} tunnel(s); changes need a restart",
                    config.registry.static_tunnels.len()
                ),
            ));
        }
        None => {}
    }

    let access = config.access_list();
    if access.is_open() {
        findings.push(CheckFinding::warning(
            "access",
            "allowlist is empty; every registered tunnel is reachable",
        ));
    } else {
        findings.push(CheckFinding::info(
            "access",
            format!("{} tunnel(s) allowed", access.listed()),
        ));
    }

    let mut identities: Vec<&String> = config.overrides.keys().collect();
    identities.sort();
    for identity in identities {
        if !access.check(identity).is_allowed() {
            findings.push(CheckFinding::warning(
                "overrides",
                format!("override for '{identity}' is unreachable: identity is not allowed"),
            ));
        } else {
            findings.push(CheckFinding::info(
                "overrides",
                format!("'{identity}' is redirected to a local endpoint"),
            ));
        }
    }

    if let Some(dir) = &config.server.static_dir
        && !dir.is_dir()
    {
        findings.push(CheckFinding::error(
            "server",
            format!("static_dir {} is not a directory", dir.display()),
        ));
    }

    findings
}

pub fn run(args: &ConfigArgs) -> Result<()> {
    let config = args.load()?;
    let findings = inspect(&config);

    println!("Checking tunnelgate configuration...");
    for finding in &findings {
        println!("  {finding}");
    }

    let errors = findings
        .iter()
        .filter(|f| f.severity == Severity::Error)
        .count();
    let warnings = findings
        .iter()
        .filter(|f| f.severity == Severity::Warning)
        .count();
    println!();
    println!("{errors} error(s), {warnings} warning(s)");

    if errors > 0 {
        bail!("configuration has {errors} error(s)");
    }
    Ok(())
}
