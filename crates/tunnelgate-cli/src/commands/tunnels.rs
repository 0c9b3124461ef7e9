//! `tunnelgate tunnels`: print the sanitized listing.

use super::ConfigArgs;
use anyhow::{Context, Result};
use reqwest::header::HeaderMap;
use tunnelgate_core::TunnelList;
use tunnelgate_proxy::registry;

pub async fn run(args: &ConfigArgs) -> Result<()> {
    let config = args.load()?;
    let client = reqwest::Client::builder()
        .build()
        .context("failed to build HTTP client")?;

    let source = registry::from_config(&config.registry, client);
    let records = source
        .list_tunnels(&HeaderMap::new())
        .await
        .context("failed to fetch tunnels from registry")?;

    let listing = TunnelList::visible(&records, &config.access_list());
    println!("{}", serde_json::to_string_pretty(&listing)?);
    Ok(())
}
