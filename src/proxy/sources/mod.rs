//! Proxy candidate sources
//!
//! Each source pulls raw `host:port` endpoints from an untrusted public feed. Sources
//! never fail: an outage or a malformed feed yields an empty list and a log line.

mod geonode;
mod github;
mod proxyscrape;

pub use geonode::GeonodeSource;
pub use github::GithubListSource;
pub use proxyscrape::ProxyScrapeSource;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::warn;

use crate::error::{RelayError, Result};
use crate::models::ProxyCandidate;

/// A feed of candidate proxies
#[async_trait]
pub trait ProxySource: Send + Sync {
    /// Name used in configuration and logs
    fn name(&self) -> &'static str;

    /// Download the current candidate list.
    ///
    /// Returns an empty list on any failure.
    async fn fetch_candidates(&self) -> Vec<ProxyCandidate>;
}

/// Known source names
pub const SOURCE_NAMES: &[&str] = &["proxyscrape", "proxylist", "geonode"];

/// Build the enabled sources, skipping unknown names
pub fn create_sources(names: &[String], timeout: Duration) -> Result<Vec<Arc<dyn ProxySource>>> {
    let client = source_client(timeout)?;

    let sources = names
        .iter()
        .filter_map(|name| -> Option<Arc<dyn ProxySource>> {
            match name.as_str() {
                "proxyscrape" => Some(Arc::new(ProxyScrapeSource::new(client.clone()))),
                "proxylist" => Some(Arc::new(GithubListSource::new(client.clone()))),
                "geonode" => Some(Arc::new(GeonodeSource::new(client.clone()))),
                other => {
                    warn!(
                        "Unknown proxy source '{}' (known: {})",
                        other,
                        SOURCE_NAMES.join(", ")
                    );
                    None
                }
            }
        })
        .collect();
    Ok(sources)
}

fn source_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .user_agent(concat!("proxyrelay/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| RelayError::Internal(format!("Failed to build source client: {}", e)))
}

/// Fetch a body as text, treating non-2xx as an error
async fn fetch_text(
    client: &Client,
    url: &str,
    query: &[(&str, &str)],
) -> anyhow::Result<String> {
    let response = client
        .get(url)
        .query(query)
        .send()
        .await?
        .error_for_status()?;
    Ok(response.text().await?)
}

/// Log a failed download and contribute nothing
fn unavailable(source_name: &str, err: anyhow::Error) -> Vec<ProxyCandidate> {
    let err = RelayError::ProviderUnavailable {
        source_name: source_name.to_string(),
        reason: format!("{:#}", err),
    };
    warn!("{}", err);
    Vec::new()
}

/// Parse a newline-separated `host:port` feed, dropping malformed lines
fn parse_plain_list(
    body: &str,
    protocol: crate::models::ProxyProtocol,
    anonymity: &str,
) -> Vec<ProxyCandidate> {
    body.lines()
        .filter_map(|line| ProxyCandidate::parse_line(line, protocol))
        .map(|c| c.with_anonymity(anonymity))
        .collect()
}
