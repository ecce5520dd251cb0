use async_trait::async_trait;
use reqwest::Client;
use tracing::{info, instrument};

use super::{fetch_text, parse_plain_list, unavailable, ProxySource};
use crate::models::{ProxyCandidate, ProxyProtocol};

const BASE_URL: &str = "https://api.proxyscrape.com/v2/";

/// ProxyScrape plain-text API, elite HTTP proxies only
pub struct ProxyScrapeSource {
    client: Client,
    base_url: String,
}

impl ProxyScrapeSource {
    pub fn new(client: Client) -> Self {
        Self::with_base_url(client, BASE_URL)
    }

    pub fn with_base_url(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl ProxySource for ProxyScrapeSource {
    fn name(&self) -> &'static str {
        "proxyscrape"
    }

    #[instrument(skip(self), fields(source = "proxyscrape"))]
    async fn fetch_candidates(&self) -> Vec<ProxyCandidate> {
        let query = [
            ("request", "displayproxies"),
            ("protocol", "http"),
            ("timeout", "5000"),
            ("country", "all"),
            ("ssl", "all"),
            ("anonymity", "elite"),
        ];

        match fetch_text(&self.client, &self.base_url, &query).await {
            Ok(body) => {
                let candidates = parse_plain_list(&body, ProxyProtocol::Http, "elite");
                info!("ProxyScrape: fetched {} proxies", candidates.len());
                candidates
            }
            Err(e) => unavailable(self.name(), e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{dead_addr, spawn_stub, StubResponse};

    #[tokio::test]
    async fn test_fetches_and_parses_plain_list() {
        let stub = spawn_stub(vec![StubResponse::text(
            200,
            "10.0.0.1:3128\nbad line\n10.0.0.2:80\n",
        )])
        .await;
        let source = ProxyScrapeSource::with_base_url(Client::new(), stub.url("/v2/"));

        let candidates = source.fetch_candidates().await;
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].endpoint(), "10.0.0.1:3128");
        assert!(stub.requests()[0].contains("request=displayproxies"));
    }

    #[tokio::test]
    async fn test_outage_yields_empty_list() {
        let addr = dead_addr().await;
        let source =
            ProxyScrapeSource::with_base_url(Client::new(), format!("http://{}/v2/", addr));
        assert!(source.fetch_candidates().await.is_empty());

        let stub = spawn_stub(vec![StubResponse::text(503, "10.0.0.1:3128")]).await;
        let source = ProxyScrapeSource::with_base_url(Client::new(), stub.url("/v2/"));
        assert!(source.fetch_candidates().await.is_empty());
    }
}
