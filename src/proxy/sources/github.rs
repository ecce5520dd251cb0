use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, info, instrument};

use super::{fetch_text, parse_plain_list, ProxySource};
use crate::models::{ProxyCandidate, ProxyProtocol};

const LIST_URLS: &[&str] = &[
    "https://raw.githubusercontent.com/TheSpeedX/PROXY-List/master/http.txt",
    "https://raw.githubusercontent.com/ShiftyTR/Proxy-List/master/http.txt",
    "https://raw.githubusercontent.com/monosans/proxy-list/main/proxies/http.txt",
];

/// Community-maintained plain-text lists hosted on GitHub
pub struct GithubListSource {
    client: Client,
    urls: Vec<String>,
}

impl GithubListSource {
    pub fn new(client: Client) -> Self {
        Self::with_urls(client, LIST_URLS.iter().map(|u| u.to_string()).collect())
    }

    pub fn with_urls(client: Client, urls: Vec<String>) -> Self {
        Self { client, urls }
    }
}

#[async_trait]
impl ProxySource for GithubListSource {
    fn name(&self) -> &'static str {
        "proxylist"
    }

    #[instrument(skip(self), fields(source = "proxylist"))]
    async fn fetch_candidates(&self) -> Vec<ProxyCandidate> {
        let downloads = self.urls.iter().map(|url| async move {
            match fetch_text(&self.client, url, &[]).await {
                Ok(body) => parse_plain_list(&body, ProxyProtocol::Http, "unknown"),
                Err(e) => {
                    debug!("Failed to fetch {}: {}", url, e);
                    Vec::new()
                }
            }
        });

        let candidates: Vec<_> = futures::future::join_all(downloads)
            .await
            .into_iter()
            .flatten()
            .collect();

        info!("ProxyList: fetched {} proxies", candidates.len());
        candidates
    }
}
