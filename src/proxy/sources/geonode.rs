use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, info, instrument};

use super::{fetch_text, unavailable, ProxySource};
use crate::models::{ProxyCandidate, ProxyProtocol};

const BASE_URL: &str = "https://proxylist.geonode.com/api/proxy-list";

/// Geonode JSON proxy list
pub struct GeonodeSource {
    client: Client,
    base_url: String,
}

impl GeonodeSource {
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

/// Convert one entry of the `data` array; malformed entries yield `None`
fn parse_item(item: &Value) -> Option<ProxyCandidate> {
    let ip = item.get("ip")?.as_str()?.trim();
    if ip.is_empty() {
        return None;
    }

    // Ports arrive as strings or numbers depending on the API version
    let port = match item.get("port")? {
        Value::String(s) => s.trim().parse::<u16>().ok()?,
        Value::Number(n) => u16::try_from(n.as_u64()?).ok()?,
        _ => return None,
    };
    if port == 0 {
        return None;
    }

    let protocol = item
        .get("protocols")
        .and_then(Value::as_array)
        .and_then(|protocols| protocols.first())
        .and_then(Value::as_str)
        .and_then(ProxyProtocol::from_str)
        .unwrap_or(ProxyProtocol::Http);

    let text = |key: &str| {
        item.get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .unwrap_or("unknown")
            .to_string()
    };

    Some(
        ProxyCandidate::new(ip, port, protocol)
            .with_country(text("country"))
            .with_anonymity(text("anonymityLevel")),
    )
}

fn parse_body(body: &str) -> anyhow::Result<Vec<ProxyCandidate>> {
    let document: Value = serde_json::from_str(body)?;
    let items = document
        .get("data")
        .and_then(Value::as_array)
        .ok_or_else(|| anyhow::anyhow!("response has no data array"))?;

    let candidates: Vec<_> = items.iter().filter_map(parse_item).collect();
    let skipped = items.len() - candidates.len();
    if skipped > 0 {
        debug!("Geonode: skipped {} malformed entries", skipped);
    }
    Ok(candidates)
}

#[async_trait]
impl ProxySource for GeonodeSource {
    fn name(&self) -> &'static str {
        "geonode"
    }

    #[instrument(skip(self), fields(source = "geonode"))]
    async fn fetch_candidates(&self) -> Vec<ProxyCandidate> {
        let query = [
            ("limit", "100"),
            ("page", "1"),
            ("sort_by", "lastChecked"),
            ("sort_type", "desc"),
            ("protocols", "http,https"),
        ];

        let result = fetch_text(&self.client, &self.base_url, &query)
            .await
            .and_then(|body| parse_body(&body));

        match result {
            Ok(candidates) => {
                info!("Geonode: fetched {} proxies", candidates.len());
                candidates
            }
            Err(e) => unavailable(self.name(), e),
        }
    }
}
