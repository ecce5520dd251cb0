use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;
use url::Host;

/// Proxy protocol type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProxyProtocol {
    #[default]
    Http,
    Https,
    Socks4,
    Socks5,
}

impl ProxyProtocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProxyProtocol::Http => "http",
            ProxyProtocol::Https => "https",
            ProxyProtocol::Socks4 => "socks4",
            ProxyProtocol::Socks5 => "socks5",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "http" => Some(ProxyProtocol::Http),
            "https" => Some(ProxyProtocol::Https),
            "socks4" => Some(ProxyProtocol::Socks4),
            "socks5" => Some(ProxyProtocol::Socks5),
            _ => None,
        }
    }

    /// Scheme used when dialing the proxy itself.
    ///
    /// Public lists label CONNECT-capable HTTP proxies as "https"; they are still
    /// spoken to in plain HTTP.
    pub fn dial_scheme(&self) -> &'static str {
        match self {
            ProxyProtocol::Http | ProxyProtocol::Https => "http",
            ProxyProtocol::Socks4 => "socks4",
            ProxyProtocol::Socks5 => "socks5",
        }
    }
}

impl std::fmt::Display for ProxyProtocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Raw endpoint descriptor yielded by a proxy source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyCandidate {
    pub ip: String,
    pub port: u16,
    pub protocol: ProxyProtocol,
    pub country: String,
    pub anonymity: String,
}

impl ProxyCandidate {
    pub fn new(ip: impl Into<String>, port: u16, protocol: ProxyProtocol) -> Self {
        Self {
            ip: ip.into(),
            port,
            protocol,
            country: "unknown".to_string(),
            anonymity: "unknown".to_string(),
        }
    }

    pub fn with_country(mut self, country: impl Into<String>) -> Self {
        self.country = country.into();
        self
    }

    pub fn with_anonymity(mut self, anonymity: impl Into<String>) -> Self {
        self.anonymity = anonymity.into();
        self
    }

    /// Parse one `host:port` line of a plain-text proxy list.
    ///
    /// Blank lines, comments and anything without a valid port yield `None`.
    pub fn parse_line(line: &str, protocol: ProxyProtocol) -> Option<Self> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return None;
        }

        let (host, port) = line.rsplit_once(':')?;
        // IPv6 hosts must be bracketed; endpoint() adds the brackets back
        let host = match Host::parse(host.trim()).ok()? {
            Host::Ipv4(addr) => addr.to_string(),
            Host::Ipv6(addr) => addr.to_string(),
            Host::Domain(domain) => domain,
        };
        let port = port.trim().parse::<u16>().ok().filter(|p| *p != 0)?;

        Some(Self::new(host, port, protocol))
    }

    /// Unique `host:port` key
    pub fn endpoint(&self) -> String {
        if self.ip.contains(':') && !(self.ip.starts_with('[') && self.ip.ends_with(']')) {
            format!("[{}]:{}", self.ip, self.port)
        } else {
            format!("{}:{}", self.ip, self.port)
        }
    }
}

/// A proxy in the live pool together with its health metrics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyRecord {
    pub endpoint: String,
    pub protocol: ProxyProtocol,
    pub country: String,
    pub anonymity: String,
    pub success_count: u64,
    pub failure_count: u64,
    /// Accumulated over successful requests only, in seconds
    pub total_response_time: f64,
    pub last_used_at: Option<DateTime<Utc>>,
    pub last_tested_at: Option<DateTime<Utc>>,
    pub is_active: bool,
    #[serde(skip)]
    pub is_being_tested: bool,
}

impl From<ProxyCandidate> for ProxyRecord {
    fn from(candidate: ProxyCandidate) -> Self {
        ProxyRecord {
            endpoint: candidate.endpoint(),
            protocol: candidate.protocol,
            country: candidate.country,
            anonymity: candidate.anonymity,
            success_count: 0,
            failure_count: 0,
            total_response_time: 0.0,
            last_used_at: None,
            last_tested_at: None,
            is_active: true,
            is_being_tested: false,
        }
    }
}

impl ProxyRecord {
    /// Success ratio in `[0, 1]`, zero before any attempt
    pub fn success_rate(&self) -> f64 {
        let total = self.success_count + self.failure_count;
        if total == 0 {
            0.0
        } else {
            self.success_count as f64 / total as f64
        }
    }

    /// Mean latency of successful requests in seconds, infinite before the first success
    pub fn avg_response_time(&self) -> f64 {
        if self.success_count == 0 {
            f64::INFINITY
        } else {
            self.total_response_time / self.success_count as f64
        }
    }

    /// URL handed to the HTTP client when dialing through this proxy
    pub fn url(&self) -> String {
        format!("{}://{}", self.protocol.dial_scheme(), self.endpoint)
    }

    /// Record a successful request.
    ///
    /// Forgives one earlier failure but never reactivates the record.
    pub fn record_success(&mut self, response_time: Duration) {
        self.success_count += 1;
        self.total_response_time += response_time.as_secs_f64();
        self.last_used_at = Some(Utc::now());
        self.failure_count = self.failure_count.saturating_sub(1);
    }

    /// Record a failed request, deactivating once `max_failures` is reached.
    ///
    /// Returns true when this call tripped the breaker.
    pub fn record_failure(&mut self, max_failures: u32) -> bool {
        self.failure_count += 1;
        self.last_used_at = Some(Utc::now());

        if self.is_active && self.failure_count >= u64::from(max_failures) {
            self.is_active = false;
            warn!(
                "Proxy {} deactivated after {} failures",
                self.endpoint, self.failure_count
            );
            return true;
        }
        false
    }
}
