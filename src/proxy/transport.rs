//! HTTP transport for direct and proxied requests
//!
//! Builds `reqwest` clients that either dial the target directly or tunnel through a
//! pooled proxy record.

use std::time::Duration;

use reqwest::Client;
use tracing::debug;

use crate::error::{RelayError, Result};
use crate::models::{ProxyProtocol, ProxyRecord};

const USER_AGENT: &str = concat!("proxyrelay/", env!("CARGO_PKG_VERSION"));

/// Factory for outbound HTTP clients
pub struct HttpTransport;

impl HttpTransport {
    /// Client that connects straight to the target, ignoring proxy environment variables
    pub fn direct(timeout: Duration) -> Result<Client> {
        Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .user_agent(USER_AGENT)
            .no_proxy()
            .build()
            .map_err(|e| RelayError::Internal(format!("Failed to build HTTP client: {}", e)))
    }

    /// Client that routes every request through `proxy`
    pub fn via_proxy(proxy: &ProxyRecord, timeout: Duration) -> Result<Client> {
        if proxy.protocol == ProxyProtocol::Socks4 {
            return Err(RelayError::UnsupportedProtocol(proxy.protocol.to_string()));
        }

        let upstream = reqwest::Proxy::all(proxy.url()).map_err(|e| {
            RelayError::InvalidProxyAddress(format!("{}: {}", proxy.endpoint, e))
        })?;

        debug!("Building client through {}", proxy.url());

        Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .user_agent(USER_AGENT)
            .proxy(upstream)
            .build()
            .map_err(|e| RelayError::Internal(format!("Failed to build HTTP client: {}", e)))
    }

    /// Pick the direct or proxied client for one attempt
    pub fn client_for(proxy: Option<&ProxyRecord>, timeout: Duration) -> Result<Client> {
        match proxy {
            Some(proxy) => Self::via_proxy(proxy, timeout),
            None => Self::direct(timeout),
        }
    }
}
