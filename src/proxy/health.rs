//! Health probing for candidate and pooled proxies
//!
//! A probe sends one request through the proxy to a fixed test endpoint and records the
//! outcome on the record itself.

use std::time::{Duration, Instant};

use chrono::Utc;
use futures::StreamExt;
use tokio::time::timeout;
use tracing::{debug, instrument};

use crate::config::PoolConfig;
use crate::error::{RelayError, Result};
use crate::models::ProxyRecord;
use crate::proxy::pool::SharedRecord;
use crate::proxy::transport::HttpTransport;

/// Health prober configuration
#[derive(Clone, Debug)]
pub struct ProberConfig {
    /// URL every proxy is probed against
    pub test_url: String,
    /// Hard timeout for a single probe
    pub test_timeout: Duration,
    /// Failures before a record is deactivated
    pub max_failures: u32,
    /// Upper bound on probes in flight during a batch
    pub concurrency: usize,
}

impl From<&PoolConfig> for ProberConfig {
    fn from(config: &PoolConfig) -> Self {
        Self {
            test_url: config.test_url.clone(),
            test_timeout: config.test_timeout,
            max_failures: config.max_failures,
            concurrency: config.sample_size.max(1),
        }
    }
}

/// Validates proxies against the test endpoint
pub struct HealthProber {
    config: ProberConfig,
}

impl HealthProber {
    pub fn new(config: ProberConfig) -> Self {
        Self { config }
    }

    /// Probe one record and record the outcome on it.
    ///
    /// Returns false without touching metrics when the record is already under test.
    pub async fn test(&self, record: &SharedRecord) -> bool {
        let snapshot = {
            let mut guard = record.lock();
            if guard.is_being_tested {
                debug!("Proxy {} is already being tested", guard.endpoint);
                return false;
            }
            guard.is_being_tested = true;
            guard.clone()
        };

        let started = Instant::now();
        let outcome = self.probe(&snapshot).await;
        let elapsed = started.elapsed();

        let mut guard = record.lock();
        guard.is_being_tested = false;
        guard.last_tested_at = Some(Utc::now());

        match outcome {
            Ok(()) => {
                guard.record_success(elapsed);
                debug!(
                    "Proxy {} OK ({:.2}s)",
                    guard.endpoint,
                    elapsed.as_secs_f64()
                );
                true
            }
            Err(e) => {
                guard.record_failure(self.config.max_failures);
                debug!("Proxy {} failed: {}", guard.endpoint, e);
                false
            }
        }
    }

    /// Probe records concurrently and keep only the ones that passed, in input order
    pub async fn test_batch(&self, records: Vec<SharedRecord>) -> Vec<SharedRecord> {
        futures::stream::iter(records)
            .map(|record| async move {
                let passed = self.test(&record).await;
                (record, passed)
            })
            .buffered(self.config.concurrency)
            .filter_map(|(record, passed)| async move { passed.then_some(record) })
            .collect()
            .await
    }

    /// One bounded request through the proxy; any non-2xx or unreadable body fails
    #[instrument(skip(self, proxy), fields(proxy = %proxy.endpoint))]
    async fn probe(&self, proxy: &ProxyRecord) -> Result<()> {
        let client = HttpTransport::via_proxy(proxy, self.config.test_timeout)?;

        let request = async {
            let response = client.get(&self.config.test_url).send().await?;
            let status = response.status();
            if !status.is_success() {
                return Err(RelayError::UpstreamStatus(status.as_u16()));
            }
            response.bytes().await?;
            Ok::<(), RelayError>(())
        };

        match timeout(self.config.test_timeout, request).await {
            Ok(result) => result.map_err(|e| RelayError::ProxyTestFailed(e.to_string())),
            Err(_) => Err(RelayError::Timeout),
        }
    }
}
