//! Live proxy pool
//!
//! Owns the current set of validated proxies. A refresh builds a brand new set from every
//! enabled source and swaps it in atomically; readers see either the old set or the new
//! one. Per-record metrics sit behind their own mutex so concurrent outcomes on the same
//! endpoint never lose updates.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

use arc_swap::ArcSwap;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rand::seq::index::sample;
use tracing::{debug, info, instrument, warn};

use crate::config::PoolConfig;
use crate::error::RelayError;
use crate::models::{ProxyCandidate, ProxyRecord};
use crate::proxy::health::HealthProber;
use crate::proxy::sources::ProxySource;

/// A pooled record shared between the pool, probes and in-flight fetches
pub type SharedRecord = Arc<Mutex<ProxyRecord>>;

/// One generation of the live set
#[derive(Default)]
struct LiveSet {
    records: Vec<SharedRecord>,
    index: HashMap<String, usize>,
    refreshed_at: Option<DateTime<Utc>>,
}

impl LiveSet {
    fn new(records: Vec<SharedRecord>, refreshed_at: DateTime<Utc>) -> Self {
        let index = records
            .iter()
            .enumerate()
            .map(|(i, r)| (r.lock().endpoint.clone(), i))
            .collect();
        Self {
            records,
            index,
            refreshed_at: Some(refreshed_at),
        }
    }

    fn get(&self, endpoint: &str) -> Option<&SharedRecord> {
        self.index.get(endpoint).map(|&i| &self.records[i])
    }
}

/// Ordering used for selection: success rate descending, then average latency
/// ascending, then endpoint so the order is total.
pub fn rank(a: &ProxyRecord, b: &ProxyRecord) -> Ordering {
    b.success_rate()
        .total_cmp(&a.success_rate())
        .then_with(|| a.avg_response_time().total_cmp(&b.avg_response_time()))
        .then_with(|| a.endpoint.cmp(&b.endpoint))
}

/// Pool of validated proxies
pub struct ProxyPool {
    config: PoolConfig,
    sources: Vec<Arc<dyn ProxySource>>,
    prober: HealthProber,
    live: ArcSwap<LiveSet>,
    refresh_lock: tokio::sync::Mutex<()>,
}

impl ProxyPool {
    pub fn new(config: PoolConfig, sources: Vec<Arc<dyn ProxySource>>) -> Self {
        let prober = HealthProber::new((&config).into());
        Self {
            config,
            sources,
            prober,
            live: ArcSwap::from_pointee(LiveSet::default()),
            refresh_lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// When the live set was last replaced
    pub fn last_refreshed_at(&self) -> Option<DateTime<Utc>> {
        self.live.load().refreshed_at
    }

    /// Number of records in the live set, active or not
    pub fn len(&self) -> usize {
        self.live.load().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True if the pool was never refreshed or the live set is older than the interval
    pub fn should_refresh(&self) -> bool {
        match self.last_refreshed_at() {
            None => true,
            Some(at) => match (Utc::now() - at).to_std() {
                Ok(age) => age > self.config.refresh_interval,
                Err(_) => false,
            },
        }
    }

    /// Repopulate the live set from every source.
    ///
    /// Concurrent callers queue behind one another; each call performs a full cycle.
    /// Returns the size of the new live set.
    pub async fn refresh(&self) -> usize {
        let _guard = self.refresh_lock.lock().await;
        self.refresh_locked().await
    }

    /// Refresh only if the live set is stale, single-flighting concurrent callers
    pub async fn refresh_if_stale(&self) {
        if !self.should_refresh() {
            return;
        }
        let _guard = self.refresh_lock.lock().await;
        // Another caller may have refreshed while we waited
        if self.should_refresh() {
            self.refresh_locked().await;
        }
    }

    #[instrument(skip(self))]
    async fn refresh_locked(&self) -> usize {
        info!("Refreshing proxy list from {} sources", self.sources.len());
        let started = Instant::now();

        let fetched = self.collect_candidates().await;
        let fetched_count = fetched.len();
        let candidates = dedupe(fetched);
        info!(
            "Fetched {} proxies, {} unique",
            fetched_count,
            candidates.len()
        );

        let sampled: Vec<SharedRecord> = {
            let sample_size = self.config.sample_size.min(candidates.len());
            let mut rng = rand::thread_rng();
            sample(&mut rng, candidates.len(), sample_size)
                .into_iter()
                .map(|i| Arc::new(Mutex::new(ProxyRecord::from(candidates[i].clone()))))
                .collect()
        };

        debug!("Testing {} sampled proxies", sampled.len());
        let working = self.prober.test_batch(sampled).await;
        let working_count = working.len();

        self.live.store(Arc::new(LiveSet::new(working, Utc::now())));

        info!(
            "Proxy refresh complete: {} working proxies ({:.1}s)",
            working_count,
            started.elapsed().as_secs_f64()
        );
        working_count
    }

    /// Fetch every source concurrently; a source that panics contributes nothing
    async fn collect_candidates(&self) -> Vec<ProxyCandidate> {
        let tasks = self.sources.iter().map(|source| {
            let source = source.clone();
            let name = source.name();
            let handle = tokio::spawn(async move { source.fetch_candidates().await });
            async move {
                match handle.await {
                    Ok(candidates) => candidates,
                    Err(e) => {
                        warn!("Proxy source {} aborted: {}", name, e);
                        Vec::new()
                    }
                }
            }
        });

        futures::future::join_all(tasks)
            .await
            .into_iter()
            .flatten()
            .collect()
    }

    /// Best active proxy for a logical provider.
    ///
    /// `None` means either the provider is not restricted or no active proxy exists.
    pub async fn select_best(&self, provider_name: &str) -> Option<ProxyRecord> {
        if !self.config.is_restricted(provider_name) {
            debug!("Provider {} doesn't need a proxy", provider_name);
            return None;
        }

        self.refresh_if_stale().await;

        let best = self.active_snapshot().into_iter().min_by(rank);

        match &best {
            Some(proxy) => debug!(
                "Selected proxy for {}: {} (success rate: {:.1}%)",
                provider_name,
                proxy.endpoint,
                proxy.success_rate() * 100.0
            ),
            None => warn!("{} for {}", RelayError::NoProxyAvailable, provider_name),
        }

        best
    }

    /// Apply a request outcome to a pooled record.
    ///
    /// Returns false when the endpoint is no longer in the live set; the outcome is dropped.
    pub fn record_outcome(&self, endpoint: &str, success: bool, response_time: Duration) -> bool {
        let live = self.live.load();
        let Some(record) = live.get(endpoint) else {
            debug!("Dropping outcome for {}: no longer pooled", endpoint);
            return false;
        };

        let mut record = record.lock();
        if success {
            record.record_success(response_time);
        } else {
            record.record_failure(self.config.max_failures);
        }
        true
    }

    /// Copy of every record in the live set
    pub fn snapshot(&self) -> Vec<ProxyRecord> {
        self.snapshot_with_refresh_time().0
    }

    /// Records and refresh time taken from the same live set
    pub fn snapshot_with_refresh_time(&self) -> (Vec<ProxyRecord>, Option<DateTime<Utc>>) {
        let live = self.live.load();
        let records = live.records.iter().map(|r| r.lock().clone()).collect();
        (records, live.refreshed_at)
    }

    /// Copy of the active records only
    pub fn active_snapshot(&self) -> Vec<ProxyRecord> {
        self.live
            .load()
            .records
            .iter()
            .filter_map(|r| {
                let r = r.lock();
                r.is_active.then(|| r.clone())
            })
            .collect()
    }

    #[cfg(test)]
    pub(crate) fn install(&self, records: Vec<ProxyRecord>) {
        let records = records
            .into_iter()
            .map(|r| Arc::new(Mutex::new(r)))
            .collect();
        self.live.store(Arc::new(LiveSet::new(records, Utc::now())));
    }
}

/// Drop repeated endpoints, keeping the first occurrence
fn dedupe(candidates: Vec<ProxyCandidate>) -> Vec<ProxyCandidate> {
    let mut seen = HashSet::new();
    candidates
        .into_iter()
        .filter(|c| seen.insert(c.endpoint()))
        .collect()
}
