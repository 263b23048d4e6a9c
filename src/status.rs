//! Provider health behind a single-flight TTL cache.
//!
//! The live snapshot sits in an `Arc` behind a short `RwLock`; readers clone the
//! `Arc` and never see a half-written snapshot. Refreshes are serialized by one
//! async mutex and re-check freshness once they hold it, so concurrent demand
//! for a stale snapshot runs a single probe fan-out.

use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use metrics::counter;
use tokio::sync::Mutex;

use crate::probe::DynProbe;
use crate::types::{ProviderHealth, SourceName};

/// Result of one complete refresh pass.
#[derive(Debug, Clone)]
pub struct StatusSnapshot {
    /// Increments by one per refresh pass; 1 is the first snapshot.
    pub generation: u64,
    /// Monotonic stamp used for TTL checks.
    pub fetched_at: Instant,
    /// Wall-clock stamp shared by every entry of this pass.
    pub checked_at: DateTime<Utc>,
    pub providers: Vec<ProviderHealth>,
}

impl StatusSnapshot {
    pub fn is_fresh(&self, ttl: Duration) -> bool {
        self.fetched_at.elapsed() < ttl
    }

    pub fn get(&self, source: SourceName) -> Option<&ProviderHealth> {
        self.providers.iter().find(|p| p.source == source)
    }
}

pub struct StatusCache {
    probes: Vec<DynProbe>,
    ttl: Duration,
    current: RwLock<Option<Arc<StatusSnapshot>>>,
    refresh_lock: Mutex<()>,
}

impl StatusCache {
    /// Probes are reordered into fixed provider order.
    pub fn new(mut probes: Vec<DynProbe>, ttl: Duration) -> Self {
        probes.sort_by_key(|p| p.source());
        Self {
            probes,
            ttl,
            current: RwLock::new(None),
            refresh_lock: Mutex::new(()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Last committed snapshot, fresh or not.
    pub fn peek(&self) -> Option<Arc<StatusSnapshot>> {
        match self.current.read() {
            Ok(g) => g.clone(),
            Err(poison) => poison.into_inner().clone(),
        }
    }

    fn fresh(&self) -> Option<Arc<StatusSnapshot>> {
        self.peek().filter(|s| s.is_fresh(self.ttl))
    }

    /// Current health, refreshing first when stale or when `force_refresh`.
    ///
    /// A forced call returns a snapshot newer than the one committed when the
    /// call began; if another refresh lands while this caller waits for the
    /// lock, that refresh satisfies it.
    pub async fn get_status(&self, force_refresh: bool) -> Arc<StatusSnapshot> {
        if !force_refresh {
            if let Some(snap) = self.fresh() {
                counter!("status_cache_hits_total").increment(1);
                return snap;
            }
        }
        let seen_generation = self.peek().map(|s| s.generation).unwrap_or(0);

        let _guard = self.refresh_lock.lock().await;

        if let Some(snap) = self.peek() {
            let refreshed_meanwhile = snap.generation > seen_generation;
            if (force_refresh && refreshed_meanwhile)
                || (!force_refresh && snap.is_fresh(self.ttl))
            {
                counter!("status_cache_hits_total").increment(1);
                return snap;
            }
        }

        let snap = Arc::new(self.refresh(seen_generation).await);
        match self.current.write() {
            Ok(mut g) => *g = Some(snap.clone()),
            Err(poison) => *poison.into_inner() = Some(snap.clone()),
        }
        snap
    }

    async fn refresh(&self, previous_generation: u64) -> StatusSnapshot {
        crate::metrics::ensure_described();
        let checked_at = Utc::now();
        let generation = self
            .peek()
            .map(|s| s.generation)
            .unwrap_or(previous_generation)
            + 1;

        let results = futures::future::join_all(self.probes.iter().map(|p| p.check())).await;

        let providers: Vec<ProviderHealth> = self
            .probes
            .iter()
            .zip(results)
            .map(|(p, r)| ProviderHealth {
                source: p.source(),
                ok: r.ok,
                checked_at,
                latency_ms: Some(r.latency_ms),
                error: r.error,
            })
            .collect();

        let healthy = providers.iter().filter(|p| p.ok).count();
        counter!("status_refresh_total").increment(1);
        tracing::info!(
            generation,
            healthy,
            total = providers.len(),
            "provider status refreshed"
        );

        StatusSnapshot {
            generation,
            fetched_at: Instant::now(),
            checked_at,
            providers,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::{Probe, ProbeResult};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingProbe {
        source: SourceName,
        calls: Arc<AtomicUsize>,
        delay: Duration,
        ok: bool,
    }

    #[async_trait]
    impl Probe for CountingProbe {
        fn source(&self) -> SourceName {
            self.source
        }

        async fn check(&self) -> ProbeResult {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            ProbeResult {
                ok: self.ok,
                latency_ms: self.delay.as_millis() as u64,
                error: (!self.ok).then(|| "http_status:500".to_string()),
            }
        }
    }

    fn cache(ttl: Duration, delay: Duration) -> (StatusCache, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let probes: Vec<DynProbe> = vec![
            Arc::new(CountingProbe {
                source: SourceName::Rss,
                calls: calls.clone(),
                delay,
                ok: false,
            }),
            Arc::new(CountingProbe {
                source: SourceName::Github,
                calls: calls.clone(),
                delay,
                ok: true,
            }),
            Arc::new(CountingProbe {
                source: SourceName::Hackernews,
                calls: calls.clone(),
                delay,
                ok: true,
            }),
        ];
        (StatusCache::new(probes, ttl), calls)
    }

    #[tokio::test]
    async fn snapshot_is_in_fixed_order_with_shared_checked_at() {
        let (c, _) = cache(Duration::from_secs(15), Duration::ZERO);
        let snap = c.get_status(false).await;
        let order: Vec<_> = snap.providers.iter().map(|p| p.source).collect();
        assert_eq!(order, SourceName::ALL.to_vec());
        assert!(snap.providers.iter().all(|p| p.checked_at == snap.checked_at));
        let rss = snap.get(SourceName::Rss).unwrap();
        assert!(!rss.ok);
        assert_eq!(rss.error.as_deref(), Some("http_status:500"));
    }

    #[tokio::test]
    async fn within_ttl_probes_run_once() {
        let (c, calls) = cache(Duration::from_secs(15), Duration::ZERO);
        let a = c.get_status(false).await;
        let b = c.get_status(false).await;
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[tokio::test]
    async fn concurrent_stale_callers_share_one_refresh() {
        let (c, calls) = cache(Duration::from_secs(15), Duration::from_millis(50));
        let c = Arc::new(c);
        let handles: Vec<_> = (0..16)
            .map(|_| {
                let c = c.clone();
                tokio::spawn(async move { c.get_status(false).await.generation })
            })
            .collect();
        for h in handles {
            assert_eq!(h.await.unwrap(), 1);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn expiry_triggers_exactly_one_new_fan_out() {
        let (c, calls) = cache(Duration::from_millis(150), Duration::from_millis(10));
        let c = Arc::new(c);
        assert_eq!(c.get_status(false).await.generation, 1);

        tokio::time::sleep(Duration::from_millis(400)).await;

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let c = c.clone();
                tokio::spawn(async move { c.get_status(false).await.generation })
            })
            .collect();
        for h in handles {
            assert_eq!(h.await.unwrap(), 2);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 6);
    }

    #[tokio::test]
    async fn forced_refresh_is_newer_than_previous() {
        let (c, calls) = cache(Duration::from_secs(15), Duration::ZERO);
        let before = c.get_status(false).await;
        tokio::time::sleep(Duration::from_millis(5)).await;
        let after = c.get_status(true).await;
        assert!(after.generation > before.generation);
        assert!(after.checked_at > before.checked_at);
        assert_eq!(calls.load(Ordering::SeqCst), 6);

        // Non-forced read right after serves the forced result.
        let again = c.get_status(false).await;
        assert!(Arc::ptr_eq(&after, &again));
    }

    #[tokio::test]
    async fn forced_caller_queued_behind_a_refresh_takes_its_result() {
        let (c, calls) = cache(Duration::from_secs(15), Duration::from_millis(100));
        let c = Arc::new(c);
        assert_eq!(c.get_status(false).await.generation, 1);

        let first = {
            let c = c.clone();
            tokio::spawn(async move { c.get_status(true).await })
        };
        // Let the first forced refresh take the lock before queueing another.
        tokio::time::sleep(Duration::from_millis(30)).await;
        let second = c.get_status(true).await;
        let first = first.await.unwrap();

        assert_eq!(first.generation, 2);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(calls.load(Ordering::SeqCst), 6);
    }
}
