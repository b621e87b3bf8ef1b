// src/facade.rs
//! Query facade: the unit the HTTP layer (and the probe tool) invokes.
//!
//! Each operation reads the registry exactly once and hands that snapshot to the aggregator.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::AggregatorConfig;
use crate::error::DetailError;
use crate::fanout::Aggregator;
use crate::normalize::ContentItem;
use crate::registry::{Provider, ProviderRegistry, Snapshot};
use crate::upstream::UpstreamClient;

/// Convenient alias used by callers.
pub type DynRegistry = Arc<dyn ProviderRegistry>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeResponse {
    pub latency: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListResponse<T> {
    pub list: Vec<T>,
}

/// One line of a probe-all run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProbeReport {
    pub key: String,
    pub name: String,
    pub active: bool,
    pub latency: u64,
}

#[derive(Clone)]
pub struct QueryFacade {
    registry: DynRegistry,
    aggregator: Aggregator,
}

impl QueryFacade {
    pub fn new(registry: DynRegistry, aggregator: Aggregator) -> Self {
        Self {
            registry,
            aggregator,
        }
    }

    /// Wire the real reqwest transport from config.
    pub fn from_config(registry: DynRegistry, cfg: AggregatorConfig) -> anyhow::Result<Self> {
        let client = UpstreamClient::from_config(&cfg)?;
        Ok(Self::new(registry, Aggregator::new(client, cfg)))
    }

    /// One registry read, off the async workers.
    async fn snapshot(&self) -> Snapshot {
        let registry = Arc::clone(&self.registry);
        match tokio::task::spawn_blocking(move || registry.snapshot_all()).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::warn!(target: "registry", error = %e, "registry read failed");
                Snapshot::default()
            }
        }
    }

    pub async fn probe(&self, key: &str) -> ProbeResponse {
        let snapshot = self.snapshot().await;
        ProbeResponse {
            latency: self.aggregator.probe(&snapshot, key).await,
        }
    }

    pub async fn hot(&self) -> ListResponse<Value> {
        let snapshot = self.snapshot().await;
        ListResponse {
            list: self.aggregator.hot(&snapshot).await,
        }
    }

    /// `None` and blank keywords short-circuit before the registry is even read.
    /// Anything else is forwarded untrimmed.
    pub async fn search(&self, keyword: Option<&str>) -> ListResponse<ContentItem> {
        let keyword = keyword.unwrap_or_default();
        if keyword.trim().is_empty() {
            return ListResponse { list: Vec::new() };
        }
        let snapshot = self.snapshot().await;
        ListResponse {
            list: self.aggregator.search(&snapshot, keyword).await,
        }
    }

    pub async fn detail(&self, key: &str, id: &str) -> Result<Value, DetailError> {
        let snapshot = self.snapshot().await;
        self.aggregator.detail(&snapshot, key, id).await
    }

    /// Probe every registered provider concurrently, fastest first.
    pub async fn probe_all(&self) -> Vec<ProbeReport> {
        let snapshot = self.snapshot().await;
        let probes = snapshot.providers().iter().map(|p: &Provider| {
            let snapshot = &snapshot;
            async move {
                ProbeReport {
                    key: p.key.clone(),
                    name: p.name.clone(),
                    active: p.active,
                    latency: self.aggregator.probe(snapshot, &p.key).await,
                }
            }
        });
        let mut reports = futures::future::join_all(probes).await;
        reports.sort_by_key(|r| r.latency);
        reports
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::UpstreamError;
    use crate::registry::{MemoryRegistry, Snapshot};
    use crate::upstream::{Transport, UpstreamOutcome};
    use async_trait::async_trait;
    use reqwest::Url;
    use serde_json::json;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;

    /// Registry that counts reads and mutates the backing list after the first one.
    struct CountingRegistry {
        inner: MemoryRegistry,
        reads: AtomicUsize,
    }

    impl ProviderRegistry for CountingRegistry {
        fn snapshot_all(&self) -> Snapshot {
            self.reads.fetch_add(1, Ordering::SeqCst);
            let snap = self.inner.snapshot_all();
            // Simulate an admin edit racing the request.
            self.inner.replace(vec![]);
            snap
        }
    }

    struct Echo {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Transport for Echo {
        async fn get_json(&self, url: Url) -> UpstreamOutcome {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match url.host_str() {
                Some("down.test") => Err(UpstreamError::Network("refused".into())),
                Some(host) => Ok(json!({"list": [{"host": host}]})),
                None => Err(UpstreamError::Network("no host".into())),
            }
        }
    }

    fn facade(providers: Vec<Provider>) -> (QueryFacade, Arc<CountingRegistry>, Arc<Echo>) {
        let reg = Arc::new(CountingRegistry {
            inner: MemoryRegistry::new(providers),
            reads: AtomicUsize::new(0),
        });
        let echo = Arc::new(Echo {
            calls: AtomicUsize::new(0),
        });
        let agg = Aggregator::new(UpstreamClient::new(echo.clone()), AggregatorConfig::default());
        (QueryFacade::new(reg.clone(), agg), reg, echo)
    }

    fn sites() -> Vec<Provider> {
        vec![
            Provider::new("ffzy", "FF", "http://ffzy.test/api", true),
            Provider::new("down", "Down", "http://down.test/api", true),
            Provider::new("lzi", "LZ", "http://lzi.test/api", true),
        ]
    }

    #[tokio::test]
    async fn search_reads_registry_once_and_ignores_midflight_edits() {
        let (f, reg, _) = facade(sites());
        let out = f.search(Some("kw")).await;
        assert_eq!(reg.reads.load(Ordering::SeqCst), 1);
        let keys: Vec<_> = out.list.iter().filter_map(|i| i.site_key()).collect();
        assert_eq!(keys, vec!["ffzy", "lzi"]);
    }

    #[tokio::test]
    async fn missing_keyword_touches_nothing() {
        let (f, reg, echo) = facade(sites());
        assert!(f.search(None).await.list.is_empty());
        assert!(f.search(Some("")).await.list.is_empty());
        assert_eq!(reg.reads.load(Ordering::SeqCst), 0);
        assert_eq!(echo.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn probe_and_detail_use_a_single_snapshot() {
        let (f, reg, _) = facade(sites());
        assert_eq!(f.probe("nope").await, ProbeResponse { latency: 9999 });
        assert_eq!(f.detail("nope", "1").await, Err(DetailError::NotFound));
        assert_eq!(reg.reads.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn probe_all_sorts_failures_last() {
        let (f, _, _) = facade(sites());
        let reports = f.probe_all().await;
        assert_eq!(reports.len(), 3);
        assert_eq!(reports.last().map(|r| r.key.as_str()), Some("down"));
        assert_eq!(reports.last().map(|r| r.latency), Some(9999));
    }

    /// Registry whose read blocks the calling thread, then reports whether another task on the
    /// same runtime made progress meanwhile.
    struct SlowDiskRegistry {
        ticked: Arc<AtomicBool>,
        saw_tick: AtomicBool,
    }

    impl ProviderRegistry for SlowDiskRegistry {
        fn snapshot_all(&self) -> Snapshot {
            std::thread::sleep(Duration::from_millis(300));
            self.saw_tick
                .store(self.ticked.load(Ordering::SeqCst), Ordering::SeqCst);
            Snapshot::new(sites())
        }
    }

    #[tokio::test(flavor = "current_thread")]
    async fn registry_read_does_not_stall_the_runtime() {
        let ticked = Arc::new(AtomicBool::new(false));
        let reg = Arc::new(SlowDiskRegistry {
            ticked: ticked.clone(),
            saw_tick: AtomicBool::new(false),
        });
        let echo = Arc::new(Echo {
            calls: AtomicUsize::new(0),
        });
        let agg = Aggregator::new(UpstreamClient::new(echo), AggregatorConfig::default());
        let f = QueryFacade::new(reg.clone(), agg);

        let flag = ticked.clone();
        let ticker = tokio::spawn(async move { flag.store(true, Ordering::SeqCst) });

        let out = f.search(Some("kw")).await;
        ticker.await.unwrap();
        assert_eq!(out.list.len(), 2);
        assert!(reg.saw_tick.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn search_keeps_surrounding_whitespace() {
        let (f, reg, echo) = facade(sites());
        assert!(f.search(Some("   ")).await.list.is_empty());
        assert_eq!(reg.reads.load(Ordering::SeqCst), 0);
        let out = f.search(Some(" kw ")).await;
        assert_eq!(out.list.len(), 2);
        assert_eq!(echo.calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn response_shapes_serialize_like_the_http_contract() {
        let v = serde_json::to_value(ProbeResponse { latency: 12 }).unwrap();
        assert_eq!(v, json!({"latency": 12}));
        let v = serde_json::to_value(ListResponse::<Value> { list: vec![] }).unwrap();
        assert_eq!(v, json!({"list": []}));
    }
}
