// src/fanout.rs
//! Fan-out aggregator: the four provider-dispatch policies.
//!
//! - probe: one call, latency or the 9999 sentinel
//! - hot: sequential fallback chain over an allow-list, first non-empty list wins
//! - search: concurrent fan-out to every active provider, wait for all, concatenate
//! - detail: one call, payload verbatim or a surfaced error
//!
//! Every policy works on a [`Snapshot`] handed in by the caller and never touches the registry.
//! Per-call failures are absorbed here (logged and counted) except for detail.

use metrics::counter;
use serde_json::Value;
use tokio::time::Instant;

use crate::config::{aggregator::HOT_LIMIT_MAX, AggregatorConfig};
use crate::error::DetailError;
use crate::normalize::{extract_list, tag_items, ContentItem};
use crate::registry::{Provider, Snapshot};
use crate::upstream::{QueryMode, UpstreamClient};

/// Reserved latency meaning "unreachable or timed out".
pub const PROBE_FAILURE_LATENCY: u64 = 9999;

#[derive(Clone)]
pub struct Aggregator {
    client: UpstreamClient,
    cfg: AggregatorConfig,
}

impl Aggregator {
    pub fn new(client: UpstreamClient, cfg: AggregatorConfig) -> Self {
        Self { client, cfg }
    }

    /// Milliseconds for one list call against `key`, or [`PROBE_FAILURE_LATENCY`].
    pub async fn probe(&self, snapshot: &Snapshot, key: &str) -> u64 {
        let Some(provider) = snapshot.find(key) else {
            tracing::debug!(target: "fanout", provider = key, "probe: unknown provider");
            return PROBE_FAILURE_LATENCY;
        };

        let started = Instant::now();
        match self
            .client
            .call(&provider.endpoint, QueryMode::Probe, self.cfg.probe_timeout())
            .await
        {
            // Keep a real measurement from ever colliding with the sentinel.
            Ok(_) => (started.elapsed().as_millis() as u64).min(PROBE_FAILURE_LATENCY - 1),
            Err(e) => {
                tracing::info!(target: "fanout", provider = key, error = %e, "probe failed");
                PROBE_FAILURE_LATENCY
            }
        }
    }

    /// Sequential fallback chain: a provider is only called after its predecessor finished,
    /// and the chain stops at the first provider that yields at least one item.
    pub async fn hot(&self, snapshot: &Snapshot) -> Vec<Value> {
        let chain = snapshot.allow_listed(&self.cfg.hot_allow_list);

        for provider in &chain {
            match self
                .client
                .call(&provider.endpoint, QueryMode::Hot, self.cfg.hot_timeout())
                .await
            {
                Ok(payload) => {
                    let mut items = extract_list(payload);
                    if !items.is_empty() {
                        items.truncate(self.cfg.hot_limit.min(HOT_LIMIT_MAX));
                        tracing::debug!(
                            target: "fanout",
                            provider = %provider.key,
                            count = items.len(),
                            "hot list served"
                        );
                        return items;
                    }
                    tracing::debug!(
                        target: "fanout",
                        provider = %provider.key,
                        "hot: empty list, falling through"
                    );
                }
                Err(e) => {
                    tracing::info!(
                        target: "fanout",
                        provider = %provider.key,
                        error = %e,
                        "hot: provider failed, falling through"
                    );
                }
            }
            counter!("hot_fallthrough_total").increment(1);
        }

        tracing::warn!(target: "fanout", tried = chain.len(), "hot list exhausted every provider");
        Vec::new()
    }

    /// Concurrent fan-out over active providers. Completes once every call has terminated;
    /// output is snapshot order, items in provider order. The keyword is forwarded as given.
    pub async fn search(&self, snapshot: &Snapshot, keyword: &str) -> Vec<ContentItem> {
        if keyword.trim().is_empty() {
            return Vec::new();
        }

        let providers = snapshot.active();
        tracing::debug!(target: "fanout", keyword, providers = providers.len(), "search fan-out");

        let calls = providers
            .iter()
            .map(|provider| self.search_one(provider, keyword));
        let per_provider = futures::future::join_all(calls).await;

        let merged: Vec<ContentItem> = per_provider.into_iter().flatten().collect();
        counter!("search_items_total").increment(merged.len() as u64);
        merged
    }

    async fn search_one(&self, provider: &Provider, keyword: &str) -> Vec<ContentItem> {
        match self
            .client
            .call(
                &provider.endpoint,
                QueryMode::Search(keyword),
                self.cfg.search_timeout(),
            )
            .await
        {
            Ok(payload) => tag_items(payload, provider),
            Err(e) => {
                tracing::info!(
                    target: "fanout",
                    provider = %provider.key,
                    error = %e,
                    "search: provider failed"
                );
                Vec::new()
            }
        }
    }

    /// Raw detail payload from one provider. No fallback, so failures surface.
    pub async fn detail(
        &self,
        snapshot: &Snapshot,
        key: &str,
        id: &str,
    ) -> Result<Value, DetailError> {
        let provider = snapshot.find(key).ok_or(DetailError::NotFound)?;
        self.client
            .call(
                &provider.endpoint,
                QueryMode::Detail(id),
                self.cfg.detail_timeout(),
            )
            .await
            .map_err(|e| {
                tracing::warn!(
                    target: "fanout",
                    provider = key,
                    error = %e,
                    "detail: source error"
                );
                DetailError::SourceError
            })
    }
}
