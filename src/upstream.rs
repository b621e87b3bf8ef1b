// src/upstream.rs
//! Upstream client: one bounded-time GET against one provider endpoint.
//!
//! The client never returns anything but an [`UpstreamOutcome`]. The deadline is enforced here
//! with `tokio::time::timeout`; when it fires the transport future is dropped, which cancels
//! the in-flight request.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use metrics::{counter, histogram};
use reqwest::Url;
use serde_json::Value;
use tokio::time::Instant;

use crate::config::AggregatorConfig;
use crate::error::UpstreamError;

/// Result of one provider call: exactly one side holds data.
pub type UpstreamOutcome = Result<Value, UpstreamError>;

/// The four request shapes spoken by VOD collection-site APIs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryMode<'a> {
    /// `ac=list&pg=1`: cheapest call, used for link health.
    Probe,
    /// `ac=list&pg=1&h=24&out=json`: first page updated in the last 24h.
    Hot,
    /// `ac=list&wd=<keyword>&out=json`
    Search(&'a str),
    /// `ac=detail&ids=<id>&out=json`
    Detail(&'a str),
}

impl<'a> QueryMode<'a> {
    pub fn label(&self) -> &'static str {
        match self {
            QueryMode::Probe => "probe",
            QueryMode::Hot => "hot",
            QueryMode::Search(_) => "search",
            QueryMode::Detail(_) => "detail",
        }
    }

    /// Query pairs in wire order. Values are raw; encoding happens in [`build_url`].
    pub fn params(&self) -> Vec<(&'static str, &'a str)> {
        match *self {
            QueryMode::Probe => vec![("ac", "list"), ("pg", "1")],
            QueryMode::Hot => vec![("ac", "list"), ("pg", "1"), ("h", "24"), ("out", "json")],
            QueryMode::Search(wd) => vec![("ac", "list"), ("wd", wd), ("out", "json")],
            QueryMode::Detail(id) => vec![("ac", "detail"), ("ids", id), ("out", "json")],
        }
    }
}

/// Append the mode's query pairs to a provider base endpoint, URL-encoding every value.
/// Existing query pairs on the endpoint are kept.
pub fn build_url(endpoint: &str, mode: &QueryMode<'_>) -> Result<Url, UpstreamError> {
    let mut url = Url::parse(endpoint.trim())
        .map_err(|e| UpstreamError::Network(format!("invalid endpoint: {e}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(UpstreamError::Network(format!(
            "unsupported endpoint scheme: {}",
            url.scheme()
        )));
    }
    {
        let mut pairs = url.query_pairs_mut();
        for (k, v) in mode.params() {
            pairs.append_pair(k, v);
        }
    }
    Ok(url)
}

/// Generic "GET, decode JSON" primitive. No deadline handling; [`UpstreamClient`] owns that.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get_json(&self, url: Url) -> UpstreamOutcome;
}

/// Convenient alias used by callers.
pub type DynTransport = Arc<dyn Transport>;

/// reqwest-backed transport shared by every provider call.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http: reqwest::Client,
}

impl HttpTransport {
    pub fn from_config(cfg: &AggregatorConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(cfg.user_agent.as_str())
            .connect_timeout(cfg.connect_timeout())
            .build()
            .context("building upstream http client")?;
        Ok(Self { http })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get_json(&self, url: Url) -> UpstreamOutcome {
        // without_url(): request URLs carry user keywords, keep them out of error strings
        let resp = self
            .http
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| UpstreamError::Network(e.without_url().to_string()))?;
        let bytes = resp
            .bytes()
            .await
            .map_err(|e| UpstreamError::Network(e.without_url().to_string()))?;
        decode_body(&bytes)
    }
}

/// Decode a provider body. Some sites prepend a UTF-8 BOM.
pub fn decode_body(bytes: &[u8]) -> UpstreamOutcome {
    let body = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    serde_json::from_slice(body).map_err(|e| UpstreamError::Decode(e.to_string()))
}

/// Bounded-time caller over a [`Transport`].
#[derive(Clone)]
pub struct UpstreamClient {
    transport: DynTransport,
}

impl UpstreamClient {
    pub fn new(transport: DynTransport) -> Self {
        Self { transport }
    }

    pub fn from_config(cfg: &AggregatorConfig) -> anyhow::Result<Self> {
        Ok(Self::new(Arc::new(HttpTransport::from_config(cfg)?)))
    }

    /// One call, one outcome. Never panics, never retries.
    pub async fn call(
        &self,
        endpoint: &str,
        mode: QueryMode<'_>,
        deadline: Duration,
    ) -> UpstreamOutcome {
        crate::metrics::ensure_described();
        let started = Instant::now();

        let outcome = match build_url(endpoint, &mode) {
            Ok(url) => match tokio::time::timeout(deadline, self.transport.get_json(url)).await {
                Ok(res) => res,
                Err(_elapsed) => Err(UpstreamError::TimedOut(deadline.as_millis() as u64)),
            },
            Err(e) => Err(e),
        };

        let ms = started.elapsed().as_secs_f64() * 1_000.0;
        let label = mode.label();
        histogram!("upstream_call_ms", "mode" => label).record(ms);
        let outcome_label = match &outcome {
            Ok(_) => "ok",
            Err(e) => e.kind(),
        };
        counter!("upstream_calls_total", "mode" => label, "outcome" => outcome_label).increment(1);
        tracing::debug!(
            target: "upstream",
            mode = label,
            outcome = outcome_label,
            elapsed_ms = ms,
            "upstream call finished"
        );

        outcome
    }
}
