//! Error types shared by the upstream client, the aggregator and the HTTP layer.
//!
//! Messages never include upstream response bodies; callers of the HTTP surface only ever
//! see the generic detail signals.

/// Failure of a single upstream call. Local to that call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UpstreamError {
    /// The per-call deadline expired and the request was dropped.
    #[error("upstream timed out after {0}ms")]
    TimedOut(u64),

    /// Transport failure, non-success status, or an endpoint that cannot be called.
    #[error("upstream network error: {0}")]
    Network(String),

    /// The body arrived but was not decodable JSON.
    #[error("upstream decode error: {0}")]
    Decode(String),
}

impl UpstreamError {
    /// Short, stable label for metrics and structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            UpstreamError::TimedOut(_) => "timeout",
            UpstreamError::Network(_) => "network",
            UpstreamError::Decode(_) => "decode",
        }
    }
}

/// Detail is the only operation without a fallback path, so its failures surface.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DetailError {
    #[error("Site not found")]
    NotFound,

    #[error("Source Error")]
    SourceError,
}
