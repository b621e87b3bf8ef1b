// src/lib.rs
// Public library surface for the binaries and integration tests.

pub mod api;
pub mod config;
pub mod error;
pub mod facade;
pub mod fanout;
pub mod metrics;
pub mod normalize;
pub mod registry;
pub mod upstream;

// ---- Re-exports for stable public API ----
pub use crate::api::create_router as router;
pub use crate::config::AggregatorConfig;
pub use crate::error::{DetailError, UpstreamError};
pub use crate::facade::QueryFacade;
pub use crate::registry::{FileRegistry, MemoryRegistry, Provider, ProviderRegistry};

use std::sync::Arc;

/// Build the facade the binaries use: config from disk/env, file-backed registry.
///
/// Example usage inside a `#[shuttle_runtime::main]` function:
/// ```ignore
/// let facade = vod_aggregator::build_facade()?;
/// let app = vod_aggregator::router(vod_aggregator::api::AppState::new(facade));
/// ```
pub fn build_facade() -> anyhow::Result<QueryFacade> {
    let cfg = AggregatorConfig::load_default()?;
    let registry = FileRegistry::init(config::sites_db_path())?;
    tracing::info!(
        registry = %registry.path().display(),
        hot_allow_list = ?cfg.hot_allow_list,
        search_timeout_ms = cfg.search_timeout_ms,
        "aggregator configured"
    );
    QueryFacade::from_config(Arc::new(registry), cfg)
}
