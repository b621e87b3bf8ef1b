//! VOD aggregator: binary entrypoint
//! Boots the Axum HTTP server, wiring routes, shared state, and middleware.

use shuttle_axum::ShuttleAxum;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use vod_aggregator::api::{self, AppState};
use vod_aggregator::metrics::Metrics;

/// Compact tracing logs. `try_init` because the deployment runtime may already have
/// installed a global subscriber.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("vod_aggregator=info,warn"));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .try_init();
}

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();

    init_tracing();

    let facade = vod_aggregator::build_facade()?;
    let state = AppState::new(facade);

    let router = match Metrics::init() {
        Ok(m) => api::create_router_with_metrics(state, &m),
        Err(e) => {
            tracing::warn!(error = ?e, "metrics disabled");
            api::create_router(state)
        }
    };

    Ok(router.into())
}
