use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;

use crate::error::DetailError;
use crate::facade::{ListResponse, ProbeResponse, QueryFacade};
use crate::normalize::ContentItem;

#[derive(Clone)]
pub struct AppState {
    pub facade: QueryFacade,
}

impl AppState {
    pub fn new(facade: QueryFacade) -> Self {
        Self { facade }
    }
}

/// Build the public router. Auth, static assets and registry admin live elsewhere.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/api/check", get(check))
        .route("/api/hot", get(hot))
        .route("/api/search", get(search))
        .route("/api/detail", get(detail))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

/// Same as [`create_router`] plus `/metrics` from an installed Prometheus recorder.
pub fn create_router_with_metrics(state: AppState, metrics: &crate::metrics::Metrics) -> Router {
    create_router(state).merge(metrics.router())
}

#[derive(serde::Deserialize)]
struct CheckReq {
    #[serde(default)]
    key: String,
}

#[derive(serde::Deserialize)]
struct SearchReq {
    #[serde(default)]
    wd: Option<String>,
}

#[derive(serde::Deserialize)]
struct DetailReq {
    #[serde(default)]
    site_key: String,
    #[serde(default)]
    id: String,
}

async fn check(State(state): State<AppState>, Query(q): Query<CheckReq>) -> Json<ProbeResponse> {
    Json(state.facade.probe(&q.key).await)
}

async fn hot(State(state): State<AppState>) -> Json<ListResponse<Value>> {
    Json(state.facade.hot().await)
}

async fn search(
    State(state): State<AppState>,
    Query(q): Query<SearchReq>,
) -> Json<ListResponse<ContentItem>> {
    Json(state.facade.search(q.wd.as_deref()).await)
}

async fn detail(State(state): State<AppState>, Query(q): Query<DetailReq>) -> Response {
    match state.facade.detail(&q.site_key, &q.id).await {
        Ok(payload) => Json(payload).into_response(),
        Err(e) => e.into_response(),
    }
}

impl IntoResponse for DetailError {
    fn into_response(self) -> Response {
        let status = match self {
            DetailError::NotFound => StatusCode::NOT_FOUND,
            DetailError::SourceError => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
