//! # pd-api
//!
//! The web routing and orchestration layer for the playground directory.

pub mod api;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;

use std::sync::Arc;

use axum::extract::State;
use axum::http::header::CONTENT_TYPE;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use pd_core::DirectoryStore;
use pd_search::Controller;
use serde_json::json;

use crate::error::ApiResult;
use crate::metrics::{MeteredStore, Metrics};

/// State shared by every handler: one controller for the whole process,
/// i.e. a single logical session.
#[derive(Clone)]
pub struct AppState {
    pub controller: Arc<Controller>,
    pub metrics: Arc<Metrics>,
}

impl AppState {
    /// Wraps `store` so its calls are counted, and builds the controller on top.
    pub fn new(store: Arc<dyn DirectoryStore>) -> Self {
        let metrics = Arc::new(Metrics::new());
        let metered: Arc<dyn DirectoryStore> = Arc::new(MeteredStore::new(store, metrics.clone()));
        Self {
            controller: Arc::new(Controller::new(metered)),
            metrics,
        }
    }
}

/// Builds the full application router, middleware included.
pub fn router(state: AppState) -> Router {
    let routes = Router::new()
        .route("/", get(handlers::index))
        .route("/search", post(handlers::search))
        .route("/reload", post(handlers::reload))
        .route("/playgrounds/{id}/reviews/load", post(handlers::load_reviews))
        .route("/playgrounds/{id}/draft", post(handlers::edit_draft))
        .route("/playgrounds/{id}/reviews", post(handlers::submit_review))
        .route("/api/playgrounds", get(api::list_playgrounds))
        .route(
            "/api/playgrounds/{id}/reviews",
            get(api::list_reviews).post(api::create_review),
        )
        .route("/health", get(health))
        .route("/metrics", get(metrics_text))
        .with_state(state);

    middleware::standard_layers(routes)
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn metrics_text(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let body = state.metrics.render()?;
    Ok((
        [(CONTENT_TYPE, "application/openmetrics-text; version=1.0.0; charset=utf-8")],
        body,
    ))
}
