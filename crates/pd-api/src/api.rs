//! JSON endpoints over the same controller the page uses.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use pd_core::{NewReview, Playground, PlaygroundId, Review};
use pd_search::{FetchOutcome, LoadStatus};
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiResult};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ZipQuery {
    #[serde(default)]
    pub zip: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PlaygroundList {
    /// The trimmed ZIP applied; empty when unfiltered.
    pub zip: String,
    pub total: usize,
    pub playgrounds: Vec<Playground>,
}

/// Applies the search action and returns the filtered view. A failed load is
/// reported as an error rather than as an empty list.
pub async fn list_playgrounds(
    State(state): State<AppState>,
    Query(query): Query<ZipQuery>,
) -> ApiResult<Json<PlaygroundList>> {
    state.controller.activate().await;
    state.controller.search(&query.zip).await;
    state
        .controller
        .read(|search| match search.load_status() {
            LoadStatus::Failed(err) => Err(ApiError::Store(err.clone())),
            _ => Ok(Json(PlaygroundList {
                zip: search.zip_query().to_string(),
                total: search.playgrounds().len(),
                playgrounds: search.visible().cloned().collect(),
            })),
        })
        .await
}

/// Reviews-expand action, then the cached list for the playground.
pub async fn list_reviews(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Vec<Review>>> {
    let playground = PlaygroundId::new(id);
    if let FetchOutcome::Failed(err) = state.controller.expand_reviews(&playground).await {
        return Err(err.into());
    }
    let reviews = state
        .controller
        .read(|search| search.reviews_for(&playground).map(<[Review]>::to_vec))
        .await
        .unwrap_or_default();
    Ok(Json(reviews))
}

/// Writes the review directly; the page's draft is left as it is. The body
/// is validated on extraction, so a blank comment or bad rating never gets here.
pub async fn create_review(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(review): Json<NewReview>,
) -> ApiResult<(StatusCode, Json<Review>)> {
    let playground = PlaygroundId::new(id);
    let review = state.controller.create_review(&playground, review).await?;
    Ok((StatusCode::CREATED, Json(review)))
}
