//! # Page Handlers
//!
//! Form posts from the directory page. Every action redirects back to `/`;
//! store failures are logged by the controller and show up as stale data or
//! a retry notice on the next render.

use askama::Template;
use axum::extract::{Path, State};
use axum::response::{Html, Redirect};
use axum::Form;
use pd_core::{PlaygroundId, Rating};
use pd_ui::IndexPage;
use serde::Deserialize;

use crate::error::ApiResult;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct SearchForm {
    #[serde(default)]
    pub zip: String,
}

#[derive(Debug, Deserialize)]
pub struct DraftForm {
    #[serde(default)]
    pub comment: String,
    pub rating: Option<i64>,
}

fn back_to(playground: &PlaygroundId) -> Redirect {
    Redirect::to(&format!("/#pg-{}", playground.path_segment()))
}

/// Renders the directory, loading playgrounds on first visit.
pub async fn index(State(state): State<AppState>) -> ApiResult<Html<String>> {
    state.controller.activate().await;
    let page = state.controller.read(IndexPage::from_state).await;
    Ok(Html(page.render()?))
}

pub async fn search(State(state): State<AppState>, Form(form): Form<SearchForm>) -> Redirect {
    state.controller.search(&form.zip).await;
    Redirect::to("/")
}

pub async fn reload(State(state): State<AppState>) -> Redirect {
    state.controller.reload().await;
    Redirect::to("/")
}

pub async fn load_reviews(State(state): State<AppState>, Path(id): Path<String>) -> Redirect {
    let playground = PlaygroundId::new(id);
    state.controller.expand_reviews(&playground).await;
    back_to(&playground)
}

/// Aims the draft at this playground and stores the typed values.
pub async fn edit_draft(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Form(form): Form<DraftForm>,
) -> ApiResult<Redirect> {
    let playground = PlaygroundId::new(id);
    let rating = form.rating.map(Rating::new).transpose()?;
    state
        .controller
        .edit_draft(playground.clone(), form.comment, rating)
        .await;
    Ok(back_to(&playground))
}

/// Draft edit followed by the submit action, as one step on the controller.
pub async fn submit_review(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Form(form): Form<DraftForm>,
) -> ApiResult<Redirect> {
    let playground = PlaygroundId::new(id);
    let rating = form.rating.map(Rating::new).transpose()?;
    state
        .controller
        .submit_draft(playground.clone(), form.comment, rating)
        .await;
    Ok(back_to(&playground))
}
