//! # pd-ui
//!
//! The directory page and the view models it renders from `SearchState`.

use askama::Template;
use pd_core::{Playground, Rating, Review};
use pd_search::{LoadStatus, SearchState};

pub const PAGE_TITLE: &str = "Playground Directory";

#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexPage {
    pub title: String,
    pub zip_query: String,
    pub cards: Vec<PlaygroundCard>,
    /// Set when the playground list could not be fetched; drives the retry banner.
    pub load_error: Option<String>,
    pub loaded: bool,
    pub total: usize,
}

pub struct PlaygroundCard {
    pub id: String,
    /// `id` escaped for use in form actions.
    pub path: String,
    pub name: String,
    pub location: String,
    pub zip: String,
    pub image: Option<String>,
    pub features: Vec<String>,
    /// `None` until reviews were requested.
    pub reviews: Option<Vec<ReviewLine>>,
    pub reviews_failed: bool,
    pub draft_comment: String,
    pub rating_options: Vec<RatingOption>,
}

pub struct ReviewLine {
    pub author: String,
    pub rating: u8,
    pub stars: String,
    pub comment: String,
    pub posted: String,
}

pub struct RatingOption {
    pub value: u8,
    pub selected: bool,
}

/// "★★★☆☆" for a rating of 3.
pub fn stars(rating: Rating) -> String {
    let filled = usize::from(rating.get());
    let empty = usize::from(Rating::MAX) - filled;
    format!("{}{}", "★".repeat(filled), "☆".repeat(empty))
}

impl From<&Review> for ReviewLine {
    fn from(review: &Review) -> Self {
        Self {
            author: review.author.clone(),
            rating: review.rating.get(),
            stars: stars(review.rating),
            comment: review.comment.clone(),
            posted: review.created_at.format("%Y-%m-%d %H:%M UTC").to_string(),
        }
    }
}

impl PlaygroundCard {
    fn build(playground: &Playground, state: &SearchState) -> Self {
        let draft = state.draft();
        let selected = draft.rating_for(&playground.id);
        Self {
            id: playground.id.to_string(),
            path: playground.id.path_segment(),
            name: playground.name.clone(),
            location: playground.location.clone(),
            zip: playground.zip.clone(),
            image: playground.image.clone(),
            features: playground.features.clone(),
            reviews: state
                .reviews_for(&playground.id)
                .map(|reviews| reviews.iter().map(ReviewLine::from).collect()),
            reviews_failed: state.review_failure(&playground.id).is_some(),
            draft_comment: draft.comment_for(&playground.id).to_string(),
            rating_options: Rating::all()
                .map(|rating| RatingOption {
                    value: rating.get(),
                    selected: rating == selected,
                })
                .collect(),
        }
    }
}

impl IndexPage {
    pub fn from_state(state: &SearchState) -> Self {
        let load_error = match state.load_status() {
            LoadStatus::Failed(err) => Some(err.to_string()),
            _ => None,
        };
        Self {
            title: PAGE_TITLE.to_string(),
            zip_query: state.zip_query().to_string(),
            cards: state
                .visible()
                .map(|playground| PlaygroundCard::build(playground, state))
                .collect(),
            load_error,
            loaded: matches!(state.load_status(), LoadStatus::Loaded),
            total: state.playgrounds().len(),
        }
    }
}
