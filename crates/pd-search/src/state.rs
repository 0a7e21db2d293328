//! # Search State
//!
//! The working set behind the directory page: the authoritative playground
//! list, the ZIP-filtered view, lazily loaded reviews and the pending draft.
//!
//! Every transition here is synchronous. Fetches are split into a `begin_*`
//! call that hands out a ticket and a `finish_*` call that applies the
//! response, so a slow earlier response can be recognised and dropped.

use std::collections::HashMap;

use pd_core::{Playground, PlaygroundId, Review, StoreError, StoreResult};

use crate::draft::Draft;

/// Outcome of the playground load.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum LoadStatus {
    #[default]
    NotLoaded,
    Loaded,
    /// The store could not be reached. Distinct from a store with no documents.
    Failed(StoreError),
}

/// Result of applying a fetched response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The response was applied; carries the number of records received.
    Applied(usize),
    /// A newer request for the same slot was issued; the response was dropped.
    Stale,
    Failed(StoreError),
}

/// Generation token for a playground load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub struct LoadTicket {
    generation: u64,
}

/// Generation token for one playground's review fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
pub struct ReviewsTicket {
    playground: PlaygroundId,
    generation: u64,
}

impl ReviewsTicket {
    pub fn playground(&self) -> &PlaygroundId {
        &self.playground
    }
}

#[derive(Debug, Default)]
pub struct SearchState {
    load: LoadStatus,
    playgrounds: Vec<Playground>,
    /// Indices into `playgrounds`, in authoritative order.
    visible: Vec<usize>,
    zip_query: String,
    reviews: HashMap<PlaygroundId, Vec<Review>>,
    review_failures: HashMap<PlaygroundId, StoreError>,
    draft: Draft,
    load_generation: u64,
    review_generations: HashMap<PlaygroundId, u64>,
}

impl SearchState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load_status(&self) -> &LoadStatus {
        &self.load
    }

    /// The authoritative list as last loaded.
    pub fn playgrounds(&self) -> &[Playground] {
        &self.playgrounds
    }

    pub fn playground(&self, id: &PlaygroundId) -> Option<&Playground> {
        self.playgrounds.iter().find(|p| &p.id == id)
    }

    /// The filtered view, in authoritative order.
    pub fn visible(&self) -> impl Iterator<Item = &Playground> + '_ {
        self.visible.iter().map(move |&index| &self.playgrounds[index])
    }

    pub fn visible_count(&self) -> usize {
        self.visible.len()
    }

    /// The trimmed ZIP the view is currently filtered by; empty when unfiltered.
    pub fn zip_query(&self) -> &str {
        &self.zip_query
    }

    /// `None` until reviews for `playground` were fetched at least once.
    pub fn reviews_for(&self, playground: &PlaygroundId) -> Option<&[Review]> {
        self.reviews.get(playground).map(Vec::as_slice)
    }

    /// The last review fetch failure for `playground`, cleared by a later success.
    pub fn review_failure(&self, playground: &PlaygroundId) -> Option<&StoreError> {
        self.review_failures.get(playground)
    }

    pub fn draft(&self) -> &Draft {
        &self.draft
    }

    pub fn draft_mut(&mut self) -> &mut Draft {
        &mut self.draft
    }

    pub fn begin_load(&mut self) -> LoadTicket {
        self.load_generation += 1;
        LoadTicket {
            generation: self.load_generation,
        }
    }

    /// Applies a playground load. On failure the lists are left untouched,
    /// which on first activation means empty.
    pub fn finish_load(
        &mut self,
        ticket: LoadTicket,
        result: StoreResult<Vec<Playground>>,
    ) -> FetchOutcome {
        if ticket.generation != self.load_generation {
            return FetchOutcome::Stale;
        }
        match result {
            Ok(playgrounds) => {
                let count = playgrounds.len();
                self.playgrounds = playgrounds;
                self.load = LoadStatus::Loaded;
                self.refilter();
                FetchOutcome::Applied(count)
            }
            Err(err) => {
                self.load = LoadStatus::Failed(err.clone());
                FetchOutcome::Failed(err)
            }
        }
    }

    /// Search action: re-derives the filtered view from the loaded list.
    /// Never touches the store. Returns the number of visible playgrounds.
    pub fn search(&mut self, zip_input: &str) -> usize {
        self.zip_query = zip_input.trim().to_string();
        self.refilter();
        self.visible.len()
    }

    fn refilter(&mut self) {
        let query = self.zip_query.as_str();
        self.visible = self
            .playgrounds
            .iter()
            .enumerate()
            .filter(|(_, p)| query.is_empty() || p.zip == query)
            .map(|(index, _)| index)
            .collect();
    }

    pub fn begin_reviews(&mut self, playground: &PlaygroundId) -> ReviewsTicket {
        let generation = self
            .review_generations
            .entry(playground.clone())
            .or_default();
        *generation += 1;
        ReviewsTicket {
            playground: playground.clone(),
            generation: *generation,
        }
    }

    /// Applies a review fetch. A success replaces the cached list wholesale;
    /// a failure leaves whatever was cached before.
    pub fn finish_reviews(
        &mut self,
        ticket: ReviewsTicket,
        result: StoreResult<Vec<Review>>,
    ) -> FetchOutcome {
        let latest = self
            .review_generations
            .get(&ticket.playground)
            .copied()
            .unwrap_or_default();
        if ticket.generation != latest {
            return FetchOutcome::Stale;
        }
        match result {
            Ok(reviews) => {
                let count = reviews.len();
                self.review_failures.remove(&ticket.playground);
                self.reviews.insert(ticket.playground, reviews);
                FetchOutcome::Applied(count)
            }
            Err(err) => {
                self.review_failures.insert(ticket.playground, err.clone());
                FetchOutcome::Failed(err)
            }
        }
    }
}
