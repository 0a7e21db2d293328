//! # Controller
//!
//! Coordinates the flow between user actions and the `DirectoryStore`.
//!
//! The state lock is never held across a store call: each action takes a
//! ticket, releases the lock, awaits the store and then re-locks to apply the
//! response. Failures are logged and degrade to stale or empty data.

use std::sync::Arc;

use pd_core::{
    DirectoryStore, NewReview, PlaygroundId, Rating, Review, StoreError, StoreResult,
};
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use crate::draft::{Draft, Submission};
use crate::state::{FetchOutcome, LoadStatus, SearchState};

/// Result of a submit action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// No target or blank text; nothing was written.
    Skipped,
    /// The review was stored and the playground's reviews were re-fetched.
    Created(Review),
    /// The store refused or could not be reached. The draft is kept for a retry.
    Failed(StoreError),
}

pub struct Controller {
    store: Arc<dyn DirectoryStore>,
    state: Mutex<SearchState>,
}

impl Controller {
    pub fn new(store: Arc<dyn DirectoryStore>) -> Self {
        Self {
            store,
            state: Mutex::new(SearchState::new()),
        }
    }

    /// Runs `f` against the current state.
    pub async fn read<R>(&self, f: impl FnOnce(&SearchState) -> R) -> R {
        let state = self.state.lock().await;
        f(&state)
    }

    /// Loads the playground list on first activation. Later calls are no-ops
    /// unless the earlier load failed.
    pub async fn activate(&self) -> Option<FetchOutcome> {
        let needs_load = self
            .read(|state| !matches!(state.load_status(), LoadStatus::Loaded))
            .await;
        if needs_load {
            Some(self.reload().await)
        } else {
            None
        }
    }

    /// Re-fetches every playground. Doubles as the retry affordance.
    #[instrument(skip(self))]
    pub async fn reload(&self) -> FetchOutcome {
        let ticket = self.state.lock().await.begin_load();
        let result = self.store.list_playgrounds().await;
        let outcome = self.state.lock().await.finish_load(ticket, result);
        match &outcome {
            FetchOutcome::Applied(count) => info!(count, "loaded playgrounds"),
            FetchOutcome::Stale => debug!("discarded stale playground list"),
            FetchOutcome::Failed(err) => {
                warn!(error = %err, kind = err.kind(), "failed to load playgrounds")
            }
        }
        outcome
    }

    /// Filters the loaded list by exact ZIP. Never calls the store.
    pub async fn search(&self, zip_input: &str) -> usize {
        let count = self.state.lock().await.search(zip_input);
        debug!(zip = zip_input.trim(), count, "applied zip filter");
        count
    }

    /// Fetches `playground`'s reviews and replaces its cached list.
    #[instrument(skip(self, playground), fields(playground = %playground))]
    pub async fn expand_reviews(&self, playground: &PlaygroundId) -> FetchOutcome {
        let ticket = self.state.lock().await.begin_reviews(playground);
        let result = self.store.list_reviews(playground).await;
        let outcome = self.state.lock().await.finish_reviews(ticket, result);
        match &outcome {
            FetchOutcome::Applied(count) => debug!(count, "loaded reviews"),
            FetchOutcome::Stale => debug!("discarded stale review list"),
            FetchOutcome::Failed(err) => {
                warn!(error = %err, kind = err.kind(), "failed to load reviews")
            }
        }
        outcome
    }

    /// Aims the draft at `playground`, resetting it if it was aimed elsewhere.
    pub async fn focus(&self, playground: PlaygroundId) {
        self.state.lock().await.draft_mut().focus(playground);
    }

    /// Returns `false` if no playground is focused.
    pub async fn edit_comment(&self, text: impl Into<String>) -> bool {
        self.state.lock().await.draft_mut().set_comment(text)
    }

    /// Returns `false` if no playground is focused.
    pub async fn edit_rating(&self, rating: Rating) -> bool {
        self.state.lock().await.draft_mut().set_rating(rating)
    }

    /// Focus plus edits as one step, so concurrent callers never interleave
    /// between them. `rating` leaves the current rating when `None`.
    pub async fn edit_draft(
        &self,
        playground: PlaygroundId,
        comment: impl Into<String>,
        rating: Option<Rating>,
    ) {
        let mut state = self.state.lock().await;
        fill_draft(state.draft_mut(), playground, comment.into(), rating);
    }

    /// Submits the draft. It is taken out under the lock, so a repeated
    /// submit finds nothing to send while the first write is in flight. On
    /// success the target's reviews are re-fetched after the write was
    /// acknowledged; on failure the draft is put back for a retry.
    #[instrument(skip(self))]
    pub async fn submit(&self) -> SubmitOutcome {
        let taken = self.state.lock().await.draft_mut().take_submission();
        self.write(taken).await
    }

    /// [`Controller::edit_draft`] followed by [`Controller::submit`], with the
    /// edit and the hand-off to the store in one critical section.
    #[instrument(skip(self, playground, comment), fields(playground = %playground))]
    pub async fn submit_draft(
        &self,
        playground: PlaygroundId,
        comment: impl Into<String>,
        rating: Option<Rating>,
    ) -> SubmitOutcome {
        let taken = {
            let mut state = self.state.lock().await;
            let draft = state.draft_mut();
            fill_draft(draft, playground, comment.into(), rating);
            draft.take_submission()
        };
        self.write(taken).await
    }

    /// Writes an already validated review without touching the draft, then
    /// refreshes the playground's reviews.
    #[instrument(skip(self, playground, review), fields(playground = %playground))]
    pub async fn create_review(
        &self,
        playground: &PlaygroundId,
        review: NewReview,
    ) -> StoreResult<Review> {
        match self.store.create_review(playground, review).await {
            Ok(review) => {
                info!(review = %review.id, "created review");
                self.expand_reviews(playground).await;
                Ok(review)
            }
            Err(err) => {
                warn!(error = %err, kind = err.kind(), "failed to create review");
                Err(err)
            }
        }
    }

    async fn write(&self, taken: Option<(Submission, Draft)>) -> SubmitOutcome {
        let Some((submission, draft)) = taken else {
            debug!("nothing to submit");
            return SubmitOutcome::Skipped;
        };
        let playground = submission.playground;

        match self.create_review(&playground, submission.review).await {
            Ok(review) => SubmitOutcome::Created(review),
            Err(err) => {
                let restored = self.state.lock().await.draft_mut().restore(draft);
                debug!(playground = %playground, restored, "draft kept after failed submit");
                SubmitOutcome::Failed(err)
            }
        }
    }
}

fn fill_draft(
    draft: &mut Draft,
    playground: PlaygroundId,
    comment: String,
    rating: Option<Rating>,
) {
    draft.focus(playground);
    draft.set_comment(comment);
    if let Some(rating) = rating {
        draft.set_rating(rating);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use mockall::predicate::eq;
    use mockall::Sequence;
    use pd_core::{Comment, MockDirectoryStore, Playground, ReviewId, ANONYMOUS_AUTHOR};

    fn playground(id: &str, zip: &str) -> Playground {
        Playground {
            id: PlaygroundId::new(id),
            name: format!("Park {id}"),
            location: "Somewhere".to_string(),
            zip: zip.to_string(),
            image: None,
            features: vec![],
        }
    }

    fn stored(playground: &PlaygroundId, review: &NewReview) -> Review {
        Review {
            id: ReviewId::new("r-new"),
            playground_id: playground.clone(),
            author: ANONYMOUS_AUTHOR.to_string(),
            rating: review.rating,
            comment: review.comment.as_str().to_string(),
            created_at: Utc::now(),
        }
    }

    fn controller(mock: MockDirectoryStore) -> Controller {
        Controller::new(Arc::new(mock))
    }

    #[tokio::test]
    async fn search_never_queries_the_store() {
        let mut mock = MockDirectoryStore::new();
        mock.expect_list_playgrounds()
            .times(1)
            .returning(|| Ok(vec![playground("p1", "10001"), playground("p2", "10002")]));
        let controller = controller(mock);

        controller.activate().await;
        assert_eq!(controller.search("10002").await, 1);
        assert_eq!(controller.search("").await, 2);
        assert!(controller.activate().await.is_none());
    }

    #[tokio::test]
    async fn failed_activation_can_be_retried() {
        let mut mock = MockDirectoryStore::new();
        let mut seq = Sequence::new();
        mock.expect_list_playgrounds()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|| Err(StoreError::unavailable("connection refused")));
        mock.expect_list_playgrounds()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|| Ok(vec![playground("p1", "10001")]));
        let controller = controller(mock);

        let first = controller.activate().await;
        assert!(matches!(first, Some(FetchOutcome::Failed(_))));
        assert_eq!(controller.read(|s| s.visible_count()).await, 0);

        let second = controller.activate().await;
        assert_eq!(second, Some(FetchOutcome::Applied(1)));
        assert_eq!(controller.read(|s| s.visible_count()).await, 1);
    }

    #[tokio::test]
    async fn blank_draft_is_not_written() {
        let mut mock = MockDirectoryStore::new();
        mock.expect_create_review().never();
        mock.expect_list_reviews().never();
        let controller = controller(mock);

        assert_eq!(controller.submit().await, SubmitOutcome::Skipped);

        controller.focus(PlaygroundId::new("p1")).await;
        controller.edit_comment("   ").await;
        assert_eq!(controller.submit().await, SubmitOutcome::Skipped);
    }

    #[tokio::test]
    async fn submit_writes_then_refetches_and_clears_draft() {
        let p1 = PlaygroundId::new("p1");
        let mut mock = MockDirectoryStore::new();
        let mut seq = Sequence::new();
        mock.expect_create_review()
            .withf(|playground, review| {
                playground.as_str() == "p1"
                    && review.rating.get() == 4
                    && review.comment.as_str() == "Great slides"
            })
            .times(1)
            .in_sequence(&mut seq)
            .returning(|playground, review| Ok(stored(playground, &review)));
        mock.expect_list_reviews()
            .with(eq(p1.clone()))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|playground| {
                let review = NewReview::new(
                    Rating::new(4).unwrap(),
                    Comment::parse("Great slides").unwrap(),
                );
                Ok(vec![stored(playground, &review)])
            });
        let controller = controller(mock);

        controller.focus(p1.clone()).await;
        controller.edit_comment(" Great slides ").await;
        controller.edit_rating(Rating::new(4).unwrap()).await;

        let outcome = controller.submit().await;
        assert!(matches!(outcome, SubmitOutcome::Created(ref r) if r.rating.get() == 4));

        controller
            .read(|state| {
                assert!(state.draft().target().is_none());
                let reviews = state.reviews_for(&p1).unwrap();
                assert_eq!(reviews[0].comment, "Great slides");
            })
            .await;
    }

    #[tokio::test]
    async fn failed_submit_keeps_the_draft() {
        let p1 = PlaygroundId::new("p1");
        let mut mock = MockDirectoryStore::new();
        mock.expect_create_review()
            .times(1)
            .returning(|_, _| Err(StoreError::rejected("permission denied")));
        mock.expect_list_reviews().never();
        let controller = controller(mock);

        controller.focus(p1.clone()).await;
        controller.edit_comment("Needs more shade").await;

        let outcome = controller.submit().await;
        assert_eq!(
            outcome,
            SubmitOutcome::Failed(StoreError::rejected("permission denied"))
        );
        let kept = controller
            .read(|state| state.draft().comment_for(&p1).to_string())
            .await;
        assert_eq!(kept, "Needs more shade");
    }

    #[tokio::test]
    async fn failed_review_fetch_degrades_silently() {
        let p1 = PlaygroundId::new("p1");
        let mut mock = MockDirectoryStore::new();
        mock.expect_list_reviews()
            .returning(|_| Err(StoreError::unavailable("offline")));
        let controller = controller(mock);

        let outcome = controller.expand_reviews(&p1).await;
        assert!(matches!(outcome, FetchOutcome::Failed(_)));
        controller
            .read(|state| {
                assert!(state.reviews_for(&p1).is_none());
                assert!(state.review_failure(&p1).is_some());
            })
            .await;
    }

    #[tokio::test]
    async fn direct_create_leaves_the_draft_alone() {
        let p1 = PlaygroundId::new("p1");
        let mut mock = MockDirectoryStore::new();
        let mut seq = Sequence::new();
        mock.expect_create_review()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|playground, review| Ok(stored(playground, &review)));
        mock.expect_list_reviews()
            .with(eq(p1.clone()))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(vec![]));
        let controller = controller(mock);

        controller.focus(PlaygroundId::new("p2")).await;
        controller.edit_comment("half typed").await;

        let review = NewReview::new(Rating::new(3).unwrap(), Comment::parse("Fine").unwrap());
        let created = controller.create_review(&p1, review).await.unwrap();
        assert_eq!(created.playground_id, p1);

        let kept = controller
            .read(|state| state.draft().comment_for(&PlaygroundId::new("p2")).to_string())
            .await;
        assert_eq!(kept, "half typed");
    }

    #[tokio::test]
    async fn submit_draft_writes_exactly_what_it_was_given() {
        let mut mock = MockDirectoryStore::new();
        mock.expect_create_review()
            .withf(|playground, review| {
                playground.as_str() == "p2"
                    && review.rating.get() == 2
                    && review.comment.as_str() == "Too sunny"
            })
            .times(1)
            .returning(|playground, review| Ok(stored(playground, &review)));
        mock.expect_list_reviews().times(1).returning(|_| Ok(vec![]));
        let controller = controller(mock);

        controller.focus(PlaygroundId::new("p1")).await;
        controller.edit_comment("for p1").await;

        let outcome = controller
            .submit_draft(PlaygroundId::new("p2"), " Too sunny ", Some(Rating::new(2).unwrap()))
            .await;
        assert!(matches!(outcome, SubmitOutcome::Created(_)));
        assert!(controller.read(|state| state.draft().target().is_none()).await);
    }
}
