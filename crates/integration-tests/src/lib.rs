//! Shared fixtures for the cross-crate scenario tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use pd_core::{
    DirectoryStore, NewReview, Playground, PlaygroundId, Rating, Review, ReviewId, StoreError,
    StoreResult, ANONYMOUS_AUTHOR,
};
use tokio::sync::oneshot;

pub fn park(id: &str, zip: &str, name: &str) -> Playground {
    Playground {
        id: PlaygroundId::new(id),
        name: name.to_string(),
        location: format!("{name} entrance"),
        zip: zip.to_string(),
        image: None,
        features: vec![],
    }
}

/// The two-playground directory used throughout the scenarios.
pub fn two_parks() -> Vec<Playground> {
    vec![park("p1", "10001", "Park A"), park("p2", "10002", "Park B")]
}

pub fn ids<'a>(playgrounds: impl IntoIterator<Item = &'a Playground>) -> Vec<String> {
    playgrounds
        .into_iter()
        .map(|p| p.id.as_str().to_string())
        .collect()
}

/// A stored review as a store would hand it back.
pub fn stored_review(playground: &str, comment: &str, rating: u8) -> Review {
    Review {
        id: ReviewId::new(format!("{playground}-{comment}")),
        playground_id: PlaygroundId::new(playground),
        author: ANONYMOUS_AUTHOR.to_string(),
        rating: Rating::new(i64::from(rating)).unwrap_or_default(),
        comment: comment.to_string(),
        created_at: Utc::now(),
    }
}

type Scripted<T> = (Option<oneshot::Receiver<()>>, StoreResult<T>);

/// A store that answers from a queue of canned responses. A response may be
/// held back behind a gate until the test releases it, which lets tests
/// finish requests out of order.
#[derive(Default)]
pub struct ScriptedStore {
    playgrounds: Mutex<VecDeque<Scripted<Vec<Playground>>>>,
    reviews: Mutex<VecDeque<Scripted<Vec<Review>>>>,
    writes: Mutex<VecDeque<Scripted<Review>>>,
    started: AtomicUsize,
    written: AtomicUsize,
}

impl ScriptedStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_playgrounds(&self, result: StoreResult<Vec<Playground>>) {
        self.push(&self.playgrounds, None, result);
    }

    /// Queues a playground list that is only returned once the sender fires.
    pub fn push_gated_playgrounds(
        &self,
        result: StoreResult<Vec<Playground>>,
    ) -> oneshot::Sender<()> {
        let (release, gate) = oneshot::channel();
        self.push(&self.playgrounds, Some(gate), result);
        release
    }

    pub fn push_reviews(&self, result: StoreResult<Vec<Review>>) {
        self.push(&self.reviews, None, result);
    }

    pub fn push_gated_reviews(&self, result: StoreResult<Vec<Review>>) -> oneshot::Sender<()> {
        let (release, gate) = oneshot::channel();
        self.push(&self.reviews, Some(gate), result);
        release
    }

    pub fn push_write(&self, result: StoreResult<Review>) {
        self.push(&self.writes, None, result);
    }

    pub fn push_gated_write(&self, result: StoreResult<Review>) -> oneshot::Sender<()> {
        let (release, gate) = oneshot::channel();
        self.push(&self.writes, Some(gate), result);
        release
    }

    /// Number of `create_review` calls received.
    pub fn written(&self) -> usize {
        self.written.load(Ordering::SeqCst)
    }

    /// Number of calls that have reached the store so far.
    pub fn started(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }

    /// Yields until at least `calls` store calls have started.
    pub async fn wait_for_calls(&self, calls: usize) {
        while self.started() < calls {
            tokio::task::yield_now().await;
        }
    }

    fn push<T>(
        &self,
        queue: &Mutex<VecDeque<Scripted<T>>>,
        gate: Option<oneshot::Receiver<()>>,
        result: StoreResult<T>,
    ) {
        if let Ok(mut queue) = queue.lock() {
            queue.push_back((gate, result));
        }
    }

    async fn answer<T>(&self, queue: &Mutex<VecDeque<Scripted<T>>>) -> StoreResult<T> {
        let next = queue.lock().ok().and_then(|mut queue| queue.pop_front());
        self.started.fetch_add(1, Ordering::SeqCst);
        let Some((gate, result)) = next else {
            return Err(StoreError::unavailable("no scripted response left"));
        };
        if let Some(gate) = gate {
            // A dropped sender releases the response as well.
            let _ = gate.await;
        }
        result
    }
}

#[async_trait]
impl DirectoryStore for ScriptedStore {
    async fn list_playgrounds(&self) -> StoreResult<Vec<Playground>> {
        self.answer(&self.playgrounds).await
    }

    async fn list_reviews(&self, _playground: &PlaygroundId) -> StoreResult<Vec<Review>> {
        self.answer(&self.reviews).await
    }

    async fn create_review(
        &self,
        _playground: &PlaygroundId,
        _review: NewReview,
    ) -> StoreResult<Review> {
        self.written.fetch_add(1, Ordering::SeqCst);
        self.answer(&self.writes).await
    }
}
