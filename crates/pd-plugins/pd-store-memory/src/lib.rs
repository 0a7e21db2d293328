//! # pd-store-memory
//!
//! In-process implementation of `DirectoryStore`.
//! Used for local development, demos and tests; nothing survives a restart.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{Duration, Utc};
use dashmap::DashMap;
use pd_core::{
    DirectoryStore, NewReview, Playground, PlaygroundId, Review, ReviewId, StoreError,
    StoreResult, ANONYMOUS_AUTHOR,
};
use uuid::Uuid;

pub struct MemoryDirectory {
    /// Kept in insertion order, which is this store's native order.
    playgrounds: Vec<Playground>,
    /// Reviews per playground, oldest first.
    reviews: DashMap<PlaygroundId, Vec<Review>>,
    available: AtomicBool,
}

impl MemoryDirectory {
    pub fn new(playgrounds: Vec<Playground>) -> Self {
        Self {
            playgrounds,
            reviews: DashMap::new(),
            available: AtomicBool::new(true),
        }
    }

    /// Simulates the store going offline (`false`) or coming back (`true`).
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    fn ensure_available(&self) -> StoreResult<()> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::unavailable("memory store is offline"))
        }
    }
}

impl Default for MemoryDirectory {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

#[async_trait]
impl DirectoryStore for MemoryDirectory {
    async fn list_playgrounds(&self) -> StoreResult<Vec<Playground>> {
        self.ensure_available()?;
        Ok(self.playgrounds.clone())
    }

    async fn list_reviews(&self, playground: &PlaygroundId) -> StoreResult<Vec<Review>> {
        self.ensure_available()?;
        let mut reviews = self
            .reviews
            .get(playground)
            .map(|entry| entry.value().clone())
            .unwrap_or_default();
        reviews.reverse();
        reviews.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(reviews)
    }

    /// Assigns a timestamp strictly after the playground's latest review, so
    /// newest-first ordering holds even when the clock does not move.
    async fn create_review(
        &self,
        playground: &PlaygroundId,
        review: NewReview,
    ) -> StoreResult<Review> {
        self.ensure_available()?;
        if !self.playgrounds.iter().any(|p| &p.id == playground) {
            return Err(StoreError::rejected(format!(
                "playground {playground} does not exist"
            )));
        }

        let mut entry = self.reviews.entry(playground.clone()).or_default();
        let now = Utc::now();
        let created_at = match entry.last() {
            Some(last) if last.created_at >= now => last.created_at + Duration::microseconds(1),
            _ => now,
        };
        let stored = Review {
            id: ReviewId::new(Uuid::now_v7().to_string()),
            playground_id: playground.clone(),
            author: ANONYMOUS_AUTHOR.to_string(),
            rating: review.rating,
            comment: review.comment.into(),
            created_at,
        };
        entry.push(stored.clone());
        tracing::debug!(playground = %playground, review = %stored.id, "stored review in memory");
        Ok(stored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pd_core::{Comment, Rating};

    fn park(id: &str, zip: &str) -> Playground {
        Playground {
            id: PlaygroundId::new(id),
            name: format!("Park {id}"),
            location: String::new(),
            zip: zip.to_string(),
            image: None,
            features: vec![],
        }
    }

    fn new_review(rating: i64, text: &str) -> NewReview {
        NewReview::new(Rating::new(rating).unwrap(), Comment::parse(text).unwrap())
    }

    #[tokio::test]
    async fn lists_playgrounds_in_insertion_order() {
        let store = MemoryDirectory::new(vec![park("b", "2"), park("a", "1")]);
        let ids: Vec<_> = store
            .list_playgrounds()
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(ids, vec![PlaygroundId::new("b"), PlaygroundId::new("a")]);
    }

    #[tokio::test]
    async fn reviews_come_back_newest_first() {
        let store = MemoryDirectory::new(vec![park("p1", "10001")]);
        let p1 = PlaygroundId::new("p1");

        assert!(store.list_reviews(&p1).await.unwrap().is_empty());

        store.create_review(&p1, new_review(3, "first")).await.unwrap();
        store.create_review(&p1, new_review(4, "second")).await.unwrap();
        store.create_review(&p1, new_review(5, "third")).await.unwrap();

        let reviews = store.list_reviews(&p1).await.unwrap();
        let comments: Vec<_> = reviews.iter().map(|r| r.comment.as_str()).collect();
        assert_eq!(comments, vec!["third", "second", "first"]);
        assert!(reviews[0].created_at > reviews[1].created_at);
        assert!(reviews.iter().all(|r| r.author == ANONYMOUS_AUTHOR));
    }

    #[tokio::test]
    async fn unknown_playground_reads_empty_and_rejects_writes() {
        let store = MemoryDirectory::default();
        let ghost = PlaygroundId::new("ghost");

        assert!(store.list_reviews(&ghost).await.unwrap().is_empty());
        let err = store.create_review(&ghost, new_review(2, "hm")).await.unwrap_err();
        assert!(matches!(err, StoreError::WriteRejected(_)));
    }

    #[tokio::test]
    async fn offline_store_is_unavailable() {
        let store = MemoryDirectory::new(vec![park("p1", "10001")]);
        store.set_available(false);
        assert!(matches!(
            store.list_playgrounds().await,
            Err(StoreError::Unavailable(_))
        ));

        store.set_available(true);
        assert_eq!(store.list_playgrounds().await.unwrap().len(), 1);
    }
}
