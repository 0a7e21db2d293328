//! # Core Traits (Ports)
//!
//! Any store plugin must implement these traits to be used by the binary.

use async_trait::async_trait;

use crate::error::StoreResult;
use crate::models::{NewReview, Playground, PlaygroundId, Review};

/// Sole boundary to the document store holding playgrounds and their reviews.
///
/// There are no update or delete operations: the application only reads
/// playgrounds and appends reviews.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait DirectoryStore: Send + Sync {
    /// Every playground currently in the store, in store-native order.
    async fn list_playgrounds(&self) -> StoreResult<Vec<Playground>>;

    /// Every review nested under `playground`, newest first.
    ///
    /// An unknown playground yields an empty list rather than an error.
    async fn list_reviews(&self, playground: &PlaygroundId) -> StoreResult<Vec<Review>>;

    /// Persists a review under `playground`, assigning the author name and a
    /// server-side timestamp, and returns the stored record.
    async fn create_review(&self, playground: &PlaygroundId, review: NewReview)
        -> StoreResult<Review>;
}
