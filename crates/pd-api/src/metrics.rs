//! Store call counters, exposed in Prometheus text format at `/metrics`.

use std::sync::Arc;

use async_trait::async_trait;
use pd_core::{
    DirectoryStore, NewReview, Playground, PlaygroundId, Review, StoreError, StoreResult,
};
use prometheus_client::encoding::text::encode;
use prometheus_client::encoding::{EncodeLabelSet, EncodeLabelValue};
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::registry::Registry;

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelValue)]
pub enum Operation {
    ListPlaygrounds,
    ListReviews,
    CreateReview,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelValue)]
pub enum Outcome {
    Ok,
    Unavailable,
    WriteRejected,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct StoreCallLabels {
    pub operation: Operation,
    pub outcome: Outcome,
}

pub struct Metrics {
    registry: Registry,
    store_calls: Family<StoreCallLabels, Counter>,
}

impl Metrics {
    pub fn new() -> Self {
        let mut registry = Registry::default();
        let store_calls = Family::<StoreCallLabels, Counter>::default();
        registry.register(
            "playdir_store_calls",
            "Document store calls by operation and outcome",
            store_calls.clone(),
        );
        Self {
            registry,
            store_calls,
        }
    }

    pub fn record<T>(&self, operation: Operation, result: &StoreResult<T>) {
        let outcome = match result {
            Ok(_) => Outcome::Ok,
            Err(StoreError::Unavailable(_)) => Outcome::Unavailable,
            Err(StoreError::WriteRejected(_)) => Outcome::WriteRejected,
        };
        self.store_calls
            .get_or_create(&StoreCallLabels { operation, outcome })
            .inc();
    }

    pub fn count(&self, operation: Operation, outcome: Outcome) -> u64 {
        self.store_calls
            .get_or_create(&StoreCallLabels { operation, outcome })
            .get()
    }

    pub fn render(&self) -> Result<String, std::fmt::Error> {
        let mut buffer = String::new();
        encode(&mut buffer, &self.registry)?;
        Ok(buffer)
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Decorates a store so every call is counted.
pub struct MeteredStore {
    inner: Arc<dyn DirectoryStore>,
    metrics: Arc<Metrics>,
}

impl MeteredStore {
    pub fn new(inner: Arc<dyn DirectoryStore>, metrics: Arc<Metrics>) -> Self {
        Self { inner, metrics }
    }
}

#[async_trait]
impl DirectoryStore for MeteredStore {
    async fn list_playgrounds(&self) -> StoreResult<Vec<Playground>> {
        let result = self.inner.list_playgrounds().await;
        self.metrics.record(Operation::ListPlaygrounds, &result);
        result
    }

    async fn list_reviews(&self, playground: &PlaygroundId) -> StoreResult<Vec<Review>> {
        let result = self.inner.list_reviews(playground).await;
        self.metrics.record(Operation::ListReviews, &result);
        result
    }

    async fn create_review(
        &self,
        playground: &PlaygroundId,
        review: NewReview,
    ) -> StoreResult<Review> {
        let result = self.inner.create_review(playground, review).await;
        self.metrics.record(Operation::CreateReview, &result);
        result
    }
}
