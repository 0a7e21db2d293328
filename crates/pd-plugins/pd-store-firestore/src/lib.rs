//! # pd-store-firestore
//!
//! `DirectoryStore` backed by a hosted document database, spoken to over its
//! REST API.
//!
//! Layout in the store:
//! - `playgrounds/{id}`: `name`, `location`, `zip`, `image`, `features`
//! - `playgrounds/{id}/reviews/{id}`: `name`, `rating`, `comment`, `timestamp`

pub mod document;

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use pd_core::{
    DirectoryStore, NewReview, Playground, PlaygroundId, Review, ReviewId, StoreError,
    StoreResult, ANONYMOUS_AUTHOR,
};
use reqwest::{Client, RequestBuilder, Response};
use secrecy::{ExposeSecret, SecretString};
use serde_json::json;
use uuid::Uuid;

use crate::document::{
    CommitResponse, ErrorEnvelope, ListDocumentsResponse, RunQueryItem, Value,
};

pub const DEFAULT_BASE_URL: &str = "https://firestore.googleapis.com";
pub const DEFAULT_DATABASE: &str = "(default)";

const PAGE_SIZE: u32 = 300;

/// Document ids are single path segments; a `/` would address another document.
fn is_document_id(id: &PlaygroundId) -> bool {
    !id.as_str().is_empty() && !id.as_str().contains('/')
}

/// Connection parameters for the hosted store.
#[derive(Debug)]
pub struct FirestoreConfig {
    pub project_id: String,
    pub database: String,
    pub base_url: String,
    /// Sent as the `key` query parameter.
    pub api_key: Option<SecretString>,
    /// Sent as `Authorization: Bearer ...`.
    pub bearer_token: Option<SecretString>,
}

impl FirestoreConfig {
    pub fn new(project_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            database: DEFAULT_DATABASE.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            bearer_token: None,
        }
    }
}

pub struct FirestoreDirectory {
    client: Client,
    config: FirestoreConfig,
}

impl FirestoreDirectory {
    pub fn new(config: FirestoreConfig) -> StoreResult<Self> {
        let client = Client::builder()
            .user_agent(concat!("playdir/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(StoreError::unavailable)?;
        Ok(Self { client, config })
    }

    /// `projects/{p}/databases/{d}/documents`, the prefix of every resource name.
    fn documents_path(&self) -> String {
        format!(
            "projects/{}/databases/{}/documents",
            self.config.project_id, self.config.database
        )
    }

    fn url(&self, suffix: &str) -> String {
        format!(
            "{}/v1/{}{}",
            self.config.base_url.trim_end_matches('/'),
            self.documents_path(),
            suffix
        )
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        let request = match &self.config.api_key {
            Some(key) => request.query(&[("key", key.expose_secret())]),
            None => request,
        };
        match &self.config.bearer_token {
            Some(token) => request.bearer_auth(token.expose_secret()),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder, write: bool) -> StoreResult<Response> {
        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(StoreError::unavailable)?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let envelope: ErrorEnvelope = response.json().await.unwrap_or_default();
        let reason = format!(
            "{status} {} {}",
            envelope.error.status, envelope.error.message
        );
        if write && status.is_client_error() {
            Err(StoreError::rejected(reason.trim()))
        } else {
            Err(StoreError::unavailable(reason.trim()))
        }
    }
}

#[async_trait]
impl DirectoryStore for FirestoreDirectory {
    /// Follows `nextPageToken` until the collection is exhausted.
    async fn list_playgrounds(&self) -> StoreResult<Vec<Playground>> {
        let mut playgrounds = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = self
                .client
                .get(self.url("/playgrounds"))
                .query(&[("pageSize", PAGE_SIZE.to_string())]);
            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token)]);
            }

            let page: ListDocumentsResponse = self
                .send(request, false)
                .await?
                .json()
                .await
                .map_err(StoreError::unavailable)?;
            playgrounds.extend(page.documents.into_iter().map(|doc| doc.into_playground()));

            match page.next_page_token.filter(|token| !token.is_empty()) {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        tracing::debug!(count = playgrounds.len(), "listed playgrounds from document store");
        Ok(playgrounds)
    }

    async fn list_reviews(&self, playground: &PlaygroundId) -> StoreResult<Vec<Review>> {
        if !is_document_id(playground) {
            return Ok(Vec::new());
        }
        let body = json!({
            "structuredQuery": {
                "from": [{ "collectionId": "reviews" }],
                "orderBy": [{
                    "field": { "fieldPath": "timestamp" },
                    "direction": "DESCENDING"
                }]
            }
        });
        let request = self
            .client
            .post(self.url(&format!("/playgrounds/{}:runQuery", playground.path_segment())))
            .json(&body);

        let items: Vec<RunQueryItem> = self
            .send(request, false)
            .await?
            .json()
            .await
            .map_err(StoreError::unavailable)?;

        let mut reviews = Vec::with_capacity(items.len());
        for document in items.into_iter().filter_map(|item| item.document) {
            let name = document.name.clone();
            match document.into_review(playground) {
                Some(review) => reviews.push(review),
                None => tracing::warn!(document = %name, "skipping review without a valid rating"),
            }
        }
        Ok(reviews)
    }

    /// One commit that writes the review and stamps `timestamp` with the
    /// server's request time. Fails if the generated id is already taken.
    async fn create_review(
        &self,
        playground: &PlaygroundId,
        review: NewReview,
    ) -> StoreResult<Review> {
        if !is_document_id(playground) {
            return Err(StoreError::rejected(format!(
                "{playground:?} is not a valid document id"
            )));
        }
        let review_id = ReviewId::new(Uuid::new_v4().simple().to_string());
        let comment: String = review.comment.into();
        let fields: HashMap<&str, Value> = HashMap::from([
            ("name", Value::string(ANONYMOUS_AUTHOR)),
            ("rating", Value::integer(i64::from(review.rating.get()))),
            ("comment", Value::string(comment.clone())),
        ]);
        let body = json!({
            "writes": [{
                "update": {
                    "name": format!("{}/playgrounds/{playground}/reviews/{review_id}", self.documents_path()),
                    "fields": fields,
                },
                "updateTransforms": [{
                    "fieldPath": "timestamp",
                    "setToServerValue": "REQUEST_TIME"
                }],
                "currentDocument": { "exists": false }
            }]
        });
        let request = self.client.post(self.url(":commit")).json(&body);

        let commit: CommitResponse = self
            .send(request, true)
            .await?
            .json()
            .await
            .map_err(StoreError::unavailable)?;
        let created_at = commit
            .write_results
            .first()
            .and_then(|result| result.transform_results.first())
            .and_then(|value| value.timestamp_value)
            .or(commit.commit_time)
            .unwrap_or_else(Utc::now);

        tracing::debug!(playground = %playground, review = %review_id, "committed review");
        Ok(Review {
            id: review_id,
            playground_id: playground.clone(),
            author: ANONYMOUS_AUTHOR.to_string(),
            rating: review.rating,
            comment,
            created_at,
        })
    }
}
