//! Wire shapes of the document store's REST API and their mapping to
//! `pd-core` models.
//!
//! Every field value is a single-key object such as `{"stringValue": "x"}` or
//! `{"integerValue": "4"}`. Unknown value kinds are ignored.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use pd_core::{Playground, PlaygroundId, Rating, Review, ReviewId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Value {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub string_value: Option<String>,
    /// int64 travels as a decimal string.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub integer_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub double_value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp_value: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub array_value: Option<ArrayValue>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArrayValue {
    #[serde(default)]
    pub values: Vec<Value>,
}

impl Value {
    pub fn string(value: impl Into<String>) -> Self {
        Self {
            string_value: Some(value.into()),
            ..Self::default()
        }
    }

    pub fn integer(value: i64) -> Self {
        Self {
            integer_value: Some(value.to_string()),
            ..Self::default()
        }
    }

    fn as_str(&self) -> Option<&str> {
        self.string_value.as_deref()
    }

    fn as_i64(&self) -> Option<i64> {
        match (&self.integer_value, self.double_value) {
            (Some(raw), _) => raw.parse().ok(),
            (None, Some(double)) if double.fract() == 0.0 => Some(double as i64),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    /// Full resource name, ending in `/<collection>/<id>`.
    pub name: String,
    #[serde(default)]
    pub fields: HashMap<String, Value>,
    #[serde(default)]
    pub create_time: Option<DateTime<Utc>>,
}

impl Document {
    /// The document id: last segment of the resource name.
    pub fn id(&self) -> &str {
        self.name.rsplit('/').next().unwrap_or_default()
    }

    fn text(&self, field: &str) -> String {
        self.fields
            .get(field)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    }

    pub fn into_playground(self) -> Playground {
        let image = self
            .fields
            .get("image")
            .and_then(Value::as_str)
            .filter(|uri| !uri.is_empty())
            .map(str::to_string);
        let features = self
            .fields
            .get("features")
            .and_then(|value| value.array_value.as_ref())
            .map(|array| {
                array
                    .values
                    .iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default();
        Playground {
            id: PlaygroundId::new(self.id()),
            name: self.text("name"),
            location: self.text("location"),
            zip: self.text("zip"),
            image,
            features,
        }
    }

    /// `None` when the stored rating is missing or outside 1..=5.
    pub fn into_review(self, playground: &PlaygroundId) -> Option<Review> {
        let rating = self
            .fields
            .get("rating")
            .and_then(Value::as_i64)
            .and_then(|raw| Rating::new(raw).ok())?;
        let created_at = self
            .fields
            .get("timestamp")
            .and_then(|value| value.timestamp_value)
            .or(self.create_time)?;
        Some(Review {
            id: ReviewId::new(self.id()),
            playground_id: playground.clone(),
            author: self.text("name"),
            rating,
            comment: self.text("comment"),
            created_at,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListDocumentsResponse {
    #[serde(default)]
    pub documents: Vec<Document>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

/// One element of a `runQuery` response stream. Elements without a document
/// only report progress (an empty result is a single such element).
#[derive(Debug, Deserialize)]
pub struct RunQueryItem {
    #[serde(default)]
    pub document: Option<Document>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitResponse {
    #[serde(default)]
    pub write_results: Vec<WriteResult>,
    pub commit_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WriteResult {
    #[serde(default)]
    pub transform_results: Vec<Value>,
}

/// Error envelope returned with non-2xx statuses.
#[derive(Debug, Default, Deserialize)]
pub struct ErrorEnvelope {
    #[serde(default)]
    pub error: ErrorBody,
}

#[derive(Debug, Default, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub status: String,
}
