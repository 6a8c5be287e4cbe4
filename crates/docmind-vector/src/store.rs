//! Vector database abstraction.
//!
//! `VectorDatabase` covers the handful of collection and point operations the
//! pipeline needs. Filters and payload selectors serialize in the Qdrant wire
//! format so the REST client can forward them unchanged.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use docmind_core::error::Result;
use docmind_core::types::{Point, ScoredPoint};

/// Similarity metric of a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Distance {
    Cosine,
    Dot,
    Euclid,
}

/// Vector parameters used when creating a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionSpec {
    pub size: usize,
    pub distance: Distance,
}

impl CollectionSpec {
    pub fn cosine(size: usize) -> Self {
        Self {
            size,
            distance: Distance::Cosine,
        }
    }
}

/// Result of a create call. Both outcomes mean the collection is usable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateOutcome {
    Created,
    AlreadyExists,
}

/// Exact-match condition on one payload key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldCondition {
    pub key: String,
    #[serde(rename = "match")]
    pub matches: MatchValue,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchValue {
    pub value: String,
}

/// Conjunction of exact-match payload conditions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayloadFilter {
    pub must: Vec<FieldCondition>,
}

impl PayloadFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add the condition `payload[key] == value`.
    pub fn must_match(mut self, key: &str, value: &str) -> Self {
        self.must.push(FieldCondition {
            key: key.to_string(),
            matches: MatchValue {
                value: value.to_string(),
            },
        });
        self
    }

    /// True when every condition holds for `payload`.
    pub fn matches(&self, payload: &Value) -> bool {
        self.must.iter().all(|cond| {
            payload
                .get(&cond.key)
                .and_then(Value::as_str)
                .is_some_and(|v| v == cond.matches.value)
        })
    }

    /// Value required for `key`, if the filter constrains it.
    pub fn value_for(&self, key: &str) -> Option<&str> {
        self.must
            .iter()
            .find(|cond| cond.key == key)
            .map(|cond| cond.matches.value.as_str())
    }
}

/// Nearest-neighbor query.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryRequest {
    pub vector: Vec<f32>,
    pub filter: PayloadFilter,
    pub limit: usize,
    /// Payload keys to return with each hit.
    pub with_payload: Vec<String>,
}

/// Operations the pipeline needs from a vector database.
///
/// Writes and deletes complete before returning (the equivalent of Qdrant's
/// `wait=true`).
#[async_trait]
pub trait VectorDatabase: Send + Sync {
    async fn collection_exists(&self, name: &str) -> Result<bool>;

    async fn create_collection(&self, name: &str, spec: CollectionSpec) -> Result<CreateOutcome>;

    /// Insert or overwrite points in one batch.
    async fn upsert_points(&self, name: &str, points: Vec<Point>) -> Result<()>;

    /// Closest-first hits among points matching the filter.
    async fn query_points(&self, name: &str, request: &QueryRequest) -> Result<Vec<ScoredPoint>>;

    /// Remove every point matching the filter. A missing collection is a no-op.
    async fn delete_points(&self, name: &str, filter: &PayloadFilter) -> Result<()>;
}
