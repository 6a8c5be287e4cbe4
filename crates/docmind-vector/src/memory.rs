//! In-memory vector database with brute-force cosine similarity search.
//!
//! All searches are O(n) over the collection, which is fine for tests and
//! small local deployments. Collection creation happens under a single write
//! lock, so concurrent creators observe exactly one collection.

use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

use docmind_core::error::{DocmindError, Result};
use docmind_core::types::{HitPayload, Point, ScoredPoint};

use crate::store::{CollectionSpec, CreateOutcome, PayloadFilter, QueryRequest, VectorDatabase};

const SERVICE: &str = "in-memory vector store";

#[derive(Debug, Clone)]
struct StoredPoint {
    vector: Vec<f32>,
    payload: Value,
}

#[derive(Debug)]
struct Collection {
    spec: CollectionSpec,
    points: HashMap<Uuid, StoredPoint>,
}

/// Thread-safe in-process vector database.
#[derive(Debug, Clone, Default)]
pub struct InMemoryVectorDatabase {
    collections: Arc<RwLock<HashMap<String, Collection>>>,
}

impl InMemoryVectorDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of collections, for diagnostics and tests.
    pub fn collection_count(&self) -> usize {
        self.collections.read().map(|c| c.len()).unwrap_or(0)
    }

    /// Number of points stored in `name`, or 0 if it does not exist.
    pub fn point_count(&self, name: &str) -> usize {
        self.collections
            .read()
            .ok()
            .and_then(|c| c.get(name).map(|col| col.points.len()))
            .unwrap_or(0)
    }

    /// Payloads of every point in `name`, in no particular order.
    pub fn payloads(&self, name: &str) -> Vec<Value> {
        self.collections
            .read()
            .ok()
            .and_then(|c| {
                c.get(name)
                    .map(|col| col.points.values().map(|p| p.payload.clone()).collect())
            })
            .unwrap_or_default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, HashMap<String, Collection>>> {
        self.collections
            .read()
            .map_err(|e| DocmindError::upstream(SERVICE, format!("lock poisoned: {e}")))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, HashMap<String, Collection>>> {
        self.collections
            .write()
            .map_err(|e| DocmindError::upstream(SERVICE, format!("lock poisoned: {e}")))
    }
}

#[async_trait]
impl VectorDatabase for InMemoryVectorDatabase {
    async fn collection_exists(&self, name: &str) -> Result<bool> {
        Ok(self.read()?.contains_key(name))
    }

    async fn create_collection(&self, name: &str, spec: CollectionSpec) -> Result<CreateOutcome> {
        let mut collections = self.write()?;
        if collections.contains_key(name) {
            return Ok(CreateOutcome::AlreadyExists);
        }
        collections.insert(
            name.to_string(),
            Collection {
                spec,
                points: HashMap::new(),
            },
        );
        Ok(CreateOutcome::Created)
    }

    async fn upsert_points(&self, name: &str, points: Vec<Point>) -> Result<()> {
        let mut collections = self.write()?;
        let collection = collections
            .get_mut(name)
            .ok_or_else(|| DocmindError::NotFound(format!("collection {name}")))?;

        // Validate the whole batch first so a bad point leaves nothing written.
        if let Some(bad) = points
            .iter()
            .find(|p| p.vector.len() != collection.spec.size)
        {
            return Err(DocmindError::upstream(
                SERVICE,
                format!(
                    "wrong vector dimension for point {}: expected {}, got {}",
                    bad.id,
                    collection.spec.size,
                    bad.vector.len()
                ),
            ));
        }

        for point in points {
            let payload = serde_json::to_value(&point.payload)?;
            collection.points.insert(
                point.id,
                StoredPoint {
                    vector: point.vector,
                    payload,
                },
            );
        }
        Ok(())
    }

    async fn query_points(&self, name: &str, request: &QueryRequest) -> Result<Vec<ScoredPoint>> {
        let collections = self.read()?;
        let collection = collections
            .get(name)
            .ok_or_else(|| DocmindError::NotFound(format!("collection {name}")))?;

        let mut scored: Vec<(f64, &Uuid, &StoredPoint)> = collection
            .points
            .iter()
            .filter(|(_, point)| request.filter.matches(&point.payload))
            .map(|(id, point)| (cosine_similarity(&request.vector, &point.vector), id, point))
            .collect();

        // Sort by descending score.
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(request.limit);

        scored
            .into_iter()
            .map(|(score, id, point)| -> Result<ScoredPoint> {
                let payload: HitPayload = serde_json::from_value(point.payload.clone())?;
                Ok(ScoredPoint {
                    id: id.to_string(),
                    score: score as f32,
                    payload,
                })
            })
            .collect()
    }

    async fn delete_points(&self, name: &str, filter: &PayloadFilter) -> Result<()> {
        let mut collections = self.write()?;
        if let Some(collection) = collections.get_mut(name) {
            collection
                .points
                .retain(|_, point| !filter.matches(&point.payload));
        }
        Ok(())
    }
}

/// Compute cosine similarity between two vectors.
///
/// Returns 0.0 if either vector has zero magnitude.
pub(crate) fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot: f64 = a
        .iter()
        .zip(b.iter())
        .map(|(x, y)| (*x as f64) * (*y as f64))
        .sum();

    let mag_a: f64 = a.iter().map(|x| (*x as f64).powi(2)).sum::<f64>().sqrt();
    let mag_b: f64 = b.iter().map(|x| (*x as f64).powi(2)).sum::<f64>().sqrt();

    if mag_a == 0.0 || mag_b == 0.0 {
        return 0.0;
    }

    dot / (mag_a * mag_b)
}
