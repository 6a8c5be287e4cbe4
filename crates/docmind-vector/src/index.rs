//! Owner-scoped vector index over one collection.

use std::sync::Arc;

use tracing::{debug, info, warn};
use uuid::Uuid;

use docmind_core::error::{DocmindError, Result};
use docmind_core::types::{
    Chunk, DocumentId, OwnerId, Point, PointPayload, ScoredPoint, DOCUMENT_ID_FIELD,
    OWNER_ID_FIELD, TEXT_FIELD,
};

use crate::embedding::EmbeddingProvider;
use crate::store::{CollectionSpec, CreateOutcome, PayloadFilter, QueryRequest, VectorDatabase};

/// Embeds chunks and queries, and keeps every read and delete scoped to a
/// single owner through a payload filter.
#[derive(Clone)]
pub struct VectorIndex {
    db: Arc<dyn VectorDatabase>,
    embedder: EmbeddingProvider,
    collection: String,
}

impl VectorIndex {
    pub fn new(
        db: Arc<dyn VectorDatabase>,
        embedder: EmbeddingProvider,
        collection: impl Into<String>,
    ) -> Self {
        Self {
            db,
            embedder,
            collection: collection.into(),
        }
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn embedder(&self) -> &EmbeddingProvider {
        &self.embedder
    }

    /// Create the collection if it is missing.
    ///
    /// Safe to call from many tasks at once: losing a creation race is
    /// reported by the database as "already exists", which counts as success.
    pub async fn ensure_collection(&self) -> Result<()> {
        if self.db.collection_exists(&self.collection).await? {
            return Ok(());
        }
        let spec = CollectionSpec::cosine(self.embedder.dimensions());
        match self.db.create_collection(&self.collection, spec).await? {
            CreateOutcome::Created => info!(
                collection = %self.collection,
                dimensions = spec.size,
                "Created vector collection"
            ),
            CreateOutcome::AlreadyExists => {
                debug!(collection = %self.collection, "Collection created concurrently")
            }
        }
        Ok(())
    }

    /// Embed `chunks` and write them as one batch of points.
    ///
    /// Chunks are embedded in as few provider calls as the batch limit
    /// allows. Nothing is written if any embedding call fails.
    pub async fn upsert(
        &self,
        owner_id: &OwnerId,
        document_id: &DocumentId,
        chunks: &[Chunk],
    ) -> Result<usize> {
        if chunks.is_empty() {
            return Err(DocmindError::invalid("no chunks to index"));
        }
        self.ensure_collection().await?;

        // Every batch is embedded before anything is written.
        let mut points: Vec<Point> = Vec::with_capacity(chunks.len());
        for batch in chunks.chunks(EmbeddingProvider::MAX_BATCH_INPUTS) {
            let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
            let embeddings = self.embedder.embed_batch(&texts).await?;
            points.extend(embeddings.into_iter().map(|embedding| Point {
                id: Uuid::new_v4(),
                vector: embedding.vector,
                payload: PointPayload {
                    owner_id: owner_id.clone(),
                    document_id: document_id.clone(),
                    part_index: batch[embedding.index].index,
                    text: embedding.original_text,
                },
            }));
        }

        let count = points.len();
        self.db.upsert_points(&self.collection, points).await?;
        debug!(
            owner_id = %owner_id,
            document_id = %document_id,
            points = count,
            "Upserted points"
        );
        Ok(count)
    }

    /// Nearest neighbors of `query` among the owner's points, closest first.
    pub async fn search(
        &self,
        query: &str,
        owner_id: &OwnerId,
        top_k: usize,
    ) -> Result<Vec<ScoredPoint>> {
        self.ensure_collection().await?;
        let embedding = self.embedder.embed_one(query).await?;

        let request = QueryRequest {
            vector: embedding.vector,
            filter: owner_filter(owner_id),
            limit: top_k,
            with_payload: vec![
                OWNER_ID_FIELD.to_string(),
                DOCUMENT_ID_FIELD.to_string(),
                TEXT_FIELD.to_string(),
            ],
        };
        let hits = self.db.query_points(&self.collection, &request).await?;

        let total = hits.len();
        let hits: Vec<ScoredPoint> = hits
            .into_iter()
            .filter(|hit| hit.payload.owner_id == owner_id.as_str())
            .collect();
        if hits.len() != total {
            warn!(
                owner_id = %owner_id,
                dropped = total - hits.len(),
                "Vector database returned points of another owner; dropped"
            );
        }
        Ok(hits)
    }

    /// Remove every point of the document belonging to the owner.
    pub async fn delete_document(&self, document_id: &DocumentId, owner_id: &OwnerId) -> Result<()> {
        let filter = PayloadFilter::new()
            .must_match(DOCUMENT_ID_FIELD, document_id.as_str())
            .must_match(OWNER_ID_FIELD, owner_id.as_str());
        self.db.delete_points(&self.collection, &filter).await
    }
}

fn owner_filter(owner_id: &OwnerId) -> PayloadFilter {
    PayloadFilter::new().must_match(OWNER_ID_FIELD, owner_id.as_str())
}
