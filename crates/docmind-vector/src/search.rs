//! Direct nearest-neighbor search over an owner's documents.

use std::sync::Arc;

use tracing::debug;

use docmind_core::error::{DocmindError, Result};
use docmind_core::types::{OwnerId, SearchHit};

use crate::index::VectorIndex;

/// Embeds a query and returns the owner's closest chunks.
pub struct QueryPipeline {
    index: Arc<VectorIndex>,
    top_k: usize,
}

impl QueryPipeline {
    pub const DEFAULT_TOP_K: usize = 1;

    pub fn new(index: Arc<VectorIndex>, top_k: usize) -> Self {
        Self {
            index,
            top_k: top_k.max(1),
        }
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    /// Search with the configured result limit.
    pub async fn search(&self, query: &str, owner_id: &OwnerId) -> Result<Vec<SearchHit>> {
        self.search_with_limit(query, owner_id, self.top_k).await
    }

    pub async fn search_with_limit(
        &self,
        query: &str,
        owner_id: &OwnerId,
        limit: usize,
    ) -> Result<Vec<SearchHit>> {
        if query.trim().is_empty() {
            return Err(DocmindError::invalid("search query cannot be empty"));
        }
        if limit == 0 {
            return Err(DocmindError::invalid("search limit must be greater than zero"));
        }

        let hits = self.index.search(query, owner_id, limit).await?;
        debug!(owner_id = %owner_id, hits = hits.len(), limit, "Search completed");
        Ok(hits.into_iter().map(SearchHit::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunker::DocumentChunker;
    use crate::embedding::{EmbeddingProvider, MockEmbeddingClient};
    use crate::memory::InMemoryVectorDatabase;
    use crate::pipeline::IngestionPipeline;
    use docmind_core::types::DocumentId;

    const DIMS: usize = 16;

    fn setup(top_k: usize) -> (Arc<MockEmbeddingClient>, IngestionPipeline, QueryPipeline) {
        let db = InMemoryVectorDatabase::new();
        let mock = Arc::new(MockEmbeddingClient::new(DIMS));
        let provider = EmbeddingProvider::new(mock.clone(), "mock", DIMS);
        let index = Arc::new(VectorIndex::new(Arc::new(db), provider, "docs"));
        (
            mock,
            IngestionPipeline::new(DocumentChunker::default(), index.clone()),
            QueryPipeline::new(index, top_k),
        )
    }

    fn owner(s: &str) -> OwnerId {
        OwnerId::new(s).unwrap()
    }

    #[tokio::test]
    async fn test_search_returns_owner_hit() {
        let (_mock, ingest, query) = setup(QueryPipeline::DEFAULT_TOP_K);
        ingest
            .add_document(&DocumentId::new("d1").unwrap(), &owner("u1"), "hello world")
            .await
            .unwrap();

        let hits = query.search("world", &owner("u1")).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].document_id, "d1");
        assert_eq!(hits[0].text, "hello world");
        assert!(!hits[0].point_id.is_empty());

        let other = query.search("world", &owner("u2")).await.unwrap();
        assert!(other.is_empty());
    }

    #[tokio::test]
    async fn test_search_respects_top_k() {
        let (_mock, ingest, query) = setup(2);
        for i in 0..5 {
            ingest
                .add_document(
                    &DocumentId::new(format!("d{i}")).unwrap(),
                    &owner("u1"),
                    &format!("note number {i}"),
                )
                .await
                .unwrap();
        }

        assert_eq!(query.search("note", &owner("u1")).await.unwrap().len(), 2);
        assert_eq!(
            query
                .search_with_limit("note", &owner("u1"), 4)
                .await
                .unwrap()
                .len(),
            4
        );
    }

    #[tokio::test]
    async fn test_empty_query_rejected_without_embedding() {
        let (mock, _ingest, query) = setup(1);
        let err = query.search("  ", &owner("u1")).await.unwrap_err();
        assert!(matches!(err, DocmindError::InvalidInput(_)));
        assert_eq!(mock.call_count(), 0);
    }

    #[tokio::test]
    async fn test_search_before_any_ingest_is_empty() {
        let (_mock, _ingest, query) = setup(1);
        let hits = query.search("anything", &owner("u1")).await.unwrap();
        assert!(hits.is_empty());
    }
}
