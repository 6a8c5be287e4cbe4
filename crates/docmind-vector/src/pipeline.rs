//! Document ingestion pipeline.
//!
//! The IngestionPipeline turns raw document text into owner-scoped points:
//! validation, chunking, batched embedding, and a single batched write.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use docmind_core::error::{DocmindError, Result};
use docmind_core::types::{DocumentId, OwnerId};

use crate::chunker::DocumentChunker;
use crate::index::VectorIndex;

/// Outcome of a successful ingestion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestReport {
    pub document_id: DocumentId,
    pub chunk_count: usize,
}

pub struct IngestionPipeline {
    chunker: DocumentChunker,
    index: Arc<VectorIndex>,
}

impl IngestionPipeline {
    pub fn new(chunker: DocumentChunker, index: Arc<VectorIndex>) -> Self {
        Self { chunker, index }
    }

    /// Chunk, embed and store a document for its owner.
    ///
    /// Fails without writing anything if the text is blank or any upstream
    /// call fails.
    pub async fn add_document(
        &self,
        document_id: &DocumentId,
        owner_id: &OwnerId,
        raw_text: &str,
    ) -> Result<IngestReport> {
        if raw_text.trim().is_empty() {
            return Err(DocmindError::invalid("document text cannot be empty"));
        }

        let chunks = self.chunker.chunks(raw_text)?;
        debug!(
            document_id = %document_id,
            chunks = chunks.len(),
            chars = raw_text.chars().count(),
            "Chunked document"
        );

        let chunk_count = self.index.upsert(owner_id, document_id, &chunks).await?;
        info!(
            owner_id = %owner_id,
            document_id = %document_id,
            chunk_count,
            "Document ingested"
        );

        Ok(IngestReport {
            document_id: document_id.clone(),
            chunk_count,
        })
    }

    /// Remove all points of a document. Deleting an unknown document succeeds.
    pub async fn delete_document(&self, document_id: &DocumentId, owner_id: &OwnerId) -> Result<()> {
        self.index.delete_document(document_id, owner_id).await?;
        info!(owner_id = %owner_id, document_id = %document_id, "Document deleted");
        Ok(())
    }
}
