//! docmind vector crate - chunking, embeddings, vector storage and the
//! ingestion and query pipelines.
//!
//! Provides a remote embedding provider with a deterministic mock client,
//! a vector database abstraction with Qdrant and in-memory backends, an
//! owner-scoped vector index, and the pipelines built on top of it.

pub mod chunker;
pub mod embedding;
pub mod index;
pub mod memory;
pub mod pipeline;
pub mod qdrant;
pub mod search;
pub mod store;

pub use chunker::DocumentChunker;
pub use embedding::{
    DynEmbeddingClient, EmbeddingClient, EmbeddingProvider, MockEmbeddingClient,
    OpenAiEmbeddingClient,
};
pub use index::VectorIndex;
pub use memory::InMemoryVectorDatabase;
pub use pipeline::{IngestReport, IngestionPipeline};
pub use qdrant::QdrantClient;
pub use search::QueryPipeline;
pub use store::{CollectionSpec, CreateOutcome, PayloadFilter, QueryRequest, VectorDatabase};
