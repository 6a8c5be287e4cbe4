//! Application state shared across route handlers.

use std::sync::Arc;
use std::time::Instant;

use docmind_agent::DocumentsAgent;
use docmind_vector::{IngestionPipeline, QueryPipeline};

/// Shared application state, cloned into every handler.
#[derive(Clone)]
pub struct AppState {
    pub ingestion: Arc<IngestionPipeline>,
    pub query: Arc<QueryPipeline>,
    /// `None` when the agent provider is disabled.
    pub agent: Option<Arc<DocumentsAgent>>,
    /// Bearer token required on protected routes.
    pub api_token: String,
    pub collection: String,
    pub max_body_bytes: usize,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(
        ingestion: Arc<IngestionPipeline>,
        query: Arc<QueryPipeline>,
        agent: Option<Arc<DocumentsAgent>>,
        api_token: impl Into<String>,
        collection: impl Into<String>,
    ) -> Self {
        Self {
            ingestion,
            query,
            agent,
            api_token: api_token.into(),
            collection: collection.into(),
            max_body_bytes: 10 * 1024 * 1024,
            start_time: Instant::now(),
        }
    }

    pub fn with_max_body_bytes(mut self, bytes: usize) -> Self {
        self.max_body_bytes = bytes;
        self
    }
}
