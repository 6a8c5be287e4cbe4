//! Embedding generation against a remote provider.
//!
//! - `EmbeddingClient` performs one raw embeddings call.
//! - `OpenAiEmbeddingClient` talks to an OpenAI-compatible `/embeddings` endpoint.
//! - `MockEmbeddingClient` provides deterministic hash-based vectors for testing.
//! - `EmbeddingProvider` validates input and re-associates results by index.

use std::collections::hash_map::DefaultHasher;
use std::future::Future;
use std::hash::{Hash, Hasher};
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use docmind_core::config::EmbeddingConfig;
use docmind_core::error::{DocmindError, Result};
use docmind_core::types::{Embedding, EmbeddingResult};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use tracing::debug;

const SERVICE: &str = "embedding provider";

/// Body of an embeddings call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmbeddingRequest {
    pub model: String,
    pub input: EmbeddingInput,
    pub encoding_format: String,
}

/// A single string or a batch of strings.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum EmbeddingInput {
    Single(String),
    Batch(Vec<String>),
}

impl EmbeddingInput {
    pub fn len(&self) -> usize {
        match self {
            EmbeddingInput::Single(_) => 1,
            EmbeddingInput::Batch(texts) => texts.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn texts(&self) -> Vec<&str> {
        match self {
            EmbeddingInput::Single(text) => vec![text.as_str()],
            EmbeddingInput::Batch(texts) => texts.iter().map(String::as_str).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingResponse {
    pub data: Vec<EmbeddingData>,
}

/// One vector of a response. `index` refers to the position of the source
/// text in the request, which is not necessarily the position in `data`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingData {
    pub index: usize,
    pub embedding: Vec<f32>,
}

/// A client able to perform one raw embeddings call.
pub trait EmbeddingClient: Send + Sync {
    fn create_embeddings(
        &self,
        request: EmbeddingRequest,
    ) -> impl Future<Output = Result<EmbeddingResponse>> + Send;
}

/// Object-safe version of [`EmbeddingClient`] for dynamic dispatch.
///
/// A blanket implementation is provided so that every `EmbeddingClient`
/// automatically implements `DynEmbeddingClient`.
pub trait DynEmbeddingClient: Send + Sync {
    fn create_embeddings_boxed<'a>(
        &'a self,
        request: EmbeddingRequest,
    ) -> Pin<Box<dyn Future<Output = Result<EmbeddingResponse>> + Send + 'a>>;
}

impl<T: EmbeddingClient> DynEmbeddingClient for T {
    fn create_embeddings_boxed<'a>(
        &'a self,
        request: EmbeddingRequest,
    ) -> Pin<Box<dyn Future<Output = Result<EmbeddingResponse>> + Send + 'a>> {
        Box::pin(self.create_embeddings(request))
    }
}

// ---------------------------------------------------------------------------
// OpenAiEmbeddingClient
// ---------------------------------------------------------------------------

/// Embeddings client for OpenAI-compatible endpoints.
#[derive(Clone)]
pub struct OpenAiEmbeddingClient {
    http: reqwest::Client,
    endpoint: String,
}

impl OpenAiEmbeddingClient {
    pub fn new(base_url: &str, api_key: Option<&str>, timeout: Duration) -> Result<Self> {
        let mut headers = HeaderMap::new();
        if let Some(key) = api_key {
            let auth = format!("Bearer {}", key.trim());
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&auth)
                    .map_err(|e| DocmindError::Config(format!("invalid embedding API key: {e}")))?,
            );
        }
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| DocmindError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            http,
            endpoint: format!("{}/embeddings", base_url.trim_end_matches('/')),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl EmbeddingClient for OpenAiEmbeddingClient {
    async fn create_embeddings(&self, request: EmbeddingRequest) -> Result<EmbeddingResponse> {
        let response = self
            .http
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| DocmindError::upstream(SERVICE, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<body unavailable>".to_string());
            return Err(DocmindError::upstream(
                SERVICE,
                format!("request failed ({status}): {body}"),
            ));
        }

        response
            .json::<EmbeddingResponse>()
            .await
            .map_err(|e| DocmindError::upstream(SERVICE, format!("malformed response: {e}")))
    }
}

// ---------------------------------------------------------------------------
// MockEmbeddingClient - deterministic hash-based vectors for testing
// ---------------------------------------------------------------------------

/// Embeddings client that derives vectors from a hash of the input text.
///
/// Identical inputs always produce identical unit vectors. Every call is
/// counted, and responses can be returned in reverse order to exercise
/// index-based re-association.
#[derive(Debug)]
pub struct MockEmbeddingClient {
    dimensions: usize,
    reverse_order: bool,
    calls: AtomicUsize,
}

impl MockEmbeddingClient {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions,
            reverse_order: false,
            calls: AtomicUsize::new(0),
        }
    }

    /// Return response entries in reverse order of their `index`.
    pub fn reversed(mut self) -> Self {
        self.reverse_order = true;
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// The vector this client returns for `text`.
    pub fn vector_for(&self, text: &str) -> Vec<f32> {
        hash_to_vector(text, self.dimensions)
    }
}

fn hash_to_vector(text: &str, dimensions: usize) -> Vec<f32> {
    let mut result = Vec::with_capacity(dimensions);
    for i in 0..dimensions {
        let mut hasher = DefaultHasher::new();
        text.hash(&mut hasher);
        i.hash(&mut hasher);
        let h = hasher.finish();
        let val = ((h as f64) / (u64::MAX as f64)) * 2.0 - 1.0;
        result.push(val as f32);
    }

    let norm: f32 = result.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        for val in &mut result {
            *val /= norm;
        }
    }
    result
}

impl EmbeddingClient for MockEmbeddingClient {
    async fn create_embeddings(&self, request: EmbeddingRequest) -> Result<EmbeddingResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut data: Vec<EmbeddingData> = request
            .input
            .texts()
            .into_iter()
            .enumerate()
            .map(|(index, text)| EmbeddingData {
                index,
                embedding: hash_to_vector(text, self.dimensions),
            })
            .collect();
        if self.reverse_order {
            data.reverse();
        }
        Ok(EmbeddingResponse { data })
    }
}

// ---------------------------------------------------------------------------
// EmbeddingProvider
// ---------------------------------------------------------------------------

/// Converts text into vectors of a fixed, model-defined dimensionality.
///
/// Input is validated before any upstream call. Batched results are matched
/// to their source text through the `index` the upstream reports.
#[derive(Clone)]
pub struct EmbeddingProvider {
    client: Arc<dyn DynEmbeddingClient>,
    model: String,
    dimensions: usize,
}

impl EmbeddingProvider {
    pub const ENCODING_FORMAT: &'static str = "float";
    /// Most inputs the embeddings endpoint accepts in one request.
    pub const MAX_BATCH_INPUTS: usize = 2048;

    pub fn new(
        client: Arc<dyn DynEmbeddingClient>,
        model: impl Into<String>,
        dimensions: usize,
    ) -> Self {
        Self {
            client,
            model: model.into(),
            dimensions,
        }
    }

    pub fn from_config(client: Arc<dyn DynEmbeddingClient>, config: &EmbeddingConfig) -> Self {
        Self::new(client, config.model.clone(), config.dimensions)
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Embed a single piece of text with exactly one upstream call.
    pub async fn embed_one(&self, text: &str) -> Result<Embedding> {
        if text.is_empty() {
            return Err(DocmindError::invalid("text for embedding cannot be empty"));
        }

        let response = self.call(EmbeddingInput::Single(text.to_string())).await?;
        let data = response
            .data
            .into_iter()
            .next()
            .ok_or_else(|| DocmindError::upstream(SERVICE, "response contained no embeddings"))?;
        self.check_dimensions(&data.embedding)?;

        Ok(Embedding {
            vector_length: data.embedding.len(),
            vector: data.embedding,
        })
    }

    /// Embed a batch of texts with exactly one upstream call.
    ///
    /// Results are sorted by source index and carry their source text.
    pub async fn embed_batch(&self, texts: &[String]) -> Result<Vec<EmbeddingResult>> {
        if texts.is_empty() {
            return Err(DocmindError::invalid("texts for embedding cannot be empty"));
        }
        if texts.len() > Self::MAX_BATCH_INPUTS {
            return Err(DocmindError::invalid(format!(
                "batch of {} texts exceeds the limit of {}",
                texts.len(),
                Self::MAX_BATCH_INPUTS
            )));
        }
        if let Some(i) = texts.iter().position(|t| t.is_empty()) {
            return Err(DocmindError::invalid(format!(
                "text part at index {i} is empty and cannot be embedded"
            )));
        }

        let response = self.call(EmbeddingInput::Batch(texts.to_vec())).await?;
        if response.data.len() != texts.len() {
            return Err(DocmindError::upstream(
                SERVICE,
                format!(
                    "expected {} embeddings, received {}",
                    texts.len(),
                    response.data.len()
                ),
            ));
        }

        let mut slots: Vec<Option<Vec<f32>>> = vec![None; texts.len()];
        for data in response.data {
            let slot = slots.get_mut(data.index).ok_or_else(|| {
                DocmindError::upstream(
                    SERVICE,
                    format!("embedding index {} is out of range", data.index),
                )
            })?;
            if slot.is_some() {
                return Err(DocmindError::upstream(
                    SERVICE,
                    format!("embedding index {} returned twice", data.index),
                ));
            }
            self.check_dimensions(&data.embedding)?;
            *slot = Some(data.embedding);
        }

        // Lengths match and no index repeats, so every slot is filled.
        slots
            .into_iter()
            .zip(texts)
            .enumerate()
            .map(|(index, (vector, text))| -> Result<EmbeddingResult> {
                let vector = vector.ok_or_else(|| {
                    DocmindError::upstream(SERVICE, format!("missing embedding for index {index}"))
                })?;
                Ok(EmbeddingResult {
                    index,
                    vector_length: vector.len(),
                    vector,
                    original_text: text.clone(),
                })
            })
            .collect()
    }

    async fn call(&self, input: EmbeddingInput) -> Result<EmbeddingResponse> {
        debug!(model = %self.model, inputs = input.len(), "Requesting embeddings");
        let request = EmbeddingRequest {
            model: self.model.clone(),
            input,
            encoding_format: Self::ENCODING_FORMAT.to_string(),
        };
        self.client.create_embeddings_boxed(request).await
    }

    fn check_dimensions(&self, vector: &[f32]) -> Result<()> {
        if vector.len() != self.dimensions {
            return Err(DocmindError::upstream(
                SERVICE,
                format!(
                    "expected {}-dimensional vector, received {}",
                    self.dimensions,
                    vector.len()
                ),
            ));
        }
        Ok(())
    }
}
