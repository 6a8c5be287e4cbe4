//! Qdrant REST client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::{Response, StatusCode, Url};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use docmind_core::config::VectorStoreConfig;
use docmind_core::error::{DocmindError, Result};
use docmind_core::types::{HitPayload, Point, ScoredPoint};

use crate::store::{CollectionSpec, CreateOutcome, PayloadFilter, QueryRequest, VectorDatabase};

const SERVICE: &str = "qdrant";

/// Async client for the subset of the Qdrant HTTP API used by the pipeline.
#[derive(Clone)]
pub struct QdrantClient {
    http: reqwest::Client,
    base_url: Url,
    create_timeout_secs: u64,
}

impl QdrantClient {
    pub fn new(
        base_url: &str,
        api_key: Option<&str>,
        request_timeout: Duration,
        create_timeout_secs: u64,
    ) -> Result<Self> {
        let mut headers = HeaderMap::new();
        if let Some(key) = api_key {
            headers.insert(
                "api-key",
                HeaderValue::from_str(key.trim())
                    .map_err(|e| DocmindError::Config(format!("invalid Qdrant API key: {e}")))?,
            );
        }
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let http = reqwest::Client::builder()
            .timeout(request_timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| DocmindError::Config(format!("failed to build Qdrant HTTP client: {e}")))?;
        let base_url = Url::parse(base_url)
            .map_err(|e| DocmindError::Config(format!("invalid Qdrant URL {base_url}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(DocmindError::Config(format!(
                "Qdrant URL {base_url} cannot carry a path"
            )));
        }
        Ok(Self {
            http,
            base_url,
            create_timeout_secs,
        })
    }

    pub fn from_config(config: &VectorStoreConfig, api_key: Option<&str>) -> Result<Self> {
        Self::new(
            &config.url,
            api_key,
            Duration::from_secs(config.request_timeout_secs),
            config.create_timeout_secs,
        )
    }

    /// `<base>/collections/<name>/<tail..>`, each segment percent-encoded.
    fn collection_url(&self, name: &str, tail: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .push("collections")
                .push(name)
                .extend(tail);
        }
        url
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<Response> {
        request
            .send()
            .await
            .map_err(|e| DocmindError::upstream(SERVICE, e.to_string()))
    }
}

/// Standard Qdrant response envelope.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    result: T,
}

#[derive(Debug, Deserialize)]
struct ExistsResult {
    exists: bool,
}

#[derive(Debug, Deserialize)]
struct QueryResult {
    points: Vec<RawPoint>,
}

#[derive(Debug, Deserialize)]
struct RawPoint {
    /// Either a UUID string or an unsigned integer.
    id: Value,
    score: f32,
    #[serde(default)]
    payload: Option<HitPayload>,
}

impl RawPoint {
    fn into_scored(self) -> Result<ScoredPoint> {
        let id = match self.id {
            Value::String(s) => s,
            Value::Number(n) => n.to_string(),
            other => {
                return Err(DocmindError::upstream(
                    SERVICE,
                    format!("unexpected point id {other}"),
                ))
            }
        };
        let payload = self.payload.ok_or_else(|| {
            DocmindError::upstream(SERVICE, format!("point {id} returned without payload"))
        })?;
        Ok(ScoredPoint {
            id,
            score: self.score,
            payload,
        })
    }
}

/// Read the body of a failed response into an upstream error.
async fn failure(response: Response) -> DocmindError {
    let status = response.status();
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "<body unavailable>".to_string());
    DocmindError::upstream(SERVICE, format!("request failed ({status}): {body}"))
}

async fn parse<T: serde::de::DeserializeOwned>(response: Response) -> Result<T> {
    if !response.status().is_success() {
        return Err(failure(response).await);
    }
    let envelope: Envelope<T> = response
        .json()
        .await
        .map_err(|e| DocmindError::upstream(SERVICE, format!("malformed response: {e}")))?;
    Ok(envelope.result)
}

/// Body of a batched upsert: parallel arrays of ids, vectors and payloads.
pub(crate) fn upsert_body(points: &[Point]) -> Result<Value> {
    let ids: Vec<String> = points.iter().map(|p| p.id.to_string()).collect();
    let vectors: Vec<&[f32]> = points.iter().map(|p| p.vector.as_slice()).collect();
    let payloads = points
        .iter()
        .map(|p| serde_json::to_value(&p.payload))
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(json!({
        "batch": {
            "ids": ids,
            "vectors": vectors,
            "payloads": payloads,
        }
    }))
}

pub(crate) fn query_body(request: &QueryRequest) -> Value {
    json!({
        "query": request.vector,
        "filter": request.filter,
        "limit": request.limit,
        "with_payload": { "include": request.with_payload },
    })
}

/// Qdrant reports a duplicate create as 409, older releases as 400 with an
/// "already exists" message.
fn is_already_exists(status: StatusCode, body: &str) -> bool {
    status == StatusCode::CONFLICT || body.contains("already exists")
}

#[async_trait]
impl VectorDatabase for QdrantClient {
    async fn collection_exists(&self, name: &str) -> Result<bool> {
        let url = self.collection_url(name, &["exists"]);
        let response = self.send(self.http.get(url)).await?;
        let result: ExistsResult = parse(response).await?;
        Ok(result.exists)
    }

    async fn create_collection(&self, name: &str, spec: CollectionSpec) -> Result<CreateOutcome> {
        let mut url = self.collection_url(name, &[]);
        url.query_pairs_mut()
            .append_pair("timeout", &self.create_timeout_secs.to_string());
        let body = json!({ "vectors": spec });
        let response = self.send(self.http.put(url).json(&body)).await?;

        let status = response.status();
        if status.is_success() {
            return Ok(CreateOutcome::Created);
        }
        let text = response.text().await.unwrap_or_default();
        if is_already_exists(status, &text) {
            debug!(collection = name, "Collection already exists");
            return Ok(CreateOutcome::AlreadyExists);
        }
        Err(DocmindError::upstream(
            SERVICE,
            format!("create collection {name} failed ({status}): {text}"),
        ))
    }

    async fn upsert_points(&self, name: &str, points: Vec<Point>) -> Result<()> {
        let mut url = self.collection_url(name, &["points"]);
        url.query_pairs_mut().append_pair("wait", "true");
        let body = upsert_body(&points)?;
        let response = self.send(self.http.put(url).json(&body)).await?;
        let _: Value = parse(response).await?;
        Ok(())
    }

    async fn query_points(&self, name: &str, request: &QueryRequest) -> Result<Vec<ScoredPoint>> {
        let url = self.collection_url(name, &["points", "query"]);
        let response = self
            .send(self.http.post(url).json(&query_body(request)))
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(DocmindError::NotFound(format!("collection {name}")));
        }
        let result: QueryResult = parse(response).await?;
        result
            .points
            .into_iter()
            .map(RawPoint::into_scored)
            .collect()
    }

    async fn delete_points(&self, name: &str, filter: &PayloadFilter) -> Result<()> {
        let mut url = self.collection_url(name, &["points", "delete"]);
        url.query_pairs_mut().append_pair("wait", "true");
        let body = json!({ "filter": filter });
        let response = self.send(self.http.post(url).json(&body)).await?;
        if response.status() == StatusCode::NOT_FOUND {
            debug!(collection = name, "Delete on missing collection ignored");
            return Ok(());
        }
        let _: Value = parse(response).await?;
        Ok(())
    }
}
