mod cli;

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;

use docmind_agent::{ChatModel, DocumentsAgent, OpenAiChatModel};
use docmind_api::auth::load_or_generate_token;
use docmind_api::{start_server, AppState};
use docmind_core::config::{resolve_api_key, DocmindConfig};
use docmind_core::error::DocmindError;
use docmind_vector::{
    DocumentChunker, DynEmbeddingClient, EmbeddingProvider, InMemoryVectorDatabase,
    IngestionPipeline, MockEmbeddingClient, OpenAiEmbeddingClient, QdrantClient, QueryPipeline,
    VectorDatabase, VectorIndex,
};

use cli::{expand_home, CliArgs};

fn build_embedding_client(config: &DocmindConfig) -> Result<Arc<dyn DynEmbeddingClient>, DocmindError> {
    let embedding = &config.embedding;
    match embedding.provider.as_str() {
        "openai" => {
            let key = resolve_api_key(&embedding.api_key_env);
            if key.is_none() {
                tracing::warn!(env = %embedding.api_key_env, "Embedding API key is not set");
            }
            let client = OpenAiEmbeddingClient::new(
                &embedding.base_url,
                key.as_deref(),
                Duration::from_secs(embedding.request_timeout_secs),
            )?;
            Ok(Arc::new(client))
        }
        "mock" => Ok(Arc::new(MockEmbeddingClient::new(embedding.dimensions))),
        other => Err(DocmindError::Config(format!(
            "unknown embedding provider: {other}"
        ))),
    }
}

fn build_vector_database(config: &DocmindConfig) -> Result<Arc<dyn VectorDatabase>, DocmindError> {
    let store = &config.vector_store;
    match store.backend.as_str() {
        "qdrant" => {
            let key = resolve_api_key(&store.api_key_env);
            Ok(Arc::new(QdrantClient::from_config(store, key.as_deref())?))
        }
        "memory" => Ok(Arc::new(InMemoryVectorDatabase::new())),
        other => Err(DocmindError::Config(format!(
            "unknown vector store backend: {other}"
        ))),
    }
}

fn build_agent(
    config: &DocmindConfig,
    query: Arc<QueryPipeline>,
) -> Result<Option<Arc<DocumentsAgent>>, DocmindError> {
    let agent = &config.agent;
    match agent.provider.as_str() {
        "openai" => {
            let key = resolve_api_key(&agent.api_key_env);
            if key.is_none() {
                tracing::warn!(env = %agent.api_key_env, "Agent API key is not set");
            }
            let model: Arc<dyn ChatModel> = Arc::new(OpenAiChatModel::new(
                &agent.base_url,
                key.as_deref(),
                Duration::from_secs(agent.request_timeout_secs),
            )?);
            Ok(Some(Arc::new(DocumentsAgent::with_default_tools(
                model, query, agent,
            ))))
        }
        "disabled" => Ok(None),
        other => Err(DocmindError::Config(format!("unknown agent provider: {other}"))),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    let config_file = args.resolve_config_path();
    let mut config = DocmindConfig::load_or_default(&config_file);
    config.apply_env_overrides();

    let log_level = args.resolve_log_level(&config.general.log_level);
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level)),
        )
        .init();

    tracing::info!("Starting docmind v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(path = %config_file.display(), "Configuration loaded");
    config.validate()?;

    // Pipelines.
    let embedder = EmbeddingProvider::from_config(build_embedding_client(&config)?, &config.embedding);
    let database = build_vector_database(&config)?;
    let index = Arc::new(VectorIndex::new(
        database,
        embedder,
        config.vector_store.collection.clone(),
    ));
    index.ensure_collection().await?;
    tracing::info!(
        backend = %config.vector_store.backend,
        collection = %config.vector_store.collection,
        dimensions = config.embedding.dimensions,
        "Vector collection ready"
    );

    let chunker = DocumentChunker::from_config(&config.chunking)?;
    let ingestion = Arc::new(IngestionPipeline::new(chunker, index.clone()));
    let query = Arc::new(QueryPipeline::new(index, config.search.top_k));
    let agent = build_agent(&config, query.clone())?;
    if agent.is_none() {
        tracing::info!("Documents agent disabled");
    }

    // API.
    let token = load_or_generate_token(&expand_home(&config.api.token_path));
    let state = AppState::new(
        ingestion,
        query,
        agent,
        token,
        config.vector_store.collection.clone(),
    )
    .with_max_body_bytes(config.api.max_body_bytes);

    let port = args.resolve_port(config.api.port);
    let addr = format!("{}:{}", config.api.host, port);
    start_server(&addr, state).await?;
    Ok(())
}
