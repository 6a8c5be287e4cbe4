use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{DocmindError, Result};

/// Instructions given to the documents agent when none are configured.
pub const DEFAULT_AGENT_INSTRUCTIONS: &str = "You are a helpful documents assistant. \
Use the documents_search tool to find passages from the user's documents that are \
relevant to the question before answering. Use documents_summary to condense long \
passages and mindmap_generator when the user asks for a mind map or an outline. \
Answer only from the retrieved content and say so when nothing relevant was found.";

/// Top-level configuration for docmind.
///
/// Loaded from `~/.docmind/config.toml` by default. Each section corresponds
/// to one external service or pipeline stage.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocmindConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub vector_store: VectorStoreConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub agent: AgentConfig,
    #[serde(default)]
    pub api: ApiConfig,
}

impl DocmindConfig {
    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: DocmindConfig = toml::from_str(&content)?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the
    /// file does not exist or cannot be parsed.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Save the current configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }

    /// Apply the deployment environment variables understood by the vector
    /// store: `QDRANT_HOST`, `QDRANT_PORT` and `QDRANT_COLLECTION`.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = lookup("QDRANT_HOST").filter(|v| !v.is_empty());
        let port = lookup("QDRANT_PORT").filter(|v| !v.is_empty());
        if host.is_some() || port.is_some() {
            let host = host.unwrap_or_else(|| "localhost".to_string());
            let port = port.unwrap_or_else(|| "6333".to_string());
            self.vector_store.url = format!("http://{host}:{port}");
        }
        if let Some(collection) = lookup("QDRANT_COLLECTION").filter(|v| !v.is_empty()) {
            self.vector_store.collection = collection;
        }
    }

    /// Reject settings that would make the pipeline misbehave at runtime.
    pub fn validate(&self) -> Result<()> {
        if self.embedding.dimensions == 0 {
            return Err(DocmindError::Config(
                "embedding.dimensions must be greater than zero".into(),
            ));
        }
        if self.chunking.chunk_size == 0 {
            return Err(DocmindError::Config(
                "chunking.chunk_size must be greater than zero".into(),
            ));
        }
        if self.chunking.overlap >= self.chunking.chunk_size {
            return Err(DocmindError::Config(format!(
                "chunking.overlap ({}) must be smaller than chunking.chunk_size ({})",
                self.chunking.overlap, self.chunking.chunk_size
            )));
        }
        if self.search.top_k == 0 {
            return Err(DocmindError::Config(
                "search.top_k must be greater than zero".into(),
            ));
        }
        if self.vector_store.collection.trim().is_empty() {
            return Err(DocmindError::Config(
                "vector_store.collection cannot be empty".into(),
            ));
        }
        if self
            .vector_store
            .collection
            .contains(|c: char| matches!(c, '/' | '?' | '#') || c.is_control())
        {
            return Err(DocmindError::Config(format!(
                "vector_store.collection {:?} contains characters not allowed in a collection name",
                self.vector_store.collection
            )));
        }
        if self.agent.max_tool_rounds == 0 {
            return Err(DocmindError::Config(
                "agent.max_tool_rounds must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

/// Reads an API key from the environment variable named in the config.
///
/// An unset or empty variable resolves to `None`.
pub fn resolve_api_key(env_var: &str) -> Option<String> {
    if env_var.is_empty() {
        return None;
    }
    std::env::var(env_var).ok().filter(|v| !v.is_empty())
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

/// Embedding provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// "openai" or "mock" (deterministic offline vectors).
    pub provider: String,
    pub base_url: String,
    /// Name of the environment variable holding the API key.
    pub api_key_env: String,
    pub model: String,
    /// Output dimensionality of `model`.
    pub dimensions: usize,
    pub request_timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            model: "text-embedding-3-small".to_string(),
            dimensions: 1536,
            request_timeout_secs: 30,
        }
    }
}

/// Vector database settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorStoreConfig {
    /// "qdrant" or "memory".
    pub backend: String,
    pub url: String,
    /// Name of the environment variable holding the Qdrant API key, if any.
    pub api_key_env: String,
    pub collection: String,
    /// Server-side timeout passed when creating the collection.
    pub create_timeout_secs: u64,
    pub request_timeout_secs: u64,
}

impl Default for VectorStoreConfig {
    fn default() -> Self {
        Self {
            backend: "qdrant".to_string(),
            url: "http://localhost:6333".to_string(),
            api_key_env: "QDRANT_API_KEY".to_string(),
            collection: "documents".to_string(),
            create_timeout_secs: 20,
            request_timeout_secs: 30,
        }
    }
}

/// Text splitting settings, in cl100k_base tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    pub chunk_size: usize,
    pub overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 800,
            overlap: 80,
        }
    }
}

/// Direct search settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Number of hits returned by a direct search.
    pub top_k: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self { top_k: 1 }
    }
}

/// Documents agent settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// "openai" or "disabled".
    pub provider: String,
    pub base_url: String,
    pub api_key_env: String,
    /// Model driving the tool-calling conversation.
    pub model: String,
    /// Model used inside the summary and mind-map tools.
    pub tool_model: String,
    pub instructions: String,
    pub max_tool_rounds: usize,
    pub mindmap_max_depth: usize,
    pub mindmap_max_nodes: usize,
    pub request_timeout_secs: u64,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            model: "o4-mini".to_string(),
            tool_model: "gpt-4o-mini".to_string(),
            instructions: DEFAULT_AGENT_INSTRUCTIONS.to_string(),
            max_tool_rounds: 5,
            mindmap_max_depth: 6,
            mindmap_max_nodes: 200,
            request_timeout_secs: 120,
        }
    }
}

/// HTTP surface settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
    /// File holding the bearer token; generated on first start.
    pub token_path: String,
    /// Maximum accepted request body, in bytes.
    pub max_body_bytes: usize,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3030,
            token_path: "~/.docmind/api.token".to_string(),
            max_body_bytes: 10 * 1024 * 1024,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_default_config() {
        let config = DocmindConfig::default();
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.embedding.model, "text-embedding-3-small");
        assert_eq!(config.embedding.dimensions, 1536);
        assert_eq!(config.chunking.chunk_size, 800);
        assert_eq!(config.chunking.overlap, 80);
        assert_eq!(config.search.top_k, 1);
        assert_eq!(config.agent.model, "o4-mini");
        assert_eq!(config.agent.tool_model, "gpt-4o-mini");
        assert_eq!(config.vector_store.create_timeout_secs, 20);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_partial_config_uses_defaults() {
        let content = r#"
[vector_store]
backend = "memory"
collection = "notes"

[chunking]
chunk_size = 200
overlap = 20
"#;
        let file = create_temp_config(content);
        let config = DocmindConfig::load(file.path()).unwrap();
        assert_eq!(config.vector_store.backend, "memory");
        assert_eq!(config.vector_store.collection, "notes");
        assert_eq!(config.chunking.chunk_size, 200);
        // Remaining fields use defaults
        assert_eq!(config.vector_store.url, "http://localhost:6333");
        assert_eq!(config.embedding.dimensions, 1536);
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let config = DocmindConfig::load_or_default(Path::new("/nonexistent/config.toml"));
        assert_eq!(config.vector_store.collection, "documents");
    }

    #[test]
    fn test_load_invalid_toml_is_config_error() {
        let file = create_temp_config("[chunking\nchunk_size = ");
        let err = DocmindConfig::load(file.path()).unwrap_err();
        assert!(matches!(err, DocmindError::Config(_)));
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut config = DocmindConfig::default();
        config.search.top_k = 5;
        config.agent.max_tool_rounds = 3;
        config.save(&path).unwrap();

        let reloaded = DocmindConfig::load(&path).unwrap();
        assert_eq!(reloaded.search.top_k, 5);
        assert_eq!(reloaded.agent.max_tool_rounds, 3);
    }

    #[test]
    fn test_validate_rejects_overlap_not_smaller_than_size() {
        let mut config = DocmindConfig::default();
        config.chunking.overlap = 800;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("overlap"));
    }

    #[test]
    fn test_validate_rejects_zero_values() {
        let mut config = DocmindConfig::default();
        config.embedding.dimensions = 0;
        assert!(config.validate().is_err());

        let mut config = DocmindConfig::default();
        config.search.top_k = 0;
        assert!(config.validate().is_err());

        let mut config = DocmindConfig::default();
        config.vector_store.collection = " ".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_path_characters_in_collection() {
        for name in ["a/b", "docs?wait=true", "docs#x"] {
            let mut config = DocmindConfig::default();
            config.vector_store.collection = name.into();
            assert!(
                matches!(config.validate(), Err(DocmindError::Config(_))),
                "{name} should be rejected"
            );
        }

        let mut config = DocmindConfig::default();
        config.vector_store.collection = "docs_v2-en".into();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_overrides_rebuild_qdrant_url() {
        let vars: HashMap<&str, &str> = [
            ("QDRANT_HOST", "qdrant.internal"),
            ("QDRANT_COLLECTION", "docs_v2"),
        ]
        .into_iter()
        .collect();
        let mut config = DocmindConfig::default();
        config.apply_overrides(|key| vars.get(key).map(|v| v.to_string()));
        assert_eq!(config.vector_store.url, "http://qdrant.internal:6333");
        assert_eq!(config.vector_store.collection, "docs_v2");
    }

    #[test]
    fn test_env_overrides_absent_keep_config() {
        let mut config = DocmindConfig::default();
        config.vector_store.url = "http://custom:1234".into();
        config.apply_overrides(|_| None);
        assert_eq!(config.vector_store.url, "http://custom:1234");
    }

    #[test]
    fn test_resolve_api_key_empty_name() {
        assert_eq!(resolve_api_key(""), None);
    }
}
