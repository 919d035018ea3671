//! Configuration for the retrieval engine

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};
use crate::providers::{FallbackConfig, ProviderConfig, VectorizerMode};

/// Main configuration, passed explicitly into every constructor
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RagConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Embedding configuration
    #[serde(default)]
    pub embeddings: EmbeddingConfig,
    /// Chunking configuration
    #[serde(default)]
    pub chunking: ChunkingConfig,
    /// Storage configuration
    #[serde(default)]
    pub storage: StorageConfig,
    /// Retrieval configuration
    #[serde(default)]
    pub retrieval: RetrievalConfig,
}

impl RagConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        toml::from_str(&raw).map_err(|e| {
            Error::Config(format!("Invalid config file {}: {}", path.display(), e))
        })
    }

    /// Load from an optional file, apply environment overrides and validate
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Override selected settings from the process environment
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Some(key) = env_value("OPENAI_API_KEY") {
            self.embeddings.api_key = Some(key.trim_matches('"').to_string());
        }
        if let Some(model) = env_value("EMBED_MODEL") {
            self.embeddings.model = model;
        }
        if let Some(base_url) = env_value("EMBEDDINGS_BASE_URL") {
            self.embeddings.base_url = base_url;
        }
        if let Some(dims) = env_value("EMBEDDINGS_DIM") {
            self.embeddings.dimensions = dims
                .parse()
                .map_err(|_| Error::Config(format!("EMBEDDINGS_DIM is not a number: {}", dims)))?;
        }
        if let Some(path) = env_value("RAG_DB_PATH") {
            self.storage.database_path = PathBuf::from(path);
        }
        if let Some(host) = env_value("RAG_HOST") {
            self.server.host = host;
        }
        if let Some(port) = env_value("RAG_PORT") {
            self.server.port = port
                .parse()
                .map_err(|_| Error::Config(format!("RAG_PORT is not a port: {}", port)))?;
        }
        Ok(())
    }

    /// Check every setting that would otherwise fail later at runtime
    pub fn validate(&self) -> Result<()> {
        self.chunking.document.validate("chunking.document")?;
        self.chunking.record.validate("chunking.record")?;
        if self.embeddings.dimensions == 0 {
            return Err(Error::Config("embeddings.dimensions must be > 0".to_string()));
        }
        if self.embeddings.batch_size == 0 {
            return Err(Error::Config("embeddings.batch_size must be > 0".to_string()));
        }
        Ok(())
    }

    /// Select the vectorizer mode: provider when an API key is configured
    pub fn vectorizer_mode(&self) -> VectorizerMode {
        match self.embeddings.api_key.as_deref().map(str::trim) {
            Some(key) if !key.is_empty() => VectorizerMode::Provider(ProviderConfig {
                api_key: key.to_string(),
                base_url: self.embeddings.base_url.clone(),
                model: self.embeddings.model.clone(),
                dimensions: self.embeddings.dimensions,
                batch_size: self.embeddings.batch_size,
                timeout: Duration::from_secs(self.embeddings.timeout_secs),
            }),
            _ => VectorizerMode::Fallback(FallbackConfig {
                dimensions: self.embeddings.dimensions,
            }),
        }
    }
}

fn env_value(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host address
    pub host: String,
    /// Port number
    pub port: u16,
    /// Enable CORS
    pub enable_cors: bool,
    /// Maximum request body size in bytes (default: 50MB)
    pub max_body_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            enable_cors: true,
            max_body_size: 50 * 1024 * 1024, // 50MB
        }
    }
}

/// Embedding configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Provider API key; absent means fallback vectors
    #[serde(default)]
    pub api_key: Option<String>,
    /// OpenAI-compatible base URL
    pub base_url: String,
    /// Provider model identifier
    pub model: String,
    /// Embedding dimensions, fixed for the lifetime of a store
    pub dimensions: usize,
    /// Texts per provider request
    pub batch_size: usize,
    /// Provider request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.openai.com/v1".to_string(),
            model: "text-embedding-3-small".to_string(),
            dimensions: 512,
            batch_size: 64,
            timeout_secs: 30,
        }
    }
}

/// A chunk window: size and overlap in characters
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChunkWindow {
    /// Maximum characters per chunk
    pub max_chars: usize,
    /// Characters repeated from the previous chunk
    pub overlap: usize,
}

impl ChunkWindow {
    pub const fn new(max_chars: usize, overlap: usize) -> Self {
        Self { max_chars, overlap }
    }

    /// `max_chars > overlap` must hold
    pub fn validate(&self, name: &str) -> Result<()> {
        if self.max_chars == 0 || self.max_chars <= self.overlap {
            return Err(Error::Config(format!(
                "{}: max_chars ({}) must be greater than overlap ({})",
                name, self.max_chars, self.overlap
            )));
        }
        Ok(())
    }
}

/// Text chunking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkingConfig {
    /// Window for free-text documents
    pub document: ChunkWindow,
    /// Window for record index texts
    pub record: ChunkWindow,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            document: ChunkWindow::new(1000, 150),
            record: ChunkWindow::new(500, 50),
        }
    }
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// SQLite database file
    pub database_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        // Use absolute path so the store does not move with the working directory
        let database_path = dirs::data_local_dir()
            .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from("/")))
            .join("secop-rag")
            .join("rag.sqlite3");

        Self { database_path }
    }
}

/// Retrieval configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Passages returned when a query does not specify top_k
    pub default_top_k: usize,
    /// Character budget when rendering context for answer generation
    pub max_context_chars: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            default_top_k: 5,
            max_context_chars: 4000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        let config = RagConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.chunking.record, ChunkWindow::new(500, 50));
    }

    #[test]
    fn test_bad_window_rejected() {
        let mut config = RagConfig::default();
        config.chunking.document = ChunkWindow::new(100, 100);
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_mode_selection() {
        let mut config = RagConfig::default();
        assert!(matches!(config.vectorizer_mode(), VectorizerMode::Fallback(_)));

        config.embeddings.api_key = Some("   ".to_string());
        assert!(matches!(config.vectorizer_mode(), VectorizerMode::Fallback(_)));

        config.embeddings.api_key = Some("sk-test".to_string());
        match config.vectorizer_mode() {
            VectorizerMode::Provider(p) => {
                assert_eq!(p.model, "text-embedding-3-small");
                assert_eq!(p.timeout, Duration::from_secs(30));
            }
            VectorizerMode::Fallback(_) => panic!("expected provider mode"),
        }
    }

    #[test]
    fn test_partial_toml() {
        let config: RagConfig = toml::from_str(
            r#"
            [chunking.document]
            max_chars = 800
            overlap = 100

            [chunking.record]
            max_chars = 400
            overlap = 40
            "#,
        )
        .unwrap();
        assert_eq!(config.chunking.document.max_chars, 800);
        assert_eq!(config.embeddings.dimensions, 512);
        assert_eq!(config.retrieval.default_top_k, 5);
    }
}
