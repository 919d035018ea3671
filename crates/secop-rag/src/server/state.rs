//! Application state for the RAG server

use std::sync::Arc;
use std::time::Instant;

use crate::config::RagConfig;
use crate::error::Result;
use crate::generation::{AnswerGenerator, ExtractiveAnswerer};
use crate::ingestion::Ingestor;
use crate::providers::Vectorizer;
use crate::retrieval::Retriever;
use crate::storage::VectorStore;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    /// Configuration
    config: RagConfig,
    /// Entry and passage storage
    store: VectorStore,
    /// Write path
    ingestor: Ingestor,
    /// Read path
    retriever: Retriever,
    /// Answer generator for query responses
    answerer: Arc<dyn AnswerGenerator>,
    /// Process start, for uptime reporting
    started_at: Instant,
}

impl AppState {
    /// Open the configured store and build the pipelines
    pub async fn new(config: RagConfig) -> Result<Self> {
        tracing::info!("Initializing RAG application state...");

        let vectorizer = Vectorizer::new(config.vectorizer_mode())?;
        let path = config.storage.database_path.clone();
        let dimensions = config.embeddings.dimensions;
        let store = tokio::task::spawn_blocking(move || VectorStore::open(path, dimensions))
            .await
            .map_err(|e| crate::error::Error::Internal(format!("Task join error: {}", e)))??;

        Self::from_parts(config, store, vectorizer)
    }

    /// Build state around an existing store and vectorizer
    pub fn from_parts(config: RagConfig, store: VectorStore, vectorizer: Vectorizer) -> Result<Self> {
        let ingestor = Ingestor::new(&config.chunking, vectorizer.clone(), store.clone())?;
        let retriever = Retriever::new(store.clone(), vectorizer.clone());
        let answerer: Arc<dyn AnswerGenerator> =
            Arc::new(ExtractiveAnswerer::from_config(&config.retrieval));

        tracing::info!(
            provider = vectorizer.provider_name(),
            answerer = answerer.name(),
            "Application state ready"
        );

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                store,
                ingestor,
                retriever,
                answerer,
                started_at: Instant::now(),
            }),
        })
    }

    /// Get configuration
    pub fn config(&self) -> &RagConfig {
        &self.inner.config
    }

    /// Get vector store
    pub fn store(&self) -> &VectorStore {
        &self.inner.store
    }

    pub fn ingestor(&self) -> &Ingestor {
        &self.inner.ingestor
    }

    pub fn retriever(&self) -> &Retriever {
        &self.inner.retriever
    }

    pub fn answerer(&self) -> &Arc<dyn AnswerGenerator> {
        &self.inner.answerer
    }

    pub fn uptime_secs(&self) -> u64 {
        self.inner.started_at.elapsed().as_secs()
    }
}
