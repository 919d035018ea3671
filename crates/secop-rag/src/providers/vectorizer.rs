//! Vectorizer: one embedding mode chosen at construction

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::error::{Error, Result};

use super::embedding::EmbeddingProvider;
use super::hashed::HashEmbedder;
use super::openai::OpenAiEmbedder;

/// Settings for the external embedding provider
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub dimensions: usize,
    pub batch_size: usize,
    pub timeout: Duration,
}

/// Settings for the hash-seeded fallback
#[derive(Debug, Clone)]
pub struct FallbackConfig {
    pub dimensions: usize,
}

/// How vectors are produced; never mixed within one deployment
#[derive(Debug, Clone)]
pub enum VectorizerMode {
    Provider(ProviderConfig),
    Fallback(FallbackConfig),
}

/// Turns texts into fixed-length vectors
#[derive(Clone)]
pub struct Vectorizer {
    provider: Arc<dyn EmbeddingProvider>,
}

impl Vectorizer {
    pub fn new(mode: VectorizerMode) -> Result<Self> {
        let provider: Arc<dyn EmbeddingProvider> = match mode {
            VectorizerMode::Provider(config) => {
                if config.dimensions == 0 {
                    return Err(Error::config("embedding dimensions must be > 0"));
                }
                info!(model = %config.model, dims = config.dimensions, "Using embedding provider");
                Arc::new(OpenAiEmbedder::new(&config)?)
            }
            VectorizerMode::Fallback(config) => {
                if config.dimensions == 0 {
                    return Err(Error::config("embedding dimensions must be > 0"));
                }
                info!(dims = config.dimensions, "No API key configured, using hash-seeded fallback vectors");
                Arc::new(HashEmbedder::new(config.dimensions))
            }
        };
        Ok(Self { provider })
    }

    /// Wrap an existing provider
    pub fn from_provider(provider: Arc<dyn EmbeddingProvider>) -> Self {
        Self { provider }
    }

    /// One vector per text, in order; empty input never reaches the provider
    pub async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let vectors = self.provider.embed_batch(texts).await?;
        if vectors.len() != texts.len() {
            return Err(Error::provider(format!(
                "{} returned {} vectors for {} texts",
                self.provider.name(),
                vectors.len(),
                texts.len()
            )));
        }
        Ok(vectors)
    }

    /// Vector for a single query text
    pub async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        self.provider.embed(text).await
    }

    pub fn dimensions(&self) -> usize {
        self.provider.dimensions()
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    pub async fn health_check(&self) -> Result<bool> {
        self.provider.health_check().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingProvider {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl EmbeddingProvider for CountingProvider {
        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(texts.iter().map(|_| vec![1.0, 0.0]).collect())
        }

        fn dimensions(&self) -> usize {
            2
        }

        async fn health_check(&self) -> Result<bool> {
            Ok(true)
        }

        fn name(&self) -> &str {
            "counting"
        }
    }

    #[tokio::test]
    async fn test_fallback_mode() {
        let v = Vectorizer::new(VectorizerMode::Fallback(FallbackConfig { dimensions: 32 })).unwrap();
        assert_eq!(v.dimensions(), 32);
        assert_eq!(v.provider_name(), "hash-fallback");

        let texts = vec!["a".to_string(), "b".to_string()];
        let first = v.embed(&texts).await.unwrap();
        let second = v.embed(&texts).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first[0], v.embed_query("a").await.unwrap());
    }

    #[test]
    fn test_zero_dimensions_rejected() {
        let result = Vectorizer::new(VectorizerMode::Fallback(FallbackConfig { dimensions: 0 }));
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[tokio::test]
    async fn test_empty_input_skips_provider() {
        let provider = Arc::new(CountingProvider {
            calls: AtomicUsize::new(0),
        });
        let v = Vectorizer::from_provider(provider.clone());
        assert!(v.embed(&[]).await.unwrap().is_empty());
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);

        v.embed(&["x".to_string()]).await.unwrap();
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }
}
