//! OpenAI-compatible embedding provider
//!
//! Talks to any endpoint exposing `POST {base_url}/embeddings`.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};

use super::embedding::EmbeddingProvider;
use super::vectorizer::ProviderConfig;

/// Embedding provider backed by an OpenAI-compatible HTTP API
pub struct OpenAiEmbedder {
    client: Client,
    endpoint: String,
    model: String,
    dimensions: usize,
    batch_size: usize,
}

impl OpenAiEmbedder {
    /// Create a new embedder; the timeout applies to each batch request
    pub fn new(config: &ProviderConfig) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            return Err(Error::config("missing embedding provider API key"));
        }
        if config.model.trim().is_empty() {
            return Err(Error::config("missing embedding model name"));
        }

        let mut headers = HeaderMap::new();
        let auth = format!("Bearer {}", config.api_key.trim());
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&auth)
                .map_err(|_| Error::config("API key is not a valid header value"))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .timeout(config.timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| Error::config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: format!("{}/embeddings", config.base_url.trim_end_matches('/')),
            model: config.model.clone(),
            dimensions: config.dimensions,
            batch_size: config.batch_size.max(1),
        })
    }

    /// Maximum texts per request
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    async fn request(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>> {
        let request = EmbeddingRequest {
            model: &self.model,
            input: inputs,
            dimensions: self.dimensions,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    Error::provider(format!("embedding request timed out: {}", e))
                } else {
                    Error::provider(format!("embedding request failed: {}", e))
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::provider(format!(
                "embedding request failed ({}): {}",
                status, body
            )));
        }

        let mut parsed: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| Error::provider(format!("failed to parse embedding response: {}", e)))?;

        parsed.data.sort_by_key(|entry| entry.index);
        if parsed.data.len() != inputs.len() {
            return Err(Error::provider(format!(
                "provider returned {} embeddings for {} inputs",
                parsed.data.len(),
                inputs.len()
            )));
        }

        parsed
            .data
            .into_iter()
            .map(|entry| {
                if entry.embedding.len() == self.dimensions {
                    Ok(entry.embedding)
                } else {
                    Err(Error::provider(format!(
                        "provider returned a {}-dimensional vector, expected {}",
                        entry.embedding.len(),
                        self.dimensions
                    )))
                }
            })
            .collect()
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
    /// Requested output size; text-embedding-3 models shorten to it
    dimensions: usize,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    index: usize,
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let mut all_embeddings = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size) {
            debug!(batch = batch.len(), model = %self.model, "Requesting embeddings");
            all_embeddings.extend(self.request(batch).await?);
        }
        Ok(all_embeddings)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(self.embed("ping").await.is_ok())
    }

    fn name(&self) -> &str {
        "openai"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::sync::oneshot;

    /// Serve one embeddings request, answering with `dims`-sized vectors
    /// and handing back the request body
    async fn mock_endpoint(dims: usize) -> (String, oneshot::Receiver<Value>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = oneshot::channel();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = Vec::new();
            let mut chunk = [0u8; 4096];
            let body = loop {
                let n = socket.read(&mut chunk).await.unwrap();
                assert!(n > 0, "connection closed before the body arrived");
                buf.extend_from_slice(&chunk[..n]);

                let raw = String::from_utf8_lossy(&buf).to_string();
                let Some(split) = raw.find("\r\n\r\n") else { continue };
                let length = raw[..split]
                    .lines()
                    .find_map(|l| {
                        let (name, value) = l.split_once(':')?;
                        name.eq_ignore_ascii_case("content-length")
                            .then(|| value.trim().parse::<usize>().ok())
                            .flatten()
                    })
                    .unwrap_or(0);
                if buf.len() >= split + 4 + length {
                    break buf[split + 4..split + 4 + length].to_vec();
                }
            };

            let request: Value = serde_json::from_slice(&body).unwrap();
            let inputs = request["input"].as_array().map(|a| a.len()).unwrap_or(0);
            let data: Vec<Value> = (0..inputs)
                .rev()
                .map(|i| json!({"index": i, "embedding": vec![0.5f32; dims]}))
                .collect();
            let payload = json!({ "data": data }).to_string();
            let response = format!(
                "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                payload.len(),
                payload
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
            let _ = tx.send(request);
        });

        (format!("http://{}/v1", addr), rx)
    }

    fn config(base_url: &str) -> ProviderConfig {
        ProviderConfig {
            api_key: "sk-test".to_string(),
            base_url: base_url.to_string(),
            model: "text-embedding-3-small".to_string(),
            dimensions: 8,
            batch_size: 2,
            timeout: Duration::from_millis(300),
        }
    }

    #[test]
    fn test_rejects_blank_key() {
        let mut cfg = config("http://localhost");
        cfg.api_key = "  ".to_string();
        assert!(matches!(OpenAiEmbedder::new(&cfg), Err(Error::Config(_))));
    }

    #[test]
    fn test_endpoint_trailing_slash() {
        let embedder = OpenAiEmbedder::new(&config("http://localhost:9/v1/")).unwrap();
        assert_eq!(embedder.endpoint, "http://localhost:9/v1/embeddings");
        assert_eq!(embedder.batch_size(), 2);
    }

    #[tokio::test]
    async fn test_empty_batch_skips_network() {
        let embedder = OpenAiEmbedder::new(&config("http://10.255.255.1")).unwrap();
        let out = embedder.embed_batch(&[]).await.unwrap();
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn test_unreachable_provider_is_provider_error() {
        // Port 9 (discard) on localhost is closed in test environments
        let embedder = OpenAiEmbedder::new(&config("http://127.0.0.1:9/v1")).unwrap();
        let err = embedder
            .embed_batch(&["hola".to_string()])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Provider(_)));
    }

    #[tokio::test]
    async fn test_request_carries_configured_dimensions() {
        let (base_url, body) = mock_endpoint(512).await;
        let mut config = crate::config::RagConfig::default();
        config.embeddings.api_key = Some("sk-test".to_string());
        config.embeddings.base_url = base_url;
        let provider = match config.vectorizer_mode() {
            crate::providers::VectorizerMode::Provider(p) => p,
            crate::providers::VectorizerMode::Fallback(_) => panic!("expected provider mode"),
        };

        let embedder = OpenAiEmbedder::new(&provider).unwrap();
        let vectors = embedder.embed_batch(&["hola".to_string()]).await.unwrap();
        assert_eq!(vectors.len(), 1);
        assert_eq!(vectors[0].len(), 512);

        let request = body.await.unwrap();
        assert_eq!(request["model"], "text-embedding-3-small");
        assert_eq!(request["input"], json!(["hola"]));
        assert_eq!(request["dimensions"], 512);
    }

    #[tokio::test]
    async fn test_wrong_vector_size_is_provider_error() {
        let (base_url, _body) = mock_endpoint(1536).await;
        let embedder = OpenAiEmbedder::new(&config(&base_url)).unwrap();
        let err = embedder
            .embed_batch(&["hola".to_string()])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Provider(_)));
    }
}
