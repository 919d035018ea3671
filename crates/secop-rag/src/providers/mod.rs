//! Embedding providers
//!
//! A `Vectorizer` wraps exactly one `EmbeddingProvider`: the OpenAI-compatible
//! client when an API key is configured, the hash-seeded fallback otherwise.

pub mod embedding;
pub mod hashed;
pub mod openai;
pub mod vectorizer;

pub use embedding::EmbeddingProvider;
pub use hashed::HashEmbedder;
pub use openai::OpenAiEmbedder;
pub use vectorizer::{FallbackConfig, ProviderConfig, Vectorizer, VectorizerMode};
