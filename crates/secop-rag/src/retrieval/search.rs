//! Retrieval orchestration: query vector, full scan, rank, resolve owners

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::error::Result;
use crate::providers::Vectorizer;
use crate::storage::VectorStore;
use crate::types::ContextItem;

use super::ranker::rank;

/// Answers queries against a vector store
#[derive(Clone)]
pub struct Retriever {
    store: VectorStore,
    vectorizer: Vectorizer,
}

impl Retriever {
    pub fn new(store: VectorStore, vectorizer: Vectorizer) -> Self {
        Self { store, vectorizer }
    }

    /// Top `top_k` passages for `query`, each resolved to its owning entry
    ///
    /// A winner whose entry has disappeared is returned with `full_text: None`.
    pub async fn answer_context(&self, query: &str, top_k: usize) -> Result<Vec<ContextItem>> {
        if top_k == 0 {
            return Ok(Vec::new());
        }

        let query_vector = self.vectorizer.embed_query(query).await?;

        let candidates = self.store.run(|store| store.fetch_all_vectors()).await?;

        if candidates.is_empty() {
            debug!("Store is empty, nothing to rank");
            return Ok(Vec::new());
        }

        let ranked = rank(&query_vector, &candidates, top_k);
        drop(candidates);

        let group_ids: Vec<String> = ranked.iter().map(|r| r.group_id.clone()).collect();
        let full_texts = self
            .store
            .run(move |store| {
                let mut resolved: HashMap<String, Option<String>> = HashMap::new();
                for group_id in group_ids {
                    if resolved.contains_key(&group_id) {
                        continue;
                    }
                    let full_text = store.get_entry(&group_id)?.map(|e| e.full_text);
                    resolved.insert(group_id, full_text);
                }
                Ok(resolved)
            })
            .await?;

        let items: Vec<ContextItem> = ranked
            .into_iter()
            .map(|r| {
                let full_text = full_texts.get(&r.group_id).cloned().flatten();
                if full_text.is_none() {
                    warn!(group_id = %r.group_id, "Ranked passage has no owning entry");
                }
                ContextItem {
                    group_id: r.group_id,
                    ordinal: r.ordinal,
                    score: r.score,
                    matched_text: r.text,
                    full_text,
                }
            })
            .collect();

        debug!(
            top_k,
            returned = items.len(),
            best = items.first().map(|i| i.score).unwrap_or(0.0),
            "Retrieved context"
        );
        Ok(items)
    }

    pub fn store(&self) -> &VectorStore {
        &self.store
    }

    pub fn vectorizer(&self) -> &Vectorizer {
        &self.vectorizer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::providers::{EmbeddingProvider, FallbackConfig, VectorizerMode};
    use crate::types::{CanonicalEntry, Passage};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn fallback(dims: usize) -> Vectorizer {
        Vectorizer::new(VectorizerMode::Fallback(FallbackConfig { dimensions: dims })).unwrap()
    }

    struct FailingProvider {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl EmbeddingProvider for FailingProvider {
        async fn embed_batch(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(Error::provider("unavailable"))
        }

        fn dimensions(&self) -> usize {
            8
        }

        async fn health_check(&self) -> Result<bool> {
            Ok(false)
        }

        fn name(&self) -> &str {
            "failing"
        }
    }

    #[tokio::test]
    async fn test_zero_top_k_skips_provider() {
        let provider = Arc::new(FailingProvider {
            calls: AtomicUsize::new(0),
        });
        let retriever = Retriever::new(
            VectorStore::in_memory(8).unwrap(),
            Vectorizer::from_provider(provider.clone()),
        );
        assert!(retriever.answer_context("q", 0).await.unwrap().is_empty());
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);

        let err = retriever.answer_context("q", 3).await.unwrap_err();
        assert!(matches!(err, Error::Provider(_)));
    }

    #[tokio::test]
    async fn test_empty_store() {
        let retriever = Retriever::new(VectorStore::in_memory(16).unwrap(), fallback(16));
        assert!(retriever.answer_context("q", 5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_exact_text_ranks_first_with_full_text() {
        let store = VectorStore::in_memory(64).unwrap();
        let vectorizer = fallback(64);

        for (id, text) in [("A", "obra civil en Cauca"), ("B", "suministro de papelería")] {
            store.put_entry(&CanonicalEntry::new(id, format!("full {}", id), text)).unwrap();
            let vectors = vectorizer.embed(&[text.to_string()]).await.unwrap();
            store
                .put_passages(id, &Passage::zip(vec![text.to_string()], vectors))
                .unwrap();
        }

        let retriever = Retriever::new(store, vectorizer);
        let items = retriever.answer_context("suministro de papelería", 5).await.unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].group_id, "B");
        assert!((items[0].score - 1.0).abs() < 1e-5);
        assert_eq!(items[0].full_text.as_deref(), Some("full B"));
        assert_eq!(items[0].matched_text, "suministro de papelería");
    }
}
