//! Answer generation boundary and the local extractive answerer

use std::collections::HashSet;

use async_trait::async_trait;

use crate::config::RetrievalConfig;
use crate::error::Result;

use super::context::ContextBundle;

/// Message returned when the context holds nothing usable
pub const NO_CONTEXT_ANSWER: &str =
    "No encontré texto suficiente en la fuente para responder. Por favor, verifica el documento original.";

/// Trait for turning a question and its context into an answer
///
/// Implementations:
/// - `ExtractiveAnswerer`: quotes the best-ranked paragraphs, no model
#[async_trait]
pub trait AnswerGenerator: Send + Sync {
    /// Produce an answer grounded in `context`
    async fn generate(&self, query: &str, context: &ContextBundle) -> Result<String>;

    /// Get generator name for logging
    fn name(&self) -> &str;
}

/// Joins the first distinct paragraphs of the rendered context
#[derive(Debug, Clone)]
pub struct ExtractiveAnswerer {
    context_chars: usize,
    max_paragraphs: usize,
}

const MAX_PARAGRAPHS: usize = 5;

impl Default for ExtractiveAnswerer {
    fn default() -> Self {
        Self::from_config(&RetrievalConfig::default())
    }
}

impl ExtractiveAnswerer {
    pub fn new(context_chars: usize, max_paragraphs: usize) -> Self {
        Self {
            context_chars,
            max_paragraphs,
        }
    }

    /// Answerer reading at most `max_context_chars` of rendered context
    pub fn from_config(config: &RetrievalConfig) -> Self {
        Self::new(config.max_context_chars, MAX_PARAGRAPHS)
    }

    /// Synchronous form of `generate`
    pub fn answer(&self, context: &ContextBundle) -> String {
        let mut seen = HashSet::new();
        let picked: Vec<String> = context
            .paragraphs(self.context_chars)
            .into_iter()
            .filter(|p| {
                seen.insert(p.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase())
            })
            .take(self.max_paragraphs)
            .collect();

        if picked.is_empty() {
            NO_CONTEXT_ANSWER.to_string()
        } else {
            picked.join(" ")
        }
    }
}

#[async_trait]
impl AnswerGenerator for ExtractiveAnswerer {
    async fn generate(&self, _query: &str, context: &ContextBundle) -> Result<String> {
        Ok(self.answer(context))
    }

    fn name(&self) -> &str {
        "extractive"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ContextItem;

    fn bundle(texts: &[&str]) -> ContextBundle {
        let items = texts
            .iter()
            .enumerate()
            .map(|(i, t)| ContextItem {
                group_id: format!("G{}", i),
                ordinal: 0,
                score: 1.0 - i as f32 * 0.1,
                matched_text: t.to_string(),
                full_text: None,
            })
            .collect();
        ContextBundle::new("q", items)
    }

    #[tokio::test]
    async fn test_empty_context_message() {
        let answer = ExtractiveAnswerer::default()
            .generate("q", &ContextBundle::default())
            .await
            .unwrap();
        assert_eq!(answer, NO_CONTEXT_ANSWER);
    }

    #[test]
    fn test_takes_at_most_five_case_insensitive_distinct() {
        let answerer = ExtractiveAnswerer::default();
        let answer = answerer.answer(&bundle(&["uno\nUNO\ndos", "tres\ncuatro\ncinco\nseis"]));
        assert_eq!(answer, "uno dos tres cuatro cinco");
    }

    #[test]
    fn test_context_budget_from_config() {
        let config = RetrievalConfig {
            max_context_chars: 8,
            ..Default::default()
        };
        let context = bundle(&["aaaa\nbbbb\ncccc"]);

        assert_eq!(ExtractiveAnswerer::from_config(&config).answer(&context), "aaaa bbbb");
        assert_eq!(ExtractiveAnswerer::default().answer(&context), "aaaa bbbb cccc");
    }
}
