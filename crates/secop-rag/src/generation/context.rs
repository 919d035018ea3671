//! Context bundles handed to answer generators

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::types::ContextItem;

/// Ranked context for one query
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContextBundle {
    /// The question being answered
    pub query: String,
    /// Matches, best first
    pub items: Vec<ContextItem>,
}

impl ContextBundle {
    pub fn new(query: impl Into<String>, items: Vec<ContextItem>) -> Self {
        Self {
            query: query.into(),
            items,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Distinct non-blank paragraphs of the matched texts, in rank order
    ///
    /// Stops after the paragraph that pushes the running length (each
    /// paragraph plus a newline) past `max_chars`.
    pub fn paragraphs(&self, max_chars: usize) -> Vec<String> {
        let mut paragraphs = Vec::new();
        let mut seen = HashSet::new();
        let mut used = 0usize;

        for item in &self.items {
            for line in item.matched_text.split('\n') {
                let paragraph = line.trim();
                if paragraph.is_empty() {
                    continue;
                }
                let key = paragraph.split_whitespace().collect::<Vec<_>>().join(" ");
                if !seen.insert(key) {
                    continue;
                }
                used += paragraph.chars().count() + 1;
                paragraphs.push(paragraph.to_string());
                if used > max_chars {
                    return paragraphs;
                }
            }
        }

        paragraphs
    }

    /// Render the context as newline-separated paragraphs
    pub fn render(&self, max_chars: usize) -> String {
        self.paragraphs(max_chars).join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(group: &str, text: &str) -> ContextItem {
        ContextItem {
            group_id: group.to_string(),
            ordinal: 0,
            score: 1.0,
            matched_text: text.to_string(),
            full_text: None,
        }
    }

    #[test]
    fn test_render_dedupes_and_skips_blank() {
        let bundle = ContextBundle::new(
            "q",
            vec![
                item("A", "Entidad: SENA\n\n  Objeto:  obra civil "),
                item("B", "Entidad:   SENA\nDepartamento: Cauca"),
            ],
        );
        assert_eq!(
            bundle.render(4000),
            "Entidad: SENA\nObjeto:  obra civil\nDepartamento: Cauca"
        );
    }

    #[test]
    fn test_render_stops_past_budget() {
        let bundle = ContextBundle::new("q", vec![item("A", "aaaa\nbbbb\ncccc")]);
        // 5 + 5 = 10 > 8 after the second paragraph
        assert_eq!(bundle.render(8), "aaaa\nbbbb");
        assert_eq!(bundle.render(100), "aaaa\nbbbb\ncccc");
    }

    #[test]
    fn test_empty_bundle() {
        let bundle = ContextBundle::new("q", Vec::new());
        assert!(bundle.is_empty());
        assert_eq!(bundle.render(100), "");
    }
}
