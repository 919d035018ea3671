//! Brute-force cosine ranking

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::types::StoredPassage;

/// A passage with its similarity to the query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedPassage {
    pub group_id: String,
    pub ordinal: u32,
    pub score: f32,
    pub text: String,
}

/// Cosine similarity; 0.0 when either vector has zero magnitude or lengths differ
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (x, y) in a.iter().zip(b) {
        let (x, y) = (*x as f64, *y as f64);
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    (dot / (norm_a.sqrt() * norm_b.sqrt())) as f32
}

/// Top `top_k` candidates by descending score; equal scores keep scan order
pub fn rank(query: &[f32], candidates: &[StoredPassage], top_k: usize) -> Vec<RankedPassage> {
    if top_k == 0 || candidates.is_empty() {
        return Vec::new();
    }

    let mut scored: Vec<(usize, f32)> = candidates
        .iter()
        .enumerate()
        .map(|(i, c)| (i, cosine_similarity(query, &c.vector)))
        .collect();

    // sort_by is stable
    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
    scored.truncate(top_k);

    scored
        .into_iter()
        .map(|(i, score)| {
            let c = &candidates[i];
            RankedPassage {
                group_id: c.group_id.clone(),
                ordinal: c.ordinal,
                score,
                text: c.text.clone(),
            }
        })
        .collect()
}
