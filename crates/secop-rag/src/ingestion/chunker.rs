//! Fixed-window text chunking over grapheme clusters

use unicode_segmentation::UnicodeSegmentation;

use crate::config::ChunkWindow;
use crate::error::Result;

/// Text chunker with configurable size and overlap
#[derive(Debug, Clone, Copy)]
pub struct TextChunker {
    /// Maximum chunk size in characters
    max_chars: usize,
    /// Characters shared between consecutive chunks
    overlap: usize,
}

impl TextChunker {
    /// Create a new chunker; fails unless `max_chars > overlap`
    pub fn new(window: ChunkWindow) -> Result<Self> {
        window.validate("chunk window")?;
        Ok(Self {
            max_chars: window.max_chars,
            overlap: window.overlap,
        })
    }

    pub fn max_chars(&self) -> usize {
        self.max_chars
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Split text into overlapping windows
    ///
    /// Whitespace runs are collapsed first. Window `i + 1` starts
    /// `max_chars - overlap` characters after window `i`.
    pub fn split(&self, text: &str) -> Vec<String> {
        let normalized = collapse_whitespace(text);
        if normalized.is_empty() {
            return Vec::new();
        }

        let graphemes: Vec<&str> = normalized.graphemes(true).collect();
        if graphemes.len() <= self.max_chars {
            return vec![normalized];
        }

        let step = self.max_chars - self.overlap;
        let mut chunks = Vec::new();
        let mut start = 0usize;

        loop {
            let end = (start + self.max_chars).min(graphemes.len());
            chunks.push(graphemes[start..end].concat());
            if end == graphemes.len() {
                break;
            }
            start += step;
        }

        chunks
    }
}

/// Collapse whitespace runs to single spaces and trim
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
