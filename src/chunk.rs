//! Recursive character text splitter.
//!
//! Splits document text into [`Chunk`]s of at most `chunk_size` characters,
//! preferring the coarsest separator that occurs in the text (paragraphs,
//! then lines, then words, then single characters). Consecutive chunks share
//! up to `chunk_overlap` characters so that context spanning a boundary is
//! not lost.
//!
//! Lengths are counted in `char`s, never bytes, so multi-byte text is never
//! cut inside a code point.
//!
//! Each chunk receives a random UUID plus a SHA-256 hash of its text, which
//! the indexer uses to detect duplicates.

use std::collections::VecDeque;

use anyhow::{bail, Result};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::config::ChunkingConfig;
use crate::models::{Chunk, Document};

#[derive(Debug, Clone)]
pub struct RecursiveSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
    separators: Vec<String>,
}

impl RecursiveSplitter {
    pub fn new(chunk_size: usize, chunk_overlap: usize, separators: Vec<String>) -> Result<Self> {
        if chunk_size == 0 {
            bail!("chunk_size must be > 0");
        }
        if chunk_overlap >= chunk_size {
            bail!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                chunk_overlap,
                chunk_size
            );
        }
        if separators.is_empty() {
            bail!("at least one separator is required");
        }
        Ok(Self {
            chunk_size,
            chunk_overlap,
            separators,
        })
    }

    pub fn from_config(config: &ChunkingConfig) -> Result<Self> {
        Self::new(
            config.chunk_size,
            config.chunk_overlap,
            config.separators.clone(),
        )
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    /// Split raw text into trimmed, non-empty chunk strings.
    pub fn split_text(&self, text: &str) -> Vec<String> {
        self.split_recursive(text, &self.separators)
    }

    /// Split a document into [`Chunk`]s with contiguous indices starting at 0.
    pub fn split_document(&self, doc: &Document) -> Vec<Chunk> {
        self.split_text(&doc.text)
            .iter()
            .enumerate()
            .map(|(i, text)| make_chunk(&doc.source, i as i64, text))
            .collect()
    }

    fn split_recursive(&self, text: &str, separators: &[String]) -> Vec<String> {
        let mut final_chunks = Vec::new();

        // First separator that occurs in the text wins; "" always matches.
        let mut separator = separators.last().map(String::as_str).unwrap_or("");
        let mut finer: &[String] = &[];
        for (i, sep) in separators.iter().enumerate() {
            if sep.is_empty() {
                separator = "";
                break;
            }
            if text.contains(sep.as_str()) {
                separator = sep;
                finer = &separators[i + 1..];
                break;
            }
        }

        let char_level = [String::new()];
        let mut good: Vec<&str> = Vec::new();

        for piece in split_keeping_separator(text, separator) {
            if char_len(piece) < self.chunk_size {
                good.push(piece);
                continue;
            }

            if !good.is_empty() {
                final_chunks.extend(self.merge_splits(&good));
                good.clear();
            }

            if !finer.is_empty() {
                final_chunks.extend(self.split_recursive(piece, finer));
            } else if !separator.is_empty() {
                // Out of separators: fall back to character-level splitting.
                final_chunks.extend(self.split_recursive(piece, &char_level));
            } else {
                let trimmed = piece.trim();
                if !trimmed.is_empty() {
                    final_chunks.push(trimmed.to_string());
                }
            }
        }

        if !good.is_empty() {
            final_chunks.extend(self.merge_splits(&good));
        }

        final_chunks
    }

    /// Greedily pack pieces (each shorter than `chunk_size`) into chunks,
    /// carrying a tail of at most `chunk_overlap` characters forward.
    fn merge_splits(&self, splits: &[&str]) -> Vec<String> {
        let mut docs = Vec::new();
        let mut window: VecDeque<(&str, usize)> = VecDeque::new();
        let mut total = 0usize;

        for &piece in splits {
            let len = char_len(piece);

            if total + len > self.chunk_size && !window.is_empty() {
                if let Some(doc) = join_window(&window) {
                    docs.push(doc);
                }
                while total > self.chunk_overlap || (total + len > self.chunk_size && total > 0) {
                    match window.pop_front() {
                        Some((_, front_len)) => total -= front_len,
                        None => break,
                    }
                }
            }

            window.push_back((piece, len));
            total += len;
        }

        if let Some(doc) = join_window(&window) {
            docs.push(doc);
        }

        docs
    }
}

impl Default for RecursiveSplitter {
    fn default() -> Self {
        let config = ChunkingConfig::default();
        Self {
            chunk_size: config.chunk_size,
            chunk_overlap: config.chunk_overlap,
            separators: config.separators,
        }
    }
}

/// Split on `separator`, attaching each separator to the start of the piece
/// that follows it. Empty pieces are dropped. An empty separator yields one
/// piece per character.
fn split_keeping_separator<'a>(text: &'a str, separator: &str) -> Vec<&'a str> {
    if separator.is_empty() {
        return text
            .char_indices()
            .map(|(i, c)| &text[i..i + c.len_utf8()])
            .collect();
    }

    let mut pieces = Vec::new();
    let mut start = 0;
    for (idx, _) in text.match_indices(separator) {
        if idx > start {
            pieces.push(&text[start..idx]);
        }
        start = idx;
    }
    if start < text.len() {
        pieces.push(&text[start..]);
    }
    pieces
}

fn join_window(window: &VecDeque<(&str, usize)>) -> Option<String> {
    let joined: String = window.iter().map(|(piece, _)| *piece).collect();
    let trimmed = joined.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// SHA-256 of `text` as lowercase hex.
pub fn hash_text(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

fn make_chunk(source: &str, index: i64, text: &str) -> Chunk {
    Chunk {
        id: Uuid::new_v4().to_string(),
        source: source.to_string(),
        chunk_index: index,
        text: text.to_string(),
        hash: hash_text(text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn splitter(size: usize, overlap: usize) -> RecursiveSplitter {
        RecursiveSplitter::new(size, overlap, ChunkingConfig::default().separators).unwrap()
    }

    /// "w0000 w0001 ...": every word is unique, so `find` locates chunks exactly.
    fn numbered_words(n: usize) -> String {
        (0..n)
            .map(|i| format!("w{:04}", i))
            .collect::<Vec<_>>()
            .join(" ")
    }

    #[test]
    fn test_small_text_single_chunk() {
        let chunks = splitter(1000, 100).split_text("Hello, world!");
        assert_eq!(chunks, vec!["Hello, world!"]);
    }

    #[test]
    fn test_empty_and_blank_text_yield_nothing() {
        let s = splitter(1000, 100);
        assert!(s.split_text("").is_empty());
        assert!(s.split_text("  \n\n \n ").is_empty());
    }

    #[test]
    fn test_prefers_paragraph_boundaries() {
        let para1 = "a".repeat(600);
        let para2 = "b".repeat(600);
        let text = format!("{}\n\n{}", para1, para2);
        let chunks = splitter(1000, 100).split_text(&text);
        assert_eq!(chunks, vec![para1, para2]);
    }

    #[test]
    fn test_small_paragraphs_are_packed_together() {
        let text = "First paragraph.\n\nSecond paragraph.\n\nThird paragraph.";
        let chunks = splitter(1000, 100).split_text(text);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0], text);
    }

    #[test]
    fn test_unbroken_text_splits_per_character_with_overlap() {
        let text = "x".repeat(2500);
        let chunks = splitter(1000, 100).split_text(&text);
        let lens: Vec<usize> = chunks.iter().map(|c| c.chars().count()).collect();
        assert_eq!(lens, vec![1000, 1000, 700]);
    }

    #[test]
    fn test_chunks_bounded_overlapping_and_covering() {
        let text = numbered_words(1000);
        let chunks = splitter(1000, 100).split_text(&text);
        assert!(chunks.len() > 1);

        let spans: Vec<(usize, usize)> = chunks
            .iter()
            .map(|c| {
                assert!(c.chars().count() <= 1000, "chunk too long: {}", c.len());
                let start = text.find(c.as_str()).expect("chunk must be a substring");
                (start, start + c.len())
            })
            .collect();

        assert_eq!(spans[0].0, 0);
        assert_eq!(spans.last().unwrap().1, text.len());
        for pair in spans.windows(2) {
            let (prev, next) = (pair[0], pair[1]);
            assert!(next.0 > prev.0, "chunks must advance");
            assert!(next.0 < prev.1, "adjacent chunks should overlap");
            assert!(prev.1 - next.0 <= 100, "overlap too long: {}", prev.1 - next.0);
        }
    }

    #[test]
    fn test_multibyte_text_is_measured_in_chars() {
        let text = "é".repeat(1500);
        let chunks = splitter(1000, 100).split_text(&text);
        assert_eq!(chunks.len(), 2);
        for c in &chunks {
            assert!(c.chars().count() <= 1000);
            assert!(c.chars().all(|ch| ch == 'é'));
        }
    }

    #[test]
    fn test_falls_back_to_characters_when_separators_run_out() {
        let s = RecursiveSplitter::new(50, 5, vec!["\n\n".to_string()]).unwrap();
        let text = "word ".repeat(40);
        let chunks = s.split_text(&text);
        assert!(chunks.len() > 1);
        for c in &chunks {
            assert!(c.chars().count() <= 50);
        }
    }

    #[test]
    fn test_oversized_line_is_split_further() {
        let long_line = numbered_words(300);
        let text = format!("short intro\n\n{}\n\nshort outro", long_line);
        let chunks = splitter(500, 50).split_text(&text);
        assert!(chunks.iter().all(|c| c.chars().count() <= 500));
        assert_eq!(chunks.first().map(String::as_str), Some("short intro"));
        assert_eq!(chunks.last().map(String::as_str), Some("short outro"));
    }

    #[test]
    fn test_split_keeping_separator() {
        assert_eq!(
            split_keeping_separator("a\n\nb\n\n\n\nc", "\n\n"),
            vec!["a", "\n\nb", "\n\n", "\n\nc"]
        );
        assert_eq!(split_keeping_separator("\n\nb", "\n\n"), vec!["\n\nb"]);
        assert_eq!(split_keeping_separator("añb", ""), vec!["a", "ñ", "b"]);
    }

    #[test]
    fn test_document_chunks_have_contiguous_indices_and_hashes() {
        let doc = Document::new("combined.txt", numbered_words(600));
        let chunks = splitter(1000, 100).split_document(&doc);
        assert!(chunks.len() > 1);
        for (i, c) in chunks.iter().enumerate() {
            assert_eq!(c.chunk_index, i as i64);
            assert_eq!(c.source, "combined.txt");
            assert_eq!(c.hash, hash_text(&c.text));
        }
    }

    #[test]
    fn test_deterministic() {
        let text = numbered_words(500);
        let s = splitter(300, 30);
        assert_eq!(s.split_text(&text), s.split_text(&text));
    }

    #[test]
    fn test_rejects_bad_sizes() {
        assert!(RecursiveSplitter::new(0, 0, vec![String::new()]).is_err());
        assert!(RecursiveSplitter::new(100, 100, vec![String::new()]).is_err());
        assert!(RecursiveSplitter::new(100, 10, vec![]).is_err());
    }
}
