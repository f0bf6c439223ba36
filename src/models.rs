//! Core data models used throughout the pipeline.
//!
//! These types represent the documents, chunks, retrieval results, and
//! answers that flow from extraction through indexing to querying.

use serde::{Deserialize, Serialize};

/// Text loaded from one file. Produced by the extractor (one per PDF) or by
/// [`load_document`](crate::index::load_document) for the combined artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    /// Where the text came from (a file name or a relative path).
    pub source: String,
    pub text: String,
}

impl Document {
    pub fn new(source: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            text: text.into(),
        }
    }
}

/// A contiguous slice of a document's text, sized for embedding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub id: String,
    /// Source of the parent document.
    pub source: String,
    /// Position of this chunk within its document, starting at 0.
    pub chunk_index: i64,
    pub text: String,
    /// SHA-256 of `text`, lowercase hex.
    pub hash: String,
}

/// A named set of stored (chunk, embedding) entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Collection {
    pub id: String,
    pub name: String,
    pub created_at: i64,
}

/// A retrieved chunk and its similarity to the query (higher is closer).
#[derive(Debug, Clone, Serialize)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    pub score: f64,
}

/// Final output of the query stage.
#[derive(Debug, Clone, Serialize)]
pub struct AnswerResponse {
    pub question: String,
    /// Chunks handed to the model as context, best match first.
    pub context: Vec<ScoredChunk>,
    /// The model's completion, unmodified.
    pub answer: String,
}

impl AnswerResponse {
    /// Texts of the context chunks, in retrieval order.
    pub fn context_texts(&self) -> Vec<&str> {
        self.context.iter().map(|c| c.chunk.text.as_str()).collect()
    }
}
