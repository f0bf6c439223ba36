//! Typed errors for the pipeline stages.
//!
//! Stage functions return `anyhow::Result`; the variants here are the
//! conditions callers may want to match on (via `downcast_ref`).

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RagError {
    /// The PDF input directory could not be listed. Fatal for extraction.
    #[error("failed to read directory {}: {source}", path.display())]
    DirectoryRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// One file could not be turned into text. The extractor logs and skips it.
    #[error("failed to extract text from {file}: {message}")]
    Extraction { file: String, message: String },

    /// The query stage was pointed at a collection that was never created.
    #[error("collection not found: {0}")]
    CollectionNotFound(String),

    /// The embedding or language-model service failed or answered garbage.
    #[error("{service} error: {message}")]
    Service { service: String, message: String },

    /// Vectors of different lengths met, usually because the embedding model
    /// changed after the collection was indexed.
    #[error(
        "embedding dimension mismatch in collection {collection}: expected {expected}, got {got}"
    )]
    DimensionMismatch {
        collection: String,
        expected: usize,
        got: usize,
    },
}

impl RagError {
    pub fn extraction(file: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Extraction {
            file: file.into(),
            message: message.into(),
        }
    }

    pub fn service(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Service {
            service: service.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_failing_thing() {
        let err = RagError::extraction("bad.pdf", "not a pdf");
        assert_eq!(
            err.to_string(),
            "failed to extract text from bad.pdf: not a pdf"
        );

        let err = RagError::CollectionNotFound("myRag".to_string());
        assert_eq!(err.to_string(), "collection not found: myRag");

        let err = RagError::service("Ollama", "HTTP 500");
        assert_eq!(err.to_string(), "Ollama error: HTTP 500");

        let err = RagError::DimensionMismatch {
            collection: "myRag".to_string(),
            expected: 768,
            got: 384,
        };
        assert!(err.to_string().contains("expected 768, got 384"));
    }

    #[test]
    fn directory_read_keeps_io_source() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err = RagError::DirectoryRead {
            path: PathBuf::from("/nope"),
            source: io,
        };
        assert!(err.to_string().contains("/nope"));
        assert!(std::error::Error::source(&err).is_some());
    }
}
