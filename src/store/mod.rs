//! Vector storage abstraction.
//!
//! The [`VectorStore`] trait defines every storage operation the indexing
//! and query stages need, so both can run against SQLite on disk or an
//! in-memory map in tests.
//!
//! A store holds named [`Collection`]s. Each collection holds entries: a
//! [`Chunk`] plus its embedding vector. Search is brute force over the
//! whole collection, scored by a [`SimilarityMetric`].
//!
//! Implementations must be `Send + Sync` to work with async runtimes.

pub mod memory;
pub mod sqlite;

use std::fmt;
use std::str::FromStr;

use anyhow::{bail, Result};
use async_trait::async_trait;

use crate::embedding::{cosine_similarity, dot_product, euclidean_distance};
use crate::error::RagError;
use crate::models::{Chunk, Collection, ScoredChunk};

pub use memory::InMemoryVectorStore;
pub use sqlite::SqliteVectorStore;

/// How query vectors are compared with stored vectors.
///
/// Every metric is turned into a score where higher means closer, so
/// results can always be sorted descending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SimilarityMetric {
    /// Cosine similarity, in `[-1, 1]`.
    #[default]
    Cosine,
    /// `1 / (1 + d)` where `d` is the L2 distance, in `(0, 1]`.
    Euclidean,
    /// Raw dot product.
    InnerProduct,
}

impl SimilarityMetric {
    pub fn score(&self, query: &[f32], stored: &[f32]) -> f64 {
        match self {
            Self::Cosine => cosine_similarity(query, stored) as f64,
            Self::Euclidean => 1.0 / (1.0 + euclidean_distance(query, stored) as f64),
            Self::InnerProduct => dot_product(query, stored) as f64,
        }
    }
}

impl FromStr for SimilarityMetric {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "cosine" => Ok(Self::Cosine),
            "euclidean" | "l2" => Ok(Self::Euclidean),
            "inner_product" | "dot" => Ok(Self::InnerProduct),
            other => bail!("Unknown similarity metric: '{}'", other),
        }
    }
}

impl fmt::Display for SimilarityMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Cosine => "cosine",
            Self::Euclidean => "euclidean",
            Self::InnerProduct => "inner_product",
        };
        f.write_str(name)
    }
}

/// What indexing does with a chunk whose text is already in the collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DuplicatePolicy {
    /// Insert it again. Re-indexing the same file doubles the collection.
    #[default]
    Append,
    /// Skip it (matched by content hash) without re-embedding.
    SkipExisting,
}

impl FromStr for DuplicatePolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "append" => Ok(Self::Append),
            "skip" | "skip_existing" => Ok(Self::SkipExisting),
            other => bail!("Unknown duplicate policy: '{}'", other),
        }
    }
}

/// A collection name with its entry count, for listings.
#[derive(Debug, Clone)]
pub struct CollectionInfo {
    pub collection: Collection,
    pub entries: i64,
}

/// Abstract vector store.
///
/// # Operations
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`create_collection`](VectorStore::create_collection) | Get or create a collection by name |
/// | [`get_collection`](VectorStore::get_collection) | Look up a collection by name |
/// | [`list_collections`](VectorStore::list_collections) | All collections with entry counts |
/// | [`delete_collection`](VectorStore::delete_collection) | Drop a collection and its entries |
/// | [`add_entries`](VectorStore::add_entries) | Insert chunks with their vectors |
/// | [`count`](VectorStore::count) | Number of entries in a collection |
/// | [`contains_hash`](VectorStore::contains_hash) | Whether a chunk hash is already stored |
/// | [`similarity_search`](VectorStore::similarity_search) | Top-k entries for a query vector |
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Return the collection called `name`, creating it if absent.
    async fn create_collection(&self, name: &str) -> Result<Collection>;

    async fn get_collection(&self, name: &str) -> Result<Option<Collection>>;

    /// Collections ordered by name.
    async fn list_collections(&self) -> Result<Vec<CollectionInfo>>;

    /// Returns `false` if there was no such collection.
    async fn delete_collection(&self, name: &str) -> Result<bool>;

    /// Insert `chunks[i]` with `vectors[i]`. Returns the number inserted.
    async fn add_entries(
        &self,
        collection: &Collection,
        chunks: &[Chunk],
        vectors: &[Vec<f32>],
    ) -> Result<usize>;

    async fn count(&self, collection: &Collection) -> Result<i64>;

    async fn contains_hash(&self, collection: &Collection, hash: &str) -> Result<bool>;

    /// The `k` highest-scoring entries, best first. Ties keep insertion order.
    ///
    /// Fails with [`RagError::DimensionMismatch`] if any stored vector's
    /// length differs from `query.len()`.
    async fn similarity_search(
        &self,
        collection: &Collection,
        query: &[f32],
        k: usize,
        metric: SimilarityMetric,
    ) -> Result<Vec<ScoredChunk>>;
}

pub(crate) fn check_lengths(chunks: &[Chunk], vectors: &[Vec<f32>]) -> Result<()> {
    if chunks.len() != vectors.len() {
        bail!(
            "got {} chunks but {} vectors; every entry needs exactly one vector",
            chunks.len(),
            vectors.len()
        );
    }
    Ok(())
}

/// Every stored vector must have the query's length.
pub(crate) fn check_dims(collection: &Collection, query: &[f32], stored: usize) -> Result<()> {
    if stored != query.len() {
        return Err(RagError::DimensionMismatch {
            collection: collection.name.clone(),
            expected: stored,
            got: query.len(),
        }
        .into());
    }
    Ok(())
}

/// Sort best first, keeping the input order among equal scores, and keep `k`.
/// NaN scores sort last.
pub(crate) fn rank(mut scored: Vec<ScoredChunk>, k: usize) -> Vec<ScoredChunk> {
    let key = |score: f64| if score.is_nan() { f64::NEG_INFINITY } else { score };
    scored.sort_by(|a, b| key(b.score).total_cmp(&key(a.score)));
    scored.truncate(k);
    scored
}
