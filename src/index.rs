//! Chunking and indexing stage.
//!
//! Loads the combined text artifact, splits it with the
//! [`RecursiveSplitter`], embeds each chunk, and stores the
//! (chunk, vector) entries in a named collection.
//!
//! # Duplicates
//!
//! With [`DuplicatePolicy::Append`] every run inserts every chunk, so
//! indexing the same file twice doubles the collection. With
//! [`DuplicatePolicy::SkipExisting`] chunks whose content hash is already in
//! the collection are dropped before embedding.

use std::collections::HashSet;
use std::path::Path;

use anyhow::{bail, Context, Result};

use crate::chunk::RecursiveSplitter;
use crate::config::Config;
use crate::embedding::{self, EmbeddingProvider};
use crate::error::RagError;
use crate::models::{Chunk, Document};
use crate::store::{DuplicatePolicy, SqliteVectorStore, VectorStore};

/// Outcome of [`index_document`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexReport {
    pub collection: String,
    /// Chunks the splitter produced.
    pub chunks: usize,
    /// Chunks embedded and inserted by this run.
    pub inserted: usize,
    /// Chunks dropped by [`DuplicatePolicy::SkipExisting`].
    pub skipped_duplicates: usize,
    /// Entries in the collection after the run.
    pub total_entries: i64,
}

/// Read `relative_path` (resolved against the current directory) as one document.
///
/// The document's `source` is the path as given.
pub fn load_document(relative_path: &Path) -> Result<Document> {
    let cwd = std::env::current_dir().context("Failed to resolve current directory")?;
    let full_path = cwd.join(relative_path);

    let text = std::fs::read_to_string(&full_path)
        .with_context(|| format!("Failed to read document: {}", full_path.display()))?;

    tracing::info!(path = %full_path.display(), chars = text.chars().count(), "loaded document");
    Ok(Document::new(relative_path.display().to_string(), text))
}

/// Split `document`, embed the chunks, and add them to `collection_name`,
/// creating the collection if needed.
///
/// Any embedding or store failure aborts the run. Batches already written
/// stay in the collection. Every vector must have the provider's
/// [`dims`](EmbeddingProvider::dims), or the first vector's length when the
/// provider reports `0`.
pub async fn index_document(
    provider: &dyn EmbeddingProvider,
    store: &dyn VectorStore,
    collection_name: &str,
    document: &Document,
    splitter: &RecursiveSplitter,
    policy: DuplicatePolicy,
    batch_size: usize,
) -> Result<IndexReport> {
    let collection = store.create_collection(collection_name).await?;
    let chunks = splitter.split_document(document);
    let total_chunks = chunks.len();
    tracing::info!(
        source = %document.source,
        chunks = total_chunks,
        chunk_size = splitter.chunk_size(),
        chunk_overlap = splitter.chunk_overlap(),
        "split document"
    );

    let pending: Vec<Chunk> = match policy {
        DuplicatePolicy::Append => chunks,
        DuplicatePolicy::SkipExisting => {
            let mut seen = HashSet::new();
            let mut fresh = Vec::with_capacity(chunks.len());
            for chunk in chunks {
                if !seen.insert(chunk.hash.clone()) {
                    continue;
                }
                if store.contains_hash(&collection, &chunk.hash).await? {
                    continue;
                }
                fresh.push(chunk);
            }
            fresh
        }
    };
    let skipped_duplicates = total_chunks - pending.len();
    if skipped_duplicates > 0 {
        tracing::info!(skipped = skipped_duplicates, "skipping chunks already indexed");
    }

    // 0 until the provider or the first vector fixes it.
    let mut dims = provider.dims();
    let mut inserted = 0usize;
    for batch in pending.chunks(batch_size.max(1)) {
        let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
        let vectors = provider
            .embed_texts(&texts)
            .await
            .with_context(|| format!("Failed to embed chunks of {}", document.source))?;
        for vector in &vectors {
            if dims == 0 {
                dims = vector.len();
            } else if vector.len() != dims {
                return Err(RagError::DimensionMismatch {
                    collection: collection.name.clone(),
                    expected: dims,
                    got: vector.len(),
                }
                .into());
            }
        }
        inserted += store.add_entries(&collection, batch, &vectors).await?;
        tracing::debug!(inserted, of = pending.len(), "stored batch");
    }

    let total_entries = store.count(&collection).await?;
    tracing::info!(
        collection = %collection.name,
        inserted,
        total_entries,
        "indexed document"
    );

    Ok(IndexReport {
        collection: collection.name,
        chunks: total_chunks,
        inserted,
        skipped_duplicates,
        total_entries,
    })
}

/// `rag index`: index the combined text file into the configured collection.
pub async fn run_index(config: &Config) -> Result<IndexReport> {
    if !config.embedding.is_enabled() {
        bail!("Embedding provider is disabled. Set [embedding] provider in config.");
    }
    let provider = embedding::create_provider(&config.embedding)?;
    let splitter = RecursiveSplitter::from_config(&config.chunking)?;
    let policy: DuplicatePolicy = config.store.on_duplicate.parse()?;
    let document = load_document(&config.paths.output_file)?;

    let store = SqliteVectorStore::open(&config.store.path).await?;
    let report = index_document(
        provider.as_ref(),
        &store,
        &config.store.collection,
        &document,
        &splitter,
        policy,
        config.embedding.batch_size,
    )
    .await;
    store.close().await;
    let report = report?;

    println!("index {}", document.source);
    println!("  collection: {}", report.collection);
    println!("  chunks: {}", report.chunks);
    println!("  inserted: {}", report.inserted);
    println!("  skipped duplicates: {}", report.skipped_duplicates);
    println!("  total entries: {}", report.total_entries);

    Ok(report)
}
