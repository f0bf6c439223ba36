//! In-memory [`VectorStore`] implementation for tests and throwaway runs.
//!
//! Uses `HashMap` and `Vec` behind `std::sync::RwLock`. Nothing is persisted.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use anyhow::{bail, Result};
use async_trait::async_trait;
use uuid::Uuid;

use crate::models::{Chunk, Collection, ScoredChunk};

use super::{check_dims, check_lengths, rank, CollectionInfo, SimilarityMetric, VectorStore};

struct StoredEntry {
    chunk: Chunk,
    vector: Vec<f32>,
}

struct StoredCollection {
    collection: Collection,
    entries: Vec<StoredEntry>,
}

/// In-memory store keyed by collection name.
pub struct InMemoryVectorStore {
    collections: RwLock<HashMap<String, StoredCollection>>,
}

impl InMemoryVectorStore {
    pub fn new() -> Self {
        Self {
            collections: RwLock::new(HashMap::new()),
        }
    }

    // A panic while holding the lock cannot leave the map half-written, so a
    // poisoned lock is still safe to use.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, StoredCollection>> {
        self.collections
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, StoredCollection>> {
        self.collections
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for InMemoryVectorStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn create_collection(&self, name: &str) -> Result<Collection> {
        let mut map = self.write();
        let stored = map
            .entry(name.to_string())
            .or_insert_with(|| StoredCollection {
                collection: Collection {
                    id: Uuid::new_v4().to_string(),
                    name: name.to_string(),
                    created_at: chrono::Utc::now().timestamp(),
                },
                entries: Vec::new(),
            });
        Ok(stored.collection.clone())
    }

    async fn get_collection(&self, name: &str) -> Result<Option<Collection>> {
        Ok(self.read().get(name).map(|s| s.collection.clone()))
    }

    async fn list_collections(&self) -> Result<Vec<CollectionInfo>> {
        let map = self.read();
        let mut infos: Vec<CollectionInfo> = map
            .values()
            .map(|s| CollectionInfo {
                collection: s.collection.clone(),
                entries: s.entries.len() as i64,
            })
            .collect();
        infos.sort_by(|a, b| a.collection.name.cmp(&b.collection.name));
        Ok(infos)
    }

    async fn delete_collection(&self, name: &str) -> Result<bool> {
        Ok(self.write().remove(name).is_some())
    }

    async fn add_entries(
        &self,
        collection: &Collection,
        chunks: &[Chunk],
        vectors: &[Vec<f32>],
    ) -> Result<usize> {
        check_lengths(chunks, vectors)?;
        let mut map = self.write();
        let stored = match map.get_mut(&collection.name) {
            Some(s) if s.collection.id == collection.id => s,
            _ => bail!("collection '{}' no longer exists", collection.name),
        };
        for (chunk, vector) in chunks.iter().zip(vectors) {
            stored.entries.push(StoredEntry {
                chunk: chunk.clone(),
                vector: vector.clone(),
            });
        }
        Ok(chunks.len())
    }

    async fn count(&self, collection: &Collection) -> Result<i64> {
        Ok(self
            .read()
            .get(&collection.name)
            .map(|s| s.entries.len() as i64)
            .unwrap_or(0))
    }

    async fn contains_hash(&self, collection: &Collection, hash: &str) -> Result<bool> {
        Ok(self
            .read()
            .get(&collection.name)
            .map(|s| s.entries.iter().any(|e| e.chunk.hash == hash))
            .unwrap_or(false))
    }

    async fn similarity_search(
        &self,
        collection: &Collection,
        query: &[f32],
        k: usize,
        metric: SimilarityMetric,
    ) -> Result<Vec<ScoredChunk>> {
        let map = self.read();
        let entries: &[StoredEntry] = match map.get(&collection.name) {
            Some(s) => s.entries.as_slice(),
            None => &[],
        };

        let mut scored = Vec::with_capacity(entries.len());
        for e in entries {
            check_dims(collection, query, e.vector.len())?;
            scored.push(ScoredChunk {
                chunk: e.chunk.clone(),
                score: metric.score(query, &e.vector),
            });
        }
        Ok(rank(scored, k))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::hash_text;
    use crate::error::RagError;

    fn chunk(text: &str) -> Chunk {
        Chunk {
            id: Uuid::new_v4().to_string(),
            source: "doc.txt".to_string(),
            chunk_index: 0,
            text: text.to_string(),
            hash: hash_text(text),
        }
    }

    #[tokio::test]
    async fn create_is_get_or_create() {
        let store = InMemoryVectorStore::new();
        let a = store.create_collection("myRag").await.unwrap();
        let b = store.create_collection("myRag").await.unwrap();
        assert_eq!(a, b);
        assert_eq!(store.list_collections().await.unwrap().len(), 1);
        assert!(store.get_collection("other").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn search_orders_by_score_and_truncates() {
        let store = InMemoryVectorStore::new();
        let col = store.create_collection("c").await.unwrap();
        store
            .add_entries(
                &col,
                &[chunk("east"), chunk("north"), chunk("north-east")],
                &[vec![1.0, 0.0], vec![0.0, 1.0], vec![1.0, 1.0]],
            )
            .await
            .unwrap();

        let hits = store
            .similarity_search(&col, &[0.0, 1.0], 2, SimilarityMetric::Cosine)
            .await
            .unwrap();
        let texts: Vec<&str> = hits.iter().map(|h| h.chunk.text.as_str()).collect();
        assert_eq!(texts, vec!["north", "north-east"]);
        assert!(hits[0].score >= hits[1].score);
    }

    #[tokio::test]
    async fn ties_keep_insertion_order() {
        let store = InMemoryVectorStore::new();
        let col = store.create_collection("c").await.unwrap();
        store
            .add_entries(
                &col,
                &[chunk("first"), chunk("second")],
                &[vec![1.0, 0.0], vec![1.0, 0.0]],
            )
            .await
            .unwrap();
        let hits = store
            .similarity_search(&col, &[1.0, 0.0], 5, SimilarityMetric::Cosine)
            .await
            .unwrap();
        assert_eq!(hits[0].chunk.text, "first");
        assert_eq!(hits[1].chunk.text, "second");
    }

    #[tokio::test]
    async fn search_rejects_query_of_another_dimension() {
        let store = InMemoryVectorStore::new();
        let col = store.create_collection("c").await.unwrap();
        store
            .add_entries(&col, &[chunk("two dims")], &[vec![1.0, 0.0]])
            .await
            .unwrap();

        let err = store
            .similarity_search(&col, &[1.0, 0.0, 0.0], 5, SimilarityMetric::Cosine)
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<RagError>(),
            Some(RagError::DimensionMismatch {
                expected: 2,
                got: 3,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn rejects_mismatched_vectors() {
        let store = InMemoryVectorStore::new();
        let col = store.create_collection("c").await.unwrap();
        assert!(store.add_entries(&col, &[chunk("a")], &[]).await.is_err());
    }

    #[tokio::test]
    async fn delete_removes_entries() {
        let store = InMemoryVectorStore::new();
        let col = store.create_collection("c").await.unwrap();
        store
            .add_entries(&col, &[chunk("a")], &[vec![1.0]])
            .await
            .unwrap();
        assert!(store.contains_hash(&col, &hash_text("a")).await.unwrap());
        assert!(store.delete_collection("c").await.unwrap());
        assert!(!store.delete_collection("c").await.unwrap());
        assert_eq!(store.count(&col).await.unwrap(), 0);
    }
}
