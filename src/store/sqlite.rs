//! SQLite-backed [`VectorStore`] implementation.
//!
//! Collections live in the `collections` table and their entries in
//! `entries`, with each embedding stored as a little-endian f32 BLOB.
//! Search loads every vector of the collection and scores it in Rust.

use std::path::Path;

use anyhow::Result;
use async_trait::async_trait;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::db;
use crate::embedding::{blob_to_vec, vec_to_blob};
use crate::migrate;
use crate::models::{Chunk, Collection, ScoredChunk};

use super::{check_dims, check_lengths, rank, CollectionInfo, SimilarityMetric, VectorStore};

/// SQLite implementation of the [`VectorStore`] trait.
pub struct SqliteVectorStore {
    pool: SqlitePool,
}

impl SqliteVectorStore {
    /// Wrap a pool whose schema is already migrated.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open (or create) the database at `path` and apply migrations.
    pub async fn open(path: &Path) -> Result<Self> {
        let pool = db::connect(path).await?;
        migrate::run_migrations(&pool).await?;
        Ok(Self::new(pool))
    }

    /// Open the database at `path` only if the file is already there.
    ///
    /// Read-only commands use this so that asking a question or listing
    /// collections never leaves an empty database behind.
    pub async fn open_existing(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let pool = db::connect_existing(path).await?;
        migrate::run_migrations(&pool).await?;
        Ok(Some(Self::new(pool)))
    }

    pub async fn close(self) {
        self.pool.close().await;
    }
}

fn row_to_collection(row: &sqlx::sqlite::SqliteRow) -> Collection {
    Collection {
        id: row.get("id"),
        name: row.get("name"),
        created_at: row.get("created_at"),
    }
}

#[async_trait]
impl VectorStore for SqliteVectorStore {
    async fn create_collection(&self, name: &str) -> Result<Collection> {
        sqlx::query(
            "INSERT INTO collections (id, name, created_at) VALUES (?, ?, ?)
             ON CONFLICT(name) DO NOTHING",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(name)
        .bind(chrono::Utc::now().timestamp())
        .execute(&self.pool)
        .await?;

        let row = sqlx::query("SELECT id, name, created_at FROM collections WHERE name = ?")
            .bind(name)
            .fetch_one(&self.pool)
            .await?;
        Ok(row_to_collection(&row))
    }

    async fn get_collection(&self, name: &str) -> Result<Option<Collection>> {
        let row = sqlx::query("SELECT id, name, created_at FROM collections WHERE name = ?")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(row_to_collection))
    }

    async fn list_collections(&self) -> Result<Vec<CollectionInfo>> {
        let rows = sqlx::query(
            r#"
            SELECT c.id, c.name, c.created_at, COUNT(e.seq) AS entries
            FROM collections c
            LEFT JOIN entries e ON e.collection_id = c.id
            GROUP BY c.id
            ORDER BY c.name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| CollectionInfo {
                collection: row_to_collection(row),
                entries: row.get("entries"),
            })
            .collect())
    }

    async fn delete_collection(&self, name: &str) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "DELETE FROM entries WHERE collection_id IN (SELECT id FROM collections WHERE name = ?)",
        )
        .bind(name)
        .execute(&mut *tx)
        .await?;

        let result = sqlx::query("DELETE FROM collections WHERE name = ?")
            .bind(name)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }

    async fn add_entries(
        &self,
        collection: &Collection,
        chunks: &[Chunk],
        vectors: &[Vec<f32>],
    ) -> Result<usize> {
        check_lengths(chunks, vectors)?;
        let now = chrono::Utc::now().timestamp();
        let mut tx = self.pool.begin().await?;

        for (chunk, vector) in chunks.iter().zip(vectors) {
            sqlx::query(
                r#"
                INSERT INTO entries (id, collection_id, source, chunk_index, text, hash,
                                     embedding, dims, created_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&chunk.id)
            .bind(&collection.id)
            .bind(&chunk.source)
            .bind(chunk.chunk_index)
            .bind(&chunk.text)
            .bind(&chunk.hash)
            .bind(vec_to_blob(vector))
            .bind(vector.len() as i64)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(chunks.len())
    }

    async fn count(&self, collection: &Collection) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM entries WHERE collection_id = ?")
            .bind(&collection.id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn contains_hash(&self, collection: &Collection, hash: &str) -> Result<bool> {
        let found: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM entries WHERE collection_id = ? AND hash = ?)",
        )
        .bind(&collection.id)
        .bind(hash)
        .fetch_one(&self.pool)
        .await?;
        Ok(found)
    }

    async fn similarity_search(
        &self,
        collection: &Collection,
        query: &[f32],
        k: usize,
        metric: SimilarityMetric,
    ) -> Result<Vec<ScoredChunk>> {
        let rows = sqlx::query(
            r#"
            SELECT id, source, chunk_index, text, hash, embedding
            FROM entries
            WHERE collection_id = ?
            ORDER BY seq
            "#,
        )
        .bind(&collection.id)
        .fetch_all(&self.pool)
        .await?;

        let mut scored = Vec::with_capacity(rows.len());
        for row in &rows {
            let blob: Vec<u8> = row.get("embedding");
            let vector = blob_to_vec(&blob);
            check_dims(collection, query, vector.len())?;
            scored.push(ScoredChunk {
                score: metric.score(query, &vector),
                chunk: Chunk {
                    id: row.get("id"),
                    source: row.get("source"),
                    chunk_index: row.get("chunk_index"),
                    text: row.get("text"),
                    hash: row.get("hash"),
                },
            });
        }

        Ok(rank(scored, k))
    }
}
