//! The vector index and document metadata store.
//!
//! SQLite-backed: one `documents` row per paper with its bibliographic
//! payload, one `chunks` row per chunk with the embedding as a little-endian
//! f32 BLOB. All access goes through upsert/query operations keyed by
//! `(document_id, chunk_index)`; an entry is never mutated except by
//! re-upsert under the same key. Similarity is cosine, computed in-process
//! over the candidate vectors.

use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::embedding::{blob_to_vec, cosine_similarity, vec_to_blob};
use crate::error::PipelineError;
use crate::models::{BibRecord, DocumentChunk, RetrievedChunk};

/// Distance metric recorded for the collection. Only cosine is supported.
pub const DISTANCE_COSINE: &str = "cosine";

#[derive(Debug)]
pub struct VectorIndex {
    pool: SqlitePool,
    collection: String,
    dims: usize,
}

impl VectorIndex {
    /// Opens the index, creating the collection on first use.
    ///
    /// The one-time, idempotent collection check happens here at construction:
    /// tables are created if missing and the collection row is recorded with
    /// the embedder's dimensionality and cosine distance. Reopening an
    /// existing collection with a different dimensionality is a configuration
    /// error — the stored vectors would be incomparable.
    pub async fn open(
        pool: SqlitePool,
        collection: &str,
        dims: usize,
    ) -> Result<Self, PipelineError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS collections (
                name TEXT PRIMARY KEY,
                dims INTEGER NOT NULL,
                distance TEXT NOT NULL,
                created_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(&pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS documents (
                id TEXT PRIMARY KEY,
                collection TEXT NOT NULL,
                pdf_name TEXT NOT NULL,
                title TEXT,
                metadata_json TEXT NOT NULL DEFAULT '{}',
                ingested_at INTEGER NOT NULL,
                UNIQUE(collection, pdf_name)
            )
            "#,
        )
        .execute(&pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS chunks (
                document_id TEXT NOT NULL,
                chunk_index INTEGER NOT NULL,
                text TEXT NOT NULL,
                embedding BLOB NOT NULL,
                metadata_json TEXT NOT NULL DEFAULT '{}',
                PRIMARY KEY (document_id, chunk_index),
                FOREIGN KEY (document_id) REFERENCES documents(id)
            )
            "#,
        )
        .execute(&pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_chunks_document ON chunks(document_id)")
            .execute(&pool)
            .await?;

        let existing: Option<i64> =
            sqlx::query_scalar("SELECT dims FROM collections WHERE name = ?")
                .bind(collection)
                .fetch_optional(&pool)
                .await?;

        match existing {
            Some(stored) if stored as usize != dims => {
                return Err(PipelineError::Configuration(format!(
                    "collection '{}' stores {}-dim vectors but the embedder produces {}",
                    collection, stored, dims
                )));
            }
            Some(_) => {}
            None => {
                let now = chrono::Utc::now().timestamp();
                tracing::info!(collection, dims, "creating vector collection");
                sqlx::query(
                    "INSERT INTO collections (name, dims, distance, created_at) VALUES (?, ?, ?, ?)",
                )
                .bind(collection)
                .bind(dims as i64)
                .bind(DISTANCE_COSINE)
                .bind(now)
                .execute(&pool)
                .await?;
            }
        }

        Ok(Self {
            pool,
            collection: collection.to_string(),
            dims,
        })
    }

    pub fn dims(&self) -> usize {
        self.dims
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Resolves the stable document id for a PDF filename, creating the
    /// document row on first sight. The `(collection, pdf_name)` key keeps
    /// the id stable across runs so chunk upserts overwrite.
    pub async fn upsert_document(
        &self,
        pdf_name: &str,
        title: &str,
        record: Option<&BibRecord>,
    ) -> Result<String, PipelineError> {
        let existing: Option<String> =
            sqlx::query_scalar("SELECT id FROM documents WHERE collection = ? AND pdf_name = ?")
                .bind(&self.collection)
                .bind(pdf_name)
                .fetch_optional(&self.pool)
                .await?;

        let doc_id = existing.unwrap_or_else(|| Uuid::new_v4().to_string());
        let metadata_json = match record {
            Some(r) => serde_json::to_string(r)
                .map_err(|e| PipelineError::Unexpected(e.to_string()))?,
            None => "{}".to_string(),
        };
        let now = chrono::Utc::now().timestamp();

        sqlx::query(
            r#"
            INSERT INTO documents (id, collection, pdf_name, title, metadata_json, ingested_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(collection, pdf_name) DO UPDATE SET
                title = excluded.title,
                metadata_json = excluded.metadata_json,
                ingested_at = excluded.ingested_at
            "#,
        )
        .bind(&doc_id)
        .bind(&self.collection)
        .bind(pdf_name)
        .bind(title)
        .bind(&metadata_json)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(doc_id)
    }

    /// True when the document already has chunks in the index — the
    /// idempotency check behind `skip_if_exists`.
    pub async fn is_document_indexed(&self, pdf_name: &str) -> Result<bool, PipelineError> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM chunks c
            JOIN documents d ON d.id = c.document_id
            WHERE d.collection = ? AND d.pdf_name = ?
            "#,
        )
        .bind(&self.collection)
        .bind(pdf_name)
        .fetch_one(&self.pool)
        .await?;

        Ok(count > 0)
    }

    /// Upserts a document's chunks in one transaction. Keys on
    /// `(document_id, chunk_index)`: re-ingesting overwrites, never
    /// duplicates. Vectors of the wrong dimensionality are rejected before
    /// anything is written.
    pub async fn upsert_chunks(&self, chunks: &[DocumentChunk]) -> Result<(), PipelineError> {
        for chunk in chunks {
            if chunk.embedding.len() != self.dims {
                return Err(PipelineError::Unexpected(format!(
                    "chunk {}/{} has {} dims, collection expects {}",
                    chunk.document_id,
                    chunk.chunk_index,
                    chunk.embedding.len(),
                    self.dims
                )));
            }
        }

        let mut tx = self.pool.begin().await?;

        for chunk in chunks {
            let blob = vec_to_blob(&chunk.embedding);
            let metadata_json = chunk.metadata.to_string();
            sqlx::query(
                r#"
                INSERT INTO chunks (document_id, chunk_index, text, embedding, metadata_json)
                VALUES (?, ?, ?, ?, ?)
                ON CONFLICT(document_id, chunk_index) DO UPDATE SET
                    text = excluded.text,
                    embedding = excluded.embedding,
                    metadata_json = excluded.metadata_json
                "#,
            )
            .bind(&chunk.document_id)
            .bind(chunk.chunk_index)
            .bind(&chunk.text)
            .bind(&blob)
            .bind(&metadata_json)
            .execute(&mut *tx)
            .await?;
        }

        // A re-ingest that yields fewer chunks must not leave a stale tail
        // from the previous run.
        let mut max_index: std::collections::HashMap<&str, i64> = std::collections::HashMap::new();
        for chunk in chunks {
            let entry = max_index.entry(chunk.document_id.as_str()).or_insert(-1);
            *entry = (*entry).max(chunk.chunk_index);
        }
        for (document_id, highest) in max_index {
            sqlx::query("DELETE FROM chunks WHERE document_id = ? AND chunk_index > ?")
                .bind(document_id)
                .bind(highest)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Top-k cosine search over every chunk in the collection.
    ///
    /// Deterministic for a fixed index state and query vector: ties are broken
    /// by `(document_id, chunk_index)`. An empty index yields an empty vec.
    pub async fn query(
        &self,
        query_vec: &[f32],
        k: i64,
    ) -> Result<Vec<RetrievedChunk>, PipelineError> {
        let rows = sqlx::query(
            r#"
            SELECT c.document_id, c.chunk_index, c.text, c.embedding, d.title, d.pdf_name
            FROM chunks c
            JOIN documents d ON d.id = c.document_id
            WHERE d.collection = ?
            "#,
        )
        .bind(&self.collection)
        .fetch_all(&self.pool)
        .await?;

        let mut results: Vec<RetrievedChunk> = rows
            .iter()
            .map(|row| {
                let blob: Vec<u8> = row.get("embedding");
                let vec = blob_to_vec(&blob);
                RetrievedChunk {
                    document_id: row.get("document_id"),
                    chunk_index: row.get("chunk_index"),
                    text: row.get("text"),
                    title: row.get("title"),
                    pdf_name: row.get("pdf_name"),
                    score: cosine_similarity(query_vec, &vec),
                }
            })
            .collect();

        results.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.document_id.cmp(&b.document_id))
                .then_with(|| a.chunk_index.cmp(&b.chunk_index))
        });
        results.truncate(k.max(0) as usize);

        Ok(results)
    }

    /// Number of chunks stored for a document, for ingest reporting.
    pub async fn chunk_count(&self, pdf_name: &str) -> Result<i64, PipelineError> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM chunks c
            JOIN documents d ON d.id = c.document_id
            WHERE d.collection = ? AND d.pdf_name = ?
            "#,
        )
        .bind(&self.collection)
        .bind(pdf_name)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }
}
