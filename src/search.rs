//! Semantic retrieval over the indexed corpus.
//!
//! Embeds the query with the same model used at ingestion time and ranks
//! chunks by cosine similarity. Deterministic for a fixed index state and a
//! fixed query embedding.

use crate::embedding::{embed_query, Embedder};
use crate::error::PipelineError;
use crate::index::VectorIndex;
use crate::models::RetrievedChunk;

pub struct Retrieval<'a> {
    index: &'a VectorIndex,
    embedder: &'a dyn Embedder,
}

impl<'a> Retrieval<'a> {
    pub fn new(index: &'a VectorIndex, embedder: &'a dyn Embedder) -> Self {
        Self { index, embedder }
    }

    /// Returns at most `k` chunks ordered by non-increasing score. A blank
    /// query or an empty index yields an empty vec, not an error.
    pub async fn search(&self, query: &str, k: i64) -> Result<Vec<RetrievedChunk>, PipelineError> {
        if query.trim().is_empty() {
            return Ok(Vec::new());
        }

        let query_vec = embed_query(self.embedder, query).await?;
        self.index.query(&query_vec, k).await
    }
}
