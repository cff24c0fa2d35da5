//! Knowledge ingestion orchestration.
//!
//! Walks the library manifest and, for each paper not yet indexed: loads the
//! PDF text, reads cached bibliographic metadata, chunks and embeds the
//! content, and upserts every chunk into the vector index. One bad document
//! never aborts the rest of the batch; store upserts get a bounded
//! exponential-backoff retry, and after a transient failure the loop pauses
//! before moving on so it does not hammer a struggling store.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::chunk;
use crate::config::Config;
use crate::embedding::Embedder;
use crate::error::PipelineError;
use crate::index::VectorIndex;
use crate::loader;
use crate::manifest::resolve_pdf_name;
use crate::metadata::MetadataCache;
use crate::models::ManifestEntry;

/// Attempts per chunk upsert before the document is reported failed.
const UPSERT_ATTEMPTS: u32 = 3;
/// Pause after a transient store failure before continuing with the batch.
const STORE_BACKOFF: Duration = Duration::from_secs(5);

#[derive(Debug, Default)]
pub struct IngestReport {
    pub indexed: usize,
    pub skipped: usize,
    pub cancelled: bool,
    /// `(pdf_name, error)` per document that failed.
    pub failures: Vec<(String, String)>,
}

pub struct Ingestor<'a> {
    index: &'a VectorIndex,
    embedder: &'a dyn Embedder,
    cache: &'a MetadataCache,
    config: &'a Config,
}

impl<'a> Ingestor<'a> {
    /// The collection existence/dimensionality check already ran when the
    /// [`VectorIndex`] was opened, so construction here cannot fail.
    pub fn new(
        index: &'a VectorIndex,
        embedder: &'a dyn Embedder,
        cache: &'a MetadataCache,
        config: &'a Config,
    ) -> Self {
        Self {
            index,
            embedder,
            cache,
            config,
        }
    }

    /// Ingests every manifest entry. With `skip_if_exists`, documents that
    /// already have chunks in the index are skipped — the idempotency marker
    /// is the indexed chunks themselves. `cancel` is checked between items.
    pub async fn ingest(
        &self,
        manifest: &[ManifestEntry],
        skip_if_exists: bool,
        cancel: &AtomicBool,
    ) -> Result<IngestReport, PipelineError> {
        let mut report = IngestReport::default();

        for entry in manifest {
            if cancel.load(Ordering::Relaxed) {
                tracing::warn!("ingestion cancelled, stopping before next document");
                report.cancelled = true;
                break;
            }

            let pdf_name = resolve_pdf_name(&entry.pdf_name);

            if skip_if_exists && self.index.is_document_indexed(&pdf_name).await? {
                tracing::debug!(%pdf_name, "already indexed, skipping");
                report.skipped += 1;
                continue;
            }

            match self.ingest_one(entry, &pdf_name).await {
                Ok(chunk_count) => {
                    tracing::info!(%pdf_name, chunk_count, "indexed document");
                    report.indexed += 1;
                }
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    tracing::warn!(%pdf_name, error = %e, "failed to ingest document");
                    let retryable = e.is_retryable();
                    report.failures.push((pdf_name, e.to_string()));
                    if retryable {
                        // Repeated failures against an external store in a
                        // tight loop invite rate limiting.
                        tokio::time::sleep(STORE_BACKOFF).await;
                    }
                }
            }
        }

        Ok(report)
    }

    async fn ingest_one(
        &self,
        entry: &ManifestEntry,
        pdf_name: &str,
    ) -> Result<usize, PipelineError> {
        let pdf_path = self.config.library.pdf_dir.join(pdf_name);
        let text = loader::load(&pdf_path)?;

        let record = self.cache.get(pdf_name);
        if record.is_none() {
            tracing::debug!(%pdf_name, "no cached metadata, indexing without it");
        }

        let document_id = self
            .index
            .upsert_document(pdf_name, &entry.title, record.as_ref())
            .await?;

        let chunks = chunk::chunk_and_embed(
            self.embedder,
            &document_id,
            &text,
            &self.config.chunking,
            self.config.embedding.batch_size,
        )
        .await?;

        if chunks.is_empty() {
            return Err(PipelineError::Unexpected(format!(
                "document {} produced no chunks",
                pdf_name
            )));
        }

        self.upsert_with_retry(&chunks).await?;
        Ok(chunks.len())
    }

    /// Bounded exponential backoff around the chunk upsert: 1s, 2s, ... up to
    /// [`UPSERT_ATTEMPTS`] tries. Safe because the upsert is idempotent under
    /// the `(document_id, chunk_index)` key.
    async fn upsert_with_retry(
        &self,
        chunks: &[crate::models::DocumentChunk],
    ) -> Result<(), PipelineError> {
        let mut last_err = None;

        for attempt in 0..UPSERT_ATTEMPTS {
            if attempt > 0 {
                let delay = Duration::from_secs(1 << (attempt - 1).min(3));
                tracing::debug!(attempt, delay_secs = delay.as_secs(), "retrying chunk upsert");
                tokio::time::sleep(delay).await;
            }

            match self.index.upsert_chunks(chunks).await {
                Ok(()) => return Ok(()),
                Err(e) if e.is_retryable() => last_err = Some(e),
                Err(e) => return Err(e),
            }
        }

        Err(last_err
            .unwrap_or_else(|| PipelineError::Transient("chunk upsert failed".to_string())))
    }
}
