//! Batch extraction and analysis orchestration.
//!
//! Drives the per-document LLM pipelines across the whole library manifest.
//! Output artifacts on disk are the idempotency markers: a document whose
//! artifact exists is never reprocessed, and artifacts are written atomically
//! so a crash cannot fake one. Configuration errors abort the batch — they
//! mean nothing will work. Every other failure is reported for its document
//! and the batch moves on.
//!
//! Per-document states: `Pending → Done` when the artifact already exists,
//! otherwise `Pending → Processing → Done` or `Pending → Processing →
//! Failed`, with `Failed` non-terminal for the batch.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::analysis;
use crate::artifacts;
use crate::config::Config;
use crate::error::PipelineError;
use crate::llm::ChatModel;
use crate::loader;
use crate::manifest::resolve_pdf_name;
use crate::metadata::MetadataCache;
use crate::models::ManifestEntry;
use crate::prompts;

/// Which per-document pipeline a batch run drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineKind {
    /// Structured JSON extraction to `<stem>_extraction.json`.
    Extraction,
    /// Narrative analysis to `<stem>_analysis.md` plus `<stem>_qa.json`.
    Analysis,
}

impl PipelineKind {
    /// The artifact whose existence marks the document as processed.
    fn marker_path(&self, config: &Config, pdf_name: &str) -> PathBuf {
        match self {
            PipelineKind::Extraction => {
                artifacts::extraction_path(&config.library.output_dir, pdf_name)
            }
            PipelineKind::Analysis => {
                artifacts::analysis_path(&config.library.output_dir, pdf_name)
            }
        }
    }
}

#[derive(Debug, Default)]
pub struct BatchReport {
    pub done: usize,
    pub skipped: usize,
    pub cancelled: bool,
    /// `(pdf_name, error)` per failed document.
    pub failures: Vec<(String, String)>,
}

pub struct BatchRunner<'a> {
    chat: &'a dyn ChatModel,
    cache: &'a MetadataCache,
    config: &'a Config,
}

impl<'a> BatchRunner<'a> {
    pub fn new(chat: &'a dyn ChatModel, cache: &'a MetadataCache, config: &'a Config) -> Self {
        Self {
            chat,
            cache,
            config,
        }
    }

    /// Runs the chosen pipeline over every manifest entry. `cancel` is
    /// checked between items so a stop request takes effect at the next
    /// document boundary.
    pub async fn run_batch(
        &self,
        manifest: &[ManifestEntry],
        kind: PipelineKind,
        cancel: &AtomicBool,
    ) -> Result<BatchReport, PipelineError> {
        let mut report = BatchReport::default();
        let total = manifest.len();

        for (i, entry) in manifest.iter().enumerate() {
            if cancel.load(Ordering::Relaxed) {
                tracing::warn!("batch cancelled, stopping before next document");
                report.cancelled = true;
                break;
            }

            let pdf_name = resolve_pdf_name(&entry.pdf_name);
            tracing::info!(item = i + 1, total, %pdf_name, "processing manifest entry");

            let marker = kind.marker_path(self.config, &pdf_name);
            if marker.is_file() {
                tracing::debug!(marker = %marker.display(), "artifact exists, skipping");
                report.skipped += 1;
                continue;
            }

            let outcome = match kind {
                PipelineKind::Extraction => self.extract_one(&pdf_name).await,
                PipelineKind::Analysis => self.analyze_one(&pdf_name).await,
            };

            match outcome {
                Ok(()) => report.done += 1,
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    tracing::warn!(%pdf_name, error = %e, "document failed, continuing batch");
                    report.failures.push((pdf_name, e.to_string()));
                }
            }
        }

        Ok(report)
    }

    /// Extraction pipeline: PDF text → LLM → fixed-shape JSON artifact.
    async fn extract_one(&self, pdf_name: &str) -> Result<(), PipelineError> {
        let pdf_path = self.config.library.pdf_dir.join(pdf_name);
        let text = loader::load(&pdf_path)?;

        let response = self
            .chat
            .complete(prompts::EXTRACTOR_SYSTEM_PROMPT, &prompts::extractor_prompt(&text))
            .await?;

        let value: serde_json::Value = serde_json::from_str(response.trim()).map_err(|e| {
            PipelineError::MalformedOutput(format!("extraction response is not JSON: {}", e))
        })?;
        if !value.is_object() {
            return Err(PipelineError::MalformedOutput(
                "extraction response is not a JSON object".to_string(),
            ));
        }

        let path = artifacts::extraction_path(&self.config.library.output_dir, pdf_name);
        artifacts::write_json_atomic(&path, &value)?;
        tracing::info!(path = %path.display(), "wrote extraction artifact");
        Ok(())
    }

    /// Analysis pipeline: PDF text + cached metadata → LLM → validated
    /// narrative artifact and questionnaire artifact. The markdown (the
    /// idempotency marker) is written last so the marker implies the QA
    /// artifact also exists.
    async fn analyze_one(&self, pdf_name: &str) -> Result<(), PipelineError> {
        let pdf_path = self.config.library.pdf_dir.join(pdf_name);
        let text = loader::load(&pdf_path)?;
        let metadata = self
            .cache
            .get_raw(pdf_name)
            .unwrap_or_else(|| serde_json::json!({}));

        let response = self
            .chat
            .complete(
                prompts::ANALYZER_SYSTEM_PROMPT,
                &prompts::analyzer_prompt(&metadata, &text),
            )
            .await?;

        let result = analysis::parse_analysis(&response)?;

        let qa = artifacts::qa_path(&self.config.library.output_dir, pdf_name);
        artifacts::write_json_atomic(&qa, &result.assessment)?;

        let md = artifacts::analysis_path(&self.config.library.output_dir, pdf_name);
        artifacts::write_atomic(&md, result.markdown.as_bytes())?;
        tracing::info!(path = %md.display(), "wrote analysis artifacts");
        Ok(())
    }
}
