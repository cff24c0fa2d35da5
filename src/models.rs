//! Core data models used throughout paperdex.
//!
//! These types represent the manifest rows, bibliographic records, chunks,
//! and per-document results that flow through the ingestion and retrieval
//! pipeline.

use serde::{Deserialize, Serialize};

/// One row of the library manifest: a paper title and the PDF filename that
/// holds it. The manifest is the source of truth for which documents exist.
#[derive(Debug, Clone, Deserialize)]
pub struct ManifestEntry {
    pub title: String,
    pub pdf_name: String,
}

/// Bibliographic record for one reference-manager entry, parsed from a cached
/// metadata file. `raw` keeps the full upstream item for prompt assembly.
#[derive(Debug, Clone, Serialize)]
pub struct BibRecord {
    pub key: String,
    pub title: String,
    pub authors: Vec<String>,
    pub tags: Vec<String>,
    pub year: Option<i32>,
    pub raw: serde_json::Value,
}

/// A chunk of a document's text with its embedding, ready for upsert.
/// `(document_id, chunk_index)` is the stable storage key; re-ingesting the
/// same document overwrites rather than duplicates.
#[derive(Debug, Clone)]
pub struct DocumentChunk {
    pub document_id: String,
    pub chunk_index: i64,
    pub text: String,
    pub embedding: Vec<f32>,
    pub metadata: serde_json::Value,
}

/// A chunk returned from semantic search, with provenance and score.
#[derive(Debug, Clone)]
pub struct RetrievedChunk {
    pub document_id: String,
    pub chunk_index: i64,
    pub text: String,
    pub title: Option<String>,
    pub pdf_name: String,
    pub score: f32,
}

/// Allowed answer literals for the analysis questionnaire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QaAnswer {
    Yes,
    Partially,
    Slightly,
    No,
}

/// The structured question-answering block every analysis response must carry.
/// Exactly these five keys, each valued with one of the four [`QaAnswer`]
/// literals — serde's `deny_unknown_fields` enforces the shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct QaAssessment {
    #[serde(rename = "Is it correlated with the research directly?")]
    pub correlated: QaAnswer,
    #[serde(rename = "Is the method well-explained and reproducible?")]
    pub reproducible: QaAnswer,
    #[serde(rename = "Does it compare against strong, state-of-the-art baselines?")]
    pub baselines: QaAnswer,
    #[serde(rename = "Does it use relevant techniques?")]
    pub techniques: QaAnswer,
    #[serde(rename = "Is the paper close to recent state-of-the-art?")]
    pub recency: QaAnswer,
}

/// Narrative analysis plus its parsed questionnaire.
#[derive(Debug, Clone)]
pub struct AnalysisResult {
    pub markdown: String,
    pub assessment: QaAssessment,
}
