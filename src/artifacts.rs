//! Output artifact paths and atomic persistence.
//!
//! Artifact existence is the idempotency marker the batch orchestrator
//! checks, so a partially written file must never look complete. Writes go
//! through a temp file in the target directory followed by an atomic rename.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::PipelineError;

fn stem(pdf_name: &str) -> &str {
    pdf_name.strip_suffix(".pdf").unwrap_or(pdf_name)
}

/// `<output_dir>/<stem>_extraction.json`
pub fn extraction_path(output_dir: &Path, pdf_name: &str) -> PathBuf {
    output_dir.join(format!("{}_extraction.json", stem(pdf_name)))
}

/// `<output_dir>/<stem>_analysis.md`
pub fn analysis_path(output_dir: &Path, pdf_name: &str) -> PathBuf {
    output_dir.join(format!("{}_analysis.md", stem(pdf_name)))
}

/// `<output_dir>/<stem>_qa.json`
pub fn qa_path(output_dir: &Path, pdf_name: &str) -> PathBuf {
    output_dir.join(format!("{}_qa.json", stem(pdf_name)))
}

/// Writes bytes to `path` atomically: temp file in the same directory, then
/// rename. A crash mid-write leaves only a temp file behind, never a
/// half-written artifact.
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), PipelineError> {
    let dir = path
        .parent()
        .ok_or_else(|| PipelineError::Unexpected(format!("no parent dir for {}", path.display())))?;
    std::fs::create_dir_all(dir)?;

    let tmp = tempfile::NamedTempFile::new_in(dir)?;
    std::fs::write(tmp.path(), contents)?;
    tmp.persist(path)
        .map_err(|e| PipelineError::Unexpected(format!("persisting {}: {}", path.display(), e)))?;
    Ok(())
}

/// Serializes `value` as pretty JSON and writes it atomically.
pub fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<(), PipelineError> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| PipelineError::Unexpected(e.to_string()))?;
    write_atomic(path, json.as_bytes())
}
