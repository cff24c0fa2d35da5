//! PDF text extraction.
//!
//! A pure function of the file path. Extraction is deterministic for a fixed
//! byte stream but loses layout: callers must tolerate OCR artifacts and
//! reading-order errors, and must not assume page boundaries survive.

use std::path::Path;

use crate::error::PipelineError;

/// Extracts the full text of a PDF. Fails with `NotFound` when the path does
/// not resolve to a file, and refuses to return an empty body — image-only
/// scans produce no text and would otherwise index as blank documents.
pub fn load(path: &Path) -> Result<String, PipelineError> {
    if !path.is_file() {
        return Err(PipelineError::NotFound(path.display().to_string()));
    }

    let text = pdf_extract::extract_text(path).map_err(|e| {
        PipelineError::Unexpected(format!("PDF extraction failed for {}: {}", path.display(), e))
    })?;

    if text.trim().is_empty() {
        return Err(PipelineError::Unexpected(format!(
            "no text extracted from {}",
            path.display()
        )));
    }

    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_not_found() {
        let err = load(Path::new("/nonexistent/paper.pdf")).unwrap_err();
        assert!(matches!(err, PipelineError::NotFound(_)));
    }

    #[test]
    fn invalid_pdf_reports_extraction_failure() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        use std::io::Write;
        f.write_all(b"not a pdf").unwrap();
        let err = load(f.path()).unwrap_err();
        assert!(matches!(err, PipelineError::Unexpected(_)));
    }
}
