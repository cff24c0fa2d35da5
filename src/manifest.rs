//! Library manifest loading and filename edge-case resolution.
//!
//! The manifest is a CSV export from the reference manager with `title` and
//! `pdf_name` columns. Legacy exports are windows-1252 encoded because some
//! filenames carry typographic apostrophes and dashes, so the bytes are
//! decoded with the configured encoding before CSV parsing.

use std::path::Path;

use crate::error::PipelineError;
use crate::models::ManifestEntry;

/// Known divergences between manifest `pdf_name` values and the actual names
/// on disk. A finite, auditable substitution table applied before filesystem
/// lookup — not general normalization.
const FILENAME_REWRITES: &[(&str, &str)] = &[
    ("Parkinsons's", "Parkinsons\u{2019}s"),
    ("diffusion-a", "diffusion\u{2013}a"),
];

/// Applies the rewrite table to a manifest filename. Names without a known
/// edge case pass through unchanged.
pub fn resolve_pdf_name(pdf_name: &str) -> String {
    let mut resolved = pdf_name.to_string();
    for (raw, corrected) in FILENAME_REWRITES {
        if resolved.contains(raw) {
            resolved = resolved.replace(raw, corrected);
        }
    }
    resolved
}

/// Loads the library manifest, decoding with `encoding_label` first.
/// Rows with an empty `pdf_name` are dropped — they have no document to
/// process. Row order is preserved.
pub fn load_manifest(path: &Path, encoding_label: &str) -> Result<Vec<ManifestEntry>, PipelineError> {
    if !path.is_file() {
        return Err(PipelineError::NotFound(path.display().to_string()));
    }

    let encoding = encoding_rs::Encoding::for_label(encoding_label.as_bytes()).ok_or_else(|| {
        PipelineError::Configuration(format!("unknown manifest encoding: {}", encoding_label))
    })?;

    let bytes = std::fs::read(path)?;
    let (decoded, _, had_errors) = encoding.decode(&bytes);
    if had_errors {
        tracing::warn!(
            manifest = %path.display(),
            encoding = encoding_label,
            "manifest contained bytes that did not decode cleanly"
        );
    }

    let mut reader = csv::Reader::from_reader(decoded.as_bytes());
    let mut entries = Vec::new();
    for record in reader.deserialize::<ManifestEntry>() {
        let entry = record
            .map_err(|e| PipelineError::Unexpected(format!("malformed manifest row: {}", e)))?;
        if entry.pdf_name.trim().is_empty() {
            continue;
        }
        entries.push(entry);
    }

    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn rewrite_table_fixes_known_edge_cases() {
        assert_eq!(
            resolve_pdf_name("Parkinsons's disease synthesis.pdf"),
            "Parkinsons\u{2019}s disease synthesis.pdf"
        );
        assert_eq!(
            resolve_pdf_name("wavelet diffusion-a survey.pdf"),
            "wavelet diffusion\u{2013}a survey.pdf"
        );
    }

    #[test]
    fn rewrite_table_passes_normal_names_through() {
        assert_eq!(resolve_pdf_name("plain paper.pdf"), "plain paper.pdf");
    }

    #[test]
    fn loads_utf8_manifest() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "title,pdf_name").unwrap();
        writeln!(f, "First Paper,first.pdf").unwrap();
        writeln!(f, "Missing File,").unwrap();
        writeln!(f, "Second Paper,second.pdf").unwrap();

        let entries = load_manifest(f.path(), "utf-8").unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].pdf_name, "first.pdf");
        assert_eq!(entries[1].title, "Second Paper");
    }

    #[test]
    fn decodes_windows_1252_bytes() {
        // 0x92 is the windows-1252 right single quotation mark.
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(b"title,pdf_name\n").unwrap();
        f.write_all(b"Parkinson\x92s Study,parkinson.pdf\n").unwrap();

        let entries = load_manifest(f.path(), "windows-1252").unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].title, "Parkinson\u{2019}s Study");
    }

    #[test]
    fn missing_manifest_is_not_found() {
        let err = load_manifest(Path::new("/nonexistent/library.csv"), "utf-8").unwrap_err();
        assert!(matches!(err, PipelineError::NotFound(_)));
    }
}
