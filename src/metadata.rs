//! Filesystem-backed cache of per-document bibliographic metadata.
//!
//! The reference manager is queried once, out of band; each document's record
//! lands in `<cache_dir>/<basename>.json`. A present cache file means the
//! remote fetch may be skipped. An absent file is a normal low-information
//! state, not a failure — ingestion and analysis proceed without metadata.

use std::path::{Path, PathBuf};

use crate::models::BibRecord;

#[derive(Clone, Debug)]
pub struct MetadataCache {
    root: PathBuf,
}

impl MetadataCache {
    /// Creates a cache rooted at the provided directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Cache file path for a PDF filename: the basename with a `.json`
    /// extension. The filename is the stable join key between manifest rows
    /// and records — never list position.
    pub fn cache_path(&self, pdf_name: &str) -> PathBuf {
        let stem = pdf_name.strip_suffix(".pdf").unwrap_or(pdf_name);
        self.root.join(format!("{}.json", stem))
    }

    /// Returns the cached record for a document, or `None` when no cache file
    /// exists. A file that exists but does not parse is reported and treated
    /// as absent.
    pub fn get(&self, pdf_name: &str) -> Option<BibRecord> {
        let raw = self.get_raw(pdf_name)?;
        match BibRecord::from_raw(raw) {
            Some(record) => Some(record),
            None => {
                tracing::warn!(pdf_name, "cached metadata is missing expected fields");
                None
            }
        }
    }

    /// Returns the unparsed cached JSON value, for embedding whole records
    /// into prompts.
    pub fn get_raw(&self, pdf_name: &str) -> Option<serde_json::Value> {
        let path = self.cache_path(pdf_name);
        let content = std::fs::read_to_string(&path).ok()?;
        match serde_json::from_str(&content) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "unreadable metadata cache file");
                None
            }
        }
    }
}

impl BibRecord {
    /// Parses a reference-manager item. The upstream shape nests the fields
    /// of interest under `data`; the full item is retained in `raw`.
    pub fn from_raw(raw: serde_json::Value) -> Option<Self> {
        let data = raw.get("data")?;
        let key = data
            .get("key")
            .or_else(|| raw.get("key"))?
            .as_str()?
            .to_string();
        let title = data.get("title")?.as_str()?.to_string();

        let authors = data
            .get("creators")
            .and_then(|c| c.as_array())
            .map(|creators| {
                creators
                    .iter()
                    .filter_map(|c| {
                        if let Some(name) = c.get("name").and_then(|n| n.as_str()) {
                            return Some(name.to_string());
                        }
                        let first = c.get("firstName").and_then(|n| n.as_str()).unwrap_or("");
                        let last = c.get("lastName").and_then(|n| n.as_str()).unwrap_or("");
                        let full = format!("{} {}", first, last).trim().to_string();
                        (!full.is_empty()).then_some(full)
                    })
                    .collect()
            })
            .unwrap_or_default();

        let tags = data
            .get("tags")
            .and_then(|t| t.as_array())
            .map(|tags| {
                tags.iter()
                    .filter_map(|t| t.get("tag").and_then(|s| s.as_str()))
                    .map(|s| s.to_string())
                    .collect()
            })
            .unwrap_or_default();

        let year = data
            .get("date")
            .and_then(|d| d.as_str())
            .and_then(parse_year);

        Some(BibRecord {
            key,
            title,
            authors,
            tags,
            year,
            raw,
        })
    }
}

/// Pulls the first four-digit run out of a free-form date string.
fn parse_year(date: &str) -> Option<i32> {
    let digits: Vec<char> = date.chars().collect();
    for window in digits.windows(4) {
        if window.iter().all(|c| c.is_ascii_digit()) {
            return window.iter().collect::<String>().parse().ok();
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_item() -> serde_json::Value {
        json!({
            "key": "ABCD1234",
            "data": {
                "key": "ABCD1234",
                "title": "Nuanced Expression Synthesis with Diffusion Models",
                "date": "2023-06-15",
                "creators": [
                    {"creatorType": "author", "firstName": "Ana", "lastName": "Silva"},
                    {"creatorType": "author", "name": "Research Lab Collective"}
                ],
                "tags": [{"tag": "diffusion"}, {"tag": "faces"}]
            }
        })
    }

    #[test]
    fn parses_full_record() {
        let record = BibRecord::from_raw(sample_item()).unwrap();
        assert_eq!(record.key, "ABCD1234");
        assert_eq!(record.authors, vec!["Ana Silva", "Research Lab Collective"]);
        assert_eq!(record.tags, vec!["diffusion", "faces"]);
        assert_eq!(record.year, Some(2023));
    }

    #[test]
    fn absent_cache_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let cache = MetadataCache::new(dir.path());
        assert!(cache.get("never_fetched.pdf").is_none());
    }

    #[test]
    fn present_cache_file_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let cache = MetadataCache::new(dir.path());
        std::fs::write(
            cache.cache_path("paper.pdf"),
            serde_json::to_string(&sample_item()).unwrap(),
        )
        .unwrap();

        let record = cache.get("paper.pdf").unwrap();
        assert_eq!(record.year, Some(2023));
        assert!(cache.get_raw("paper.pdf").is_some());
    }

    #[test]
    fn malformed_cache_file_is_treated_as_absent() {
        let dir = tempfile::tempdir().unwrap();
        let cache = MetadataCache::new(dir.path());
        std::fs::write(cache.cache_path("broken.pdf"), "{not json").unwrap();
        assert!(cache.get("broken.pdf").is_none());
    }

    #[test]
    fn year_parsing_tolerates_free_form_dates() {
        assert_eq!(parse_year("2021"), Some(2021));
        assert_eq!(parse_year("June 2019"), Some(2019));
        assert_eq!(parse_year("n.d."), None);
    }
}
