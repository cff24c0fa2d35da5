use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::PipelineError;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub library: LibraryConfig,
    pub db: DbConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub llm: LlmConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LibraryConfig {
    /// CSV manifest with `title` and `pdf_name` columns.
    pub manifest: PathBuf,
    /// Directory holding the PDF files named by the manifest.
    pub pdf_dir: PathBuf,
    /// Directory of per-document `<basename>.json` metadata cache files.
    pub metadata_cache_dir: PathBuf,
    /// Directory for extraction/analysis output artifacts.
    pub output_dir: PathBuf,
    /// Character encoding of the manifest file. Legacy exports use
    /// windows-1252 for typographic apostrophes and dashes.
    #[serde(default = "default_manifest_encoding")]
    pub manifest_encoding: String,
}

fn default_manifest_encoding() -> String {
    "windows-1252".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
    #[serde(default = "default_collection")]
    pub collection: String,
}

fn default_collection() -> String {
    "paper_library".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    /// Adjacent sentences merge into one chunk while their similarity to the
    /// running chunk stays at or above this threshold.
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f32,
    /// Hard upper bound on chunk size, in characters.
    #[serde(default = "default_max_chunk_chars")]
    pub max_chunk_chars: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: default_similarity_threshold(),
            max_chunk_chars: default_max_chunk_chars(),
        }
    }
}

fn default_similarity_threshold() -> f32 {
    0.5
}
fn default_max_chunk_chars() -> usize {
    2800
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_top_k")]
    pub top_k: i64,
    /// Budget for assembled answer context. Lowest-ranked chunks are dropped
    /// first when the retrieved set exceeds it.
    #[serde(default = "default_max_context_chars")]
    pub max_context_chars: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            max_context_chars: default_max_context_chars(),
        }
    }
}

fn default_top_k() -> i64 {
    50
}
fn default_max_context_chars() -> usize {
    24_000
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_embedding_model")]
    pub model: String,
    #[serde(default = "default_dims")]
    pub dims: usize,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_embed_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: default_embedding_model(),
            dims: default_dims(),
            batch_size: default_batch_size(),
            max_retries: default_max_retries(),
            timeout_secs: default_embed_timeout_secs(),
        }
    }
}

fn default_embedding_model() -> String {
    "text-embedding-3-small".to_string()
}
fn default_dims() -> usize {
    1536
}
fn default_batch_size() -> usize {
    64
}
fn default_max_retries() -> u32 {
    3
}
fn default_embed_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct LlmConfig {
    #[serde(default = "default_llm_model")]
    pub model: String,
    /// Environment variable holding the API credential.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_llm_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: default_llm_model(),
            api_key_env: default_api_key_env(),
            max_retries: default_max_retries(),
            timeout_secs: default_llm_timeout_secs(),
        }
    }
}

fn default_llm_model() -> String {
    "gpt-5-mini".to_string()
}
fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}
fn default_llm_timeout_secs() -> u64 {
    120
}

impl LlmConfig {
    /// Reads the API credential from the environment. A missing credential is
    /// a construction-time configuration error, never a per-item failure.
    pub fn api_key(&self) -> Result<String, PipelineError> {
        std::env::var(&self.api_key_env).map_err(|_| {
            PipelineError::Configuration(format!(
                "{} must be set in the environment",
                self.api_key_env
            ))
        })
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    if config.chunking.max_chunk_chars == 0 {
        anyhow::bail!("chunking.max_chunk_chars must be > 0");
    }
    if !(0.0..=1.0).contains(&config.chunking.similarity_threshold) {
        anyhow::bail!("chunking.similarity_threshold must be in [0.0, 1.0]");
    }
    if config.retrieval.top_k < 1 {
        anyhow::bail!("retrieval.top_k must be >= 1");
    }
    if config.embedding.dims == 0 {
        anyhow::bail!("embedding.dims must be > 0");
    }
    if encoding_rs::Encoding::for_label(config.library.manifest_encoding.as_bytes()).is_none() {
        anyhow::bail!(
            "library.manifest_encoding '{}' is not a known encoding label",
            config.library.manifest_encoding
        );
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(body: &str) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(body.as_bytes()).unwrap();
        f
    }

    #[test]
    fn minimal_config_gets_defaults() {
        let f = write_config(
            r#"
[library]
manifest = "library.csv"
pdf_dir = "pdfs"
metadata_cache_dir = "metadata_cache"
output_dir = "outputs"

[db]
path = "data/paperdex.sqlite"
"#,
        );
        let cfg = load_config(f.path()).unwrap();
        assert_eq!(cfg.library.manifest_encoding, "windows-1252");
        assert_eq!(cfg.db.collection, "paper_library");
        assert!((cfg.chunking.similarity_threshold - 0.5).abs() < f32::EPSILON);
        assert_eq!(cfg.retrieval.top_k, 50);
        assert_eq!(cfg.embedding.dims, 1536);
        assert_eq!(cfg.llm.api_key_env, "OPENAI_API_KEY");
    }

    #[test]
    fn bad_threshold_rejected() {
        let f = write_config(
            r#"
[library]
manifest = "library.csv"
pdf_dir = "pdfs"
metadata_cache_dir = "metadata_cache"
output_dir = "outputs"

[db]
path = "data/paperdex.sqlite"

[chunking]
similarity_threshold = 1.5
"#,
        );
        assert!(load_config(f.path()).is_err());
    }

    #[test]
    fn unknown_encoding_rejected() {
        let f = write_config(
            r#"
[library]
manifest = "library.csv"
pdf_dir = "pdfs"
metadata_cache_dir = "metadata_cache"
output_dir = "outputs"
manifest_encoding = "not-a-real-encoding"

[db]
path = "data/paperdex.sqlite"
"#,
        );
        assert!(load_config(f.path()).is_err());
    }
}
