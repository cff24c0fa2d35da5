//! Semantic chunking.
//!
//! Splits extracted document text into sentences, then merges adjacent
//! sentences into one chunk while they stay semantically close to the chunk
//! built so far. Closeness is cosine similarity between the sentence's
//! embedding and the running mean of the chunk's sentence embeddings, against
//! a configurable threshold — chunk size is coherence-driven, not a fixed
//! token count. Each finished chunk is embedded independently.
//!
//! Re-running on identical text with the same embedder yields the same chunks
//! in the same order, so re-upserting under `(document_id, chunk_index)`
//! overwrites instead of duplicating.

use crate::config::ChunkingConfig;
use crate::embedding::{cosine_similarity, Embedder};
use crate::error::PipelineError;
use crate::models::DocumentChunk;

/// Splits text into sentence-sized segments.
///
/// Boundaries are `.`, `!`, `?` followed by whitespace, plus blank lines
/// (paragraph breaks always end a sentence). Extraction noise means this is
/// approximate; the merge step tolerates fragments.
pub fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();

    for paragraph in text.split("\n\n") {
        let flat = paragraph.split_whitespace().collect::<Vec<_>>().join(" ");
        if flat.is_empty() {
            continue;
        }

        let mut start = 0usize;
        let chars: Vec<(usize, char)> = flat.char_indices().collect();
        for (pos, &(byte_idx, c)) in chars.iter().enumerate() {
            if matches!(c, '.' | '!' | '?') {
                let at_end = pos + 1 == chars.len();
                let followed_by_space = chars.get(pos + 1).map(|&(_, n)| n == ' ').unwrap_or(false);
                if at_end || followed_by_space {
                    let end = byte_idx + c.len_utf8();
                    let sentence = flat[start..end].trim();
                    if !sentence.is_empty() {
                        sentences.push(sentence.to_string());
                    }
                    start = end;
                }
            }
        }

        let tail = flat[start..].trim();
        if !tail.is_empty() {
            sentences.push(tail.to_string());
        }
    }

    sentences
}

/// Groups sentences into chunks by the similarity threshold. Pure with
/// respect to the provided sentence vectors, which makes the merge decision
/// unit-testable without an embedding backend.
fn merge_sentences(
    sentences: &[String],
    vectors: &[Vec<f32>],
    config: &ChunkingConfig,
) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current_text = String::new();
    let mut centroid: Vec<f32> = Vec::new();
    let mut members = 0usize;

    for (sentence, vector) in sentences.iter().zip(vectors.iter()) {
        if current_text.is_empty() {
            current_text = sentence.clone();
            centroid = vector.clone();
            members = 1;
            continue;
        }

        let similar = cosine_similarity(&centroid, vector) >= config.similarity_threshold;
        let fits = current_text.len() + 1 + sentence.len() <= config.max_chunk_chars;

        if similar && fits {
            current_text.push(' ');
            current_text.push_str(sentence);
            // Running mean keeps the merge criterion anchored to the whole
            // chunk rather than only the previous sentence.
            for (c, v) in centroid.iter_mut().zip(vector.iter()) {
                *c = (*c * members as f32 + v) / (members + 1) as f32;
            }
            members += 1;
        } else {
            chunks.push(std::mem::take(&mut current_text));
            current_text = sentence.clone();
            centroid = vector.clone();
            members = 1;
        }
    }

    if !current_text.is_empty() {
        chunks.push(current_text);
    }

    chunks
}

/// Chunks `text` and embeds every chunk. Returns chunks with contiguous
/// indices starting at 0; empty or whitespace-only text yields no chunks.
pub async fn chunk_and_embed(
    embedder: &dyn Embedder,
    document_id: &str,
    text: &str,
    config: &ChunkingConfig,
    batch_size: usize,
) -> Result<Vec<DocumentChunk>, PipelineError> {
    let sentences = split_sentences(text);
    if sentences.is_empty() {
        return Ok(Vec::new());
    }

    let mut sentence_vectors = Vec::with_capacity(sentences.len());
    for batch in sentences.chunks(batch_size.max(1)) {
        let vectors = embedder.embed(batch).await?;
        sentence_vectors.extend(vectors);
    }

    let merged = merge_sentences(&sentences, &sentence_vectors, config);

    let mut chunk_vectors = Vec::with_capacity(merged.len());
    for batch in merged.chunks(batch_size.max(1)) {
        let vectors = embedder.embed(batch).await?;
        chunk_vectors.extend(vectors);
    }

    let chunks = merged
        .into_iter()
        .zip(chunk_vectors)
        .enumerate()
        .map(|(idx, (text, embedding))| DocumentChunk {
            document_id: document_id.to_string(),
            chunk_index: idx as i64,
            metadata: serde_json::json!({ "chars": text.len() }),
            text,
            embedding,
        })
        .collect();

    Ok(chunks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    /// Deterministic bag-of-words embedder: same text, same vector.
    struct MockEmbedder;

    #[async_trait]
    impl Embedder for MockEmbedder {
        fn model_name(&self) -> &str {
            "mock"
        }
        fn dims(&self) -> usize {
            8
        }
        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, PipelineError> {
            Ok(texts.iter().map(|t| mock_vector(t)).collect())
        }
    }

    fn mock_vector(text: &str) -> Vec<f32> {
        let mut v = vec![0.0f32; 8];
        for word in text.to_lowercase().split_whitespace() {
            let mut h = 2166136261u32;
            for b in word.bytes() {
                h ^= b as u32;
                h = h.wrapping_mul(16777619);
            }
            v[(h % 8) as usize] += 1.0;
        }
        v
    }

    fn config(threshold: f32) -> ChunkingConfig {
        ChunkingConfig {
            similarity_threshold: threshold,
            max_chunk_chars: 2800,
        }
    }

    #[test]
    fn splits_on_terminators_and_paragraphs() {
        let text = "First sentence. Second sentence! Third?\n\nNew paragraph without terminator";
        let sentences = split_sentences(text);
        assert_eq!(
            sentences,
            vec![
                "First sentence.",
                "Second sentence!",
                "Third?",
                "New paragraph without terminator"
            ]
        );
    }

    #[test]
    fn split_is_whitespace_insensitive() {
        let a = split_sentences("One two.   Three four.");
        let b = split_sentences("One two.\nThree four.");
        assert_eq!(a, b);
    }

    #[test]
    fn similar_sentences_merge_into_one_chunk() {
        let sentences = vec!["alpha beta.".to_string(), "gamma delta.".to_string()];
        let vectors = vec![vec![1.0, 0.2, 0.0], vec![0.9, 0.3, 0.0]];
        let merged = merge_sentences(&sentences, &vectors, &config(0.5));
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0], "alpha beta. gamma delta.");
    }

    #[test]
    fn dissimilar_sentences_stay_apart() {
        let sentences = vec![
            "neural rendering of faces.".to_string(),
            "sqlite journal checkpoint.".to_string(),
        ];
        let vectors = vec![vec![1.0, 0.0, 0.0], vec![0.0, 1.0, 0.0]];
        let merged = merge_sentences(&sentences, &vectors, &config(0.5));
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn size_cap_forces_a_flush() {
        let sentences = vec!["same words here.".to_string(), "same words here.".to_string()];
        let vectors = vec![vec![1.0, 0.0], vec![1.0, 0.0]];
        let cfg = ChunkingConfig {
            similarity_threshold: 0.0,
            max_chunk_chars: 20,
        };
        let merged = merge_sentences(&sentences, &vectors, &cfg);
        assert_eq!(merged.len(), 2);
    }

    #[tokio::test]
    async fn chunk_and_embed_is_deterministic_with_contiguous_indices() {
        let text = "Facial expression synthesis has advanced. Diffusion models drive it. \
                    Meanwhile database tuning differs entirely. Indexes and journals matter.";
        let cfg = config(0.3);

        let a = chunk_and_embed(&MockEmbedder, "doc1", text, &cfg, 64)
            .await
            .unwrap();
        let b = chunk_and_embed(&MockEmbedder, "doc1", text, &cfg, 2)
            .await
            .unwrap();

        assert!(!a.is_empty());
        assert_eq!(a.len(), b.len());
        for (i, (x, y)) in a.iter().zip(b.iter()).enumerate() {
            assert_eq!(x.chunk_index, i as i64);
            assert_eq!(x.text, y.text);
            assert_eq!(x.embedding, y.embedding);
        }
    }

    #[tokio::test]
    async fn empty_text_yields_no_chunks() {
        let cfg = config(0.5);
        let chunks = chunk_and_embed(&MockEmbedder, "doc1", "   \n\n  ", &cfg, 64)
            .await
            .unwrap();
        assert!(chunks.is_empty());
    }
}
