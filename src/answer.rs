//! Retrieval-augmented answer synthesis.
//!
//! Retrieves the top-ranked chunks for a question, assembles a context block
//! bounded by the model's input budget (lowest-ranked chunks are dropped
//! first), and asks the chat model for a grounded, cited answer. When
//! retrieval comes back empty the prompt says so explicitly — the system
//! instruction then requires an "insufficient information" answer instead of
//! a hallucinated one.

use crate::config::RetrievalConfig;
use crate::error::PipelineError;
use crate::llm::ChatModel;
use crate::models::RetrievedChunk;
use crate::prompts;
use crate::search::Retrieval;

pub struct Synthesizer<'a> {
    retrieval: Retrieval<'a>,
    chat: &'a dyn ChatModel,
    config: &'a RetrievalConfig,
}

impl<'a> Synthesizer<'a> {
    pub fn new(
        retrieval: Retrieval<'a>,
        chat: &'a dyn ChatModel,
        config: &'a RetrievalConfig,
    ) -> Self {
        Self {
            retrieval,
            chat,
            config,
        }
    }

    /// Answers a free-text question against the indexed corpus, returning the
    /// model's text verbatim.
    pub async fn answer(&self, query: &str) -> Result<String, PipelineError> {
        let chunks = self.retrieval.search(query, self.config.top_k).await?;
        let context = build_context(&chunks, self.config.max_context_chars);
        let user = prompts::answer_prompt(&context, query);
        self.chat.complete(prompts::ANSWER_SYSTEM_PROMPT, &user).await
    }
}

/// Assembles the context block from ranked chunks, newest-ranked first,
/// stopping once the character budget is reached. Zero chunks produce the
/// explicit no-context notice rather than an empty string.
pub fn build_context(chunks: &[RetrievedChunk], budget_chars: usize) -> String {
    if chunks.is_empty() {
        return prompts::NO_CONTEXT_NOTICE.to_string();
    }

    let mut out = String::new();
    for chunk in chunks {
        let source = chunk.title.as_deref().unwrap_or(&chunk.pdf_name);
        let entry = format!(
            "[source: {}, part {}]\n{}\n\n",
            source, chunk.chunk_index, chunk.text
        );
        if !out.is_empty() && out.len() + entry.len() > budget_chars {
            break;
        }
        out.push_str(&entry);
    }

    out.trim_end().to_string()
}
