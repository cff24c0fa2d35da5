//! Fixed prompt contracts for the extraction, analysis, and answer services.

/// System instruction for structured knowledge extraction. The response must
/// be a single JSON object so it can be persisted as-is.
pub const EXTRACTOR_SYSTEM_PROMPT: &str = r#"You are a specialist in evaluating and summarizing scientific papers focused on facial expression synthesis and related areas.
Your task is to extract the knowledge present in a scientific article, based on its content.

Extract the following fields from the provided paper:
- goals
- methodology
- contributions
- main_results
- limitations
- main_area
- keywords

Respond with a single valid JSON object whose keys are exactly the fields above.
Each value is a concise string (keywords is an array of strings).
Output only the JSON object, with no surrounding prose and no code fences."#;

/// System instruction for narrative analysis. The questionnaire block must be
/// emitted as a fenced JSON segment under the `## Question Answering` heading
/// so it can be parsed with a real JSON parser rather than sliced out of
/// prose.
pub const ANALYZER_SYSTEM_PROMPT: &str = r#"You are a specialist in evaluating and summarizing scientific papers focused on facial expression synthesis and related areas.
Evaluate the provided scientific article and discuss, in order, under these markdown headings:
## Paper content analysis
## Goals
## Methodology
## Contributions
## Main Results
## Limitations
## Summary
## Main Area
## Quality Assessment
## Keywords

Then answer five questions about the paper. Answer each with exactly one of
"Yes", "Partially", "Slightly", or "No" — where Yes means fully meets the
criteria, Partially means mostly meets it with some gaps, Slightly means
minimally meets it, and No means it does not meet it at all.

1. Is it correlated with the research directly?
   (does the paper address facial expression synthesis, especially nuanced expression synthesis)
2. Is the method well-explained and reproducible?
   (sufficient methodological detail for replication, and a direct link to code)
3. Does it compare against strong, state-of-the-art baselines?
4. Does it use relevant techniques?
   (deep learning models, diffusion models, GANs, or other pertinent methods)
5. Is the paper close to recent state-of-the-art?
   (published within the last 4 years and building on current research)

End the response with a final section in exactly this form:

## Question Answering
```json
{
    "Is it correlated with the research directly?": "...",
    "Is the method well-explained and reproducible?": "...",
    "Does it compare against strong, state-of-the-art baselines?": "...",
    "Does it use relevant techniques?": "...",
    "Is the paper close to recent state-of-the-art?": "..."
}
```

The fenced block must be valid JSON with exactly those five keys and no others.
Be concise and precise, use technical language appropriate for academic contexts."#;

/// System instruction for grounded question answering over the library.
pub const ANSWER_SYSTEM_PROMPT: &str = "You are a helpful research assistant that answers questions based on provided academic documents. \
Use only the supplied document excerpts; cite the source title of every claim. \
If the excerpts do not contain the answer, or no excerpts are supplied, say plainly that you do not have enough information in the library — never answer from general knowledge.";

/// Marker included in the answer prompt when retrieval produced nothing.
pub const NO_CONTEXT_NOTICE: &str =
    "(no matching excerpts were found in the knowledge base for this question)";

/// User message for extraction: the paper's full text.
pub fn extractor_prompt(paper_content: &str) -> String {
    format!("# PAPER CONTENT:\n{}", paper_content)
}

/// User message for analysis: cached metadata (may be empty) plus full text.
pub fn analyzer_prompt(paper_metadata: &serde_json::Value, paper_content: &str) -> String {
    format!(
        "# PAPER METADATA:\n{}\n# PAPER CONTENT:\n{}",
        paper_metadata, paper_content
    )
}

/// User message for answering: assembled excerpts plus the question.
pub fn answer_prompt(context: &str, query: &str) -> String {
    format!(
        "Based on the following academic documents, answer the user's question.\n\
         If the answer is not found in the documents, state that you don't have enough information.\n\n\
         Documents:\n{}\n\n\
         User Question: {}\n\n\
         Answer:",
        context, query
    )
}
