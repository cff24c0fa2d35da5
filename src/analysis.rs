//! Parsing of narrative analysis responses.
//!
//! The analyzer prompt requires the questionnaire to arrive as a fenced JSON
//! block under a `## Question Answering` heading. The block is located by its
//! fence, parsed with serde, and shape-checked against [`QaAssessment`] —
//! any deviation is `MalformedOutput`, never a silent partial parse.

use crate::error::PipelineError;
use crate::models::{AnalysisResult, QaAssessment};

pub const QA_HEADING: &str = "## Question Answering";

/// Validates a full analysis response and extracts its questionnaire.
pub fn parse_analysis(markdown: &str) -> Result<AnalysisResult, PipelineError> {
    let assessment = parse_qa_block(markdown)?;
    Ok(AnalysisResult {
        markdown: markdown.to_string(),
        assessment,
    })
}

/// Extracts and validates the fenced questionnaire block.
pub fn parse_qa_block(markdown: &str) -> Result<QaAssessment, PipelineError> {
    let heading_at = markdown.find(QA_HEADING).ok_or_else(|| {
        PipelineError::MalformedOutput(format!("response is missing the '{}' section", QA_HEADING))
    })?;
    let section = &markdown[heading_at + QA_HEADING.len()..];

    let fence_open = section
        .find("```")
        .ok_or_else(|| {
            PipelineError::MalformedOutput(
                "questionnaire section has no fenced JSON block".to_string(),
            )
        })?;
    let after_fence = &section[fence_open + 3..];
    // Tolerate both ```json and a bare ``` fence.
    let body_start = after_fence.find('\n').ok_or_else(|| {
        PipelineError::MalformedOutput("unterminated questionnaire fence".to_string())
    })?;
    let body = &after_fence[body_start + 1..];
    let fence_close = body.find("```").ok_or_else(|| {
        PipelineError::MalformedOutput("unterminated questionnaire fence".to_string())
    })?;

    serde_json::from_str(&body[..fence_close]).map_err(|e| {
        PipelineError::MalformedOutput(format!("questionnaire block failed validation: {}", e))
    })
}
