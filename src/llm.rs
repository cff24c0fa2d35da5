//! Language model client.
//!
//! The [`ChatModel`] trait is the seam the extraction, analysis, and answer
//! services call through; tests substitute scripted responses. The OpenAI
//! implementation posts to `/v1/chat/completions` with the same retry policy
//! as the embedding client: 429/5xx and network errors retry with exponential
//! backoff, other client errors fail immediately, and a missed deadline
//! surfaces as a `Timeout` instead of hanging.

use std::time::Duration;

use async_trait::async_trait;

use crate::config::LlmConfig;
use crate::error::PipelineError;

#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Sends one system instruction plus one user message and returns the
    /// generated text verbatim.
    async fn complete(&self, system: &str, user: &str) -> Result<String, PipelineError>;
}

#[derive(Debug)]
pub struct OpenAiChat {
    model: String,
    api_key: String,
    max_retries: u32,
    timeout: Duration,
    client: reqwest::Client,
}

impl OpenAiChat {
    /// Fails at construction when the credential is absent — a configuration
    /// error, raised before any document is touched.
    pub fn new(config: &LlmConfig) -> Result<Self, PipelineError> {
        let api_key = config.api_key()?;
        let timeout = Duration::from_secs(config.timeout_secs);
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PipelineError::Unexpected(e.to_string()))?;

        Ok(Self {
            model: config.model.clone(),
            api_key,
            max_retries: config.max_retries,
            timeout,
            client,
        })
    }
}

#[async_trait]
impl ChatModel for OpenAiChat {
    async fn complete(&self, system: &str, user: &str) -> Result<String, PipelineError> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": system},
                {"role": "user", "content": user}
            ],
        });

        let mut last_err = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = Duration::from_secs(1 << (attempt - 1).min(5));
                tokio::time::sleep(delay).await;
            }

            let resp = self
                .client
                .post("https://api.openai.com/v1/chat/completions")
                .header("Authorization", format!("Bearer {}", self.api_key))
                .header("Content-Type", "application/json")
                .json(&body)
                .send()
                .await;

            match resp {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        let json: serde_json::Value = response
                            .json()
                            .await
                            .map_err(|e| PipelineError::Transient(e.to_string()))?;
                        return parse_chat_response(&json);
                    }

                    if status.as_u16() == 429 || status.is_server_error() {
                        let body_text = response.text().await.unwrap_or_default();
                        last_err = Some(PipelineError::Transient(format!(
                            "chat API error {}: {}",
                            status, body_text
                        )));
                        continue;
                    }

                    let body_text = response.text().await.unwrap_or_default();
                    return Err(PipelineError::Unexpected(format!(
                        "chat API error {}: {}",
                        status, body_text
                    )));
                }
                Err(e) if e.is_timeout() => {
                    last_err = Some(PipelineError::Timeout(self.timeout));
                    continue;
                }
                Err(e) => {
                    last_err = Some(PipelineError::Transient(e.to_string()));
                    continue;
                }
            }
        }

        Err(last_err
            .unwrap_or_else(|| PipelineError::Transient("chat completion failed after retries".into())))
    }
}

fn parse_chat_response(json: &serde_json::Value) -> Result<String, PipelineError> {
    json.get("choices")
        .and_then(|c| c.as_array())
        .and_then(|c| c.first())
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|c| c.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| {
            PipelineError::MalformedOutput("chat response missing message content".to_string())
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_chat_response_content() {
        let json = serde_json::json!({
            "choices": [{"message": {"role": "assistant", "content": "hello"}}]
        });
        assert_eq!(parse_chat_response(&json).unwrap(), "hello");
    }

    #[test]
    fn missing_content_is_malformed() {
        let json = serde_json::json!({"choices": []});
        assert!(matches!(
            parse_chat_response(&json),
            Err(PipelineError::MalformedOutput(_))
        ));
    }

    #[test]
    fn missing_credential_is_fatal_at_construction() {
        let config = LlmConfig {
            api_key_env: "PAPERDEX_TEST_KEY_THAT_IS_NOT_SET".to_string(),
            ..LlmConfig::default()
        };
        let err = OpenAiChat::new(&config).unwrap_err();
        assert!(err.is_fatal());
    }
}
