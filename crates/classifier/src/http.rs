//! HTTP classifier for OpenAI-compatible chat-completions endpoints.
//!
//! Sends the prompt as a single user message, asks for a JSON object
//! response, and extracts the first choice's content. Transient failures
//! are retried with exponential backoff up to the configured attempt count.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::client::{Classifier, ClassifierError};
use crate::config::ClassifierConfig;

/// Classifier backed by `POST {base_url}/chat/completions`.
pub struct ChatCompletionsClassifier {
    client: reqwest::Client,
    config: ClassifierConfig,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

impl ChatCompletionsClassifier {
    /// Create a classifier with its own connection pool.
    pub fn new(config: ClassifierConfig) -> Result<Self, ClassifierError> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }

    async fn attempt(&self, prompt: &str) -> Result<Value, ClassifierError> {
        let body = json!({
            "model": self.config.model,
            "messages": [{"role": "user", "content": prompt}],
            "response_format": {"type": "json_object"},
            "temperature": 0,
        });

        let mut request = self
            .client
            .post(format!("{}/chat/completions", self.config.base_url))
            .timeout(self.config.timeout)
            .json(&body);
        if !self.config.api_key.is_empty() {
            request = request.bearer_auth(&self.config.api_key);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                ClassifierError::Timeout(self.config.timeout)
            } else {
                ClassifierError::Request(e)
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClassifierError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let chat: ChatResponse = response.json().await?;
        let content = chat
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or(ClassifierError::EmptyResponse)?;

        parse_json_content(&content)
    }
}

#[async_trait]
impl Classifier for ChatCompletionsClassifier {
    async fn classify(&self, prompt: &str) -> Result<Value, ClassifierError> {
        let mut attempt = 1;
        loop {
            match self.attempt(prompt).await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && attempt < self.config.max_attempts => {
                    let delay = self.config.retry_delay(attempt);
                    tracing::warn!(
                        attempt,
                        max_attempts = self.config.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Transient classification failure, retrying",
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Parse a model answer as JSON, tolerating a surrounding Markdown code
/// fence.
pub fn parse_json_content(content: &str) -> Result<Value, ClassifierError> {
    let trimmed = strip_code_fence(content.trim());
    serde_json::from_str(trimmed).map_err(|e| ClassifierError::InvalidJson(e.to_string()))
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    // Drop an optional language tag on the opening fence line.
    let rest = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => rest,
    };
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_json() {
        let v = parse_json_content(r#" {"items": []} "#).unwrap();
        assert_eq!(v, json!({"items": []}));
    }

    #[test]
    fn parses_fenced_json() {
        let v = parse_json_content("```json\n{\"items\": [1]}\n```").unwrap();
        assert_eq!(v, json!({"items": [1]}));

        let v = parse_json_content("```\n{\"a\": true}\n```").unwrap();
        assert_eq!(v, json!({"a": true}));
    }

    #[test]
    fn rejects_prose() {
        let err = parse_json_content("Sure! Here are your items.").unwrap_err();
        assert!(matches!(err, ClassifierError::InvalidJson(_)));
    }
}
