//! Outbound chat-completion call.
//!
//! [`CompletionProvider`] is the seam the request handler talks to;
//! [`OpenAiChatProvider`] is the production implementation. One request is
//! issued per call: no retries, no streaming.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::prompt::ChatMessage;

pub const OPENAI_CHAT_COMPLETIONS_URL: &str = "https://api.openai.com/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "gpt-4.1-mini";
pub const TEMPERATURE: f32 = 0.65;
pub const MAX_TOKENS: u32 = 650;

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// The provider answered with a non-success status. `body` is its raw
    /// error text, possibly empty.
    #[error("provider returned HTTP {status}")]
    Status { status: u16, body: String },
    /// Connect failure, timeout or an undecodable envelope.
    #[error("provider request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

#[async_trait::async_trait]
pub trait CompletionProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Send `messages` and return the trimmed text of the first choice.
    /// A reply without content yields an empty string.
    async fn complete(
        &self,
        api_key: &str,
        messages: &[ChatMessage],
    ) -> Result<String, ProviderError>;
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    #[serde(default)]
    message: Option<ChoiceMessage>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

impl ChatCompletionResponse {
    fn first_content(self) -> String {
        self.choices
            .into_iter()
            .next()
            .and_then(|c| c.message)
            .and_then(|m| m.content)
            .map(|s| s.trim().to_string())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone)]
pub struct OpenAiChatProvider {
    url: String,
    model: String,
    client: reqwest::Client,
}

impl OpenAiChatProvider {
    pub fn new(
        url: impl Into<String>,
        model: impl Into<String>,
        timeout: Option<Duration>,
    ) -> Result<Self, ProviderError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            url: url.into(),
            model: model.into(),
            client: builder.build()?,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait::async_trait]
impl CompletionProvider for OpenAiChatProvider {
    fn name(&self) -> &str {
        "openai"
    }

    async fn complete(
        &self,
        api_key: &str,
        messages: &[ChatMessage],
    ) -> Result<String, ProviderError> {
        let body = ChatCompletionRequest {
            model: &self.model,
            messages,
            temperature: TEMPERATURE,
            max_tokens: MAX_TOKENS,
        };
        let resp = self
            .client
            .post(&self.url)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            tracing::warn!(provider = %self.name(), status = status.as_u16(), "provider returned non-success status");
            return Err(ProviderError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let envelope: ChatCompletionResponse = resp.json().await?;
        Ok(envelope.first_content())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_body_has_fixed_sampling_parameters() {
        let messages = vec![ChatMessage::system("rules"), ChatMessage::user("eggs")];
        let body = ChatCompletionRequest {
            model: DEFAULT_MODEL,
            messages: &messages,
            temperature: TEMPERATURE,
            max_tokens: MAX_TOKENS,
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["model"], "gpt-4.1-mini");
        assert_eq!(value["max_tokens"], 650);
        assert!((value["temperature"].as_f64().unwrap() - 0.65).abs() < 1e-6);
        assert_eq!(
            value["messages"],
            json!([
                {"role": "system", "content": "rules"},
                {"role": "user", "content": "eggs"}
            ])
        );
    }

    #[test]
    fn first_content_is_trimmed() {
        let envelope: ChatCompletionResponse = serde_json::from_value(json!({
            "choices": [
                {"message": {"role": "assistant", "content": "  {\"title\":\"x\"}\n"}},
                {"message": {"content": "ignored"}}
            ]
        }))
        .unwrap();
        assert_eq!(envelope.first_content(), "{\"title\":\"x\"}");
    }

    #[test]
    fn missing_content_becomes_empty() {
        let envelope: ChatCompletionResponse = serde_json::from_value(json!({})).unwrap();
        assert_eq!(envelope.first_content(), "");
        let envelope: ChatCompletionResponse =
            serde_json::from_value(json!({"choices": [{"message": {"content": null}}]})).unwrap();
        assert_eq!(envelope.first_content(), "");
    }
}
