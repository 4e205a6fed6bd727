use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use url::Url;

use super::prompt::ChatCompletionRequest;
use crate::config::AppConfig;

#[derive(Debug, thiserror::Error)]
pub enum InferenceError {
    #[error("Inference transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Inference service returned {status}: {message}")]
    Status { status: u16, message: String },
    #[error("Inference service returned no content")]
    EmptyReply,
    #[error("Invalid inference endpoint: {0}")]
    Endpoint(#[from] url::ParseError),
}

impl InferenceError {
    /// Likely cause, for the operator log.
    pub fn hint(&self) -> &'static str {
        match self {
            InferenceError::Status { status: 401 | 403, .. } => "check the API key",
            InferenceError::Status { status: 404, .. } => "check that the key has access to the model",
            InferenceError::Status { status: 429, .. } => "quota or rate limit exceeded",
            InferenceError::Status { .. } => "inference service error",
            InferenceError::Transport(e) if e.is_timeout() => "inference request timed out",
            InferenceError::Transport(_) => "network failure reaching the inference service",
            InferenceError::EmptyReply => "model returned an empty message",
            InferenceError::Endpoint(_) => "check OPENAI_BASE_URL",
        }
    }
}

/// Chat-completion backend used by the analysis endpoint.
#[async_trait]
pub trait VisionClient: Send + Sync {
    /// Sends one request and returns the text of the first choice.
    async fn complete(&self, request: &ChatCompletionRequest) -> Result<String, InferenceError>;
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ReplyMessage,
}

#[derive(Deserialize)]
struct ReplyMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Client for OpenAI-compatible `/chat/completions` endpoints.
#[derive(Clone)]
pub struct OpenAiVisionClient {
    http: reqwest::Client,
    api_key: String,
    completions_url: Url,
}

impl OpenAiVisionClient {
    pub fn new(config: &AppConfig) -> Result<Self, InferenceError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.settings.inference.timeout_secs))
            .build()?;
        let completions_url = config.base_url.join("chat/completions")?;
        Ok(Self {
            http,
            api_key: config.api_key.clone(),
            completions_url,
        })
    }
}

#[async_trait]
impl VisionClient for OpenAiVisionClient {
    async fn complete(&self, request: &ChatCompletionRequest) -> Result<String, InferenceError> {
        log::debug!("Chat completion request: {}", request.summary());

        let response = self
            .http
            .post(self.completions_url.clone())
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(InferenceError::Status {
                status: status.as_u16(),
                message: error_message(&body),
            });
        }

        let body: ChatCompletionResponse = response.json().await?;
        let content = body
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or(InferenceError::EmptyReply)?;

        log::debug!("Chat completion returned {} chars", content.chars().count());
        Ok(content)
    }
}

fn error_message(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return "empty response body".to_string();
    }
    serde_json::from_str::<Value>(trimmed)
        .ok()
        .and_then(|value| {
            value
                .pointer("/error/message")
                .and_then(|v| v.as_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| trimmed.chars().take(500).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_message_prefers_api_error_field() {
        let body = r#"{"error":{"message":"Incorrect API key provided","type":"invalid_request_error"}}"#;
        assert_eq!(error_message(body), "Incorrect API key provided");
        assert_eq!(error_message("  "), "empty response body");
        assert_eq!(error_message("bad gateway"), "bad gateway");
    }

    #[test]
    fn hints_name_the_likely_cause() {
        let unauthorized = InferenceError::Status {
            status: 401,
            message: String::new(),
        };
        assert_eq!(unauthorized.hint(), "check the API key");
        assert_eq!(InferenceError::EmptyReply.hint(), "model returned an empty message");
    }

    #[test]
    fn completions_url_is_joined_to_base() {
        let config = AppConfig::from_lookup(|key| match key {
            "OPENAI_API_KEY" => Some("sk-test".to_string()),
            "OPENAI_BASE_URL" => Some("https://proxy.example.com/openai/v1".to_string()),
            _ => None,
        })
        .unwrap();
        let client = OpenAiVisionClient::new(&config).unwrap();
        assert_eq!(
            client.completions_url.as_str(),
            "https://proxy.example.com/openai/v1/chat/completions"
        );
    }
}
