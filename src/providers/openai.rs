use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::OpenAiConfig;
use crate::error::{Result, ServeError};
use crate::providers::types::{ChatMessage, Prompt};
use crate::providers::{ModelHandle, error_excerpt};

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Chat model served by the OpenAI chat-completions API
pub struct OpenAiModel {
    name: String,
    model: String,
    api_key: String,
    url: String,
    temperature: Option<f32>,
    client: reqwest::Client,
}

impl OpenAiModel {
    /// Build the handle. No request is made until the first `invoke`.
    pub fn new(model: &str, api_key: String, config: &OpenAiConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            name: format!("openai/{}", model),
            model: model.to_string(),
            api_key,
            url: format!(
                "{}/v1/chat/completions",
                config.endpoint.trim_end_matches('/')
            ),
            temperature: config.temperature,
            client,
        })
    }
}

#[async_trait]
impl ModelHandle for OpenAiModel {
    async fn invoke(&self, prompt: &Prompt) -> Result<String> {
        let request = ChatCompletionRequest {
            model: &self.model,
            messages: &prompt.messages,
            temperature: self.temperature,
        };

        tracing::debug!(model = %self.name, url = %self.url, "Sending OpenAI chat completion");

        let resp = self
            .client
            .post(&self.url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await
            .map_err(|e| ServeError::ModelInvocation(format!("OpenAI request failed: {}", e)))?;

        let status = resp.status();
        let text = resp.text().await.map_err(|e| {
            ServeError::ModelInvocation(format!("Failed to read OpenAI response: {}", e))
        })?;

        if !status.is_success() {
            return Err(ServeError::ModelInvocation(format!(
                "OpenAI returned {}: {}",
                status.as_u16(),
                error_excerpt(&text)
            )));
        }

        let parsed: ChatCompletionResponse = serde_json::from_str(&text).map_err(|e| {
            ServeError::ModelInvocation(format!("Malformed OpenAI response: {}", e))
        })?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| {
                ServeError::ModelInvocation("OpenAI response contained no message content".to_string())
            })
    }

    fn name(&self) -> &str {
        &self.name
    }
}
