use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::OllamaConfig;
use crate::error::{Result, ServeError};
use crate::providers::types::{ChatMessage, Prompt};
use crate::providers::{ModelHandle, error_excerpt};

#[derive(Debug, Serialize)]
struct OllamaChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct OllamaChatResponse {
    message: Option<OllamaMessage>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OllamaMessage {
    content: String,
}

/// Model served by a local Ollama instance
pub struct OllamaModel {
    name: String,
    model: String,
    url: String,
    client: reqwest::Client,
}

impl OllamaModel {
    pub fn new(model: &str, config: &OllamaConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            name: format!("ollama/{}", model),
            model: model.to_string(),
            url: format!("{}/api/chat", config.endpoint.trim_end_matches('/')),
            client,
        })
    }
}

#[async_trait]
impl ModelHandle for OllamaModel {
    async fn invoke(&self, prompt: &Prompt) -> Result<String> {
        let request = OllamaChatRequest {
            model: &self.model,
            messages: &prompt.messages,
            stream: false,
        };

        tracing::debug!(model = %self.name, url = %self.url, "Sending Ollama chat request");

        let resp = self
            .client
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .map_err(|e| ServeError::ModelInvocation(format!("Ollama request failed: {}", e)))?;

        let status = resp.status();
        let text = resp.text().await.map_err(|e| {
            ServeError::ModelInvocation(format!("Failed to read Ollama response: {}", e))
        })?;

        if !status.is_success() {
            return Err(ServeError::ModelInvocation(format!(
                "Ollama returned {}: {}",
                status.as_u16(),
                error_excerpt(&text)
            )));
        }

        let parsed: OllamaChatResponse = serde_json::from_str(&text).map_err(|e| {
            ServeError::ModelInvocation(format!("Malformed Ollama response: {}", e))
        })?;

        match parsed {
            OllamaChatResponse {
                message: Some(message),
                ..
            } => Ok(message.content),
            OllamaChatResponse {
                error: Some(error), ..
            } => Err(ServeError::ModelInvocation(format!("Ollama error: {}", error))),
            _ => Err(ServeError::ModelInvocation(
                "Ollama response contained no message".to_string(),
            )),
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}
