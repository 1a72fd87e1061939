use rustc_hash::FxHashMap;
use serde_json::{Value, json};
use std::time::Duration;
use url::Url;

use crate::error::{Result, ServeError};
use crate::router::table::normalize_path;
use crate::server::routes::InvokeResponse;

/// Client for a running chainserve instance
pub struct InvokeClient {
    base_url: Url,
    http: reqwest::Client,
}

impl InvokeClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let mut base_url = Url::parse(base_url)
            .map_err(|e| ServeError::Other(format!("Invalid server URL '{}': {}", base_url, e)))?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(300))
            .build()?;

        Ok(Self { base_url, http })
    }

    fn invoke_url(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(&format!("{}/invoke", normalize_path(path)))
            .map_err(|e| ServeError::Other(format!("Invalid route path '{}': {}", path, e)))
    }

    /// Post named fields to `/{path}/invoke` and return the output text
    pub async fn invoke(&self, path: &str, fields: &FxHashMap<String, String>) -> Result<String> {
        self.send(path, json!({ "input": fields })).await
    }

    /// Post a bare string; the route's template must have exactly one field
    pub async fn invoke_text(&self, path: &str, text: &str) -> Result<String> {
        self.send(path, json!({ "input": text })).await
    }

    async fn send(&self, path: &str, body: Value) -> Result<String> {
        let url = self.invoke_url(path)?;
        tracing::debug!("POST {}", url);

        let resp = self.http.post(url).json(&body).send().await?;
        let status = resp.status();
        let text = resp.text().await?;

        if !status.is_success() {
            let detail = serde_json::from_str::<Value>(&text)
                .ok()
                .and_then(|v| v.get("detail").and_then(Value::as_str).map(str::to_string))
                .unwrap_or(text);
            return Err(ServeError::Remote {
                status: status.as_u16(),
                detail,
            });
        }

        let parsed: InvokeResponse = serde_json::from_str(&text)?;
        Ok(parsed.output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invoke_url() {
        let client = InvokeClient::new("http://localhost:8000").unwrap();
        assert_eq!(
            client.invoke_url("/essay").unwrap().as_str(),
            "http://localhost:8000/essay/invoke"
        );

        let client = InvokeClient::new("http://localhost:8000/api").unwrap();
        assert_eq!(
            client.invoke_url("poem/").unwrap().as_str(),
            "http://localhost:8000/api/poem/invoke"
        );
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(InvokeClient::new("not a url").is_err());
    }
}
