//! Reqwest-based client for an OpenAI-compatible chat-completions endpoint.
//!
//! The endpoint contract is plain request/response text: no streaming, no
//! structured output schema. A missing credential is detected before any
//! HTTP call so a keyless session degrades to an inline warning per turn.

use std::time::Duration;

use anyhow::Result;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::Config;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self { role, content: content.into() }
    }
}

#[derive(Debug, Clone)]
pub struct ChatOptions {
    pub model: String,
    pub temperature: f32,
    pub top_p: f32,
    pub max_tokens: Option<u32>,
}

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("no API key configured; set OPENAI_API_KEY or enter one in the sidebar")]
    MissingApiKey,
    #[error("model call failed: {0}")]
    Upstream(String),
}

#[derive(Debug, Clone)]
pub struct LlmClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl LlmClient {
    /// Build a client against an explicit endpoint, outside the config
    /// layer. `None` for the key yields a client that fails every call
    /// with `MissingApiKey` without touching the network.
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()?;
        Ok(Self { http, base_url: base_url.into(), api_key })
    }

    pub fn from_config(cfg: &Config) -> Result<Self> {
        let timeout = cfg
            .get("REQUEST_TIMEOUT")
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(60);
        let api_base_url = cfg.get("API_BASE_URL").unwrap_or_else(|| "default".into());
        let mut base_url = if api_base_url == "default" {
            "https://api.openai.com/v1".to_string()
        } else {
            api_base_url
        };
        let trimmed = base_url.trim_end_matches('/');
        if !trimmed.ends_with("/v1") && !trimmed.contains("/v1/") {
            base_url = format!("{}/v1", trimmed);
        } else {
            base_url = trimmed.to_string();
        }
        let api_key = cfg.get("OPENAI_API_KEY").filter(|k| !k.trim().is_empty());

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout))
            .build()?;

        Ok(Self { http, base_url, api_key })
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Replace the credential at runtime (sidebar key entry).
    pub fn set_api_key(&mut self, key: String) {
        let key = key.trim().to_string();
        self.api_key = if key.is_empty() { None } else { Some(key) };
    }

    /// One-shot completion: send the messages, return the assistant text.
    pub async fn complete(
        &self,
        messages: &[ChatMessage],
        opts: &ChatOptions,
    ) -> Result<String, LlmError> {
        let key = self.api_key.as_ref().ok_or(LlmError::MissingApiKey)?;

        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let hv = HeaderValue::from_str(&format!("Bearer {}", key))
            .map_err(|e| LlmError::Upstream(e.to_string()))?;
        headers.insert(AUTHORIZATION, hv);

        let mut body = serde_json::json!({
            "model": opts.model,
            "temperature": opts.temperature,
            "top_p": opts.top_p,
            "messages": messages,
        });
        if let Some(max) = opts.max_tokens {
            body["max_tokens"] = serde_json::json!(max);
        }

        let resp = self
            .http
            .post(url)
            .headers(headers)
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::Upstream(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let detail = resp.text().await.unwrap_or_default();
            let detail = detail.chars().take(200).collect::<String>();
            return Err(LlmError::Upstream(format!("{}: {}", status, detail)));
        }

        let completion: Completion = resp
            .json()
            .await
            .map_err(|e| LlmError::Upstream(format!("malformed completion: {}", e)))?;
        completion
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| LlmError::Upstream("completion had no choices".into()))
    }
}

#[derive(Debug, Deserialize)]
struct Completion {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: CompletionMessage,
}

#[derive(Debug, Deserialize)]
struct CompletionMessage {
    content: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keyless_client() -> LlmClient {
        LlmClient::new("https://api.openai.com/v1", None).unwrap()
    }

    #[tokio::test]
    async fn missing_key_short_circuits_before_any_request() {
        let client = keyless_client();
        let opts = ChatOptions {
            model: "gpt-4o".into(),
            temperature: 0.0,
            top_p: 1.0,
            max_tokens: None,
        };
        let err = client
            .complete(&[ChatMessage::new(Role::User, "hi")], &opts)
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::MissingApiKey));
    }

    #[test]
    fn set_api_key_ignores_blank_input() {
        let mut client = keyless_client();
        client.set_api_key("   ".into());
        assert!(!client.has_api_key());
        client.set_api_key("sk-test".into());
        assert!(client.has_api_key());
    }
}
