//! Anthropic Messages API client.
//!
//! System messages are lifted out of the conversation into the top-level
//! `system` field, which is where the Messages API expects them.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::{
    chat::{split_system, ChatMessage, ChatProvider, ChatResponse},
    error::LLMError,
};

use super::http::{client_with_timeout, decode_response, trace_payload};

const PROVIDER_NAME: &str = "Anthropic";
const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const DEFAULT_MODEL: &str = "claude-3-opus";
const DEFAULT_MAX_TOKENS: u32 = 1000;
const API_VERSION: &str = "2023-06-01";

/// Configuration for the Anthropic client.
#[derive(Debug)]
pub struct AnthropicConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: Option<f32>,
    pub timeout_seconds: Option<u64>,
}

/// Client for Anthropic's Claude models.
#[derive(Debug, Clone)]
pub struct Anthropic {
    pub config: Arc<AnthropicConfig>,
    pub client: Client,
}

#[derive(Serialize)]
struct AnthropicMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<AnthropicMessage<'a>>,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Deserialize, Debug)]
struct AnthropicResponse {
    content: Vec<AnthropicContent>,
}

#[derive(Deserialize, Debug)]
struct AnthropicContent {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

impl std::fmt::Display for AnthropicResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

impl ChatResponse for AnthropicResponse {
    fn text(&self) -> Option<String> {
        self.content
            .iter()
            .find(|block| block.kind == "text")
            .and_then(|block| block.text.clone())
    }
}

impl Anthropic {
    pub fn new(
        api_key: impl Into<String>,
        base_url: Option<String>,
        model: Option<String>,
        max_tokens: Option<u32>,
        temperature: Option<f32>,
        timeout_seconds: Option<u64>,
    ) -> Self {
        Self {
            config: Arc::new(AnthropicConfig {
                api_key: api_key.into(),
                base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
                model: model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
                max_tokens: max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
                temperature,
                timeout_seconds,
            }),
            client: client_with_timeout(timeout_seconds),
        }
    }
}

#[async_trait]
impl ChatProvider for Anthropic {
    async fn chat(&self, messages: &[ChatMessage]) -> Result<Box<dyn ChatResponse>, LLMError> {
        if self.config.api_key.is_empty() {
            return Err(LLMError::AuthError("Missing Anthropic API key".to_string()));
        }

        let (system, rest) = split_system(messages);
        let body = AnthropicRequest {
            model: &self.config.model,
            system,
            messages: rest
                .into_iter()
                .map(|m| AnthropicMessage {
                    role: m.role.as_str(),
                    content: &m.content,
                })
                .collect(),
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
        };
        trace_payload(PROVIDER_NAME, &body);

        let url = format!("{}/v1/messages", self.config.base_url.trim_end_matches('/'));
        let mut request = self
            .client
            .post(url)
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&body);

        if let Some(timeout) = self.config.timeout_seconds {
            request = request.timeout(std::time::Duration::from_secs(timeout));
        }

        let resp = request.send().await?;
        let parsed: AnthropicResponse = decode_response(resp, PROVIDER_NAME).await?;
        Ok(Box::new(parsed))
    }

    fn provider_name(&self) -> &str {
        PROVIDER_NAME
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    fn available_models(&self) -> Vec<String> {
        ["claude-3-opus", "claude-3-sonnet", "claude-3-haiku"]
            .iter()
            .map(|m| m.to_string())
            .collect()
    }
}
