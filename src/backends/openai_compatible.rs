//! Shared client for chat-completions APIs that follow the OpenAI wire shape.
//!
//! Backends plug in through [`OpenAIProviderConfig`], which fixes the
//! provider name, default endpoint and default sampling settings.

use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::{
    chat::{ChatMessage, ChatProvider, ChatResponse},
    error::LLMError,
};

use super::http::{client_with_timeout, decode_response, trace_payload};

/// Compile-time description of an OpenAI-shaped provider.
pub trait OpenAIProviderConfig: Send + Sync + 'static {
    const PROVIDER_NAME: &'static str;
    const DEFAULT_BASE_URL: &'static str;
    const DEFAULT_MODEL: &'static str;
    const KNOWN_MODELS: &'static [&'static str];
    const DEFAULT_TEMPERATURE: Option<f32> = None;
    const DEFAULT_MAX_TOKENS: Option<u32> = None;
}

/// Runtime settings for an OpenAI-shaped provider.
#[derive(Debug)]
pub struct OpenAICompatibleConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    pub timeout_seconds: Option<u64>,
}

/// Generic chat-completions client, parameterised by provider config.
pub struct OpenAICompatibleProvider<T: OpenAIProviderConfig> {
    pub config: Arc<OpenAICompatibleConfig>,
    pub client: Client,
    _provider: PhantomData<T>,
}

impl<T: OpenAIProviderConfig> Clone for OpenAICompatibleProvider<T> {
    fn clone(&self) -> Self {
        Self {
            config: Arc::clone(&self.config),
            client: self.client.clone(),
            _provider: PhantomData,
        }
    }
}

#[derive(Serialize)]
pub(crate) struct OpenAIChatMessage<'a> {
    pub(crate) role: &'a str,
    pub(crate) content: &'a str,
}

#[derive(Serialize)]
pub(crate) struct OpenAIChatRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) model: Option<&'a str>,
    pub(crate) messages: Vec<OpenAIChatMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) max_tokens: Option<u32>,
}

#[derive(Deserialize, Debug)]
pub(crate) struct OpenAIChatResponse {
    choices: Vec<OpenAIChatChoice>,
}

#[derive(Deserialize, Debug)]
struct OpenAIChatChoice {
    message: OpenAIChatMsg,
}

#[derive(Deserialize, Debug)]
struct OpenAIChatMsg {
    content: Option<String>,
}

impl std::fmt::Display for OpenAIChatResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

impl ChatResponse for OpenAIChatResponse {
    fn text(&self) -> Option<String> {
        self.choices
            .first()
            .and_then(|c| c.message.content.clone())
            .filter(|content| !content.is_empty())
    }
}

pub(crate) fn to_wire_messages(messages: &[ChatMessage]) -> Vec<OpenAIChatMessage<'_>> {
    messages
        .iter()
        .map(|m| OpenAIChatMessage {
            role: m.role.as_str(),
            content: &m.content,
        })
        .collect()
}

impl<T: OpenAIProviderConfig> OpenAICompatibleProvider<T> {
    pub fn new(
        api_key: impl Into<String>,
        base_url: Option<String>,
        model: Option<String>,
        max_tokens: Option<u32>,
        temperature: Option<f32>,
        timeout_seconds: Option<u64>,
    ) -> Self {
        Self::with_client(
            client_with_timeout(timeout_seconds),
            api_key,
            base_url,
            model,
            max_tokens,
            temperature,
            timeout_seconds,
        )
    }

    /// Creates a client around an existing HTTP client.
    pub fn with_client(
        client: Client,
        api_key: impl Into<String>,
        base_url: Option<String>,
        model: Option<String>,
        max_tokens: Option<u32>,
        temperature: Option<f32>,
        timeout_seconds: Option<u64>,
    ) -> Self {
        Self {
            config: Arc::new(OpenAICompatibleConfig {
                api_key: api_key.into(),
                base_url: base_url.unwrap_or_else(|| T::DEFAULT_BASE_URL.to_string()),
                model: model.unwrap_or_else(|| T::DEFAULT_MODEL.to_string()),
                max_tokens: max_tokens.or(T::DEFAULT_MAX_TOKENS),
                temperature: temperature.or(T::DEFAULT_TEMPERATURE),
                timeout_seconds,
            }),
            client,
            _provider: PhantomData,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    pub fn max_tokens(&self) -> Option<u32> {
        self.config.max_tokens
    }

    pub fn temperature(&self) -> Option<f32> {
        self.config.temperature
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        )
    }
}

#[async_trait]
impl<T: OpenAIProviderConfig> ChatProvider for OpenAICompatibleProvider<T> {
    async fn chat(&self, messages: &[ChatMessage]) -> Result<Box<dyn ChatResponse>, LLMError> {
        if self.config.api_key.is_empty() {
            return Err(LLMError::AuthError(format!(
                "Missing {} API key",
                T::PROVIDER_NAME
            )));
        }

        let body = OpenAIChatRequest {
            model: Some(&self.config.model),
            messages: to_wire_messages(messages),
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        };
        trace_payload(T::PROVIDER_NAME, &body);

        let mut request = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.config.api_key)
            .json(&body);

        if let Some(timeout) = self.config.timeout_seconds {
            request = request.timeout(std::time::Duration::from_secs(timeout));
        }

        let resp = request.send().await?;
        let parsed: OpenAIChatResponse = decode_response(resp, T::PROVIDER_NAME).await?;
        Ok(Box::new(parsed))
    }

    fn provider_name(&self) -> &str {
        T::PROVIDER_NAME
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    fn available_models(&self) -> Vec<String> {
        let mut models: Vec<String> = T::KNOWN_MODELS.iter().map(|m| m.to_string()).collect();
        if !models.iter().any(|m| m == &self.config.model) {
            models.push(self.config.model.clone());
        }
        models
    }
}
