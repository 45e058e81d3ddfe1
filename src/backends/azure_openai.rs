//! Azure OpenAI client.
//!
//! Requests go to a named deployment rather than a model, authenticated with
//! the `api-key` header.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;

use crate::{
    chat::{ChatMessage, ChatProvider, ChatResponse},
    error::LLMError,
};

use super::http::{client_with_timeout, decode_response, trace_payload};
use super::openai_compatible::{to_wire_messages, OpenAIChatRequest, OpenAIChatResponse};

const PROVIDER_NAME: &str = "Azure OpenAI";
const DEFAULT_MODEL: &str = "gpt-4";

/// Configuration for the Azure OpenAI client.
#[derive(Debug)]
pub struct AzureOpenAIConfig {
    pub api_key: String,
    pub api_version: String,
    pub deployment_id: String,
    pub endpoint: String,
    /// Model served by the deployment, reported to callers only.
    pub model: String,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    pub timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct AzureOpenAI {
    pub config: Arc<AzureOpenAIConfig>,
    pub client: Client,
}

impl AzureOpenAI {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        api_key: impl Into<String>,
        api_version: impl Into<String>,
        deployment_id: impl Into<String>,
        endpoint: impl Into<String>,
        model: Option<String>,
        max_tokens: Option<u32>,
        temperature: Option<f32>,
        timeout_seconds: Option<u64>,
    ) -> Self {
        Self {
            config: Arc::new(AzureOpenAIConfig {
                api_key: api_key.into(),
                api_version: api_version.into(),
                deployment_id: deployment_id.into(),
                endpoint: endpoint.into(),
                model: model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
                max_tokens,
                temperature,
                timeout_seconds,
            }),
            client: client_with_timeout(timeout_seconds),
        }
    }

    pub fn deployment_id(&self) -> &str {
        &self.config.deployment_id
    }

    pub fn api_version(&self) -> &str {
        &self.config.api_version
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/openai/deployments/{}/chat/completions",
            self.config.endpoint.trim_end_matches('/'),
            self.config.deployment_id
        )
    }
}

#[async_trait]
impl ChatProvider for AzureOpenAI {
    async fn chat(&self, messages: &[ChatMessage]) -> Result<Box<dyn ChatResponse>, LLMError> {
        if self.config.api_key.is_empty() {
            return Err(LLMError::AuthError(
                "Missing Azure OpenAI API key".to_string(),
            ));
        }

        let body = OpenAIChatRequest {
            model: None,
            messages: to_wire_messages(messages),
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        };
        trace_payload(PROVIDER_NAME, &body);

        let mut request = self
            .client
            .post(self.endpoint())
            .query(&[("api-version", self.config.api_version.as_str())])
            .header("api-key", &self.config.api_key)
            .json(&body);

        if let Some(timeout) = self.config.timeout_seconds {
            request = request.timeout(std::time::Duration::from_secs(timeout));
        }

        let resp = request.send().await?;
        let parsed: OpenAIChatResponse = decode_response(resp, PROVIDER_NAME).await?;
        Ok(Box::new(parsed))
    }

    fn provider_name(&self) -> &str {
        PROVIDER_NAME
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    fn available_models(&self) -> Vec<String> {
        vec!["gpt-4".to_string(), "gpt-3.5-turbo".to_string()]
    }
}
