//! AWS Bedrock backend using the Converse API.
//!
//! Credentials are resolved by the AWS SDK default chain; only the region is
//! configured here. The SDK client is built lazily on first use.

use std::sync::Arc;

use async_trait::async_trait;
use aws_sdk_bedrockruntime::{
    types::{
        ContentBlock, ConversationRole, ConverseOutput, InferenceConfiguration, Message,
        SystemContentBlock,
    },
    Client as BedrockClient,
};
use tokio::sync::OnceCell;

use crate::{
    chat::{split_system, ChatMessage, ChatProvider, ChatResponse, ChatRole, TextResponse},
    error::LLMError,
};

const PROVIDER_NAME: &str = "AWS Bedrock";
const DEFAULT_MODEL: &str = "anthropic.claude-3-sonnet-20240229-v1:0";
const DEFAULT_REGION: &str = "us-east-1";

const KNOWN_MODELS: &[&str] = &[
    "anthropic.claude-3-sonnet-20240229-v1:0",
    "anthropic.claude-3-haiku-20240307-v1:0",
    "us.anthropic.claude-3-7-sonnet-20250219-v1:0",
    "amazon.titan-text-express-v1",
    "meta.llama-2-70b-chat-v1",
];

/// AWS Bedrock backend client
#[derive(Clone, Debug)]
pub struct BedrockBackend {
    client: Arc<OnceCell<BedrockClient>>,
    region: String,
    model: String,
    max_tokens: Option<u32>,
    temperature: Option<f32>,
}

impl BedrockBackend {
    pub fn new(
        region: Option<String>,
        model: Option<String>,
        max_tokens: Option<u32>,
        temperature: Option<f32>,
    ) -> Self {
        Self {
            client: Arc::new(OnceCell::new()),
            region: region.unwrap_or_else(|| DEFAULT_REGION.to_string()),
            model: model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            max_tokens,
            temperature,
        }
    }

    /// Get the AWS region
    pub fn region(&self) -> &str {
        &self.region
    }

    async fn get_client(&self) -> &BedrockClient {
        self.client
            .get_or_init(|| async {
                let config = aws_config::from_env()
                    .region(aws_config::Region::new(self.region.clone()))
                    .load()
                    .await;
                BedrockClient::new(&config)
            })
            .await
    }

    fn convert_message(msg: &ChatMessage) -> Result<Message, LLMError> {
        let role = match msg.role {
            ChatRole::Assistant => ConversationRole::Assistant,
            _ => ConversationRole::User,
        };
        Message::builder()
            .role(role)
            .content(ContentBlock::Text(msg.content.clone()))
            .build()
            .map_err(|e| LLMError::InvalidRequest(e.to_string()))
    }
}

#[async_trait]
impl ChatProvider for BedrockBackend {
    async fn chat(&self, messages: &[ChatMessage]) -> Result<Box<dyn ChatResponse>, LLMError> {
        let (system, rest) = split_system(messages);
        let converted = rest
            .into_iter()
            .map(Self::convert_message)
            .collect::<Result<Vec<_>, _>>()?;

        let client = self.get_client().await;
        let mut request = client
            .converse()
            .model_id(&self.model)
            .set_messages(Some(converted))
            .inference_config(
                InferenceConfiguration::builder()
                    .set_max_tokens(self.max_tokens.map(|t| t as i32))
                    .set_temperature(self.temperature)
                    .build(),
            );

        if let Some(system) = system {
            request = request.system(SystemContentBlock::Text(system));
        }

        log::trace!("{PROVIDER_NAME} converse request to {}", self.model);

        let response = request
            .send()
            .await
            .map_err(|e| LLMError::ProviderError(format!("{e:?}")))?;

        let text = match response.output() {
            Some(ConverseOutput::Message(msg)) => msg.content().iter().find_map(|block| {
                if let ContentBlock::Text(t) = block {
                    Some(t.clone())
                } else {
                    None
                }
            }),
            _ => None,
        };

        Ok(Box::new(TextResponse(text)))
    }

    fn provider_name(&self) -> &str {
        PROVIDER_NAME
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn available_models(&self) -> Vec<String> {
        KNOWN_MODELS.iter().map(|m| m.to_string()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let backend = BedrockBackend::new(None, None, None, None);
        assert_eq!(backend.region(), "us-east-1");
        assert_eq!(backend.model(), DEFAULT_MODEL);
        assert_eq!(backend.provider_name(), "AWS Bedrock");
        assert!(backend.available_models().contains(&DEFAULT_MODEL.to_string()));
    }

    #[test]
    fn assistant_messages_keep_their_role() {
        let msg = ChatMessage::assistant().content("hi").build();
        let converted = BedrockBackend::convert_message(&msg).unwrap();
        assert_eq!(converted.role(), &ConversationRole::Assistant);
    }
}
