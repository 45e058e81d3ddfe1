use async_trait::async_trait;

use crate::{
    chat::{ChatMessage, ChatProvider, ChatResponse},
    error::LLMError,
};

use super::wrapper::ResilientLLM;

#[async_trait]
impl ChatProvider for ResilientLLM {
    async fn chat(&self, messages: &[ChatMessage]) -> Result<Box<dyn ChatResponse>, LLMError> {
        self.retry(|| self.inner.chat(messages)).await
    }

    async fn generate_response(&self, messages: &[ChatMessage]) -> Result<String, LLMError> {
        self.retry(|| self.inner.generate_response(messages)).await
    }

    fn provider_name(&self) -> &str {
        self.inner.provider_name()
    }

    fn model(&self) -> &str {
        self.inner.model()
    }

    fn available_models(&self) -> Vec<String> {
        self.inner.available_models()
    }
}
