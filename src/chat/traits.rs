use async_trait::async_trait;

use crate::error::LLMError;

use super::message::ChatMessage;

pub trait ChatResponse: std::fmt::Debug + std::fmt::Display + Send + Sync {
    fn text(&self) -> Option<String>;
}

/// Trait for providers that support chat-style interactions.
///
/// This is the single capability the orchestration layer depends on; each
/// backend implements it and nothing above this seam knows which vendor is
/// on the other side.
#[async_trait]
pub trait ChatProvider: Sync + Send {
    async fn chat(&self, messages: &[ChatMessage]) -> Result<Box<dyn ChatResponse>, LLMError>;

    /// Sends the messages and returns the response text.
    ///
    /// A response without any text is reported as
    /// [`LLMError::ResponseFormatError`].
    async fn generate_response(&self, messages: &[ChatMessage]) -> Result<String, LLMError> {
        let response = self.chat(messages).await?;
        response.text().ok_or_else(|| LLMError::ResponseFormatError {
            message: format!("{} returned no text", self.provider_name()),
            raw_response: response.to_string(),
        })
    }

    /// Human readable provider name, e.g. "Azure OpenAI".
    fn provider_name(&self) -> &str;

    /// Model identifier requests are sent to.
    fn model(&self) -> &str;

    /// Models this backend is known to serve.
    fn available_models(&self) -> Vec<String> {
        vec![self.model().to_string()]
    }
}

#[async_trait]
impl<T: ChatProvider + ?Sized> ChatProvider for Box<T> {
    async fn chat(&self, messages: &[ChatMessage]) -> Result<Box<dyn ChatResponse>, LLMError> {
        (**self).chat(messages).await
    }

    async fn generate_response(&self, messages: &[ChatMessage]) -> Result<String, LLMError> {
        (**self).generate_response(messages).await
    }

    fn provider_name(&self) -> &str {
        (**self).provider_name()
    }

    fn model(&self) -> &str {
        (**self).model()
    }

    fn available_models(&self) -> Vec<String> {
        (**self).available_models()
    }
}

/// Plain text response used by backends whose payload is reduced to text
/// before it leaves the adapter.
#[derive(Debug, Clone)]
pub struct TextResponse(pub Option<String>);

impl std::fmt::Display for TextResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.0 {
            Some(text) => write!(f, "{text}"),
            None => write!(f, "No response content"),
        }
    }
}

impl ChatResponse for TextResponse {
    fn text(&self) -> Option<String> {
        self.0.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Silent;

    #[async_trait]
    impl ChatProvider for Silent {
        async fn chat(&self, _: &[ChatMessage]) -> Result<Box<dyn ChatResponse>, LLMError> {
            Ok(Box::new(TextResponse(None)))
        }

        fn provider_name(&self) -> &str {
            "Silent"
        }

        fn model(&self) -> &str {
            "none"
        }
    }

    #[tokio::test]
    async fn missing_text_is_a_format_error() {
        let err = Silent.generate_response(&[]).await.unwrap_err();
        assert!(matches!(err, LLMError::ResponseFormatError { .. }));
    }

    #[tokio::test]
    async fn boxed_provider_delegates() {
        let boxed: Box<dyn ChatProvider> = Box::new(Silent);
        assert_eq!(boxed.provider_name(), "Silent");
        assert_eq!(boxed.available_models(), vec!["none".to_string()]);
    }
}
