//! Agents and the loop that makes two of them talk.

mod agent;
mod chatbot;
mod events;
mod interaction;
mod turn;

pub use agent::Agent;
pub use chatbot::Chatbot;
pub use events::{InteractionEvent, StopCause};
pub use interaction::{
    interact, InteractionConfig, InteractionLoop, InteractionOutcome, DEFAULT_START_MESSAGE,
};
pub use turn::{Transcript, Turn};

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;

    use crate::chat::{ChatMessage, ChatProvider, ChatResponse, ChatRole, TextResponse};
    use crate::error::LLMError;

    type Reply = dyn Fn(&[ChatMessage]) -> Result<String, LLMError> + Send + Sync;

    /// Provider double answering from a closure and recording every request.
    pub(crate) struct ScriptedProvider {
        reply: Box<Reply>,
        calls: Arc<Mutex<Vec<Vec<ChatMessage>>>>,
    }

    impl ScriptedProvider {
        pub(crate) fn from_fn(
            reply: impl Fn(&[ChatMessage]) -> Result<String, LLMError> + Send + Sync + 'static,
        ) -> Self {
            Self {
                reply: Box::new(reply),
                calls: Arc::new(Mutex::new(Vec::new())),
            }
        }

        /// Answers "echo: <last user message>".
        pub(crate) fn echo() -> Self {
            Self::from_fn(|messages| {
                let last = messages
                    .iter()
                    .rev()
                    .find(|m| m.role == ChatRole::User)
                    .map(|m| m.content.clone())
                    .unwrap_or_default();
                Ok(format!("echo: {last}"))
            })
        }

        pub(crate) fn constant(text: &str) -> Self {
            let text = text.to_string();
            Self::from_fn(move |_| Ok(text.clone()))
        }

        pub(crate) fn failing(error: fn() -> LLMError) -> Self {
            Self::from_fn(move |_| Err(error()))
        }

        pub(crate) fn calls(&self) -> Arc<Mutex<Vec<Vec<ChatMessage>>>> {
            Arc::clone(&self.calls)
        }
    }

    #[async_trait]
    impl ChatProvider for ScriptedProvider {
        async fn chat(&self, messages: &[ChatMessage]) -> Result<Box<dyn ChatResponse>, LLMError> {
            self.calls.lock().unwrap().push(messages.to_vec());
            let text = (self.reply)(messages)?;
            Ok(Box::new(TextResponse(Some(text))))
        }

        fn provider_name(&self) -> &str {
            "Scripted"
        }

        fn model(&self) -> &str {
            "scripted-1"
        }
    }
}
