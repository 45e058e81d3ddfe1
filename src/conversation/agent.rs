use async_trait::async_trait;

use crate::error::GenerationError;

/// A conversational participant driven by the interaction loop.
///
/// Each call hands the agent the other side's latest message; the agent is
/// responsible for keeping whatever history it needs.
#[async_trait]
pub trait Agent: Send {
    fn name(&self) -> &str;

    async fn respond(&mut self, message: &str) -> Result<String, GenerationError>;
}

#[async_trait]
impl<T: Agent + ?Sized> Agent for Box<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    async fn respond(&mut self, message: &str) -> Result<String, GenerationError> {
        (**self).respond(message).await
    }
}
