use crate::{chat::ChatProvider, error::LLMError};

use super::super::llm_builder::LLMBuilder;
use super::super::state::BuilderState;
use super::{backends, helpers, wrappers};

impl LLMBuilder {
    /// Builds the configured provider.
    ///
    /// Fails with [`LLMError::InvalidRequest`] when no backend is set, when
    /// the backend needs credentials that were not supplied, or when the
    /// backend's cargo feature is disabled.
    pub fn build(self) -> Result<Box<dyn ChatProvider>, LLMError> {
        self.state.build()
    }
}

impl BuilderState {
    pub(super) fn build(mut self) -> Result<Box<dyn ChatProvider>, LLMError> {
        helpers::log_builder_state(&self);
        let backend = self
            .backend
            .take()
            .ok_or_else(|| LLMError::InvalidRequest("No backend specified".to_string()))?;

        let provider = backends::build_backend(&mut self, backend)?;
        let provider = wrappers::wrap_with_resilience(&mut self, provider);
        Ok(provider)
    }
}
