use crate::{chat::ChatProvider, error::LLMError};

#[cfg(feature = "anthropic")]
use super::super::helpers;
use crate::builder::state::BuilderState;

#[cfg(feature = "anthropic")]
pub(super) fn build_anthropic(
    state: &mut BuilderState,
) -> Result<Box<dyn ChatProvider>, LLMError> {
    let api_key = helpers::require_api_key(state, "Anthropic")?;
    let timeout = helpers::timeout_or_default(state);

    let provider = crate::backends::anthropic::Anthropic::new(
        api_key,
        state.base_url.take(),
        state.model.take(),
        state.max_tokens,
        state.temperature,
        timeout,
    );

    Ok(Box::new(provider))
}

#[cfg(not(feature = "anthropic"))]
pub(super) fn build_anthropic(
    _state: &mut BuilderState,
) -> Result<Box<dyn ChatProvider>, LLMError> {
    Err(LLMError::InvalidRequest(
        "Anthropic feature not enabled".to_string(),
    ))
}
