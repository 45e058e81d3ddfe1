use crate::{chat::ChatProvider, error::LLMError};

#[cfg(any(feature = "openai", feature = "meta"))]
use super::super::helpers;
use crate::builder::state::BuilderState;

#[cfg(feature = "openai")]
pub(super) fn build_openai(state: &mut BuilderState) -> Result<Box<dyn ChatProvider>, LLMError> {
    let api_key = helpers::require_api_key(state, "OpenAI")?;
    let timeout = helpers::timeout_or_default(state);

    let provider = crate::backends::openai::OpenAI::new(
        api_key,
        state.base_url.take(),
        state.model.take(),
        state.max_tokens,
        state.temperature,
        timeout,
    );

    Ok(Box::new(provider))
}

#[cfg(not(feature = "openai"))]
pub(super) fn build_openai(_state: &mut BuilderState) -> Result<Box<dyn ChatProvider>, LLMError> {
    Err(LLMError::InvalidRequest(
        "OpenAI feature not enabled".to_string(),
    ))
}

#[cfg(feature = "meta")]
pub(super) fn build_meta(state: &mut BuilderState) -> Result<Box<dyn ChatProvider>, LLMError> {
    let api_key = helpers::require_api_key(state, "Meta")?;
    let timeout = helpers::timeout_or_default(state);

    let provider = crate::backends::meta::Meta::new(
        api_key,
        state.base_url.take(),
        state.model.take(),
        state.max_tokens,
        state.temperature,
        timeout,
    );

    Ok(Box::new(provider))
}

#[cfg(not(feature = "meta"))]
pub(super) fn build_meta(_state: &mut BuilderState) -> Result<Box<dyn ChatProvider>, LLMError> {
    Err(LLMError::InvalidRequest(
        "Meta feature not enabled".to_string(),
    ))
}
