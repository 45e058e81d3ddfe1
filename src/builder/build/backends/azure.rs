use crate::{chat::ChatProvider, error::LLMError};

#[cfg(feature = "azure_openai")]
use super::super::helpers;
use crate::builder::state::BuilderState;

#[cfg(feature = "azure_openai")]
pub(super) fn build_azure_openai(
    state: &mut BuilderState,
) -> Result<Box<dyn ChatProvider>, LLMError> {
    let endpoint = state.base_url.take().ok_or_else(|| {
        LLMError::InvalidRequest("No API endpoint provided for Azure OpenAI".into())
    })?;
    let api_key = helpers::require_api_key(state, "Azure OpenAI")?;
    let api_version = state.api_version.take().ok_or_else(|| {
        LLMError::InvalidRequest("No API version provided for Azure OpenAI".to_string())
    })?;
    let model = state.model.take();
    let deployment = state
        .deployment_id
        .take()
        .or_else(|| model.clone())
        .ok_or_else(|| {
            LLMError::InvalidRequest("No deployment ID provided for Azure OpenAI".into())
        })?;

    let timeout = helpers::timeout_or_default(state);
    let provider = crate::backends::azure_openai::AzureOpenAI::new(
        api_key,
        api_version,
        deployment,
        endpoint,
        model,
        state.max_tokens,
        state.temperature,
        timeout,
    );

    Ok(Box::new(provider))
}

#[cfg(not(feature = "azure_openai"))]
pub(super) fn build_azure_openai(
    _state: &mut BuilderState,
) -> Result<Box<dyn ChatProvider>, LLMError> {
    Err(LLMError::InvalidRequest(
        "Azure OpenAI feature not enabled".to_string(),
    ))
}

#[cfg(feature = "bedrock")]
pub(super) fn build_bedrock(state: &mut BuilderState) -> Result<Box<dyn ChatProvider>, LLMError> {
    let provider = crate::backends::aws::BedrockBackend::new(
        state.region.take(),
        state.model.take(),
        state.max_tokens,
        state.temperature,
    );

    Ok(Box::new(provider))
}

#[cfg(not(feature = "bedrock"))]
pub(super) fn build_bedrock(_state: &mut BuilderState) -> Result<Box<dyn ChatProvider>, LLMError> {
    Err(LLMError::InvalidRequest(
        "AWS Bedrock feature not enabled".to_string(),
    ))
}
