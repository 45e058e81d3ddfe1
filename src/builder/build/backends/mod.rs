mod anthropic;
mod azure;
mod google;
mod openai;

use crate::{builder::LLMBackend, chat::ChatProvider, error::LLMError};

use crate::builder::state::BuilderState;

pub(super) fn build_backend(
    state: &mut BuilderState,
    backend: LLMBackend,
) -> Result<Box<dyn ChatProvider>, LLMError> {
    match backend {
        LLMBackend::OpenAI => openai::build_openai(state),
        LLMBackend::Meta => openai::build_meta(state),
        LLMBackend::Anthropic => anthropic::build_anthropic(state),
        LLMBackend::Google => google::build_google(state),
        LLMBackend::AzureOpenAI => azure::build_azure_openai(state),
        LLMBackend::AwsBedrock => azure::build_bedrock(state),
    }
}
