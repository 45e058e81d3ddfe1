//! OpenAI API client built on the OpenAI-compatible base.

use super::openai_compatible::{OpenAICompatibleProvider, OpenAIProviderConfig};

/// OpenAI configuration for the generic provider
pub struct OpenAIConfig;

impl OpenAIProviderConfig for OpenAIConfig {
    const PROVIDER_NAME: &'static str = "OpenAI";
    const DEFAULT_BASE_URL: &'static str = "https://api.openai.com/v1/";
    const DEFAULT_MODEL: &'static str = "gpt-4";
    const KNOWN_MODELS: &'static [&'static str] = &["gpt-4", "gpt-3.5-turbo", "gpt-4-turbo"];
}

/// Client for the OpenAI chat completions API.
pub type OpenAI = OpenAICompatibleProvider<OpenAIConfig>;
