//! Meta Llama API client.
//!
//! The Llama API speaks the chat-completions wire format, so this is a thin
//! configuration over the OpenAI-compatible base with Meta's sampling
//! defaults.

use super::openai_compatible::{OpenAICompatibleProvider, OpenAIProviderConfig};

pub struct MetaConfig;

impl OpenAIProviderConfig for MetaConfig {
    const PROVIDER_NAME: &'static str = "Meta";
    const DEFAULT_BASE_URL: &'static str = "https://llama-api.meta.com/v1/";
    const DEFAULT_MODEL: &'static str = "llama-3-70b";
    const KNOWN_MODELS: &'static [&'static str] = &["llama-3-70b", "llama-3-8b", "llama-2-70b"];
    const DEFAULT_TEMPERATURE: Option<f32> = Some(0.7);
    const DEFAULT_MAX_TOKENS: Option<u32> = Some(800);
}

/// Client for Meta's hosted Llama models.
pub type Meta = OpenAICompatibleProvider<MetaConfig>;
