use std::fmt;

use crate::error::LLMError;

/// Supported LLM backend providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LLMBackend {
    AzureOpenAI,
    OpenAI,
    Anthropic,
    Google,
    Meta,
    AwsBedrock,
}

impl LLMBackend {
    pub const ALL: [LLMBackend; 6] = [
        LLMBackend::AzureOpenAI,
        LLMBackend::OpenAI,
        LLMBackend::Anthropic,
        LLMBackend::Google,
        LLMBackend::Meta,
        LLMBackend::AwsBedrock,
    ];

    /// Short name accepted on the command line and in config files.
    pub const fn as_str(&self) -> &'static str {
        match self {
            LLMBackend::AzureOpenAI => "azure",
            LLMBackend::OpenAI => "openai",
            LLMBackend::Anthropic => "anthropic",
            LLMBackend::Google => "google",
            LLMBackend::Meta => "meta",
            LLMBackend::AwsBedrock => "aws",
        }
    }

    /// Environment variable conventionally holding the API key.
    pub const fn api_key_env(&self) -> Option<&'static str> {
        match self {
            LLMBackend::AzureOpenAI => Some("AZURE_OPENAI_API_KEY"),
            LLMBackend::OpenAI => Some("OPENAI_API_KEY"),
            LLMBackend::Anthropic => Some("ANTHROPIC_API_KEY"),
            LLMBackend::Google => Some("GOOGLE_API_KEY"),
            LLMBackend::Meta => Some("META_API_KEY"),
            LLMBackend::AwsBedrock => None,
        }
    }
}

impl fmt::Display for LLMBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for LLMBackend {
    type Err = LLMError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "azure" | "azure-openai" => Ok(LLMBackend::AzureOpenAI),
            "openai" => Ok(LLMBackend::OpenAI),
            "anthropic" => Ok(LLMBackend::Anthropic),
            "google" => Ok(LLMBackend::Google),
            "meta" => Ok(LLMBackend::Meta),
            "aws" | "aws-bedrock" | "bedrock" => Ok(LLMBackend::AwsBedrock),
            _ => Err(LLMError::InvalidRequest(format!(
                "Unknown LLM backend: {s}. Available providers: azure, openai, anthropic, google, meta, aws"
            ))),
        }
    }
}
