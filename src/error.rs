use thiserror::Error;

/// Error types that can occur when interacting with LLM providers.
#[derive(Debug, Error)]
pub enum LLMError {
    /// HTTP request/response errors
    #[error("HTTP error: {0}")]
    HttpError(String),
    /// Authentication and authorization errors
    #[error("Auth error: {0}")]
    AuthError(String),
    /// Invalid request parameters or format
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    /// Errors returned by the LLM provider
    #[error("Provider error: {0}")]
    ProviderError(String),
    /// API response parsing or format error
    #[error("Response format error: {message}. Raw response: {raw_response}")]
    ResponseFormatError {
        message: String,
        raw_response: String,
    },
    /// Generic error
    #[error("Generic error: {0}")]
    Generic(String),
    /// JSON serialization/deserialization errors
    #[error("JSON parse error: {0}")]
    JsonError(String),
    /// Retry attempts exceeded
    #[error("Retry attempts exceeded after {attempts} tries: {last_error}")]
    RetryExceeded { attempts: usize, last_error: String },
}

/// Converts reqwest HTTP errors into LlmErrors
impl From<reqwest::Error> for LLMError {
    fn from(err: reqwest::Error) -> Self {
        LLMError::HttpError(err.to_string())
    }
}

impl From<serde_json::Error> for LLMError {
    fn from(err: serde_json::Error) -> Self {
        LLMError::JsonError(format!(
            "{} at line {} column {}",
            err,
            err.line(),
            err.column()
        ))
    }
}

/// A single agent failed to produce a response for one turn.
///
/// The interaction loop never propagates this; it renders the failure into
/// the transcript and keeps going.
#[derive(Debug, Error)]
#[error("{agent} failed to generate a response: {source}")]
pub struct GenerationError {
    /// Name of the agent whose provider call failed
    pub agent: String,
    /// Underlying provider error
    #[source]
    pub source: LLMError,
}

impl GenerationError {
    pub fn new(agent: impl Into<String>, source: LLMError) -> Self {
        Self {
            agent: agent.into(),
            source,
        }
    }

    /// Text substituted for the response of a failed turn.
    pub fn transcript_text(&self) -> String {
        format!("An error occurred: {}", self.source)
    }
}

/// Configuration and I/O errors raised by the orchestration layer.
#[derive(Debug, Error)]
pub enum SelfPlayError {
    #[error("end threshold must be a number within [0, 1], got {0}")]
    InvalidThreshold(f64),
    #[error("turn limit must be at least 1")]
    InvalidTurnCount,
    #[error("unknown role-play template: {0}")]
    UnknownTemplate(String),
    #[error("template {template} has no system message for role {role}")]
    IncompleteTemplate { template: String, role: String },
    #[error("no personas match the requested criteria")]
    NoPersonas,
    #[error("experiment needs at least one response option")]
    NoOptions,
    #[error("multi-variant test needs at least one variant")]
    NoVariants,
    #[error("sample of {per_variant} personas for each of {variants} variants is too large")]
    SampleTooLarge { per_variant: usize, variants: usize },
    #[error(transparent)]
    Provider(#[from] LLMError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("template parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generation_error_renders_inline_text() {
        let err = GenerationError::new("Bot A", LLMError::HttpError("timeout".into()));
        assert_eq!(err.transcript_text(), "An error occurred: HTTP error: timeout");
        assert_eq!(
            err.to_string(),
            "Bot A failed to generate a response: HTTP error: timeout"
        );
    }

    #[test]
    fn threshold_error_mentions_value() {
        let err = SelfPlayError::InvalidThreshold(1.5);
        assert!(err.to_string().contains("1.5"));
    }
}
