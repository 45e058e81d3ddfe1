//! Google Gemini client using the `generateContent` REST endpoint.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::{
    chat::{split_system, ChatMessage, ChatProvider, ChatResponse, ChatRole},
    error::LLMError,
};

use super::http::{client_with_timeout, decode_response, trace_payload};

const PROVIDER_NAME: &str = "Google";
const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const DEFAULT_MODEL: &str = "gemini-pro";

#[derive(Debug)]
pub struct GoogleConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    pub timeout_seconds: Option<u64>,
}

/// Client for Google's Gemini models.
#[derive(Debug, Clone)]
pub struct Google {
    pub config: Arc<GoogleConfig>,
    pub client: Client,
}

#[derive(Serialize)]
struct GooglePart<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct GoogleContent<'a> {
    role: &'a str,
    parts: Vec<GooglePart<'a>>,
}

#[derive(Serialize)]
struct GoogleSystemInstruction<'a> {
    parts: Vec<GooglePart<'a>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GoogleGenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GoogleRequest<'a> {
    contents: Vec<GoogleContent<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GoogleSystemInstruction<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GoogleGenerationConfig>,
}

#[derive(Deserialize, Debug)]
struct GoogleResponse {
    #[serde(default)]
    candidates: Vec<GoogleCandidate>,
}

#[derive(Deserialize, Debug)]
struct GoogleCandidate {
    content: Option<GoogleResponseContent>,
}

#[derive(Deserialize, Debug)]
struct GoogleResponseContent {
    #[serde(default)]
    parts: Vec<GoogleResponsePart>,
}

#[derive(Deserialize, Debug)]
struct GoogleResponsePart {
    text: Option<String>,
}

impl std::fmt::Display for GoogleResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

impl ChatResponse for GoogleResponse {
    fn text(&self) -> Option<String> {
        let content = self.candidates.first()?.content.as_ref()?;
        let text: String = content
            .parts
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect();
        (!text.is_empty()).then_some(text)
    }
}

impl Google {
    pub fn new(
        api_key: impl Into<String>,
        base_url: Option<String>,
        model: Option<String>,
        max_tokens: Option<u32>,
        temperature: Option<f32>,
        timeout_seconds: Option<u64>,
    ) -> Self {
        Self {
            config: Arc::new(GoogleConfig {
                api_key: api_key.into(),
                base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
                model: model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
                max_tokens,
                temperature,
                timeout_seconds,
            }),
            client: client_with_timeout(timeout_seconds),
        }
    }
}

#[async_trait]
impl ChatProvider for Google {
    async fn chat(&self, messages: &[ChatMessage]) -> Result<Box<dyn ChatResponse>, LLMError> {
        if self.config.api_key.is_empty() {
            return Err(LLMError::AuthError("Missing Google API key".to_string()));
        }

        let (system, rest) = split_system(messages);
        let contents = rest
            .into_iter()
            .map(|m| GoogleContent {
                role: match m.role {
                    ChatRole::Assistant => "model",
                    _ => "user",
                },
                parts: vec![GooglePart { text: &m.content }],
            })
            .collect();

        let generation_config =
            if self.config.temperature.is_some() || self.config.max_tokens.is_some() {
                Some(GoogleGenerationConfig {
                    temperature: self.config.temperature,
                    max_output_tokens: self.config.max_tokens,
                })
            } else {
                None
            };

        let body = GoogleRequest {
            contents,
            system_instruction: system.as_deref().map(|text| GoogleSystemInstruction {
                parts: vec![GooglePart { text }],
            }),
            generation_config,
        };
        trace_payload(PROVIDER_NAME, &body);

        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        );
        let mut request = self
            .client
            .post(url)
            .query(&[("key", self.config.api_key.as_str())])
            .json(&body);

        if let Some(timeout) = self.config.timeout_seconds {
            request = request.timeout(std::time::Duration::from_secs(timeout));
        }

        let resp = request.send().await?;
        let parsed: GoogleResponse = decode_response(resp, PROVIDER_NAME).await?;
        Ok(Box::new(parsed))
    }

    fn provider_name(&self) -> &str {
        PROVIDER_NAME
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    fn available_models(&self) -> Vec<String> {
        vec!["gemini-pro".to_string(), "gemini-ultra".to_string()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use serde_json::json;

    #[tokio::test]
    async fn maps_roles_and_system_instruction() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1beta/models/gemini-pro:generateContent")
            .match_query(Matcher::UrlEncoded("key".into(), "gk".into()))
            .match_body(Matcher::Json(json!({
                "contents": [
                    {"role": "user", "parts": [{"text": "hello"}]},
                    {"role": "model", "parts": [{"text": "hi"}]}
                ],
                "systemInstruction": {"parts": [{"text": "Be curious."}]}
            })))
            .with_status(200)
            .with_body(
                r#"{"candidates":[{"content":{"role":"model","parts":[{"text":"Tell "},{"text":"me more"}]}}]}"#,
            )
            .create_async()
            .await;

        let client = Google::new("gk", Some(server.url()), None, None, None, None);
        let messages = vec![
            ChatMessage::system().content("Be curious.").build(),
            ChatMessage::user().content("hello").build(),
            ChatMessage::assistant().content("hi").build(),
        ];
        let text = client.generate_response(&messages).await.unwrap();

        assert_eq!(text, "Tell me more");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn no_candidates_is_format_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", Matcher::Any)
            .with_status(200)
            .with_body(r#"{"candidates":[]}"#)
            .create_async()
            .await;

        let client = Google::new("gk", Some(server.url()), None, None, None, None);
        let err = client
            .generate_response(&[ChatMessage::user().content("hi").build()])
            .await
            .unwrap_err();
        assert!(matches!(err, LLMError::ResponseFormatError { .. }));
    }
}
