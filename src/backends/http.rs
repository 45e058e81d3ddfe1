use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;

use crate::error::LLMError;

/// Builds a reqwest client with an optional overall timeout.
pub(crate) fn client_with_timeout(timeout_seconds: Option<u64>) -> Client {
    let mut builder = Client::builder();
    if let Some(sec) = timeout_seconds {
        builder = builder.timeout(std::time::Duration::from_secs(sec));
    }
    builder.build().unwrap_or_else(|err| {
        log::warn!("Falling back to default HTTP client: {err}");
        Client::new()
    })
}

/// Maps the HTTP status onto [`LLMError`] and decodes a successful body.
///
/// 401 and 403 become [`LLMError::AuthError`], every other non-2xx status a
/// [`LLMError::ProviderError`]. Bodies that do not decode are reported with
/// the raw text attached.
pub(crate) async fn decode_response<T: DeserializeOwned>(
    resp: Response,
    provider: &str,
) -> Result<T, LLMError> {
    let status = resp.status();
    log::debug!("{provider} HTTP status: {status}");
    let body = resp.text().await?;

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            return Err(LLMError::AuthError(format!(
                "{provider} rejected the request ({status}): {body}"
            )))
        }
        s if !s.is_success() => {
            return Err(LLMError::ProviderError(format!(
                "{provider} returned {status}: {body}"
            )))
        }
        _ => {}
    }

    serde_json::from_str(&body).map_err(|e| LLMError::ResponseFormatError {
        message: format!("Failed to decode {provider} response: {e}"),
        raw_response: body,
    })
}

pub(crate) fn trace_payload<T: serde::Serialize>(provider: &str, body: &T) {
    if log::log_enabled!(log::Level::Trace) {
        if let Ok(json) = serde_json::to_string(body) {
            log::trace!("{provider} request payload: {json}");
        }
    }
}
