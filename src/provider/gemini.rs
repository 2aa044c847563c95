//! Google Gemini REST client.
//!
//! Uses `models/{model}:generateContent` for single replies and
//! `models/{model}:streamGenerateContent?alt=sse` for streamed ones.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};

use crate::chat::{create_sse_stream, event_data};
use crate::error::RelayError;

use super::classify::{classify_http_failure, ApiErrorEnvelope};
use super::types::{GenerateContentRequest, GenerateContentResponse};
use super::{FragmentStream, GenerativeProvider};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

const API_KEY_HEADER: &str = "x-goog-api-key";

/// Configuration for the Gemini client.
#[derive(Debug)]
pub struct GeminiConfig {
    /// API key for authentication with Gemini.
    pub api_key: SecretString,
    /// Model identifier.
    pub model: String,
    /// API root, without the version segment.
    pub base_url: String,
    /// Request timeout in seconds.
    pub timeout_seconds: Option<u64>,
}

/// Client for interacting with the Gemini API.
///
/// The client uses `Arc` internally for configuration, making cloning cheap.
#[derive(Debug, Clone)]
pub struct Gemini {
    pub config: Arc<GeminiConfig>,
    pub client: Client,
}

impl Gemini {
    pub fn new(
        api_key: SecretString,
        model: Option<String>,
        base_url: Option<String>,
        timeout_seconds: Option<u64>,
    ) -> Result<Self, RelayError> {
        let client = Client::builder().build()?;
        Ok(Self::with_client(
            client,
            api_key,
            model,
            base_url,
            timeout_seconds,
        ))
    }

    /// Creates a new Gemini client with a custom HTTP client.
    pub fn with_client(
        client: Client,
        api_key: SecretString,
        model: Option<String>,
        base_url: Option<String>,
        timeout_seconds: Option<u64>,
    ) -> Self {
        Self {
            config: Arc::new(GeminiConfig {
                api_key,
                model: model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
                base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
                timeout_seconds,
            }),
            client,
        }
    }

    fn endpoint(&self, method: &str) -> String {
        format!(
            "{}/v1beta/models/{}:{}",
            self.config.base_url.trim_end_matches('/'),
            self.config.model,
            method
        )
    }

    async fn post(
        &self,
        url: String,
        body: &GenerateContentRequest,
    ) -> Result<reqwest::Response, RelayError> {
        if self.config.api_key.expose_secret().is_empty() {
            return Err(RelayError::AuthFailure("Missing Gemini API key".to_string()));
        }

        if log::log_enabled!(log::Level::Trace) {
            if let Ok(json) = serde_json::to_string(body) {
                log::trace!("Gemini request payload: {}", json);
            }
        }

        let mut request = self
            .client
            .post(url)
            .header(API_KEY_HEADER, self.config.api_key.expose_secret())
            .json(body);

        if let Some(timeout) = self.config.timeout_seconds {
            request = request.timeout(Duration::from_secs(timeout));
        }

        let resp = request.send().await?;
        log::debug!("Gemini HTTP status: {}", resp.status());

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(classify_http_failure(status.as_u16(), &body));
        }
        Ok(resp)
    }
}

#[async_trait]
impl GenerativeProvider for Gemini {
    fn model(&self) -> &str {
        &self.config.model
    }

    fn has_credentials(&self) -> bool {
        !self.config.api_key.expose_secret().is_empty()
    }

    async fn generate(&self, request: &GenerateContentRequest) -> Result<String, RelayError> {
        let resp = self.post(self.endpoint("generateContent"), request).await?;
        let raw = resp.text().await?;
        let parsed: GenerateContentResponse =
            serde_json::from_str(&raw).map_err(|e| RelayError::ResponseFormat {
                message: format!("Failed to decode Gemini response: {e}"),
                raw_response: raw.clone(),
            })?;
        match parsed.text()? {
            Some(text) if !text.is_empty() => Ok(text),
            _ => {
                let reason = parsed
                    .candidates
                    .first()
                    .and_then(|c| c.finish_reason.as_deref())
                    .unwrap_or("none");
                Err(RelayError::ProviderUnavailable(format!(
                    "empty reply (finish reason: {reason})"
                )))
            }
        }
    }

    async fn generate_stream(
        &self,
        request: &GenerateContentRequest,
    ) -> Result<FragmentStream, RelayError> {
        let url = format!("{}?alt=sse", self.endpoint("streamGenerateContent"));
        let resp = self.post(url, request).await?;
        Ok(create_sse_stream(resp, parse_stream_event))
    }
}

/// Extracts the text of one streamed Gemini event.
fn parse_stream_event(event: &str) -> Result<Option<String>, RelayError> {
    let Some(data) = event_data(event) else {
        return Ok(None);
    };
    let data = data.trim();
    if data.is_empty() {
        return Ok(None);
    }

    if let Ok(envelope) = serde_json::from_str::<ApiErrorEnvelope>(data) {
        return Err(envelope.error.classify(200));
    }

    let chunk: GenerateContentResponse = serde_json::from_str(data)
        .map_err(|e| RelayError::MalformedFragment(format!("{e}: {data}")))?;
    Ok(chunk.text()?.filter(|text| !text.is_empty()))
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use futures::StreamExt;

    use super::*;
    use crate::chat::create_mock_response;

    fn chunk(text: &str) -> String {
        format!(
            "data: {{\"candidates\":[{{\"content\":{{\"role\":\"model\",\"parts\":[{{\"text\":\"{text}\"}}]}}}}]}}\r\n\r\n"
        )
    }

    #[test]
    fn stream_parser_extracts_text() {
        assert_eq!(
            parse_stream_event(&chunk("Hi ").replace('\r', "")).unwrap(),
            Some("Hi ".to_string())
        );
        assert_eq!(parse_stream_event(": keep-alive\n\n").unwrap(), None);
    }

    #[test]
    fn stream_parser_flags_garbage_as_fragment_fault() {
        let err = parse_stream_event("data: {\"candidates\": [\n\n").unwrap_err();
        assert!(err.is_fragment_fault());
    }

    #[test]
    fn stream_parser_classifies_inline_errors() {
        let err = parse_stream_event(
            "data: {\"error\":{\"code\":429,\"message\":\"quota\",\"status\":\"RESOURCE_EXHAUSTED\"}}\n\n",
        )
        .unwrap_err();
        assert!(matches!(err, RelayError::QuotaExceeded(_)));
    }

    #[tokio::test]
    async fn stream_keeps_fragments_before_failure() {
        let body = format!(
            "{}{}data: {{\"candidates\":[{{\"finishReason\":\"SAFETY\"}}]}}\r\n\r\n",
            chunk("Hi "),
            chunk("there")
        );
        let bytes = body.into_bytes();
        let chunks = bytes
            .chunks(7)
            .map(|c| Ok(Bytes::copy_from_slice(c)))
            .collect();
        let mut stream = create_sse_stream(create_mock_response(chunks), parse_stream_event);

        assert_eq!(stream.next().await.unwrap().unwrap(), "Hi ");
        assert_eq!(stream.next().await.unwrap().unwrap(), "there");
        assert!(matches!(
            stream.next().await.unwrap(),
            Err(RelayError::ContentFiltered(_))
        ));
        assert!(stream.next().await.is_none());
    }

    #[test]
    fn endpoint_targets_model() {
        let gemini = Gemini::with_client(
            Client::new(),
            SecretString::new("k".to_string()),
            None,
            Some("http://localhost:9999/".to_string()),
            None,
        );
        assert_eq!(
            gemini.endpoint("generateContent"),
            "http://localhost:9999/v1beta/models/gemini-2.5-flash:generateContent"
        );
    }
}
