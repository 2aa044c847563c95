//! Maps Gemini failure responses onto relay error kinds.
//!
//! This is the only place that inspects provider error text. Structured
//! fields (HTTP status, `error.status`, detail `reason`) are checked first;
//! the message is consulted only for invalid keys, which Gemini reports as
//! a plain `INVALID_ARGUMENT`.

use serde::Deserialize;

use crate::error::RelayError;

#[derive(Debug, Deserialize)]
pub struct ApiErrorEnvelope {
    pub error: ApiErrorBody,
}

#[derive(Debug, Default, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub code: u16,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub details: Vec<serde_json::Value>,
}

const AUTH_REASONS: &[&str] = &["API_KEY_INVALID", "API_KEY_EXPIRED", "API_KEY_SERVICE_BLOCKED"];

impl ApiErrorBody {
    fn reasons(&self) -> impl Iterator<Item = &str> {
        self.details
            .iter()
            .filter_map(|d| d.get("reason").and_then(|r| r.as_str()))
    }

    /// Classifies this error, using `http_status` when the body has no code.
    pub fn classify(&self, http_status: u16) -> RelayError {
        let code = if self.code == 0 { http_status } else { self.code };
        let summary = format!("HTTP {code} {}: {}", self.status, self.message);

        if code == 401
            || code == 403
            || self.status == "UNAUTHENTICATED"
            || self.status == "PERMISSION_DENIED"
            || self.reasons().any(|r| AUTH_REASONS.contains(&r))
            || (self.status == "INVALID_ARGUMENT" && self.message.contains("API key"))
        {
            return RelayError::AuthFailure(summary);
        }
        if code == 429 || self.status == "RESOURCE_EXHAUSTED" {
            return RelayError::QuotaExceeded(summary);
        }
        RelayError::ProviderUnavailable(summary)
    }
}

/// Classifies a non-success HTTP response from the provider.
pub fn classify_http_failure(http_status: u16, body: &str) -> RelayError {
    match serde_json::from_str::<ApiErrorEnvelope>(body) {
        Ok(envelope) => envelope.error.classify(http_status),
        Err(_) => ApiErrorBody {
            code: http_status,
            message: body.trim().chars().take(200).collect(),
            ..ApiErrorBody::default()
        }
        .classify(http_status),
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case::bad_key(
        400,
        r#"{"error":{"code":400,"message":"API key not valid. Please pass a valid API key.","status":"INVALID_ARGUMENT","details":[{"@type":"type.googleapis.com/google.rpc.ErrorInfo","reason":"API_KEY_INVALID"}]}}"#,
        "auth"
    )]
    #[case::denied(403, r#"{"error":{"code":403,"message":"denied","status":"PERMISSION_DENIED"}}"#, "auth")]
    #[case::quota(429, r#"{"error":{"code":429,"message":"Resource has been exhausted","status":"RESOURCE_EXHAUSTED"}}"#, "quota")]
    #[case::overloaded(503, r#"{"error":{"code":503,"message":"The model is overloaded.","status":"UNAVAILABLE"}}"#, "other")]
    #[case::bad_argument(400, r#"{"error":{"code":400,"message":"Invalid JSON payload","status":"INVALID_ARGUMENT"}}"#, "other")]
    #[case::html_body(502, "<html>Bad Gateway</html>", "other")]
    #[case::bare_429(429, "", "quota")]
    fn classifies_provider_failures(#[case] status: u16, #[case] body: &str, #[case] kind: &str) {
        let err = classify_http_failure(status, body);
        let actual = match err {
            RelayError::AuthFailure(_) => "auth",
            RelayError::QuotaExceeded(_) => "quota",
            RelayError::ProviderUnavailable(_) => "other",
            other => panic!("unexpected kind: {other:?}"),
        };
        assert_eq!(actual, kind);
    }
}
