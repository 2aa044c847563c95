use thiserror::Error;

/// Errors produced while relaying a chat turn to the provider and back.
///
/// The first five variants are the error kinds surfaced to callers of the
/// relay endpoints. The remaining ones are client-side or internal faults.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RelayError {
    /// Missing, empty or otherwise unacceptable request input
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    /// The provider rejected the configured credentials
    #[error("Auth error: {0}")]
    AuthFailure(String),
    /// The provider usage limit was reached
    #[error("Quota exceeded: {0}")]
    QuotaExceeded(String),
    /// The provider safety policy blocked the turn
    #[error("Content filtered: {0}")]
    ContentFiltered(String),
    /// Any other provider or transport failure on the way to the provider
    #[error("Provider error: {0}")]
    ProviderUnavailable(String),
    /// The provider answered with a body that could not be understood
    #[error("Response format error: {message}. Raw response: {raw_response}")]
    ResponseFormat {
        message: String,
        raw_response: String,
    },
    /// A single streamed fragment could not be decoded; the stream goes on
    #[error("Malformed fragment: {0}")]
    MalformedFragment(String),
    /// Client-side network failure or non-success status from the relay
    #[error("Transport error: {0}")]
    Transport(String),
    /// Error reported by the relay server inside a response
    #[error("{0}")]
    Remote(String),
}

impl RelayError {
    /// Short, caller-facing message for this error kind.
    ///
    /// Never contains raw provider text for the classified kinds.
    pub fn public_message(&self) -> String {
        match self {
            RelayError::InvalidInput(msg) => msg.clone(),
            RelayError::AuthFailure(_) => "Invalid API key".to_string(),
            RelayError::QuotaExceeded(_) => "API quota exceeded".to_string(),
            RelayError::ContentFiltered(_) => "Content filtered for safety".to_string(),
            RelayError::Remote(msg) => msg.clone(),
            _ => "Failed to process your request".to_string(),
        }
    }

    /// True for faults that only affect one streamed fragment.
    pub fn is_fragment_fault(&self) -> bool {
        matches!(self, RelayError::MalformedFragment(_))
    }
}

/// Converts reqwest HTTP errors into RelayErrors
impl From<reqwest::Error> for RelayError {
    fn from(err: reqwest::Error) -> Self {
        RelayError::ProviderUnavailable(err.to_string())
    }
}

impl From<serde_json::Error> for RelayError {
    fn from(err: serde_json::Error) -> Self {
        RelayError::ResponseFormat {
            message: format!("{} at line {} column {}", err, err.line(), err.column()),
            raw_response: String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classified_kinds_hide_provider_text() {
        let err = RelayError::AuthFailure("API key not valid: AIza...".into());
        assert_eq!(err.public_message(), "Invalid API key");

        let err = RelayError::ProviderUnavailable("connection reset by 10.0.0.7".into());
        assert_eq!(err.public_message(), "Failed to process your request");
    }

    #[test]
    fn only_malformed_fragments_are_fragment_faults() {
        assert!(RelayError::MalformedFragment("bad".into()).is_fragment_fault());
        assert!(!RelayError::ContentFiltered("SAFETY".into()).is_fragment_fault());
    }
}
