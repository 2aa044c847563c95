//! Generative-language provider seam and its Gemini implementation.

mod classify;
mod gemini;
mod types;

use std::pin::Pin;

use async_trait::async_trait;
use futures::stream::Stream;

use crate::error::RelayError;

pub use classify::{classify_http_failure, ApiErrorBody, ApiErrorEnvelope};
pub use gemini::{Gemini, GeminiConfig, DEFAULT_BASE_URL, DEFAULT_MODEL};
pub use types::{
    Candidate, Content, GenerateContentRequest, GenerateContentResponse, GenerationConfig, Part,
    PromptFeedback, SafetySetting, UsageMetadata,
};

/// Lazy sequence of text fragments for one streamed turn.
pub type FragmentStream = Pin<Box<dyn Stream<Item = Result<String, RelayError>> + Send>>;

/// A backend that can answer a fully assembled generation request.
#[async_trait]
pub trait GenerativeProvider: Send + Sync {
    /// Model identifier, for diagnostics.
    fn model(&self) -> &str;

    /// Whether a credential is configured.
    fn has_credentials(&self) -> bool {
        true
    }

    /// Resolves to the complete reply text.
    async fn generate(&self, request: &GenerateContentRequest) -> Result<String, RelayError>;

    /// Opens a streamed reply.
    ///
    /// Failures before the first byte are returned directly; later ones
    /// arrive as stream items.
    async fn generate_stream(
        &self,
        request: &GenerateContentRequest,
    ) -> Result<FragmentStream, RelayError>;
}
