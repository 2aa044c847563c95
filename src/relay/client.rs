use std::sync::Arc;

use futures::future::ready;
use futures::StreamExt;

use crate::chat::{history, input_violation};
use crate::error::RelayError;
use crate::provider::{Content, FragmentStream, GenerateContentRequest, GenerativeProvider};

use super::config::RelayConfig;
use super::request::RelayRequest;

/// Drives one provider call per chat turn.
///
/// Cheap to clone; every call shares the same provider and configuration
/// and nothing else.
#[derive(Clone)]
pub struct RelayClient {
    provider: Arc<dyn GenerativeProvider>,
    config: Arc<RelayConfig>,
}

impl RelayClient {
    pub fn new(provider: Arc<dyn GenerativeProvider>, config: RelayConfig) -> Self {
        Self {
            provider,
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    pub fn model(&self) -> &str {
        self.provider.model()
    }

    pub fn has_credentials(&self) -> bool {
        self.provider.has_credentials()
    }

    /// Sends the turn and waits for the whole reply.
    pub async fn complete_once(&self, request: &RelayRequest) -> Result<String, RelayError> {
        let body = self.build_request(request)?;
        self.provider.generate(&body).await
    }

    /// Sends the turn and returns its reply as a lazy fragment stream.
    ///
    /// Every `Ok` item is non-empty. The stream ends after the first fatal
    /// error; fragment faults are passed through and do not end it.
    pub async fn complete_streaming(
        &self,
        request: &RelayRequest,
    ) -> Result<FragmentStream, RelayError> {
        let body = self.build_request(request)?;
        let stream = self.provider.generate_stream(&body).await?;

        let stream = stream
            .filter(|item| ready(!matches!(item, Ok(text) if text.is_empty())))
            .scan(false, |failed, item| {
                if *failed {
                    return ready(None);
                }
                if let Err(err) = &item {
                    if !err.is_fragment_fault() {
                        *failed = true;
                    }
                }
                ready(Some(item))
            });
        Ok(Box::pin(stream))
    }

    fn build_request(&self, request: &RelayRequest) -> Result<GenerateContentRequest, RelayError> {
        if let Some(reason) = input_violation(&request.message) {
            return Err(RelayError::InvalidInput(reason));
        }
        if request.system_prompt.is_some() {
            log::debug!("ignoring per-request system prompt; relay uses its configured one");
        }

        let mut contents = history::encode(&request.history)?;
        contents.push(Content::text(Some(history::USER_ROLE), request.message.clone()));

        let system_instruction = if self.config.system_prompt.is_empty() {
            None
        } else {
            Some(Content::text(None, self.config.system_prompt.clone()))
        };

        Ok(GenerateContentRequest {
            contents,
            system_instruction,
            generation_config: (&self.config.generation).into(),
            safety_settings: self.config.safety_settings.clone(),
        })
    }
}
