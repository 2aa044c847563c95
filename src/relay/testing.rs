use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::RelayError;
use crate::provider::{FragmentStream, GenerateContentRequest, GenerativeProvider};

/// Provider double that replays a fixed outcome and records requests.
pub(crate) struct ScriptedProvider {
    reply: Result<String, RelayError>,
    fragments: Vec<Result<String, RelayError>>,
    open_error: Option<RelayError>,
    calls: AtomicUsize,
    last: Mutex<Option<GenerateContentRequest>>,
}

impl ScriptedProvider {
    fn base() -> Self {
        Self {
            reply: Ok(String::new()),
            fragments: Vec::new(),
            open_error: None,
            calls: AtomicUsize::new(0),
            last: Mutex::new(None),
        }
    }

    pub(crate) fn replying(text: &str) -> Self {
        Self {
            reply: Ok(text.to_string()),
            ..Self::base()
        }
    }

    pub(crate) fn streaming(fragments: Vec<Result<String, RelayError>>) -> Self {
        Self {
            fragments,
            ..Self::base()
        }
    }

    pub(crate) fn failing(err: RelayError) -> Self {
        Self {
            reply: Err(err.clone()),
            open_error: Some(err),
            ..Self::base()
        }
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn last_request(&self) -> Option<GenerateContentRequest> {
        self.last.lock().unwrap().clone()
    }

    fn record(&self, request: &GenerateContentRequest) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last.lock().unwrap() = Some(request.clone());
    }
}

#[async_trait]
impl GenerativeProvider for ScriptedProvider {
    fn model(&self) -> &str {
        "scripted-model"
    }

    async fn generate(&self, request: &GenerateContentRequest) -> Result<String, RelayError> {
        self.record(request);
        self.reply.clone()
    }

    async fn generate_stream(
        &self,
        request: &GenerateContentRequest,
    ) -> Result<FragmentStream, RelayError> {
        self.record(request);
        if let Some(err) = &self.open_error {
            return Err(err.clone());
        }
        Ok(Box::pin(futures::stream::iter(self.fragments.clone())))
    }
}
