use std::collections::VecDeque;
use std::pin::Pin;

use bytes::Bytes;
use futures::stream::{Stream, StreamExt};
use reqwest::header::ACCEPT;
use reqwest::{Client, Response};

use crate::error::RelayError;
use crate::relay::RelayRequest;
use crate::wire::{ChatRequest, ChatResponse, ErrorBody, HealthResponse, SystemPromptResponse};

use super::consumer::{ConsumerEvent, ConsumerState, StreamConsumer};

type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, RelayError>> + Send>>;

pub const DEFAULT_RELAY_URL: &str = "http://localhost:3000/api";

/// HTTP client for a relay server.
#[derive(Debug, Clone)]
pub struct ChatClient {
    client: Client,
    base_url: String,
}

impl ChatClient {
    /// `base_url` points at the `/api` root, e.g. `http://localhost:3000/api`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// Sends a turn and waits for the whole reply.
    pub async fn send_message(&self, request: &RelayRequest) -> Result<String, RelayError> {
        let resp = self
            .client
            .post(self.url("chat"))
            .json(&ChatRequest::from_relay(request))
            .send()
            .await
            .map_err(transport)?;
        let resp = ensure_success(resp).await?;
        let body: ChatResponse = resp.json().await.map_err(transport)?;
        Ok(body.response)
    }

    /// Opens a streamed turn. Resolves once response headers arrive.
    pub async fn open_stream(&self, request: &RelayRequest) -> Result<TurnStream, RelayError> {
        let mut consumer = StreamConsumer::new();
        consumer.begin();

        let resp = self
            .client
            .post(self.url("chat-stream"))
            .header(ACCEPT, "text/event-stream")
            .json(&ChatRequest::from_relay(request))
            .send()
            .await
            .map_err(transport)?;
        let resp = ensure_success(resp).await?;

        consumer.headers_received();
        let body = resp.bytes_stream().map(|chunk| chunk.map_err(transport));
        Ok(TurnStream::with_consumer(Box::pin(body), consumer))
    }

    pub async fn health(&self) -> Result<HealthResponse, RelayError> {
        let resp = self
            .client
            .get(self.url("health"))
            .send()
            .await
            .map_err(transport)?;
        let resp = ensure_success(resp).await?;
        resp.json().await.map_err(transport)
    }

    /// Whether the relay answers its health check.
    pub async fn check_health(&self) -> bool {
        match self.health().await {
            Ok(_) => true,
            Err(err) => {
                log::warn!("relay health check failed: {err}");
                false
            }
        }
    }

    /// The relay's fixed system prompt, if it can be fetched.
    pub async fn system_prompt(&self) -> Option<String> {
        let fetch = async {
            let resp = self
                .client
                .get(self.url("system-prompt"))
                .send()
                .await
                .map_err(transport)?;
            let resp = ensure_success(resp).await?;
            resp.json::<SystemPromptResponse>()
                .await
                .map_err(transport)
        };
        match fetch.await {
            Ok(body) => Some(body.system_prompt),
            Err(err) => {
                log::warn!("failed to fetch system prompt: {err}");
                None
            }
        }
    }
}

fn transport(err: reqwest::Error) -> RelayError {
    RelayError::Transport(err.to_string())
}

async fn ensure_success(resp: Response) -> Result<Response, RelayError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let text = resp.text().await.unwrap_or_default();
    match serde_json::from_str::<ErrorBody>(&text) {
        Ok(body) => Err(RelayError::Remote(body.error)),
        Err(_) => Err(RelayError::Transport(format!(
            "API error {}: {}",
            status.as_u16(),
            text
        ))),
    }
}

/// Body of one streamed turn, decoded event by event.
pub struct TurnStream {
    body: ByteStream,
    consumer: StreamConsumer,
    pending: VecDeque<ConsumerEvent>,
}

impl TurnStream {
    /// Wraps an already-open body; the consumer starts in `Streaming`.
    pub fn from_body<S>(body: S) -> Self
    where
        S: Stream<Item = Result<Bytes, RelayError>> + Send + 'static,
    {
        let mut consumer = StreamConsumer::new();
        consumer.begin();
        consumer.headers_received();
        Self::with_consumer(Box::pin(body), consumer)
    }

    fn with_consumer(body: ByteStream, consumer: StreamConsumer) -> Self {
        Self {
            body,
            consumer,
            pending: VecDeque::new(),
        }
    }

    pub fn state(&self) -> ConsumerState {
        self.consumer.state()
    }

    /// Next event of the turn; `None` once a terminal event was returned.
    pub async fn next_event(&mut self) -> Option<ConsumerEvent> {
        loop {
            if let Some(event) = self.pending.pop_front() {
                return Some(event);
            }
            if self.consumer.state().is_terminal() {
                return None;
            }
            match self.body.next().await {
                Some(Ok(bytes)) => self.pending.extend(self.consumer.feed(&bytes)),
                Some(Err(err)) => return self.consumer.transport_failed(err.to_string()),
                None => return self.consumer.end_of_body(),
            }
        }
    }
}
