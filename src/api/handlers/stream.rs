use std::convert::Infallible;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{header, HeaderName, HeaderValue};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::Json;
use futures::future::ready;
use futures::stream::{self, BoxStream, Stream, StreamExt};

use super::helpers::relay_request;
use crate::api::ServerState;
use crate::chat::RelayEvent;
use crate::error::RelayError;
use crate::provider::FragmentStream;
use crate::wire::ChatRequest;

pub async fn handle_chat_stream(
    State(state): State<ServerState>,
    body: Result<Json<ChatRequest>, JsonRejection>,
) -> Response {
    let events = match relay_request(body) {
        Err(err) => failure(err),
        Ok(request) => {
            let relay = state.relay.clone();
            stream::once(async move {
                match relay.complete_streaming(&request).await {
                    Ok(fragments) => relay_events(fragments).boxed(),
                    Err(err) => failure(err),
                }
            })
            .flatten()
            .boxed()
        }
    };

    sse_response(events.filter_map(|event| ready(to_sse(&event))), &state)
}

/// GET keep-alive: a ping comment, then an open stream of keep-alives.
pub async fn handle_stream_keepalive(State(state): State<ServerState>) -> Response {
    let events = stream::once(ready(Event::default().comment("ping"))).chain(stream::pending());
    sse_response(events, &state)
}

/// Relay protocol over a fragment stream.
///
/// Emits one chunk per fragment, then exactly one of `Done` or `Error`.
/// Fragment faults are logged and skipped.
pub fn relay_events(fragments: FragmentStream) -> impl Stream<Item = RelayEvent> + Send {
    stream::unfold(Some(fragments), |state| async move {
        let mut fragments = state?;
        loop {
            match fragments.next().await {
                Some(Ok(text)) => return Some((RelayEvent::Chunk(text), Some(fragments))),
                Some(Err(err)) if err.is_fragment_fault() => {
                    log::warn!("skipping fragment: {err}");
                }
                Some(Err(err)) => {
                    log::error!("stream relay failed: {err}");
                    return Some((RelayEvent::Error(err.public_message()), None));
                }
                None => return Some((RelayEvent::Done, None)),
            }
        }
    })
}

fn failure(err: RelayError) -> BoxStream<'static, RelayEvent> {
    log::warn!("stream request failed before relaying: {err}");
    stream::iter([RelayEvent::Error(err.public_message())]).boxed()
}

fn to_sse(event: &RelayEvent) -> Option<Event> {
    match event.data() {
        Ok(data) => Some(Event::default().data(data)),
        Err(err) => {
            log::warn!("dropping unserializable event {event:?}: {err}");
            None
        }
    }
}

fn sse_response<S>(events: S, state: &ServerState) -> Response
where
    S: Stream<Item = Event> + Send + 'static,
{
    let sse = Sse::new(events.map(Ok::<_, Infallible>))
        .keep_alive(KeepAlive::new().interval(state.keep_alive));
    (
        [
            (header::CACHE_CONTROL, HeaderValue::from_static("no-cache")),
            (
                HeaderName::from_static("x-accel-buffering"),
                HeaderValue::from_static("no"),
            ),
        ],
        sse,
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn protocol(items: Vec<Result<String, RelayError>>) -> Vec<RelayEvent> {
        let fragments: FragmentStream = Box::pin(stream::iter(items));
        relay_events(fragments).collect().await
    }

    #[tokio::test]
    async fn completed_stream_ends_with_done() {
        let events = protocol(vec![Ok("Hi ".into()), Ok("there!".into())]).await;
        assert_eq!(
            events,
            vec![
                RelayEvent::Chunk("Hi ".into()),
                RelayEvent::Chunk("there!".into()),
                RelayEvent::Done
            ]
        );
    }

    #[tokio::test]
    async fn fragment_fault_is_skipped() {
        let events = protocol(vec![
            Ok("a".into()),
            Err(RelayError::MalformedFragment("bad".into())),
            Ok("b".into()),
        ])
        .await;
        assert_eq!(
            events,
            vec![
                RelayEvent::Chunk("a".into()),
                RelayEvent::Chunk("b".into()),
                RelayEvent::Done
            ]
        );
    }

    #[tokio::test]
    async fn fatal_error_replaces_done_and_keeps_prior_chunks() {
        let events = protocol(vec![
            Ok("partial".into()),
            Err(RelayError::ContentFiltered("SAFETY".into())),
            Ok("never".into()),
        ])
        .await;
        assert_eq!(
            events,
            vec![
                RelayEvent::Chunk("partial".into()),
                RelayEvent::Error("Content filtered for safety".into())
            ]
        );
    }
}
