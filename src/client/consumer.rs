//! Incremental decoder for the relay event stream.
//!
//! The consumer is a pure state machine: it is fed raw body bytes as they
//! arrive and hands back the events they complete. Network reads rarely
//! line up with event boundaries, so partial events are buffered until
//! their delimiter shows up.

use crate::chat::{event_data, RelayEvent, SseDecoder};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumerState {
    Idle,
    Sending,
    Streaming,
    Complete,
    Failed,
}

impl ConsumerState {
    pub fn is_terminal(self) -> bool {
        matches!(self, ConsumerState::Complete | ConsumerState::Failed)
    }
}

/// What a caller should apply to its session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsumerEvent {
    Fragment(String),
    Completed,
    Failed(String),
}

#[derive(Debug)]
pub struct StreamConsumer {
    state: ConsumerState,
    decoder: SseDecoder,
}

impl Default for StreamConsumer {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamConsumer {
    pub fn new() -> Self {
        Self {
            state: ConsumerState::Idle,
            decoder: SseDecoder::default(),
        }
    }

    pub fn state(&self) -> ConsumerState {
        self.state
    }

    /// The request is going out. Starts a fresh turn from any state but
    /// `Sending` or `Streaming`.
    pub fn begin(&mut self) -> bool {
        if matches!(self.state, ConsumerState::Sending | ConsumerState::Streaming) {
            return false;
        }
        self.state = ConsumerState::Sending;
        self.decoder = SseDecoder::default();
        true
    }

    /// Response headers arrived with a success status.
    pub fn headers_received(&mut self) {
        if self.state == ConsumerState::Sending {
            self.state = ConsumerState::Streaming;
        }
    }

    /// Feeds newly read body bytes, returning the events they complete.
    ///
    /// Input after a terminal event is ignored.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<ConsumerEvent> {
        let mut events = Vec::new();
        if self.state != ConsumerState::Streaming {
            return events;
        }

        self.decoder.push_bytes(bytes);
        while let Some(raw) = self.decoder.next_event() {
            let Some(data) = event_data(&raw) else {
                continue;
            };
            let parsed = match RelayEvent::parse(&data) {
                Ok(parsed) => parsed,
                Err(err) => {
                    log::warn!("ignoring unparsable stream event {data:?}: {err}");
                    continue;
                }
            };
            for event in parsed {
                match event {
                    RelayEvent::Chunk(text) => events.push(ConsumerEvent::Fragment(text)),
                    RelayEvent::Done => {
                        self.state = ConsumerState::Complete;
                        events.push(ConsumerEvent::Completed);
                        return events;
                    }
                    RelayEvent::Error(message) => {
                        self.state = ConsumerState::Failed;
                        events.push(ConsumerEvent::Failed(message));
                        return events;
                    }
                }
            }
        }
        events
    }

    /// The connection failed before or during the body.
    pub fn transport_failed(&mut self, message: impl Into<String>) -> Option<ConsumerEvent> {
        if !matches!(self.state, ConsumerState::Sending | ConsumerState::Streaming) {
            return None;
        }
        self.state = ConsumerState::Failed;
        Some(ConsumerEvent::Failed(message.into()))
    }

    /// The body ended without a sentinel or error; treated as completion.
    pub fn end_of_body(&mut self) -> Option<ConsumerEvent> {
        if self.state != ConsumerState::Streaming {
            return None;
        }
        if !self.decoder.remainder().trim().is_empty() {
            log::warn!(
                "stream closed with an incomplete event: {:?}",
                self.decoder.remainder()
            );
        }
        self.state = ConsumerState::Complete;
        Some(ConsumerEvent::Completed)
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn streaming() -> StreamConsumer {
        let mut consumer = StreamConsumer::new();
        assert!(consumer.begin());
        consumer.headers_received();
        consumer
    }

    fn wire(fragments: &[String]) -> Vec<u8> {
        let mut body = String::new();
        for fragment in fragments {
            body.push_str(&RelayEvent::Chunk(fragment.clone()).frame().unwrap());
        }
        body.push_str(&RelayEvent::Done.frame().unwrap());
        body.into_bytes()
    }

    fn accumulate(consumer: &mut StreamConsumer, reads: &[&[u8]]) -> (String, Vec<ConsumerEvent>) {
        let mut text = String::new();
        let mut events = Vec::new();
        for read in reads {
            for event in consumer.feed(read) {
                if let ConsumerEvent::Fragment(f) = &event {
                    text.push_str(f);
                }
                events.push(event);
            }
        }
        (text, events)
    }

    #[test]
    fn walks_the_happy_path() {
        let mut consumer = StreamConsumer::new();
        assert_eq!(consumer.state(), ConsumerState::Idle);
        consumer.begin();
        assert_eq!(consumer.state(), ConsumerState::Sending);
        consumer.headers_received();
        assert_eq!(consumer.state(), ConsumerState::Streaming);

        let body = wire(&["Hi ".to_string(), "there!".to_string()]);
        let (text, events) = accumulate(&mut consumer, &[body.as_slice()]);
        assert_eq!(text, "Hi there!");
        assert_eq!(events.last(), Some(&ConsumerEvent::Completed));
        assert_eq!(consumer.state(), ConsumerState::Complete);
    }

    #[test]
    fn frame_split_mid_json_waits_for_the_rest() {
        let mut consumer = streaming();
        assert!(consumer.feed(b"data: {\"chu").is_empty());
        assert!(consumer.feed(b"nk\":\"Hi \"}\n").is_empty());
        assert_eq!(
            consumer.feed(b"\ndata: [DO"),
            vec![ConsumerEvent::Fragment("Hi ".into())]
        );
        assert_eq!(consumer.feed(b"NE]\n\n"), vec![ConsumerEvent::Completed]);
    }

    #[test]
    fn error_event_fails_the_turn_and_ignores_the_rest() {
        let mut consumer = streaming();
        let events = consumer.feed(
            b"data: {\"chunk\":\"a\"}\n\ndata: {\"error\":\"Invalid API key\"}\n\ndata: {\"chunk\":\"b\"}\n\n",
        );
        assert_eq!(
            events,
            vec![
                ConsumerEvent::Fragment("a".into()),
                ConsumerEvent::Failed("Invalid API key".into())
            ]
        );
        assert_eq!(consumer.state(), ConsumerState::Failed);
        assert!(consumer.feed(b"data: {\"chunk\":\"c\"}\n\n").is_empty());
        assert_eq!(consumer.end_of_body(), None);
    }

    #[test]
    fn unparsable_events_and_comments_are_skipped() {
        let mut consumer = streaming();
        let events = consumer.feed(b": keep-alive\n\ndata: {oops\n\ndata: {\"chunk\":\"ok\"}\n\n");
        assert_eq!(events, vec![ConsumerEvent::Fragment("ok".into())]);
    }

    #[test]
    fn closed_body_without_sentinel_completes() {
        let mut consumer = streaming();
        consumer.feed(b"data: {\"chunk\":\"a\"}\n\ndata: {\"chunk\"");
        assert_eq!(consumer.end_of_body(), Some(ConsumerEvent::Completed));
        assert_eq!(consumer.state(), ConsumerState::Complete);
    }

    #[test]
    fn invalid_byte_does_not_stall_the_stream() {
        let mut consumer = streaming();
        let first = consumer.feed(b"data: {\"chunk\":\"a\"}\n\n\xFF: junk\n\n");
        assert_eq!(first, vec![ConsumerEvent::Fragment("a".into())]);

        let rest = consumer.feed(b"data: {\"chunk\":\"b\"}\n\ndata: [DONE]\n\n");
        assert_eq!(
            rest,
            vec![ConsumerEvent::Fragment("b".into()), ConsumerEvent::Completed]
        );
        assert_eq!(consumer.state(), ConsumerState::Complete);
    }

    #[test]
    fn transport_failure_while_sending() {
        let mut consumer = StreamConsumer::new();
        consumer.begin();
        assert_eq!(
            consumer.transport_failed("connection refused"),
            Some(ConsumerEvent::Failed("connection refused".into()))
        );
        assert!(consumer.begin());
    }

    #[test]
    fn begin_is_refused_mid_turn() {
        let mut consumer = streaming();
        assert!(!consumer.begin());
    }

    proptest! {
        #[test]
        fn any_read_split_preserves_fragment_order(
            fragments in prop::collection::vec("[a-zA-Z0-9 ,.!?éü✨\"\\\\]{1,12}", 1..8),
            cuts in prop::collection::vec(any::<prop::sample::Index>(), 0..10),
        ) {
            let body = wire(&fragments);
            let mut points: Vec<usize> = cuts.iter().map(|i| i.index(body.len())).collect();
            points.push(0);
            points.push(body.len());
            points.sort_unstable();
            points.dedup();

            let reads: Vec<&[u8]> = points.windows(2).map(|w| &body[w[0]..w[1]]).collect();
            let mut consumer = streaming();
            let (text, events) = accumulate(&mut consumer, &reads);

            prop_assert_eq!(text, fragments.concat());
            prop_assert_eq!(events.last(), Some(&ConsumerEvent::Completed));
            prop_assert_eq!(events.len(), fragments.len() + 1);
        }
    }
}
