mod event;
pub mod history;
mod message;
mod session;
mod sse;

pub use event::{RelayEvent, DONE_SENTINEL};
pub use message::{input_violation, Sender, Turn, MAX_INPUT_CHARS};
pub use session::{ChatSession, SessionError, SessionPhase};
pub use sse::{event_data, SseDecoder};

pub(crate) use sse::create_sse_stream;

#[cfg(test)]
pub(crate) use sse::tests::create_mock_response;
