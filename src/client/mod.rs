//! Client side of the relay: HTTP calls, the stream consumer and the turn
//! driver that ties them to a [`ChatSession`](crate::chat::ChatSession).

mod consumer;
mod http;
mod turn;

pub use consumer::{ConsumerEvent, ConsumerState, StreamConsumer};
pub use http::{ChatClient, TurnStream, DEFAULT_RELAY_URL};
pub use turn::{attend_turn, failure_message, run_turn, send_turn, TurnOutcome};
