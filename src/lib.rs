//! Chat relay between a browser-style client and Google's Gemini API.
//!
//! The server half ([`api`]) accepts a message plus the prior conversation,
//! forwards it to the provider with a fixed persona prompt and sampling
//! settings, and answers either with the whole reply or with a live event
//! stream of text fragments. The client half ([`client`]) consumes that
//! stream and keeps a [`chat::ChatSession`] in step with it.

#[cfg(feature = "server")]
pub mod api;
pub mod chat;
pub mod client;
pub mod config;
pub mod error;
#[cfg(feature = "cli")]
pub mod logging;
pub mod provider;
pub mod relay;
pub mod wire;

pub use chat::{ChatSession, Sender, Turn};
pub use error::RelayError;
pub use provider::{Gemini, GenerativeProvider};
pub use relay::{RelayClient, RelayConfig, RelayRequest};
