//! Model relay: turns a chat request into one provider call.

mod client;
mod config;
mod request;

#[cfg(test)]
pub(crate) mod testing;

pub use client::RelayClient;
pub use config::{
    default_safety_settings, GenerationSettings, RelayConfig, DEFAULT_SYSTEM_PROMPT,
    SUGGESTED_PROMPTS,
};
pub use request::RelayRequest;
