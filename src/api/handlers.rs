#[path = "handlers/chat.rs"]
mod chat;

#[path = "handlers/stream.rs"]
mod stream;

#[path = "handlers/system.rs"]
mod system;

#[path = "handlers/helpers.rs"]
mod helpers;

pub use chat::handle_chat;
pub use helpers::{relay_error, status_for, ApiError, ApiResult};
pub use stream::{handle_chat_stream, handle_stream_keepalive, relay_events};
pub use system::{get_system_prompt, health, update_system_prompt};
