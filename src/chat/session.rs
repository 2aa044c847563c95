//! In-memory chat session: conversation history plus the single in-flight
//! streaming buffer.

use super::message::{Sender, Turn};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("a reply is already streaming")]
    StreamActive,
    #[error("no reply is streaming")]
    NoActiveStream,
    #[error("turn text must not be empty")]
    EmptyTurn,
    #[error("{0}")]
    InvalidInput(String),
}

/// Where the session is in the current turn's lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Ready for a new submission
    Idle,
    /// A reply is being received
    Streaming,
}

#[derive(Debug, Default)]
pub struct ChatSession {
    turns: Vec<Turn>,
    streaming: Option<String>,
}

impl ChatSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    /// Copy of the history, for handing to a relay call.
    pub fn history(&self) -> Vec<Turn> {
        self.turns.clone()
    }

    pub fn phase(&self) -> SessionPhase {
        if self.streaming.is_some() {
            SessionPhase::Streaming
        } else {
            SessionPhase::Idle
        }
    }

    pub fn is_streaming(&self) -> bool {
        self.streaming.is_some()
    }

    /// Text received so far for the in-flight reply.
    pub fn partial_text(&self) -> Option<&str> {
        self.streaming.as_deref()
    }

    pub fn append_turn(&mut self, turn: Turn) -> Result<(), SessionError> {
        if turn.text.is_empty() {
            return Err(SessionError::EmptyTurn);
        }
        self.turns.push(turn);
        Ok(())
    }

    pub fn begin_stream(&mut self) -> Result<(), SessionError> {
        if self.streaming.is_some() {
            return Err(SessionError::StreamActive);
        }
        self.streaming = Some(String::new());
        Ok(())
    }

    pub fn append_fragment(&mut self, fragment: &str) -> Result<&str, SessionError> {
        let buffer = self
            .streaming
            .as_mut()
            .ok_or(SessionError::NoActiveStream)?;
        buffer.push_str(fragment);
        Ok(buffer.as_str())
    }

    /// Closes the stream, turning the buffer into an assistant turn.
    ///
    /// An empty buffer closes the stream without adding a turn.
    pub fn finalize_stream(&mut self) -> Result<Option<&Turn>, SessionError> {
        let text = self.streaming.take().ok_or(SessionError::NoActiveStream)?;
        if text.is_empty() {
            log::warn!("reply finished without any text");
            return Ok(None);
        }
        self.turns.push(Turn {
            text,
            sender: Sender::Assistant,
        });
        Ok(self.turns.last())
    }

    /// Closes the stream, discarding partial text for a visible error turn.
    pub fn fail_stream(&mut self, message: &str) -> Result<&Turn, SessionError> {
        self.streaming.take().ok_or(SessionError::NoActiveStream)?;
        self.turns.push(Turn::error(message));
        Ok(&self.turns[self.turns.len() - 1])
    }

    /// Drops the in-flight buffer without recording anything.
    ///
    /// Returns whether a stream was active.
    pub fn cancel_stream(&mut self) -> bool {
        self.streaming.take().is_some()
    }

    /// Starts a new conversation.
    pub fn reset(&mut self) {
        self.turns.clear();
        self.streaming = None;
    }
}
