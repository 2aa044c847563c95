use std::fmt;

use serde::{Deserialize, Serialize};

/// Hard limit on user-authored input, in characters.
pub const MAX_INPUT_CHARS: usize = 2000;

/// Author of a turn in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    /// The human participant
    User,
    /// The model; older clients send this as `"ai"`
    #[serde(alias = "ai")]
    Assistant,
}

impl fmt::Display for Sender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Sender::User => "user",
            Sender::Assistant => "assistant",
        };
        write!(f, "{name}")
    }
}

/// One message in a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub text: String,
    pub sender: Sender,
}

impl Turn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            sender: Sender::User,
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            sender: Sender::Assistant,
        }
    }

    /// Visible assistant turn describing a failed relay call.
    pub fn error(message: &str) -> Self {
        Self::assistant(format!("Error: {message}"))
    }
}

/// Checks a user-authored message against the input rules.
///
/// Returns the reason it is unacceptable, if any.
pub fn input_violation(text: &str) -> Option<String> {
    if text.trim().is_empty() {
        return Some("Message is required and must be a string".to_string());
    }
    let len = text.chars().count();
    if len > MAX_INPUT_CHARS {
        return Some(format!(
            "Message is too long ({len} characters, limit is {MAX_INPUT_CHARS})"
        ));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_ai_sender_is_accepted() {
        let turn: Turn = serde_json::from_str(r#"{"text":"hello","sender":"ai"}"#).unwrap();
        assert_eq!(turn, Turn::assistant("hello"));
        assert_eq!(
            serde_json::to_string(&turn).unwrap(),
            r#"{"text":"hello","sender":"assistant"}"#
        );
    }

    #[test]
    fn input_rules() {
        assert!(input_violation("").is_some());
        assert!(input_violation("  \n").is_some());
        assert!(input_violation("hi").is_none());
        assert!(input_violation(&"x".repeat(MAX_INPUT_CHARS)).is_none());
        assert!(input_violation(&"x".repeat(MAX_INPUT_CHARS + 1)).is_some());
    }

    #[test]
    fn error_turn_is_labeled() {
        assert_eq!(Turn::error("Invalid API key").text, "Error: Invalid API key");
    }
}
