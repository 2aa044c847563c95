//! JSON bodies exchanged between chat clients and the relay server.

use serde::{Deserialize, Serialize};

use crate::chat::{input_violation, Turn};
use crate::error::RelayError;
use crate::relay::RelayRequest;

pub const INVALID_MESSAGE: &str = "Message is required and must be a string";
pub const INVALID_SYSTEM_PROMPT: &str = "System prompt is required and must be a string";

/// Body of `POST /api/chat` and `POST /api/chat-stream`.
///
/// `message` is kept loosely typed so that a missing or non-string value
/// is reported as invalid input rather than a body decoding failure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    #[serde(default)]
    pub message: Option<serde_json::Value>,
    #[serde(default)]
    pub history: Vec<Turn>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
}

impl ChatRequest {
    pub fn from_relay(request: &RelayRequest) -> Self {
        Self {
            message: Some(serde_json::Value::String(request.message.clone())),
            history: request.history.clone(),
            system_prompt: request.system_prompt.clone(),
        }
    }

    pub fn into_relay_request(self) -> Result<RelayRequest, RelayError> {
        let message = match self.message {
            Some(serde_json::Value::String(message)) if !message.is_empty() => message,
            _ => return Err(RelayError::InvalidInput(INVALID_MESSAGE.to_string())),
        };
        if let Some(reason) = input_violation(&message) {
            return Err(RelayError::InvalidInput(reason));
        }
        Ok(RelayRequest {
            message,
            history: self.history,
            system_prompt: self.system_prompt,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub response: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemPromptResponse {
    pub system_prompt: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemPromptUpdate {
    #[serde(default)]
    pub system_prompt: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoticeResponse {
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
    pub model: String,
    pub api_key_configured: bool,
}
