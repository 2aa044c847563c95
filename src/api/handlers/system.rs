use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use chrono::{SecondsFormat, Utc};

use super::helpers::{bad_request, ApiResult};
use crate::api::ServerState;
use crate::wire::{
    HealthResponse, NoticeResponse, SystemPromptResponse, SystemPromptUpdate,
    INVALID_SYSTEM_PROMPT,
};

pub async fn get_system_prompt(State(state): State<ServerState>) -> Json<SystemPromptResponse> {
    Json(SystemPromptResponse {
        system_prompt: state.relay.config().system_prompt.clone(),
    })
}

/// Accepts a prompt but changes nothing; the prompt is fixed at startup.
pub async fn update_system_prompt(
    body: Result<Json<SystemPromptUpdate>, JsonRejection>,
) -> ApiResult<Json<NoticeResponse>> {
    let prompt = match body {
        Ok(Json(SystemPromptUpdate {
            system_prompt: Some(serde_json::Value::String(prompt)),
        })) if !prompt.is_empty() => prompt,
        _ => return Err(bad_request(INVALID_SYSTEM_PROMPT)),
    };

    log::info!(
        "system prompt update received ({} characters); not applied",
        prompt.chars().count()
    );
    Ok(Json(NoticeResponse {
        message: "System prompt received. Set system_prompt in the config file and restart the server for it to take effect.".to_string(),
    }))
}

pub async fn health(State(state): State<ServerState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        model: state.relay.model().to_string(),
        api_key_configured: state.relay.has_credentials(),
    })
}
