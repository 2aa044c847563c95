use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;

use super::helpers::{relay_error, relay_request, ApiResult};
use crate::api::ServerState;
use crate::wire::{ChatRequest, ChatResponse};

pub async fn handle_chat(
    State(state): State<ServerState>,
    body: Result<Json<ChatRequest>, JsonRejection>,
) -> ApiResult<Json<ChatResponse>> {
    let request = relay_request(body).map_err(|e| relay_error(&e))?;

    let response = state.relay.complete_once(&request).await.map_err(|e| {
        log::error!("chat relay failed: {e}");
        relay_error(&e)
    })?;

    Ok(Json(ChatResponse { response }))
}
