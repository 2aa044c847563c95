use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::error::RelayError;
use crate::relay::RelayRequest;
use crate::wire::{ChatRequest, ErrorBody};

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub body: ErrorBody,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

pub fn bad_request(msg: impl Into<String>) -> ApiError {
    ApiError {
        status: StatusCode::BAD_REQUEST,
        body: ErrorBody {
            error: msg.into(),
            details: None,
        },
    }
}

pub fn status_for(err: &RelayError) -> StatusCode {
    match err {
        RelayError::InvalidInput(_) | RelayError::ContentFiltered(_) => StatusCode::BAD_REQUEST,
        RelayError::AuthFailure(_) => StatusCode::UNAUTHORIZED,
        RelayError::QuotaExceeded(_) => StatusCode::TOO_MANY_REQUESTS,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Error response for a failed relay call.
///
/// Only unclassified failures carry diagnostic details.
pub fn relay_error(err: &RelayError) -> ApiError {
    let status = status_for(err);
    let details = (status == StatusCode::INTERNAL_SERVER_ERROR).then(|| err.to_string());
    ApiError {
        status,
        body: ErrorBody {
            error: err.public_message(),
            details,
        },
    }
}

/// Validates a chat body into a relay request.
pub fn relay_request(
    body: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<RelayRequest, RelayError> {
    let Json(body) = body.map_err(|rejection| {
        log::debug!("rejected chat body: {rejection}");
        RelayError::InvalidInput(format!("Invalid request body: {}", rejection.body_text()))
    })?;
    body.into_relay_request()
}
