//! Axum request handlers for all service endpoints.

use std::time::Duration;

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use common::{
    protocol::{ErrorResponse, HealthResponse, InvocationResponse},
    Operation, ServiceError,
};
use serde_json::Value;

use super::state::AppState;
use crate::invocation;

/// Optional request header carrying a per-request Key Service deadline in
/// milliseconds. It can only shorten the configured `KMS_TIMEOUT_MS`.
pub const DEADLINE_HEADER: &str = "x-kms-timeout-ms";

/// `POST /encrypt`: HTTP status mirrors the invocation's `statusCode`.
pub async fn encrypt(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Response {
    to_http(handle(&state, Operation::Encrypt, &headers, &body).await)
}

/// `POST /decrypt`: HTTP status mirrors the invocation's `statusCode`.
pub async fn decrypt(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Response {
    to_http(handle(&state, Operation::Decrypt, &headers, &body).await)
}

/// `POST /invoke/encrypt`: always `200 OK` with the full
/// `{statusCode, body}` document.
pub async fn invoke_encrypt(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let resp = handle(&state, Operation::Encrypt, &headers, &body).await;
    (StatusCode::OK, Json(resp)).into_response()
}

/// `POST /invoke/decrypt`: always `200 OK` with the full
/// `{statusCode, body}` document.
pub async fn invoke_decrypt(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let resp = handle(&state, Operation::Decrypt, &headers, &body).await;
    (StatusCode::OK, Json(resp)).into_response()
}

/// `GET /health`: liveness check.
///
/// The service holds no warm state, so it is ready as soon as it is serving.
pub async fn health(State(state): State<AppState>) -> Response {
    let body = HealthResponse {
        status: "ok".into(),
        algorithm: state.service.algorithm().id().into(),
    };
    (StatusCode::OK, Json(body)).into_response()
}

/// Catch-all 404 handler.
pub async fn not_found() -> impl IntoResponse {
    let err = ErrorResponse::new("NOT_FOUND", "the requested resource does not exist");
    (StatusCode::NOT_FOUND, Json(err))
}

async fn handle(state: &AppState, op: Operation, headers: &HeaderMap, body: &[u8]) -> InvocationResponse {
    let parsed = caller_deadline(headers).and_then(|deadline| parse_event(body).map(|event| (deadline, event)));
    match parsed {
        Ok((deadline, event)) => match op {
            Operation::Encrypt => invocation::encrypt_event_within(&state.service, event, deadline).await,
            Operation::Decrypt => invocation::decrypt_event_within(&state.service, event, deadline).await,
        },
        Err(e) => invocation::rejected(op, &e),
    }
}

/// Read [`DEADLINE_HEADER`], if present.
fn caller_deadline(headers: &HeaderMap) -> Result<Option<Duration>, ServiceError> {
    let Some(value) = headers.get(DEADLINE_HEADER) else {
        return Ok(None);
    };
    value
        .to_str()
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .filter(|ms| *ms > 0)
        .map(|ms| Some(Duration::from_millis(ms)))
        .ok_or_else(|| ServiceError::structural(format!("{DEADLINE_HEADER} must be a positive integer")))
}

/// Parse an HTTP body into a request event.
fn parse_event(body: &[u8]) -> Result<Value, ServiceError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(ServiceError::structural("request body is empty"));
    }
    serde_json::from_slice(body)
        .map_err(|_| ServiceError::structural("request body is not valid JSON"))
}

fn to_http(resp: InvocationResponse) -> Response {
    let status = StatusCode::from_u16(resp.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(resp.body)).into_response()
}
