//! Axum request handlers for all service endpoints.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use common::protocol::{ErrorResponse, HealthResponse};
use common::ServiceError;
use serde_json::Value;
use tracing::{error, warn};

use super::state::AppState;
use crate::payload::{self, EncryptionPolicy, ExchangeReply};

/// `GET /encryption/public-key` — the server's SPKI PEM public key as plain
/// text.
///
/// Served without authentication so clients can wrap their ephemeral session
/// keys. Provisions the keypair on first call if it does not exist yet.
pub async fn public_key(State(state): State<AppState>) -> Response {
    match state.key_store.public_key_pem().await {
        Ok(pem) => (StatusCode::OK, pem).into_response(),
        Err(e) => {
            error!(error = %e, "public key provisioning failed");
            service_error_response(&ServiceError::Internal("key provisioning failed".into()))
        }
    }
}

/// `POST /echo` — encrypted echo exchange.
///
/// The route requires an envelope: the body is decrypted, echoed back by the
/// business handler, and re-encrypted under the same session key with a fresh
/// nonce. A plain JSON body is rejected.
pub async fn echo(State(state): State<AppState>, Json(body): Json<Value>) -> Response {
    let result = payload::run_exchange(
        &state.key_store,
        EncryptionPolicy::Required,
        body,
        |plaintext| async move { Ok(plaintext) },
    )
    .await;

    match result {
        Ok(ExchangeReply::Encrypted(envelope)) => (StatusCode::OK, Json(envelope)).into_response(),
        Ok(ExchangeReply::Plain(value)) => (StatusCode::OK, Json(value)).into_response(),
        Err(err) => {
            warn!(error = %err, "echo exchange failed");
            service_error_response(&err)
        }
    }
}

/// `POST /echo/plain` — echo exchange with encryption optional.
///
/// Mirrors the platform's opt-out routes (public or unauthenticated
/// endpoints): an enveloped body is decrypted and answered encrypted, a
/// plain JSON body passes through untouched and is answered in plain JSON.
pub async fn echo_plain(State(state): State<AppState>, Json(body): Json<Value>) -> Response {
    let result = payload::run_exchange(
        &state.key_store,
        EncryptionPolicy::Optional,
        body,
        |plaintext| async move { Ok(plaintext) },
    )
    .await;

    match result {
        Ok(ExchangeReply::Encrypted(envelope)) => (StatusCode::OK, Json(envelope)).into_response(),
        Ok(ExchangeReply::Plain(value)) => (StatusCode::OK, Json(value)).into_response(),
        Err(err) => {
            warn!(error = %err, "plain echo exchange failed");
            service_error_response(&err)
        }
    }
}

/// `GET /health` — liveness and readiness check.
///
/// Returns `200 OK` once the RSA keypair is provisioned and cached.
/// Returns `503 Service Unavailable` before that.
pub async fn health(State(state): State<AppState>) -> Response {
    let keys_ready = state.key_store.is_ready();

    let (status_code, status_str) = if keys_ready {
        (StatusCode::OK, "ok")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "degraded")
    };

    let body = HealthResponse {
        status: status_str.into(),
        keys_ready,
    };
    (status_code, Json(body)).into_response()
}

/// Catch-all 404 handler.
pub async fn not_found() -> impl IntoResponse {
    let err = ErrorResponse::new("not_found", "the requested resource does not exist");
    (StatusCode::NOT_FOUND, Json(err))
}

/// Render a [`ServiceError`] as its wire status and error body.
fn service_error_response(err: &ServiceError) -> Response {
    let status =
        StatusCode::from_u16(err.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let body = ErrorResponse::new(err.code(), err.to_string());
    (status, Json(body)).into_response()
}
