//! Trigger handlers: start a fire-and-forget haptic session.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};

use crate::api::dto::TriggerAccepted;
use crate::app_state::AppState;
use crate::domain::{TriggerArgs, TriggerOptions};
use crate::error::RelayError;

/// `POST /trigger`: Start a session from a JSON options object.
///
/// # Errors
///
/// Returns [`RelayError::InvalidAddress`] or [`RelayError::InvalidRequest`]
/// when the options are rejected; nothing is spawned in that case.
pub async fn trigger(
    State(state): State<AppState>,
    Json(options): Json<TriggerOptions>,
) -> Result<impl IntoResponse, RelayError> {
    let session_id = state.relay.trigger(options)?;
    Ok((StatusCode::ACCEPTED, Json(TriggerAccepted::now(session_id))))
}

/// `POST /trigger/args`: Start a session from a positional JSON array
/// `[connectAddress, timeout, vibrate, linear, linearDuration]`.
///
/// # Errors
///
/// Same as [`trigger`].
pub async fn trigger_args(
    State(state): State<AppState>,
    Json(TriggerArgs(address, timeout, vibrate, linear, linear_duration)): Json<TriggerArgs>,
) -> Result<impl IntoResponse, RelayError> {
    let session_id = state
        .relay
        .trigger_with(address, timeout, vibrate, linear, linear_duration)?;
    Ok((StatusCode::ACCEPTED, Json(TriggerAccepted::now(session_id))))
}

/// Trigger routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/trigger", post(trigger))
        .route("/trigger/args", post(trigger_args))
}
