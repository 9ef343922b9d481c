//! REST endpoint handlers organized by resource.

pub mod events;
pub mod system;
pub mod trigger;

use axum::Router;

use crate::app_state::AppState;

/// Composes all resource routes under `/api/v1`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(trigger::routes())
        .merge(events::routes())
}
