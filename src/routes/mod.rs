use axum::{Router, http::HeaderMap};

use crate::{error::AppError, state::SharedState};

pub mod activity;
pub mod admin;
pub mod docs;
pub mod health;
pub mod participant;
pub mod session;
pub mod websocket;

/// Header carrying the participant credential issued at sign-in.
pub const SESSION_TOKEN_HEADER: &str = "x-session-token";

/// Compose all route trees, wiring in shared state and documentation routes.
pub fn router(state: SharedState) -> Router<()> {
    let api_router = health::router()
        .merge(websocket::router())
        .merge(participant::router())
        .merge(activity::router())
        .merge(session::router())
        .merge(admin::router());

    let docs_router = docs::router(state.clone());

    api_router.merge(docs_router).with_state(state)
}

/// Extract the participant credential from the request headers.
pub(crate) fn credential(headers: &HeaderMap) -> Result<&str, AppError> {
    headers
        .get(SESSION_TOKEN_HEADER)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized("missing session credential".into()))
}
