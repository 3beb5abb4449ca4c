use axum::{
    Router,
    extract::{Path, State, WebSocketUpgrade},
    response::IntoResponse,
    routing::get,
};

use crate::{
    error::AppError,
    services::websocket_service,
    state::{SharedState, registry::ConnectionRole},
};

#[utoipa::path(
    get,
    path = "/ws/{role}",
    params(("role" = String, Path, description = "Connection role: display, host or user")),
    responses(
        (status = 101, description = "Switching protocols to WebSocket"),
        (status = 400, description = "Unknown role segment")
    )
)]
/// Upgrade the HTTP connection into a role-scoped WebSocket session.
pub async fn ws_handler(
    State(state): State<SharedState>,
    Path(role): Path<String>,
    ws: WebSocketUpgrade,
) -> Result<impl IntoResponse, AppError> {
    let role: ConnectionRole = role
        .parse()
        .map_err(|err: crate::state::registry::UnknownRole| AppError::BadRequest(err.to_string()))?;

    let shared_state = state.clone();
    Ok(ws.on_upgrade(move |socket| websocket_service::handle_socket(shared_state, socket, role)))
}

/// Configure the WebSocket endpoint.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new().route("/ws/{role}", get(ws_handler))
}
