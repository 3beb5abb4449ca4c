use axum::{
    Json, Router,
    extract::State,
    routing::{get, post},
};
use validator::Validate;

use crate::{
    dto::{
        participant::{SigninRequest, SigninResponse, StatsCountResponse},
        session::TrainingStatusResponse,
    },
    error::AppError,
    services::{participant_service, session_service},
    state::SharedState,
};

/// Routes handling sign-in and the polling fallbacks.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/api/signin", post(signin))
        .route("/api/training/status", get(training_status))
        .route("/api/stats/count", get(stats_count))
}

/// Sign a participant in and return the credential for subsequent requests.
#[utoipa::path(
    post,
    path = "/api/signin",
    tag = "participant",
    request_body = SigninRequest,
    responses(
        (status = 200, description = "Participant created or re-identified", body = SigninResponse),
        (status = 401, description = "Invalid host or admin password")
    )
)]
pub async fn signin(
    State(state): State<SharedState>,
    Json(payload): Json<SigninRequest>,
) -> Result<Json<SigninResponse>, AppError> {
    payload.validate()?;
    let response = participant_service::signin(&state, payload).await?;
    Ok(Json(response))
}

/// Snapshot of the live training state for polling clients.
#[utoipa::path(
    get,
    path = "/api/training/status",
    tag = "participant",
    responses((status = 200, description = "Current training status", body = TrainingStatusResponse))
)]
pub async fn training_status(
    State(state): State<SharedState>,
) -> Result<Json<TrainingStatusResponse>, AppError> {
    let status = session_service::training_status(&state).await?;
    Ok(Json(status))
}

/// Current participant head-count.
#[utoipa::path(
    get,
    path = "/api/stats/count",
    tag = "participant",
    responses((status = 200, description = "Participant head-count", body = StatsCountResponse))
)]
pub async fn stats_count(
    State(state): State<SharedState>,
) -> Result<Json<StatsCountResponse>, AppError> {
    let count = participant_service::participant_count(&state).await?;
    Ok(Json(StatsCountResponse { count }))
}
