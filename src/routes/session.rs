use axum::{
    Json, Router,
    extract::{Path, State},
    http::HeaderMap,
    routing::post,
};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::{
        activity::{CountdownRequest, PhaseRequest},
        common::AckResponse,
    },
    error::AppError,
    routes::credential,
    services::session_service,
    state::SharedState,
};

/// Routes exposing the host activity controls.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/api/activities/{id}/start", post(start_activity))
        .route("/api/activities/stop", post(stop_activity))
        .route("/api/activities/reset", post(reset_activity))
        .route("/api/activities/phase", post(set_phase))
        .route("/api/activities/countdown", post(schedule_countdown))
}

/// Acknowledgement returned when a countdown was armed.
#[derive(Debug, Serialize, ToSchema)]
pub struct CountdownResponse {
    /// Always `"ok"`.
    pub status: String,
    /// Effective countdown duration in seconds.
    pub seconds: u64,
}

/// Put an activity instance on stage (host only).
#[utoipa::path(
    post,
    path = "/api/activities/{id}/start",
    tag = "session",
    params(("id" = Uuid, Path, description = "Activity instance identifier")),
    responses(
        (status = 200, description = "Activity started", body = AckResponse),
        (status = 401, description = "Caller is not a host"),
        (status = 404, description = "Unknown activity instance"),
        (status = 409, description = "Another activity is already running")
    )
)]
pub async fn start_activity(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
) -> Result<Json<AckResponse>, AppError> {
    let credential = credential(&headers)?;
    session_service::start_activity(&state, credential, id).await?;
    Ok(Json(AckResponse::ok()))
}

/// Close submissions and move the running activity to results (host only).
#[utoipa::path(
    post,
    path = "/api/activities/stop",
    tag = "session",
    responses(
        (status = 200, description = "Activity stopped", body = AckResponse),
        (status = 401, description = "Caller is not a host"),
        (status = 409, description = "No activity is on stage")
    )
)]
pub async fn stop_activity(
    State(state): State<SharedState>,
    headers: HeaderMap,
) -> Result<Json<AckResponse>, AppError> {
    let credential = credential(&headers)?;
    session_service::stop_activity(&state, credential).await?;
    Ok(Json(AckResponse::ok()))
}

/// Clear the stage and return the session to idle (host only).
#[utoipa::path(
    post,
    path = "/api/activities/reset",
    tag = "session",
    responses(
        (status = 200, description = "Stage cleared", body = AckResponse),
        (status = 401, description = "Caller is not a host")
    )
)]
pub async fn reset_activity(
    State(state): State<SharedState>,
    headers: HeaderMap,
) -> Result<Json<AckResponse>, AppError> {
    let credential = credential(&headers)?;
    session_service::reset_activity(&state, credential).await?;
    Ok(Json(AckResponse::ok()))
}

/// Broadcast an intra-activity sub-phase change (host only).
#[utoipa::path(
    post,
    path = "/api/activities/phase",
    tag = "session",
    request_body = PhaseRequest,
    responses(
        (status = 200, description = "Sub-phase broadcast", body = AckResponse),
        (status = 401, description = "Caller is not a host")
    )
)]
pub async fn set_phase(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Json(payload): Json<PhaseRequest>,
) -> Result<Json<AckResponse>, AppError> {
    let credential = credential(&headers)?;
    session_service::set_phase(&state, credential, payload.phase).await?;
    Ok(Json(AckResponse::ok()))
}

/// Announce a countdown and schedule the automatic stop (host only).
#[utoipa::path(
    post,
    path = "/api/activities/countdown",
    tag = "session",
    request_body = CountdownRequest,
    responses(
        (status = 200, description = "Countdown armed", body = CountdownResponse),
        (status = 401, description = "Caller is not a host"),
        (status = 409, description = "No activity is running")
    )
)]
pub async fn schedule_countdown(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Json(payload): Json<CountdownRequest>,
) -> Result<Json<CountdownResponse>, AppError> {
    let credential = credential(&headers)?;
    payload.validate()?;
    let seconds = session_service::schedule_auto_stop(&state, credential, payload.seconds).await?;
    Ok(Json(CountdownResponse {
        status: "ok".into(),
        seconds,
    }))
}
