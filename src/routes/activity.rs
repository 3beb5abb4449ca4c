use axum::{
    Json, Router,
    extract::{Path, State},
    http::HeaderMap,
    routing::{get, post},
};
use serde_json::Value;
use uuid::Uuid;

use crate::{
    dto::{
        activity::{DefinitionSummary, InstanceSummary},
        common::AckResponse,
    },
    error::AppError,
    routes::credential,
    services::activity_service,
    state::SharedState,
};

/// Routes serving activity metadata, submissions and results.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/api/definitions", get(list_definitions))
        .route("/api/activities", get(list_activities))
        .route("/api/activities/{id}/config", get(activity_config))
        .route("/api/activities/{id}/results", get(activity_results))
        .route("/api/activities/{id}/submit", post(submit_answer))
}

/// List the registered activity definitions.
#[utoipa::path(
    get,
    path = "/api/definitions",
    tag = "activity",
    responses((status = 200, description = "Registered definitions", body = [DefinitionSummary]))
)]
pub async fn list_definitions(State(state): State<SharedState>) -> Json<Vec<DefinitionSummary>> {
    Json(activity_service::list_definitions(&state))
}

/// List the enabled activity instances of the active session.
#[utoipa::path(
    get,
    path = "/api/activities",
    tag = "activity",
    responses((status = 200, description = "Enabled activity instances", body = [InstanceSummary]))
)]
pub async fn list_activities(
    State(state): State<SharedState>,
) -> Result<Json<Vec<InstanceSummary>>, AppError> {
    let instances = activity_service::list_enabled_instances(&state).await?;
    Ok(Json(instances))
}

/// Definition defaults merged with the instance configuration.
#[utoipa::path(
    get,
    path = "/api/activities/{id}/config",
    tag = "activity",
    params(("id" = Uuid, Path, description = "Activity instance identifier")),
    responses(
        (status = 200, description = "Merged configuration"),
        (status = 404, description = "Unknown activity instance")
    )
)]
pub async fn activity_config(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let config = activity_service::merged_config(&state, id).await?;
    Ok(Json(config))
}

/// Aggregated results for an activity instance.
#[utoipa::path(
    get,
    path = "/api/activities/{id}/results",
    tag = "activity",
    params(("id" = Uuid, Path, description = "Activity instance identifier")),
    responses(
        (status = 200, description = "Aggregated results"),
        (status = 404, description = "Unknown activity instance")
    )
)]
pub async fn activity_results(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let results = activity_service::results(&state, id).await?;
    Ok(Json(results))
}

/// Record the calling participant's answer for the running activity.
#[utoipa::path(
    post,
    path = "/api/activities/{id}/submit",
    tag = "activity",
    params(("id" = Uuid, Path, description = "Activity instance identifier")),
    responses(
        (status = 200, description = "Submission stored", body = AckResponse),
        (status = 400, description = "Malformed submission payload"),
        (status = 401, description = "Missing or unknown credential"),
        (status = 409, description = "Activity is not accepting submissions")
    )
)]
pub async fn submit_answer(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
    Json(payload): Json<Value>,
) -> Result<Json<AckResponse>, AppError> {
    let credential = credential(&headers)?;
    activity_service::submit(&state, credential, id, payload).await?;
    Ok(Json(AckResponse::ok()))
}
