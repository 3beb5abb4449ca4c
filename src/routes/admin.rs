use axum::{
    Json, Router,
    extract::{Path, State},
    http::HeaderMap,
    routing::{patch, post},
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::{
        activity::InstanceSummary,
        admin::{CreateInstanceRequest, UpdateInstanceRequest, UpdateSessionRequest},
        common::AckResponse,
        session::SessionSummary,
    },
    error::AppError,
    routes::credential,
    services::admin_service,
    state::SharedState,
};

/// Routes exposing the admin configuration surface.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route(
            "/api/admin/instances",
            post(create_instance).get(list_instances),
        )
        .route(
            "/api/admin/instances/{id}",
            patch(update_instance).delete(delete_instance),
        )
        .route("/api/admin/session", post(update_session))
        .route("/api/admin/reset", post(reset_session))
}

/// Create an activity instance for the active session (admin only).
#[utoipa::path(
    post,
    path = "/api/admin/instances",
    tag = "admin",
    request_body = CreateInstanceRequest,
    responses(
        (status = 200, description = "Instance created", body = InstanceSummary),
        (status = 401, description = "Caller is not an admin"),
        (status = 404, description = "Unknown activity definition")
    )
)]
pub async fn create_instance(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Json(payload): Json<CreateInstanceRequest>,
) -> Result<Json<InstanceSummary>, AppError> {
    let credential = credential(&headers)?;
    payload.validate()?;
    let summary = admin_service::create_instance(&state, credential, payload).await?;
    Ok(Json(summary))
}

/// List every instance of the active session, disabled ones included (admin only).
#[utoipa::path(
    get,
    path = "/api/admin/instances",
    tag = "admin",
    responses(
        (status = 200, description = "All activity instances", body = [InstanceSummary]),
        (status = 401, description = "Caller is not an admin")
    )
)]
pub async fn list_instances(
    State(state): State<SharedState>,
    headers: HeaderMap,
) -> Result<Json<Vec<InstanceSummary>>, AppError> {
    let credential = credential(&headers)?;
    let instances = admin_service::list_instances(&state, credential).await?;
    Ok(Json(instances))
}

/// Update an existing activity instance (admin only).
#[utoipa::path(
    patch,
    path = "/api/admin/instances/{id}",
    tag = "admin",
    params(("id" = Uuid, Path, description = "Activity instance identifier")),
    request_body = UpdateInstanceRequest,
    responses(
        (status = 200, description = "Instance updated", body = InstanceSummary),
        (status = 401, description = "Caller is not an admin"),
        (status = 404, description = "Unknown activity instance")
    )
)]
pub async fn update_instance(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
    Json(payload): Json<UpdateInstanceRequest>,
) -> Result<Json<InstanceSummary>, AppError> {
    let credential = credential(&headers)?;
    payload.validate()?;
    let summary = admin_service::update_instance(&state, credential, id, payload).await?;
    Ok(Json(summary))
}

/// Delete an activity instance and its submissions (admin only).
#[utoipa::path(
    delete,
    path = "/api/admin/instances/{id}",
    tag = "admin",
    params(("id" = Uuid, Path, description = "Activity instance identifier")),
    responses(
        (status = 200, description = "Instance deleted", body = AckResponse),
        (status = 401, description = "Caller is not an admin"),
        (status = 404, description = "Unknown activity instance"),
        (status = 409, description = "Instance is currently on stage")
    )
)]
pub async fn delete_instance(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
) -> Result<Json<AckResponse>, AppError> {
    let credential = credential(&headers)?;
    admin_service::delete_instance(&state, credential, id).await?;
    Ok(Json(AckResponse::ok()))
}

/// Update title and status of the active session (admin only).
#[utoipa::path(
    post,
    path = "/api/admin/session",
    tag = "admin",
    request_body = UpdateSessionRequest,
    responses(
        (status = 200, description = "Session updated", body = SessionSummary),
        (status = 401, description = "Caller is not an admin")
    )
)]
pub async fn update_session(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Json(payload): Json<UpdateSessionRequest>,
) -> Result<Json<SessionSummary>, AppError> {
    let credential = credential(&headers)?;
    payload.validate()?;
    let summary = admin_service::update_session(&state, credential, payload).await?;
    Ok(Json(summary))
}

/// Deactivate the current session and create a fresh one (admin only).
#[utoipa::path(
    post,
    path = "/api/admin/reset",
    tag = "admin",
    responses(
        (status = 200, description = "Replacement session", body = SessionSummary),
        (status = 401, description = "Caller is not an admin")
    )
)]
pub async fn reset_session(
    State(state): State<SharedState>,
    headers: HeaderMap,
) -> Result<Json<SessionSummary>, AppError> {
    let credential = credential(&headers)?;
    let summary = admin_service::reset_session(&state, credential).await?;
    Ok(Json(summary))
}
