use std::time::SystemTime;

use serde_json::json;
use uuid::Uuid;

use crate::{
    dao::{
        models::{ActivityInstanceEntity, ParticipantRole},
        training_store::TrainingStore,
    },
    dto::{
        activity::InstanceSummary,
        admin::{CreateInstanceRequest, UpdateInstanceRequest, UpdateSessionRequest},
        session::SessionSummary,
    },
    error::ServiceError,
    services::participant_service,
    state::SharedState,
};

const ADMIN_ROLES: &[ParticipantRole] = &[ParticipantRole::Admin];

/// Create a new activity instance (a configured round) for the active session.
pub async fn create_instance(
    state: &SharedState,
    credential: &str,
    request: CreateInstanceRequest,
) -> Result<InstanceSummary, ServiceError> {
    participant_service::require_role(state, credential, ADMIN_ROLES).await?;

    if state.activities().get(&request.definition_id).is_none() {
        return Err(ServiceError::NotFound(format!(
            "activity definition `{}` is not registered",
            request.definition_id
        )));
    }

    let store = state.store();
    let session = store
        .ensure_active_session(state.config().session_title.clone())
        .await?;

    let instance = ActivityInstanceEntity {
        id: Uuid::new_v4(),
        session_id: session.id,
        definition_id: request.definition_id,
        name: request.name,
        config: request.config.unwrap_or_else(|| json!({})),
        is_enabled: request.is_enabled.unwrap_or(false),
        created_at: SystemTime::now(),
    };
    store.save_instance(instance.clone()).await?;

    Ok(instance.into())
}

/// Update name, configuration or enabled flag of an existing instance.
pub async fn update_instance(
    state: &SharedState,
    credential: &str,
    instance_id: Uuid,
    request: UpdateInstanceRequest,
) -> Result<InstanceSummary, ServiceError> {
    participant_service::require_role(state, credential, ADMIN_ROLES).await?;

    let store = state.store();
    let mut instance = store
        .find_instance(instance_id)
        .await?
        .ok_or_else(|| {
            ServiceError::NotFound(format!("activity instance `{instance_id}` not found"))
        })?;

    if let Some(name) = request.name {
        instance.name = name;
    }
    if let Some(config) = request.config {
        instance.config = config;
    }
    if let Some(is_enabled) = request.is_enabled {
        instance.is_enabled = is_enabled;
    }
    store.save_instance(instance.clone()).await?;

    Ok(instance.into())
}

/// Delete an instance and its submissions.
///
/// The instance currently on stage cannot be deleted; stop or reset first.
pub async fn delete_instance(
    state: &SharedState,
    credential: &str,
    instance_id: Uuid,
) -> Result<(), ServiceError> {
    participant_service::require_role(state, credential, ADMIN_ROLES).await?;

    let store = state.store();
    if store.find_instance(instance_id).await?.is_none() {
        return Err(ServiceError::NotFound(format!(
            "activity instance `{instance_id}` not found"
        )));
    }

    if let Some(session) = store.active_session().await?
        && session.current_instance == Some(instance_id)
    {
        return Err(ServiceError::InvalidState(
            "cannot delete the activity instance currently on stage".into(),
        ));
    }

    store.delete_instance(instance_id).await?;
    Ok(())
}

/// Every instance of the active session, disabled ones included.
pub async fn list_instances(
    state: &SharedState,
    credential: &str,
) -> Result<Vec<InstanceSummary>, ServiceError> {
    participant_service::require_role(state, credential, ADMIN_ROLES).await?;

    let store = state.store();
    let session = store
        .ensure_active_session(state.config().session_title.clone())
        .await?;
    let instances = store.list_instances(session.id).await?;
    Ok(instances.into_iter().map(Into::into).collect())
}

/// Update title and lifecycle status of the active session.
pub async fn update_session(
    state: &SharedState,
    credential: &str,
    request: UpdateSessionRequest,
) -> Result<SessionSummary, ServiceError> {
    participant_service::require_role(state, credential, ADMIN_ROLES).await?;

    let store = state.store();
    let mut session = store
        .ensure_active_session(state.config().session_title.clone())
        .await?;

    if let Some(title) = request.title {
        session.title = title;
    }
    if let Some(status) = request.status {
        session.status = status;
    }
    store.save_session(session.clone()).await?;

    Ok(session.into())
}

/// Deactivate the current session and start over with a fresh one.
///
/// Participants, instances and submissions of the old session are destroyed;
/// the state machine returns to idle and any armed countdown is dropped.
pub async fn reset_session(
    state: &SharedState,
    credential: &str,
) -> Result<SessionSummary, ServiceError> {
    participant_service::require_role(state, credential, ADMIN_ROLES).await?;

    let session = state
        .store()
        .reset_active_session(state.config().session_title.clone())
        .await?;
    state.reset_machine().await;
    state.clear_countdown().await;

    Ok(session.into())
}
