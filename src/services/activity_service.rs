use serde_json::Value;
use uuid::Uuid;

use crate::{
    activities::merge_config,
    dao::{
        models::{ActivityInstanceEntity, ActivityPhaseState, ParticipantRole, SessionEntity},
        training_store::TrainingStore,
    },
    dto::activity::{DefinitionSummary, InstanceSummary},
    error::ServiceError,
    services::participant_service,
    state::SharedState,
};

/// Record a participant's answer for the activity instance on stage.
///
/// Submissions are only accepted while the instance is running — or, when
/// the late-submission policy allows it, while it shows results. The payload
/// itself is validated by the activity implementation.
pub async fn submit(
    state: &SharedState,
    credential: &str,
    instance_id: Uuid,
    payload: Value,
) -> Result<(), ServiceError> {
    let mut participant = participant_service::require_role(
        state,
        credential,
        &[
            ParticipantRole::User,
            ParticipantRole::Host,
            ParticipantRole::Admin,
        ],
    )
    .await?;

    let store = state.store();
    let session = require_active_session(state).await?;

    if session.current_instance != Some(instance_id) {
        return Err(ServiceError::InvalidState(
            "activity instance is not on stage".into(),
        ));
    }
    match session.activity_phase {
        ActivityPhaseState::Running => {}
        ActivityPhaseState::Results if state.config().allow_late_submissions => {}
        _ => {
            return Err(ServiceError::InvalidState(
                "activity is not accepting submissions".into(),
            ));
        }
    }

    let instance = find_session_instance(state, &session, instance_id).await?;
    let activity = state.activities().get(&instance.definition_id).ok_or_else(|| {
        ServiceError::NotFound(format!(
            "activity definition `{}` is not registered",
            instance.definition_id
        ))
    })?;

    let ctx = state.activity_context(session.id, instance);
    activity.handle_input(ctx, participant.id, payload).await?;

    participant.interaction_count += 1;
    store.save_participant(participant).await?;

    Ok(())
}

/// Aggregate results for an activity instance, whatever its phase.
pub async fn results(state: &SharedState, instance_id: Uuid) -> Result<Value, ServiceError> {
    let session = require_active_session(state).await?;
    let instance = find_session_instance(state, &session, instance_id).await?;
    let activity = state.activities().get(&instance.definition_id).ok_or_else(|| {
        ServiceError::NotFound(format!(
            "activity definition `{}` is not registered",
            instance.definition_id
        ))
    })?;

    activity.results(state.activity_context(session.id, instance)).await
}

/// Definition defaults merged with the instance configuration.
pub async fn merged_config(state: &SharedState, instance_id: Uuid) -> Result<Value, ServiceError> {
    let session = require_active_session(state).await?;
    let instance = find_session_instance(state, &session, instance_id).await?;

    let defaults = state
        .activities()
        .get(&instance.definition_id)
        .map(|activity| activity.definition().default_config)
        .unwrap_or(Value::Null);

    Ok(merge_config(&defaults, &instance.config))
}

/// Rounds the host can start, in creation order. Empty when no session exists.
pub async fn list_enabled_instances(
    state: &SharedState,
) -> Result<Vec<InstanceSummary>, ServiceError> {
    let store = state.store();
    let Some(session) = store.active_session().await? else {
        return Ok(Vec::new());
    };

    let instances = store.list_instances(session.id).await?;
    Ok(instances
        .into_iter()
        .filter(|instance| instance.is_enabled)
        .map(Into::into)
        .collect())
}

/// Metadata of every registered activity definition.
pub fn list_definitions(state: &SharedState) -> Vec<DefinitionSummary> {
    state
        .activities()
        .definitions()
        .into_iter()
        .map(Into::into)
        .collect()
}

async fn require_active_session(state: &SharedState) -> Result<SessionEntity, ServiceError> {
    state
        .store()
        .active_session()
        .await?
        .ok_or_else(|| ServiceError::NotFound("no active session".into()))
}

async fn find_session_instance(
    state: &SharedState,
    session: &SessionEntity,
    instance_id: Uuid,
) -> Result<ActivityInstanceEntity, ServiceError> {
    state
        .store()
        .find_instance(instance_id)
        .await?
        .filter(|instance| instance.session_id == session.id)
        .ok_or_else(|| {
            ServiceError::NotFound(format!("activity instance `{instance_id}` not found"))
        })
}
