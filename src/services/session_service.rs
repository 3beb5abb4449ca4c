use std::time::Duration;

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    dao::{
        models::{ActivityPhaseState, ParticipantRole},
        training_store::TrainingStore,
    },
    dto::session::TrainingStatusResponse,
    error::ServiceError,
    services::{participant_service, ws_events},
    state::{ActivityPhase, CountdownHandle, SessionEvent, SharedState},
};

/// Roles allowed to drive activity transitions.
const CONTROL_ROLES: &[ParticipantRole] = &[ParticipantRole::Host, ParticipantRole::Admin];

/// Put an activity instance on stage and open it for submissions.
///
/// Valid while idle, from results, or as an explicit restart of the instance
/// already running (producing a fresh round). The session row update and the
/// activity's own start routine run as the transition work; the display is
/// only notified once both committed.
pub async fn start_activity(
    state: &SharedState,
    credential: &str,
    instance_id: Uuid,
) -> Result<(), ServiceError> {
    participant_service::require_role(state, credential, CONTROL_ROLES).await?;

    let store = state.store();
    let session = store
        .active_session()
        .await?
        .ok_or_else(|| ServiceError::NotFound("no active session".into()))?;
    let instance = store
        .find_instance(instance_id)
        .await?
        .filter(|instance| instance.session_id == session.id)
        .ok_or_else(|| ServiceError::NotFound(format!("activity instance `{instance_id}` not found")))?;
    let activity = state.activities().get(&instance.definition_id).ok_or_else(|| {
        ServiceError::NotFound(format!(
            "activity definition `{}` is not registered",
            instance.definition_id
        ))
    })?;

    let ctx = state.activity_context(session.id, instance);
    let mut updated = session;
    updated.current_instance = Some(instance_id);
    updated.activity_phase = ActivityPhaseState::Running;

    let work_store = store.clone();
    state
        .run_transition(SessionEvent::StartActivity { instance_id }, move || async move {
            work_store.save_session(updated).await?;
            activity.start(ctx).await
        })
        .await?;

    ws_events::broadcast_activity_started(state.registry(), instance_id);
    Ok(())
}

/// Close submissions for the activity on stage and move it to results.
pub async fn stop_activity(state: &SharedState, credential: &str) -> Result<(), ServiceError> {
    participant_service::require_role(state, credential, CONTROL_ROLES).await?;
    stop_current(state, None).await?;
    Ok(())
}

/// Clear the stage entirely and return the session to idle.
pub async fn reset_activity(state: &SharedState, credential: &str) -> Result<(), ServiceError> {
    participant_service::require_role(state, credential, CONTROL_ROLES).await?;

    let shared = state.clone();
    state
        .run_transition(SessionEvent::ResetActivity, move || async move {
            let store = shared.store();
            let session = store
                .active_session()
                .await?
                .ok_or_else(|| ServiceError::NotFound("no active session".into()))?;

            // Stop whatever is on stage; a missing instance or definition
            // must not block the reset.
            if let Some(instance_id) = session.current_instance
                && let Some(instance) = store.find_instance(instance_id).await?
                && let Some(activity) = shared.activities().get(&instance.definition_id)
            {
                let ctx = shared.activity_context(session.id, instance);
                if let Err(err) = activity.stop(ctx).await {
                    warn!(instance = %instance_id, error = %err, "activity stop failed during reset");
                }
            }

            let mut updated = session;
            updated.current_instance = None;
            updated.activity_phase = ActivityPhaseState::Idle;
            store.save_session(updated).await?;
            Ok(())
        })
        .await?;

    // A countdown armed for the cleared stage could only ever no-op.
    state.clear_countdown().await;
    ws_events::broadcast_activity_reset(state.registry());
    Ok(())
}

/// Broadcast an intra-activity sub-phase change without touching the
/// activity phase itself.
pub async fn set_phase(state: &SharedState, credential: &str, phase: u32) -> Result<(), ServiceError> {
    participant_service::require_role(state, credential, CONTROL_ROLES).await?;

    let session = state
        .store()
        .active_session()
        .await?
        .ok_or_else(|| ServiceError::NotFound("no active session".into()))?;

    ws_events::broadcast_phase_change(state.registry(), phase, session.current_instance);
    Ok(())
}

/// Announce a countdown and arm a timer that stops the running activity once
/// it expires.
///
/// Re-scheduling aborts the previously armed timer; the expiry itself
/// re-checks that the same instance is still running inside the serialized
/// transition work, so a manual stop in the meantime turns it into a no-op.
pub async fn schedule_auto_stop(
    state: &SharedState,
    credential: &str,
    seconds: Option<u64>,
) -> Result<u64, ServiceError> {
    participant_service::require_role(state, credential, CONTROL_ROLES).await?;

    let seconds = seconds.unwrap_or(state.config().default_countdown_seconds);
    let instance_id = match state.machine_phase().await {
        ActivityPhase::Running { instance_id } => instance_id,
        _ => {
            return Err(ServiceError::InvalidState(
                "no activity is running".into(),
            ));
        }
    };

    ws_events::broadcast_countdown_started(state.registry(), seconds);

    let timer_state = state.clone();
    let handle = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(seconds)).await;
        match stop_current(&timer_state, Some(instance_id)).await {
            Ok(stopped) => {
                info!(instance = %stopped, "countdown expired; activity moved to results");
            }
            Err(err) => {
                debug!(error = %err, "countdown expired without effect");
            }
        }
    });
    state
        .replace_countdown(CountdownHandle::new(instance_id, handle))
        .await;

    Ok(seconds)
}

/// Snapshot of the live training state for polling clients.
pub async fn training_status(state: &SharedState) -> Result<TrainingStatusResponse, ServiceError> {
    let store = state.store();
    match store.active_session().await? {
        Some(session) => {
            let count = store.count_participants(session.id).await?;
            Ok(TrainingStatusResponse::from_session(&session, count))
        }
        None => Ok(TrainingStatusResponse::no_session()),
    }
}

/// Shared stop path for the manual host action and the countdown timer.
///
/// When `expected_instance` is set (timer path) the transition only proceeds
/// if that instance is still in the running phase; the check runs inside the
/// transition work, so it is serialized against every competing stop and the
/// `plugin_end` broadcast can never be emitted twice for one round.
async fn stop_current(
    state: &SharedState,
    expected_instance: Option<Uuid>,
) -> Result<Uuid, ServiceError> {
    let shared = state.clone();
    let (instance_id, _next) = state
        .run_transition(SessionEvent::StopActivity, move || async move {
            let store = shared.store();
            let session = store
                .active_session()
                .await?
                .ok_or_else(|| ServiceError::NotFound("no active session".into()))?;
            let instance_id = session
                .current_instance
                .ok_or_else(|| ServiceError::InvalidState("no activity on stage".into()))?;

            if let Some(expected) = expected_instance
                && (session.activity_phase != ActivityPhaseState::Running
                    || instance_id != expected)
            {
                return Err(ServiceError::InvalidState(
                    "activity already left the running phase".into(),
                ));
            }

            let mut updated = session.clone();
            updated.activity_phase = ActivityPhaseState::Results;
            store.save_session(updated).await?;

            // Defensive: a deleted instance or unregistered definition must
            // not keep the session stuck in running.
            if let Some(instance) = store.find_instance(instance_id).await?
                && let Some(activity) = shared.activities().get(&instance.definition_id)
            {
                activity
                    .stop(shared.activity_context(session.id, instance))
                    .await?;
            }

            Ok(instance_id)
        })
        .await?;

    ws_events::broadcast_activity_ended(state.registry(), instance_id);
    Ok(instance_id)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::SystemTime;

    use serde_json::json;
    use tokio::sync::mpsc;

    use crate::{
        activities::ActivityRegistry,
        config::AppConfig,
        dao::{models::ActivityInstanceEntity, training_store::memory::MemoryStore},
        dto::participant::{SigninRequest, SigninResponse},
        state::{
            AppState,
            registry::{ClientConnection, ConnectionRole},
        },
    };

    use super::*;

    struct Fixture {
        state: SharedState,
        host_credential: String,
        user_credential: String,
        instance_id: Uuid,
    }

    async fn fixture() -> Fixture {
        let state = AppState::new(
            AppConfig::default(),
            Arc::new(MemoryStore::new()),
            ActivityRegistry::builtin(),
        );

        let host = signin_as(&state, "Host", ParticipantRole::Host).await;
        let user = signin_as(&state, "Alice", ParticipantRole::User).await;

        let session = state.store().active_session().await.unwrap().unwrap();
        let instance_id = Uuid::new_v4();
        state
            .store()
            .save_instance(ActivityInstanceEntity {
                id: instance_id,
                session_id: session.id,
                definition_id: "choice_vote".into(),
                name: "Warmup vote".into(),
                config: json!({"question": "Best tool?", "options": ["A", "B"]}),
                is_enabled: true,
                created_at: SystemTime::now(),
            })
            .await
            .unwrap();

        Fixture {
            state,
            host_credential: host.credential,
            user_credential: user.credential,
            instance_id,
        }
    }

    async fn signin_as(state: &SharedState, name: &str, role: ParticipantRole) -> SigninResponse {
        let config = state.config();
        participant_service::signin(
            state,
            SigninRequest {
                name: name.into(),
                department: None,
                role,
                host_password: Some(config.host_password.clone()),
                admin_password: Some(config.admin_password.clone()),
            },
        )
        .await
        .unwrap()
    }

    fn listen(state: &SharedState, role: ConnectionRole) -> mpsc::UnboundedReceiver<axum::extract::ws::Message> {
        let (tx, rx) = mpsc::unbounded_channel();
        state.registry().register(ClientConnection {
            id: Uuid::new_v4(),
            role,
            tx,
        });
        rx
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<axum::extract::ws::Message>) -> Vec<String> {
        let mut frames = Vec::new();
        while let Ok(frame) = rx.try_recv() {
            if let axum::extract::ws::Message::Text(text) = frame {
                frames.push(text.to_string());
            }
        }
        frames
    }

    fn count_containing(frames: &[String], needle: &str) -> usize {
        frames.iter().filter(|frame| frame.contains(needle)).count()
    }

    #[tokio::test]
    async fn unauthorized_start_changes_nothing_and_stays_silent() {
        let fx = fixture().await;
        let mut display = listen(&fx.state, ConnectionRole::Display);

        let err = start_activity(&fx.state, &fx.user_credential, fx.instance_id)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Unauthorized(_)));
        assert_eq!(fx.state.machine_phase().await, ActivityPhase::Idle);
        assert!(drain(&mut display).is_empty());
    }

    #[tokio::test]
    async fn start_and_stop_drive_the_phase_and_the_broadcasts() {
        let fx = fixture().await;
        let mut display = listen(&fx.state, ConnectionRole::Display);
        let mut user = listen(&fx.state, ConnectionRole::User);

        start_activity(&fx.state, &fx.host_credential, fx.instance_id)
            .await
            .unwrap();
        assert_eq!(
            fx.state.machine_phase().await,
            ActivityPhase::Running { instance_id: fx.instance_id }
        );
        let session = fx.state.store().active_session().await.unwrap().unwrap();
        assert_eq!(session.current_instance, Some(fx.instance_id));
        assert_eq!(session.activity_phase, ActivityPhaseState::Running);
        assert!(count_containing(&drain(&mut display), "\"plugin_start\"") >= 1);
        assert_eq!(count_containing(&drain(&mut user), "\"plugin_start\""), 1);

        stop_activity(&fx.state, &fx.host_credential).await.unwrap();
        assert_eq!(
            fx.state.machine_phase().await,
            ActivityPhase::Results { instance_id: fx.instance_id }
        );
        assert_eq!(count_containing(&drain(&mut display), "\"plugin_end\""), 1);
        assert_eq!(count_containing(&drain(&mut user), "\"plugin_end\""), 1);
    }

    #[tokio::test]
    async fn double_stop_succeeds_with_exactly_one_extra_broadcast() {
        let fx = fixture().await;
        start_activity(&fx.state, &fx.host_credential, fx.instance_id)
            .await
            .unwrap();
        stop_activity(&fx.state, &fx.host_credential).await.unwrap();

        let mut display = listen(&fx.state, ConnectionRole::Display);
        stop_activity(&fx.state, &fx.host_credential).await.unwrap();

        assert_eq!(count_containing(&drain(&mut display), "\"plugin_end\""), 1);
    }

    #[tokio::test]
    async fn starting_a_second_instance_requires_a_stop_first() {
        let fx = fixture().await;
        let session = fx.state.store().active_session().await.unwrap().unwrap();
        let other = Uuid::new_v4();
        fx.state
            .store()
            .save_instance(ActivityInstanceEntity {
                id: other,
                session_id: session.id,
                definition_id: "numeric_recall".into(),
                name: "Round 2".into(),
                config: json!({}),
                is_enabled: true,
                created_at: SystemTime::now(),
            })
            .await
            .unwrap();

        start_activity(&fx.state, &fx.host_credential, fx.instance_id)
            .await
            .unwrap();
        let err = start_activity(&fx.state, &fx.host_credential, other)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidState(_)));

        stop_activity(&fx.state, &fx.host_credential).await.unwrap();
        start_activity(&fx.state, &fx.host_credential, other)
            .await
            .unwrap();
        assert_eq!(
            fx.state.machine_phase().await,
            ActivityPhase::Running { instance_id: other }
        );
    }

    #[tokio::test]
    async fn reset_clears_the_stage_for_every_role() {
        let fx = fixture().await;
        start_activity(&fx.state, &fx.host_credential, fx.instance_id)
            .await
            .unwrap();

        let mut display = listen(&fx.state, ConnectionRole::Display);
        let mut host = listen(&fx.state, ConnectionRole::Host);
        reset_activity(&fx.state, &fx.host_credential).await.unwrap();

        assert_eq!(fx.state.machine_phase().await, ActivityPhase::Idle);
        let session = fx.state.store().active_session().await.unwrap().unwrap();
        assert_eq!(session.current_instance, None);
        assert_eq!(session.activity_phase, ActivityPhaseState::Idle);
        assert_eq!(count_containing(&drain(&mut display), "\"plugin_reset\""), 1);
        assert_eq!(count_containing(&drain(&mut host), "\"plugin_reset\""), 1);
    }

    #[tokio::test]
    async fn set_phase_broadcasts_without_touching_the_machine() {
        let fx = fixture().await;
        start_activity(&fx.state, &fx.host_credential, fx.instance_id)
            .await
            .unwrap();

        let mut display = listen(&fx.state, ConnectionRole::Display);
        set_phase(&fx.state, &fx.host_credential, 2).await.unwrap();

        let frames = drain(&mut display);
        assert_eq!(count_containing(&frames, "\"plugin_phase_change\""), 1);
        assert!(frames[0].contains("\"phase\":2"));
        assert_eq!(
            fx.state.machine_phase().await,
            ActivityPhase::Running { instance_id: fx.instance_id }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn countdown_stops_the_activity_when_it_expires() {
        let fx = fixture().await;
        start_activity(&fx.state, &fx.host_credential, fx.instance_id)
            .await
            .unwrap();

        let mut display = listen(&fx.state, ConnectionRole::Display);
        let seconds = schedule_auto_stop(&fx.state, &fx.host_credential, Some(5))
            .await
            .unwrap();
        assert_eq!(seconds, 5);
        assert_eq!(count_containing(&drain(&mut display), "\"countdown_start\""), 1);

        tokio::time::sleep(Duration::from_secs(6)).await;
        tokio::task::yield_now().await;

        assert_eq!(
            fx.state.machine_phase().await,
            ActivityPhase::Results { instance_id: fx.instance_id }
        );
        assert_eq!(count_containing(&drain(&mut display), "\"plugin_end\""), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn countdown_preempted_by_a_manual_stop_stays_silent() {
        let fx = fixture().await;
        start_activity(&fx.state, &fx.host_credential, fx.instance_id)
            .await
            .unwrap();
        schedule_auto_stop(&fx.state, &fx.host_credential, Some(30))
            .await
            .unwrap();

        stop_activity(&fx.state, &fx.host_credential).await.unwrap();
        let mut display = listen(&fx.state, ConnectionRole::Display);

        tokio::time::sleep(Duration::from_secs(31)).await;
        tokio::task::yield_now().await;

        // The timer found the phase already in results and emitted nothing.
        assert_eq!(count_containing(&drain(&mut display), "\"plugin_end\""), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn rescheduling_cancels_the_earlier_timer() {
        let fx = fixture().await;
        start_activity(&fx.state, &fx.host_credential, fx.instance_id)
            .await
            .unwrap();

        schedule_auto_stop(&fx.state, &fx.host_credential, Some(30))
            .await
            .unwrap();
        schedule_auto_stop(&fx.state, &fx.host_credential, Some(60))
            .await
            .unwrap();

        let mut display = listen(&fx.state, ConnectionRole::Display);
        tokio::time::sleep(Duration::from_secs(31)).await;
        tokio::task::yield_now().await;
        assert_eq!(count_containing(&drain(&mut display), "\"plugin_end\""), 0);
        assert_eq!(
            fx.state.machine_phase().await,
            ActivityPhase::Running { instance_id: fx.instance_id }
        );

        tokio::time::sleep(Duration::from_secs(30)).await;
        tokio::task::yield_now().await;
        assert_eq!(count_containing(&drain(&mut display), "\"plugin_end\""), 1);
    }

    #[tokio::test]
    async fn countdown_requires_a_running_activity() {
        let fx = fixture().await;
        let err = schedule_auto_stop(&fx.state, &fx.host_credential, Some(10))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidState(_)));
    }

    #[tokio::test]
    async fn training_status_reflects_the_live_session() {
        let fx = fixture().await;
        let status = training_status(&fx.state).await.unwrap();
        assert_eq!(status.status, "pending");
        assert_eq!(status.participant_count, 2);
        assert_eq!(status.activity_instance_id, None);

        start_activity(&fx.state, &fx.host_credential, fx.instance_id)
            .await
            .unwrap();
        let status = training_status(&fx.state).await.unwrap();
        assert_eq!(status.activity_instance_id, Some(fx.instance_id));
        assert_eq!(status.activity_phase, Some(ActivityPhaseState::Running));
    }

    #[tokio::test]
    async fn status_without_a_session_is_a_well_defined_zero_state() {
        let state = AppState::new(
            AppConfig::default(),
            Arc::new(MemoryStore::new()),
            ActivityRegistry::builtin(),
        );
        let status = training_status(&state).await.unwrap();
        assert_eq!(status.status, "no_session");
        assert_eq!(status.participant_count, 0);
    }
}
