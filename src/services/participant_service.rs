use std::time::SystemTime;

use rand::Rng;
use uuid::Uuid;

use crate::{
    dao::{
        models::{ParticipantEntity, ParticipantRole},
        training_store::TrainingStore,
    },
    dto::participant::{SigninRequest, SigninResponse},
    error::ServiceError,
    services::ws_events,
    state::SharedState,
};

/// Sign a participant in, creating the row or re-issuing the credential when
/// the same user name returns.
///
/// Host and admin roles must present the matching access password; the
/// comparison itself is the only piece of authentication living in the core.
pub async fn signin(
    state: &SharedState,
    request: SigninRequest,
) -> Result<SigninResponse, ServiceError> {
    let config = state.config();
    let store = state.store();
    let session = store
        .ensure_active_session(config.session_title.clone())
        .await?;

    match request.role {
        ParticipantRole::Host => {
            if request.host_password.as_deref() != Some(config.host_password.as_str()) {
                return Err(ServiceError::Unauthorized("invalid host password".into()));
            }
        }
        ParticipantRole::Admin => {
            if request.admin_password.as_deref() != Some(config.admin_password.as_str()) {
                return Err(ServiceError::Unauthorized("invalid admin password".into()));
            }
        }
        ParticipantRole::User => {}
    }

    // A returning user keeps their row; only the credential is re-issued so
    // the previous browser session can no longer act for them.
    if request.role == ParticipantRole::User
        && let Some(mut existing) = store
            .find_participant_by_name(session.id, request.name.clone(), ParticipantRole::User)
            .await?
    {
        existing.credential = new_credential();
        if request.department.is_some() {
            existing.department = request.department;
        }
        store.save_participant(existing.clone()).await?;

        let credential = existing.credential.clone();
        return Ok(SigninResponse {
            participant: existing.into(),
            credential,
        });
    }

    let participant = ParticipantEntity {
        id: Uuid::new_v4(),
        session_id: session.id,
        name: request.name,
        department: request.department,
        role: request.role,
        credential: new_credential(),
        interaction_count: 0,
        code4: new_code4(),
        created_at: SystemTime::now(),
    };
    store.save_participant(participant.clone()).await?;

    let count = store.count_participants(session.id).await?;
    ws_events::broadcast_stats_update(state.registry(), count);

    let credential = participant.credential.clone();
    Ok(SigninResponse {
        participant: participant.into(),
        credential,
    })
}

/// Resolve a credential to a participant holding one of the allowed roles.
///
/// Fails with `Unauthorized` both for unknown credentials and role
/// mismatches; callers observe no state change in either case.
pub async fn require_role(
    state: &SharedState,
    credential: &str,
    allowed: &[ParticipantRole],
) -> Result<ParticipantEntity, ServiceError> {
    let participant = state
        .store()
        .find_participant_by_credential(credential.to_string())
        .await?
        .ok_or_else(|| ServiceError::Unauthorized("unknown session credential".into()))?;

    if !allowed.contains(&participant.role) {
        return Err(ServiceError::Unauthorized(format!(
            "operation requires one of the roles {allowed:?}"
        )));
    }

    Ok(participant)
}

/// Head-count of the active session, zero when no session exists.
pub async fn participant_count(state: &SharedState) -> Result<u64, ServiceError> {
    let store = state.store();
    match store.active_session().await? {
        Some(session) => Ok(store.count_participants(session.id).await?),
        None => Ok(0),
    }
}

fn new_credential() -> String {
    Uuid::new_v4().simple().to_string()
}

fn new_code4() -> String {
    rand::rng().random_range(1000..10000).to_string()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tokio::sync::mpsc;

    use crate::{
        activities::ActivityRegistry,
        config::AppConfig,
        dao::training_store::memory::MemoryStore,
        state::{
            AppState,
            registry::{ClientConnection, ConnectionRole},
        },
    };

    use super::*;

    fn test_state() -> SharedState {
        AppState::new(
            AppConfig::default(),
            Arc::new(MemoryStore::new()),
            ActivityRegistry::builtin(),
        )
    }

    fn user_request(name: &str) -> SigninRequest {
        SigninRequest {
            name: name.into(),
            department: None,
            role: ParticipantRole::User,
            host_password: None,
            admin_password: None,
        }
    }

    #[tokio::test]
    async fn signin_creates_a_participant_and_updates_the_display_count() {
        let state = test_state();
        let (tx, mut rx) = mpsc::unbounded_channel();
        state.registry().register(ClientConnection {
            id: Uuid::new_v4(),
            role: ConnectionRole::Display,
            tx,
        });

        let response = signin(&state, user_request("Alice")).await.unwrap();
        assert_eq!(response.participant.name, "Alice");
        assert_eq!(response.participant.code4.len(), 4);
        assert!(!response.credential.is_empty());

        let frame = rx.try_recv().unwrap();
        let text = match frame {
            axum::extract::ws::Message::Text(text) => text.to_string(),
            other => panic!("expected text frame, got {other:?}"),
        };
        assert!(text.contains("\"stats_update\""));
        assert!(text.contains("\"count\":1"));
    }

    #[tokio::test]
    async fn duplicate_name_reissues_the_credential_without_a_new_row() {
        let state = test_state();

        let first = signin(&state, user_request("Alice")).await.unwrap();
        let second = signin(&state, user_request("Alice")).await.unwrap();

        assert_eq!(first.participant.id, second.participant.id);
        assert_ne!(first.credential, second.credential);
        assert_eq!(participant_count(&state).await.unwrap(), 1);

        // The stale credential no longer resolves.
        let err = require_role(&state, &first.credential, &[ParticipantRole::User])
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn host_signin_requires_the_access_password() {
        let state = test_state();

        let rejected = signin(
            &state,
            SigninRequest {
                name: "Host".into(),
                department: None,
                role: ParticipantRole::Host,
                host_password: Some("wrong".into()),
                admin_password: None,
            },
        )
        .await;
        assert!(matches!(rejected, Err(ServiceError::Unauthorized(_))));

        let accepted = signin(
            &state,
            SigninRequest {
                name: "Host".into(),
                department: None,
                role: ParticipantRole::Host,
                host_password: Some(state.config().host_password.clone()),
                admin_password: None,
            },
        )
        .await
        .unwrap();
        assert_eq!(accepted.participant.role, ParticipantRole::Host);
    }

    #[tokio::test]
    async fn require_role_rejects_a_role_mismatch() {
        let state = test_state();
        let response = signin(&state, user_request("Alice")).await.unwrap();

        let err = require_role(&state, &response.credential, &[ParticipantRole::Host])
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Unauthorized(_)));
    }
}
