use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::dao::models::{ActivityPhaseState, SessionEntity, SessionStatus};

/// Poll response describing the live training state.
///
/// Served to frontends that fall back to polling when the WebSocket is
/// unavailable; the keys are part of the stable wire contract.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TrainingStatusResponse {
    /// Session lifecycle status, or `no_session` when none is active.
    pub status: String,
    /// Activity instance currently on stage, if any.
    pub activity_instance_id: Option<Uuid>,
    /// Coarse phase of the current activity instance.
    pub activity_phase: Option<ActivityPhaseState>,
    /// Number of signed-in participants.
    pub participant_count: u64,
    /// Server time the snapshot was taken (RFC 3339).
    pub timestamp: String,
}

impl TrainingStatusResponse {
    /// Snapshot for a live session.
    pub fn from_session(session: &SessionEntity, participant_count: u64) -> Self {
        Self {
            status: status_label(session.status).into(),
            activity_instance_id: session.current_instance,
            activity_phase: Some(session.activity_phase),
            participant_count,
            timestamp: super::format_system_time(std::time::SystemTime::now()),
        }
    }

    /// Snapshot when no session is active.
    pub fn no_session() -> Self {
        Self {
            status: "no_session".into(),
            activity_instance_id: None,
            activity_phase: None,
            participant_count: 0,
            timestamp: super::format_system_time(std::time::SystemTime::now()),
        }
    }
}

fn status_label(status: SessionStatus) -> &'static str {
    match status {
        SessionStatus::Pending => "pending",
        SessionStatus::Running => "running",
        SessionStatus::Ended => "ended",
    }
}

/// Session row as exposed to admin clients.
#[derive(Debug, Serialize, ToSchema)]
pub struct SessionSummary {
    /// Stable identifier for the session.
    pub id: Uuid,
    /// Display title.
    pub title: String,
    /// Lifecycle status.
    pub status: SessionStatus,
    /// Activity instance currently on stage, if any.
    pub current_instance: Option<Uuid>,
    /// Coarse phase of the current activity instance.
    pub activity_phase: ActivityPhaseState,
    /// Creation timestamp (RFC 3339).
    pub created_at: String,
}

impl From<SessionEntity> for SessionSummary {
    fn from(session: SessionEntity) -> Self {
        Self {
            id: session.id,
            title: session.title,
            status: session.status,
            current_instance: session.current_instance,
            activity_phase: session.activity_phase,
            created_at: super::format_system_time(session.created_at),
        }
    }
}
