use std::time::SystemTime;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;
use uuid::Uuid;

/// Lifecycle status of a training session.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Session exists but check-in has not opened yet.
    Pending,
    /// Session is live; participants can sign in and take part.
    Running,
    /// Session is over; kept around for result consultation.
    Ended,
}

/// Coarse activity phase stored on the session row.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ActivityPhaseState {
    /// No activity is currently selected.
    Idle,
    /// The current activity instance accepts submissions.
    Running,
    /// The current activity instance shows its results.
    Results,
}

/// Role a signed-in participant holds for the session.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ParticipantRole {
    /// Regular attendee submitting answers from a mobile client.
    #[default]
    User,
    /// Controller driving activity transitions.
    Host,
    /// Operator allowed to configure the session and its rounds.
    Admin,
}

/// The single training session row shared across layers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionEntity {
    /// Stable identifier for the session.
    pub id: Uuid,
    /// Display title shown on the big screen.
    pub title: String,
    /// Lifecycle status of the session.
    pub status: SessionStatus,
    /// Whether this row is the active session (at most one at a time).
    pub is_active: bool,
    /// Reference to the activity instance currently on stage, if any.
    pub current_instance: Option<Uuid>,
    /// Coarse phase of the current activity instance.
    pub activity_phase: ActivityPhaseState,
    /// Creation timestamp for auditing/debugging.
    pub created_at: SystemTime,
}

impl SessionEntity {
    /// Build a fresh pending session with the provided title.
    pub fn new(title: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            title,
            status: SessionStatus::Pending,
            is_active: true,
            current_instance: None,
            activity_phase: ActivityPhaseState::Idle,
            created_at: SystemTime::now(),
        }
    }
}

/// A signed-in human scoped to one session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ParticipantEntity {
    /// Stable identifier for the participant.
    pub id: Uuid,
    /// Session this participant belongs to.
    pub session_id: Uuid,
    /// Display name chosen at sign-in.
    pub name: String,
    /// Optional department/team affiliation.
    pub department: Option<String>,
    /// Role this participant holds.
    pub role: ParticipantRole,
    /// Opaque credential used to re-identify the client on every request.
    ///
    /// Globally unique; re-issued when the same name signs in again.
    pub credential: String,
    /// Number of activities this participant has completed.
    pub interaction_count: u32,
    /// Random 4-digit check-in code shown to the participant.
    pub code4: String,
    /// Creation timestamp.
    pub created_at: SystemTime,
}

/// A configured round of an activity definition inside a session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ActivityInstanceEntity {
    /// Stable identifier for the instance.
    pub id: Uuid,
    /// Session this instance belongs to.
    pub session_id: Uuid,
    /// Key of the activity definition this instance is a round of.
    pub definition_id: String,
    /// Display name for the round (e.g. "Morning survey").
    pub name: String,
    /// Instance-specific configuration merged over the definition defaults.
    pub config: Value,
    /// Whether the host sees and can start this round.
    pub is_enabled: bool,
    /// Creation timestamp; defines the round ordering.
    pub created_at: SystemTime,
}

/// One participant's answer to one activity instance.
///
/// The `(session_id, instance_id, participant_id)` triple is unique; a later
/// submission overwrites the earlier one. `seq` is assigned at first insert
/// and preserved across overwrites so insertion order stays well defined.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SubmissionEntity {
    /// Session the submission belongs to.
    pub session_id: Uuid,
    /// Activity instance the submission answers.
    pub instance_id: Uuid,
    /// Participant who submitted.
    pub participant_id: Uuid,
    /// Activity-specific payload, derived fields included.
    pub data: Value,
    /// Monotonic insertion sequence, stable across overwrites.
    pub seq: u64,
    /// First submission timestamp.
    pub created_at: SystemTime,
    /// Last overwrite timestamp.
    pub updated_at: SystemTime,
}
