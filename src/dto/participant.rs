use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::dao::models::{ParticipantEntity, ParticipantRole};

/// Sign-in request creating or re-identifying a participant.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct SigninRequest {
    /// Display name; duplicate user names re-issue the existing row's credential.
    #[validate(length(min = 1, max = 64))]
    pub name: String,
    /// Optional department/team affiliation.
    #[validate(length(max = 64))]
    pub department: Option<String>,
    /// Requested role; defaults to `user`.
    #[serde(default)]
    pub role: ParticipantRole,
    /// Required when requesting the `host` role.
    pub host_password: Option<String>,
    /// Required when requesting the `admin` role.
    pub admin_password: Option<String>,
}

/// Successful sign-in payload.
#[derive(Debug, Serialize, ToSchema)]
pub struct SigninResponse {
    /// The created or re-identified participant.
    pub participant: ParticipantSummary,
    /// Opaque credential to present on subsequent requests.
    pub credential: String,
}

/// Participant as exposed to clients (credential omitted).
#[derive(Debug, Serialize, ToSchema)]
pub struct ParticipantSummary {
    /// Stable identifier for the participant.
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// Optional department/team affiliation.
    pub department: Option<String>,
    /// Granted role.
    pub role: ParticipantRole,
    /// Number of activities completed so far.
    pub interaction_count: u32,
    /// Random 4-digit check-in code.
    pub code4: String,
}

impl From<ParticipantEntity> for ParticipantSummary {
    fn from(participant: ParticipantEntity) -> Self {
        Self {
            id: participant.id,
            name: participant.name,
            department: participant.department,
            role: participant.role,
            interaction_count: participant.interaction_count,
            code4: participant.code4,
        }
    }
}

/// Participant head-count payload for the display polling fallback.
#[derive(Debug, Serialize, ToSchema)]
pub struct StatsCountResponse {
    /// Number of signed-in participants for the active session.
    pub count: u64,
}
