use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::activities::ActivityDefinition;
use crate::dao::models::ActivityInstanceEntity;

/// Static metadata of a registered activity definition.
#[derive(Debug, Serialize, ToSchema)]
pub struct DefinitionSummary {
    /// Stable string key used to reference the definition.
    pub id: String,
    /// Human readable name.
    pub name: String,
    /// Short description shown in the admin panel.
    pub description: String,
    /// Configuration applied when an instance does not override it.
    pub default_config: Value,
}

impl From<ActivityDefinition> for DefinitionSummary {
    fn from(definition: ActivityDefinition) -> Self {
        Self {
            id: definition.id,
            name: definition.name,
            description: definition.description,
            default_config: definition.default_config,
        }
    }
}

/// An activity instance as exposed to host and admin clients.
#[derive(Debug, Serialize, ToSchema)]
pub struct InstanceSummary {
    /// Stable identifier for the instance.
    pub id: Uuid,
    /// Definition this instance is a round of.
    pub definition_id: String,
    /// Display name for the round.
    pub name: String,
    /// Instance-specific configuration.
    pub config: Value,
    /// Whether the host can start this round.
    pub is_enabled: bool,
    /// Creation timestamp (RFC 3339).
    pub created_at: String,
}

impl From<ActivityInstanceEntity> for InstanceSummary {
    fn from(instance: ActivityInstanceEntity) -> Self {
        Self {
            id: instance.id,
            definition_id: instance.definition_id,
            name: instance.name,
            config: instance.config,
            is_enabled: instance.is_enabled,
            created_at: super::format_system_time(instance.created_at),
        }
    }
}

/// Aggregated results for choice-tally activities (vote/survey).
#[derive(Debug, Serialize, ToSchema)]
pub struct ChoiceTallyResults {
    /// Number of submissions, including ones outside the configured options.
    pub total: u64,
    /// Submission count per configured option, in configuration order.
    #[schema(value_type = Object)]
    pub counts: IndexMap<String, u64>,
    /// Echo of the configured question text.
    pub question: Option<String>,
}

/// Aggregated results for score-ranked activities (numeric recall).
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ScoreRankedResults {
    /// Number of participants who submitted.
    pub participant_count: u64,
    /// Mean of the stored per-participant scores.
    pub average_score: f64,
    /// `average_score / missing_count × 100`, clamped to zero when undefined.
    pub accuracy: f64,
    /// Authoritative answer set for the round.
    pub missing_numbers: Vec<u32>,
    /// The five highest-scoring participants, descending, ties by submission order.
    pub top_users: Vec<TopUser>,
}

/// One entry of the score-ranked leaderboard.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TopUser {
    /// Participant who achieved the score.
    pub participant_id: Uuid,
    /// Score stored with the submission.
    pub score: u64,
}

/// Host request scheduling an automatic stop.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct CountdownRequest {
    /// Countdown duration in seconds; the configured default applies when omitted.
    #[validate(range(min = 1, max = 3600))]
    pub seconds: Option<u64>,
}

/// Host request broadcasting an intra-activity sub-phase change.
#[derive(Debug, Deserialize, ToSchema)]
pub struct PhaseRequest {
    /// Sub-phase number forwarded to display and user clients.
    pub phase: u32,
}
