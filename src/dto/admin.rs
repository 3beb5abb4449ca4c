use serde::Deserialize;
use serde_json::Value;
use utoipa::ToSchema;
use validator::Validate;

use crate::dao::models::SessionStatus;
use crate::dto::validation::validate_definition_id;

/// Admin request creating a new activity instance (a configured round).
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct CreateInstanceRequest {
    /// Key of the registered activity definition to instantiate.
    #[validate(custom(function = validate_definition_id))]
    pub definition_id: String,
    /// Display name for the round.
    #[validate(length(min = 1, max = 128))]
    pub name: String,
    /// Instance-specific configuration merged over the definition defaults.
    pub config: Option<Value>,
    /// Whether the round is immediately visible to the host; defaults to false.
    pub is_enabled: Option<bool>,
}

/// Admin request updating an existing activity instance.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct UpdateInstanceRequest {
    /// New display name, when present.
    #[validate(length(min = 1, max = 128))]
    pub name: Option<String>,
    /// Replacement configuration, when present.
    pub config: Option<Value>,
    /// New enabled flag, when present.
    pub is_enabled: Option<bool>,
}

/// Admin request updating the active session row.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct UpdateSessionRequest {
    /// New display title, when present.
    #[validate(length(min = 1, max = 128))]
    pub title: Option<String>,
    /// New lifecycle status, when present.
    pub status: Option<SessionStatus>,
}
