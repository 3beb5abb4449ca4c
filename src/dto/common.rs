use serde::Serialize;
use utoipa::ToSchema;

/// Minimal acknowledgement body returned by imperative host endpoints.
#[derive(Debug, Serialize, ToSchema)]
pub struct AckResponse {
    /// Always `"ok"` on success; errors use the error body instead.
    pub status: String,
}

impl AckResponse {
    /// Build the canonical `ok` acknowledgement.
    pub fn ok() -> Self {
        Self {
            status: "ok".into(),
        }
    }
}
