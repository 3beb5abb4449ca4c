use tracing::warn;

use crate::{dao::training_store::TrainingStore, dto::health::HealthResponse, state::SharedState};

/// Respond with a health payload after probing the storage backend.
pub async fn health_status(state: &SharedState) -> HealthResponse {
    if let Err(err) = state.store().health_check().await {
        warn!(error = %err, "storage health check failed");
        return HealthResponse::degraded();
    }

    HealthResponse::ok()
}
