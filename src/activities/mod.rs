//! Activity contract and the closed registry of built-in implementations.

pub mod choice_vote;
pub mod numeric_recall;

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::BoxFuture;
use serde_json::Value;
use uuid::Uuid;

use crate::{
    dao::{models::ActivityInstanceEntity, training_store::TrainingStore},
    dto::ws::ServerMessage,
    error::ServiceError,
    state::registry::{ConnectionRegistry, ConnectionRole},
};

pub use self::choice_vote::ChoiceVote;
pub use self::numeric_recall::NumericRecall;

/// Static metadata describing a registered activity kind.
#[derive(Debug, Clone)]
pub struct ActivityDefinition {
    /// Stable string key used by instances to reference the definition.
    pub id: String,
    /// Human readable name.
    pub name: String,
    /// Short description shown in the admin panel.
    pub description: String,
    /// Configuration applied when an instance does not override it.
    pub default_config: Value,
}

/// Everything an activity operation needs, passed explicitly per call.
#[derive(Clone)]
pub struct ActivityContext {
    /// Session the operation is scoped to.
    pub session_id: Uuid,
    /// The instance being started/stopped/answered/aggregated.
    pub instance: ActivityInstanceEntity,
    /// Storage handle for submission bookkeeping.
    pub store: Arc<dyn TrainingStore>,
    /// Registry used for role-scoped broadcasts.
    pub registry: Arc<ConnectionRegistry>,
}

impl ActivityContext {
    /// Instance configuration merged over the definition defaults
    /// (instance keys win).
    pub fn merged_config(&self, defaults: &Value) -> Value {
        merge_config(defaults, &self.instance.config)
    }
}

/// Uniform lifecycle contract every interactive exercise implements.
///
/// All four operations must be safely callable even if the activity was never
/// started for this instance.
pub trait Activity: Send + Sync {
    /// Static metadata for this activity kind.
    fn definition(&self) -> ActivityDefinition;

    /// Reset instance-scoped state for a fresh round (clear prior
    /// submissions, regenerate puzzle data) and notify display, user and host
    /// clients. Starting twice yields two independently valid rounds.
    fn start<'a>(&'a self, ctx: ActivityContext) -> BoxFuture<'a, Result<(), ServiceError>>;

    /// Finalize the round. Must succeed even when the round never started.
    fn stop<'a>(&'a self, ctx: ActivityContext) -> BoxFuture<'a, Result<(), ServiceError>>;

    /// Validate a participant payload, derive activity-specific fields and
    /// upsert it into the submission store.
    fn handle_input<'a>(
        &'a self,
        ctx: ActivityContext,
        participant_id: Uuid,
        payload: Value,
    ) -> BoxFuture<'a, Result<(), ServiceError>>;

    /// Aggregate all submissions into the activity's result payload.
    /// Returns a well-defined zero-state when nothing was submitted.
    fn results<'a>(&'a self, ctx: ActivityContext) -> BoxFuture<'a, Result<Value, ServiceError>>;
}

/// Closed registry of activity implementations, resolved once at startup and
/// keyed by the definition id.
pub struct ActivityRegistry {
    entries: HashMap<String, Arc<dyn Activity>>,
}

impl ActivityRegistry {
    /// Build the registry holding the built-in activity implementations.
    pub fn builtin() -> Self {
        let mut registry = Self {
            entries: HashMap::new(),
        };
        registry.insert(Arc::new(NumericRecall::new()));
        registry.insert(Arc::new(ChoiceVote));
        registry
    }

    fn insert(&mut self, activity: Arc<dyn Activity>) {
        self.entries.insert(activity.definition().id, activity);
    }

    /// Resolve an activity implementation by definition id.
    pub fn get(&self, definition_id: &str) -> Option<Arc<dyn Activity>> {
        self.entries.get(definition_id).cloned()
    }

    /// Metadata of every registered definition, sorted by id.
    pub fn definitions(&self) -> Vec<ActivityDefinition> {
        let mut definitions: Vec<ActivityDefinition> = self
            .entries
            .values()
            .map(|activity| activity.definition())
            .collect();
        definitions.sort_by(|a, b| a.id.cmp(&b.id));
        definitions
    }
}

/// Shallow-merge `overrides` into `defaults`; non-object overrides replace
/// the defaults wholesale.
pub fn merge_config(defaults: &Value, overrides: &Value) -> Value {
    match (defaults, overrides) {
        (Value::Object(base), Value::Object(extra)) => {
            let mut merged = base.clone();
            for (key, value) in extra {
                merged.insert(key.clone(), value.clone());
            }
            Value::Object(merged)
        }
        (_, Value::Null) => defaults.clone(),
        (_, replacement) => replacement.clone(),
    }
}

/// Broadcast the fresh-round notification to display, user and host clients.
pub(crate) fn notify_round_started(ctx: &ActivityContext) {
    let message = ServerMessage::PluginStart {
        plugin_id: ctx.instance.id,
    };
    ctx.registry.broadcast_to_role(ConnectionRole::Display, &message);
    ctx.registry.broadcast_to_role(ConnectionRole::User, &message);
    ctx.registry.broadcast_to_role(ConnectionRole::Host, &message);
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn builtin_registry_resolves_both_activities() {
        let registry = ActivityRegistry::builtin();
        assert!(registry.get("numeric_recall").is_some());
        assert!(registry.get("choice_vote").is_some());
        assert!(registry.get("unknown").is_none());

        let ids: Vec<String> = registry
            .definitions()
            .into_iter()
            .map(|definition| definition.id)
            .collect();
        assert_eq!(ids, vec!["choice_vote", "numeric_recall"]);
    }

    #[test]
    fn merge_config_lets_instance_keys_win() {
        let defaults = json!({"question": null, "options": [], "missing_count": 10});
        let overrides = json!({"question": "Best tool?", "options": ["A", "B"]});

        let merged = merge_config(&defaults, &overrides);
        assert_eq!(merged["question"], "Best tool?");
        assert_eq!(merged["options"], json!(["A", "B"]));
        assert_eq!(merged["missing_count"], 10);
    }

    #[test]
    fn merge_config_keeps_defaults_on_null_override() {
        let defaults = json!({"missing_count": 10});
        assert_eq!(merge_config(&defaults, &Value::Null), defaults);
    }
}
