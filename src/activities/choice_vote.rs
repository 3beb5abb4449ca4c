use futures::future::BoxFuture;
use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::{Value, json};
use uuid::Uuid;

use crate::{
    activities::{Activity, ActivityContext, ActivityDefinition, notify_round_started},
    dao::training_store::TrainingStore,
    dto::{activity::ChoiceTallyResults, ws::ServerMessage},
    error::ServiceError,
    state::registry::ConnectionRole,
};

/// Single-choice vote/survey activity.
///
/// Participants pick one of the configured options; results are a tally per
/// option. A choice outside the configured options still counts toward the
/// total but lands in no bucket.
pub struct ChoiceVote;

#[derive(Debug, Deserialize, Default)]
struct VoteConfig {
    #[serde(default)]
    question: Option<String>,
    #[serde(default)]
    options: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct VotePayload {
    value: String,
}

impl ChoiceVote {
    fn config(&self, ctx: &ActivityContext) -> VoteConfig {
        let merged = ctx.merged_config(&self.definition().default_config);
        serde_json::from_value(merged).unwrap_or_default()
    }

    async fn tally(&self, ctx: &ActivityContext) -> Result<ChoiceTallyResults, ServiceError> {
        let config = self.config(ctx);
        let mut counts: IndexMap<String, u64> =
            config.options.into_iter().map(|option| (option, 0)).collect();

        let submissions = ctx
            .store
            .list_submissions(ctx.session_id, ctx.instance.id)
            .await?;

        let mut total = 0;
        for submission in submissions {
            total += 1;
            if let Some(choice) = submission.data.get("value").and_then(Value::as_str)
                && let Some(bucket) = counts.get_mut(choice)
            {
                *bucket += 1;
            }
        }

        Ok(ChoiceTallyResults {
            total,
            counts,
            question: config.question,
        })
    }
}

impl Activity for ChoiceVote {
    fn definition(&self) -> ActivityDefinition {
        ActivityDefinition {
            id: "choice_vote".into(),
            name: "Single Choice Vote".into(),
            description: "Participants pick one option; the display shows a live tally.".into(),
            default_config: json!({ "question": null, "options": [] }),
        }
    }

    fn start<'a>(&'a self, ctx: ActivityContext) -> BoxFuture<'a, Result<(), ServiceError>> {
        Box::pin(async move {
            // Fresh round: prior votes would otherwise leak into the tally.
            ctx.store
                .clear_submissions(ctx.session_id, ctx.instance.id)
                .await?;
            notify_round_started(&ctx);
            Ok(())
        })
    }

    fn stop<'a>(&'a self, _ctx: ActivityContext) -> BoxFuture<'a, Result<(), ServiceError>> {
        Box::pin(async move { Ok(()) })
    }

    fn handle_input<'a>(
        &'a self,
        ctx: ActivityContext,
        participant_id: Uuid,
        payload: Value,
    ) -> BoxFuture<'a, Result<(), ServiceError>> {
        Box::pin(async move {
            let vote: VotePayload = serde_json::from_value(payload).map_err(|err| {
                ServiceError::InvalidInput(format!("invalid vote payload: {err}"))
            })?;

            ctx.store
                .upsert_submission(
                    ctx.session_id,
                    ctx.instance.id,
                    participant_id,
                    json!({ "value": vote.value }),
                )
                .await?;

            // Live preview on the display while voting is still open.
            let results = self.tally(&ctx).await?;
            ctx.registry.broadcast_to_role(
                ConnectionRole::Display,
                &ServerMessage::PluginUpdate {
                    plugin_id: ctx.instance.id,
                    data: serde_json::to_value(&results)
                        .map_err(|err| ServiceError::InvalidInput(err.to_string()))?,
                },
            );

            Ok(())
        })
    }

    fn results<'a>(&'a self, ctx: ActivityContext) -> BoxFuture<'a, Result<Value, ServiceError>> {
        Box::pin(async move {
            let results = self.tally(&ctx).await?;
            serde_json::to_value(&results).map_err(|err| ServiceError::InvalidInput(err.to_string()))
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::SystemTime;

    use tokio::sync::mpsc;

    use crate::{
        dao::{models::ActivityInstanceEntity, training_store::memory::MemoryStore},
        state::registry::{ClientConnection, ConnectionRegistry},
    };

    use super::*;

    fn context(config: Value) -> ActivityContext {
        let instance = ActivityInstanceEntity {
            id: Uuid::new_v4(),
            session_id: Uuid::new_v4(),
            definition_id: "choice_vote".into(),
            name: "Warmup vote".into(),
            config,
            is_enabled: true,
            created_at: SystemTime::now(),
        };
        ActivityContext {
            session_id: instance.session_id,
            instance,
            store: Arc::new(MemoryStore::new()),
            registry: Arc::new(ConnectionRegistry::new()),
        }
    }

    #[tokio::test]
    async fn zero_submissions_yield_zeroed_buckets() {
        let activity = ChoiceVote;
        let ctx = context(json!({"question": "Best tool?", "options": ["A", "B"]}));

        let results = activity.results(ctx).await.unwrap();
        assert_eq!(results["total"], 0);
        assert_eq!(results["counts"], json!({"A": 0, "B": 0}));
        assert_eq!(results["question"], "Best tool?");
    }

    #[tokio::test]
    async fn tallies_three_votes_across_two_options() {
        let activity = ChoiceVote;
        let ctx = context(json!({"question": "Best tool?", "options": ["A", "B"]}));

        for value in ["A", "A", "B"] {
            activity
                .handle_input(ctx.clone(), Uuid::new_v4(), json!({"value": value}))
                .await
                .unwrap();
        }

        let results = activity.results(ctx).await.unwrap();
        assert_eq!(results["total"], 3);
        assert_eq!(results["counts"], json!({"A": 2, "B": 1}));
    }

    #[tokio::test]
    async fn unknown_choice_counts_toward_total_but_no_bucket() {
        let activity = ChoiceVote;
        let ctx = context(json!({"options": ["A", "B"]}));

        activity
            .handle_input(ctx.clone(), Uuid::new_v4(), json!({"value": "C"}))
            .await
            .unwrap();

        let results = activity.results(ctx).await.unwrap();
        assert_eq!(results["total"], 1);
        assert_eq!(results["counts"], json!({"A": 0, "B": 0}));
    }

    #[tokio::test]
    async fn resubmission_overwrites_the_previous_vote() {
        let activity = ChoiceVote;
        let ctx = context(json!({"options": ["A", "B"]}));
        let participant = Uuid::new_v4();

        activity
            .handle_input(ctx.clone(), participant, json!({"value": "A"}))
            .await
            .unwrap();
        activity
            .handle_input(ctx.clone(), participant, json!({"value": "B"}))
            .await
            .unwrap();

        let results = activity.results(ctx).await.unwrap();
        assert_eq!(results["total"], 1);
        assert_eq!(results["counts"], json!({"A": 0, "B": 1}));
    }

    #[tokio::test]
    async fn malformed_payload_is_rejected_before_storage() {
        let activity = ChoiceVote;
        let ctx = context(json!({"options": ["A"]}));

        let err = activity
            .handle_input(ctx.clone(), Uuid::new_v4(), json!({"vote": "A"}))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput(_)));

        let results = activity.results(ctx).await.unwrap();
        assert_eq!(results["total"], 0);
    }

    #[tokio::test]
    async fn start_clears_prior_round_submissions() {
        let activity = ChoiceVote;
        let ctx = context(json!({"options": ["A"]}));

        activity
            .handle_input(ctx.clone(), Uuid::new_v4(), json!({"value": "A"}))
            .await
            .unwrap();
        activity.start(ctx.clone()).await.unwrap();

        let results = activity.results(ctx).await.unwrap();
        assert_eq!(results["total"], 0);
    }

    #[tokio::test]
    async fn submission_pushes_a_live_preview_to_the_display() {
        let activity = ChoiceVote;
        let ctx = context(json!({"options": ["A"]}));

        let (tx, mut rx) = mpsc::unbounded_channel();
        ctx.registry.register(ClientConnection {
            id: Uuid::new_v4(),
            role: ConnectionRole::Display,
            tx,
        });

        activity
            .handle_input(ctx.clone(), Uuid::new_v4(), json!({"value": "A"}))
            .await
            .unwrap();

        let frame = rx.try_recv().unwrap();
        let text = match frame {
            axum::extract::ws::Message::Text(text) => text.to_string(),
            other => panic!("expected text frame, got {other:?}"),
        };
        assert!(text.contains("\"plugin_update\""));
        assert!(text.contains("\"total\":1"));
    }
}
