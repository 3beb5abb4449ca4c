use std::collections::HashSet;

use dashmap::DashMap;
use futures::future::BoxFuture;
use rand::seq::SliceRandom;
use serde::Deserialize;
use serde_json::{Value, json};
use uuid::Uuid;

use crate::{
    activities::{Activity, ActivityContext, ActivityDefinition, notify_round_started},
    dao::training_store::TrainingStore,
    dto::activity::{ScoreRankedResults, TopUser},
    error::ServiceError,
};

const LEADERBOARD_SIZE: usize = 5;

/// Numeric-recall memory game.
///
/// Each round removes a random subset of a numeric range; participants submit
/// the numbers they believe are missing and score one point per correct
/// guess. Results rank participants by their stored score.
pub struct NumericRecall {
    /// Authoritative round data keyed by `(session, instance)`.
    ///
    /// Lives in process memory only; a restart forfeits the round, which is
    /// acceptable since connection state is not persisted either.
    rounds: DashMap<(Uuid, Uuid), NumericRound>,
}

#[derive(Debug, Clone)]
struct NumericRound {
    missing: Vec<u32>,
}

#[derive(Debug, Deserialize)]
struct RecallConfig {
    #[serde(default = "default_total_numbers")]
    total_numbers: u32,
    #[serde(default = "default_missing_count")]
    missing_count: u32,
}

fn default_total_numbers() -> u32 {
    100
}

fn default_missing_count() -> u32 {
    10
}

#[derive(Debug, Deserialize)]
struct GuessPayload {
    answers: Vec<u32>,
}

impl NumericRecall {
    /// Create the activity with no round in flight.
    pub fn new() -> Self {
        Self {
            rounds: DashMap::new(),
        }
    }

    fn round_key(ctx: &ActivityContext) -> (Uuid, Uuid) {
        (ctx.session_id, ctx.instance.id)
    }

    fn config(&self, ctx: &ActivityContext) -> RecallConfig {
        let merged = ctx.merged_config(&self.definition().default_config);
        serde_json::from_value(merged).unwrap_or(RecallConfig {
            total_numbers: default_total_numbers(),
            missing_count: default_missing_count(),
        })
    }

    fn generate_round(config: &RecallConfig) -> NumericRound {
        let total = config.total_numbers.max(1);
        let count = config.missing_count.min(total) as usize;

        let mut pool: Vec<u32> = (1..=total).collect();
        let mut rng = rand::rng();
        pool.shuffle(&mut rng);

        let mut missing: Vec<u32> = pool.into_iter().take(count).collect();
        missing.sort_unstable();
        NumericRound { missing }
    }

    fn missing_for(&self, ctx: &ActivityContext) -> Vec<u32> {
        self.rounds
            .get(&Self::round_key(ctx))
            .map(|round| round.missing.clone())
            .unwrap_or_default()
    }
}

impl Default for NumericRecall {
    fn default() -> Self {
        Self::new()
    }
}

impl Activity for NumericRecall {
    fn definition(&self) -> ActivityDefinition {
        ActivityDefinition {
            id: "numeric_recall".into(),
            name: "Numeric Recall".into(),
            description: "Spot which numbers disappeared from the board.".into(),
            default_config: json!({ "total_numbers": 100, "missing_count": 10 }),
        }
    }

    fn start<'a>(&'a self, ctx: ActivityContext) -> BoxFuture<'a, Result<(), ServiceError>> {
        Box::pin(async move {
            ctx.store
                .clear_submissions(ctx.session_id, ctx.instance.id)
                .await?;

            let config = self.config(&ctx);
            self.rounds
                .insert(Self::round_key(&ctx), Self::generate_round(&config));

            notify_round_started(&ctx);
            Ok(())
        })
    }

    fn stop<'a>(&'a self, _ctx: ActivityContext) -> BoxFuture<'a, Result<(), ServiceError>> {
        // Round data stays available for the results view.
        Box::pin(async move { Ok(()) })
    }

    fn handle_input<'a>(
        &'a self,
        ctx: ActivityContext,
        participant_id: Uuid,
        payload: Value,
    ) -> BoxFuture<'a, Result<(), ServiceError>> {
        Box::pin(async move {
            let guess: GuessPayload = serde_json::from_value(payload).map_err(|err| {
                ServiceError::InvalidInput(format!("invalid guess payload: {err}"))
            })?;

            let missing: HashSet<u32> = self.missing_for(&ctx).into_iter().collect();
            let submitted: HashSet<u32> = guess.answers.iter().copied().collect();
            let score = missing.intersection(&submitted).count() as u64;

            ctx.store
                .upsert_submission(
                    ctx.session_id,
                    ctx.instance.id,
                    participant_id,
                    json!({ "answers": guess.answers, "score": score }),
                )
                .await?;

            Ok(())
        })
    }

    fn results<'a>(&'a self, ctx: ActivityContext) -> BoxFuture<'a, Result<Value, ServiceError>> {
        Box::pin(async move {
            let submissions = ctx
                .store
                .list_submissions(ctx.session_id, ctx.instance.id)
                .await?;

            let scores: Vec<(Uuid, u64)> = submissions
                .iter()
                .map(|submission| {
                    let score = submission
                        .data
                        .get("score")
                        .and_then(Value::as_u64)
                        .unwrap_or(0);
                    (submission.participant_id, score)
                })
                .collect();

            let missing = self.missing_for(&ctx);
            let participant_count = scores.len() as u64;
            let average_score = if scores.is_empty() {
                0.0
            } else {
                scores.iter().map(|(_, score)| *score as f64).sum::<f64>() / scores.len() as f64
            };
            let accuracy = if missing.is_empty() {
                0.0
            } else {
                average_score / missing.len() as f64 * 100.0
            };

            // Submissions arrive in insertion order; a stable sort keeps that
            // order among equal scores.
            let mut ranked = scores;
            ranked.sort_by(|a, b| b.1.cmp(&a.1));
            let top_users = ranked
                .into_iter()
                .take(LEADERBOARD_SIZE)
                .map(|(participant_id, score)| TopUser {
                    participant_id,
                    score,
                })
                .collect();

            let results = ScoreRankedResults {
                participant_count,
                average_score,
                accuracy,
                missing_numbers: missing,
                top_users,
            };
            serde_json::to_value(&results).map_err(|err| ServiceError::InvalidInput(err.to_string()))
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::SystemTime;

    use crate::{
        dao::{models::ActivityInstanceEntity, training_store::memory::MemoryStore},
        state::registry::ConnectionRegistry,
    };

    use super::*;

    fn context(config: Value) -> ActivityContext {
        let instance = ActivityInstanceEntity {
            id: Uuid::new_v4(),
            session_id: Uuid::new_v4(),
            definition_id: "numeric_recall".into(),
            name: "Round 1".into(),
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

    fn missing_numbers(results: &Value) -> Vec<u32> {
        results["missingNumbers"]
            .as_array()
            .unwrap()
            .iter()
            .map(|value| value.as_u64().unwrap() as u32)
            .collect()
    }

    #[tokio::test]
    async fn round_generation_respects_the_configured_shape() {
        let activity = NumericRecall::new();
        let ctx = context(json!({"total_numbers": 50, "missing_count": 7}));

        activity.start(ctx.clone()).await.unwrap();
        let results = activity.results(ctx).await.unwrap();
        let missing = missing_numbers(&results);

        assert_eq!(missing.len(), 7);
        assert!(missing.iter().all(|n| (1..=50).contains(n)));
        let distinct: HashSet<u32> = missing.iter().copied().collect();
        assert_eq!(distinct.len(), missing.len());
    }

    #[tokio::test]
    async fn score_is_the_intersection_size_regardless_of_guess_size() {
        let activity = NumericRecall::new();
        let ctx = context(json!({"total_numbers": 100, "missing_count": 10}));
        activity.start(ctx.clone()).await.unwrap();

        let missing = missing_numbers(&activity.results(ctx.clone()).await.unwrap());
        let missing_set: HashSet<u32> = missing.iter().copied().collect();
        let present: Vec<u32> = (1..=100).filter(|n| !missing_set.contains(n)).collect();

        // 4 correct guesses padded with 8 present numbers: 12 answers, score 4.
        let mut answers: Vec<u32> = missing.iter().take(4).copied().collect();
        answers.extend(present.iter().take(8).copied());
        assert_eq!(answers.len(), 12);

        let participant = Uuid::new_v4();
        activity
            .handle_input(ctx.clone(), participant, json!({"answers": answers}))
            .await
            .unwrap();

        let submissions = ctx
            .store
            .list_submissions(ctx.session_id, ctx.instance.id)
            .await
            .unwrap();
        assert_eq!(submissions.len(), 1);
        assert_eq!(submissions[0].data["score"], 4);
    }

    #[tokio::test]
    async fn results_rank_top_five_with_ties_in_submission_order() {
        let activity = NumericRecall::new();
        let ctx = context(json!({"total_numbers": 100, "missing_count": 10}));
        activity.start(ctx.clone()).await.unwrap();

        let missing = missing_numbers(&activity.results(ctx.clone()).await.unwrap());

        // Seven participants scoring 0..=5 with one deliberate tie at 5.
        let mut participants = Vec::new();
        for correct in [5usize, 5, 4, 3, 2, 1, 0] {
            let participant = Uuid::new_v4();
            let answers: Vec<u32> = missing.iter().take(correct).copied().collect();
            activity
                .handle_input(ctx.clone(), participant, json!({"answers": answers}))
                .await
                .unwrap();
            participants.push(participant);
        }

        let results = activity.results(ctx).await.unwrap();
        assert_eq!(results["participantCount"], 7);

        let top_users = results["topUsers"].as_array().unwrap();
        assert_eq!(top_users.len(), 5);

        let scores: Vec<u64> = top_users
            .iter()
            .map(|user| user["score"].as_u64().unwrap())
            .collect();
        assert_eq!(scores, vec![5, 5, 4, 3, 2]);
        // The first-submitted of the two 5-scorers leads the board.
        assert_eq!(
            top_users[0]["participantId"].as_str().unwrap(),
            participants[0].to_string()
        );
        assert_eq!(
            top_users[1]["participantId"].as_str().unwrap(),
            participants[1].to_string()
        );

        let accuracy = results["accuracy"].as_f64().unwrap();
        assert!((0.0..=100.0).contains(&accuracy));
    }

    #[tokio::test]
    async fn zero_submissions_yield_a_well_defined_zero_state() {
        let activity = NumericRecall::new();
        let ctx = context(json!({}));

        let results = activity.results(ctx).await.unwrap();
        assert_eq!(results["participantCount"], 0);
        assert_eq!(results["averageScore"], 0.0);
        assert_eq!(results["accuracy"], 0.0);
        assert_eq!(results["missingNumbers"], json!([]));
        assert_eq!(results["topUsers"], json!([]));
    }

    #[tokio::test]
    async fn restart_produces_a_fresh_round_and_clears_submissions() {
        let activity = NumericRecall::new();
        let ctx = context(json!({}));
        activity.start(ctx.clone()).await.unwrap();

        activity
            .handle_input(ctx.clone(), Uuid::new_v4(), json!({"answers": [1, 2, 3]}))
            .await
            .unwrap();
        activity.start(ctx.clone()).await.unwrap();

        let results = activity.results(ctx).await.unwrap();
        assert_eq!(results["participantCount"], 0);
        assert_eq!(missing_numbers(&results).len(), 10);
    }

    #[tokio::test]
    async fn input_before_any_round_scores_zero_without_failing() {
        let activity = NumericRecall::new();
        let ctx = context(json!({}));

        activity
            .handle_input(ctx.clone(), Uuid::new_v4(), json!({"answers": [1, 2]}))
            .await
            .unwrap();

        let submissions = ctx
            .store
            .list_submissions(ctx.session_id, ctx.instance.id)
            .await
            .unwrap();
        assert_eq!(submissions[0].data["score"], 0);
    }

    #[tokio::test]
    async fn malformed_guess_payload_is_rejected() {
        let activity = NumericRecall::new();
        let ctx = context(json!({}));

        let err = activity
            .handle_input(ctx.clone(), Uuid::new_v4(), json!({"answers": "1,2,3"}))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput(_)));
    }
}
