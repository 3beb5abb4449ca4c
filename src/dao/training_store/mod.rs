pub mod memory;

use futures::future::BoxFuture;
use serde_json::Value;
use uuid::Uuid;

use crate::dao::models::{
    ActivityInstanceEntity, ParticipantEntity, ParticipantRole, SessionEntity, SubmissionEntity,
};
use crate::dao::storage::StorageResult;

/// Abstraction over the persistence layer for sessions, participants,
/// activity instances and submissions.
///
/// `active_session` must be a single indexed lookup; `upsert_submission` must
/// be last-write-wins on the `(session, instance, participant)` key.
pub trait TrainingStore: Send + Sync {
    /// Fetch the active session, if one exists.
    fn active_session(&self) -> BoxFuture<'static, StorageResult<Option<SessionEntity>>>;
    /// Fetch the active session, creating a pending one with `title` when absent.
    fn ensure_active_session(
        &self,
        title: String,
    ) -> BoxFuture<'static, StorageResult<SessionEntity>>;
    /// Persist a session row keyed by its id.
    fn save_session(&self, session: SessionEntity) -> BoxFuture<'static, StorageResult<()>>;
    /// Atomically deactivate the current active session (purging its scoped
    /// rows) and create a fresh pending replacement.
    fn reset_active_session(
        &self,
        title: String,
    ) -> BoxFuture<'static, StorageResult<SessionEntity>>;

    /// Persist a participant row keyed by its id.
    fn save_participant(
        &self,
        participant: ParticipantEntity,
    ) -> BoxFuture<'static, StorageResult<()>>;
    /// Resolve a participant from its opaque credential.
    fn find_participant_by_credential(
        &self,
        credential: String,
    ) -> BoxFuture<'static, StorageResult<Option<ParticipantEntity>>>;
    /// Look up a participant by display name and role within a session.
    fn find_participant_by_name(
        &self,
        session_id: Uuid,
        name: String,
        role: ParticipantRole,
    ) -> BoxFuture<'static, StorageResult<Option<ParticipantEntity>>>;
    /// Number of participants signed in to the session.
    fn count_participants(&self, session_id: Uuid) -> BoxFuture<'static, StorageResult<u64>>;

    /// Persist an activity instance keyed by its id.
    fn save_instance(
        &self,
        instance: ActivityInstanceEntity,
    ) -> BoxFuture<'static, StorageResult<()>>;
    /// Delete an activity instance and every submission made against it.
    fn delete_instance(&self, id: Uuid) -> BoxFuture<'static, StorageResult<()>>;
    /// Fetch one activity instance.
    fn find_instance(
        &self,
        id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<ActivityInstanceEntity>>>;
    /// List a session's activity instances in creation order.
    fn list_instances(
        &self,
        session_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<ActivityInstanceEntity>>>;

    /// Insert or overwrite the submission for the given key (last-write-wins).
    fn upsert_submission(
        &self,
        session_id: Uuid,
        instance_id: Uuid,
        participant_id: Uuid,
        data: Value,
    ) -> BoxFuture<'static, StorageResult<()>>;
    /// List submissions for an instance, ordered by insertion sequence.
    fn list_submissions(
        &self,
        session_id: Uuid,
        instance_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<SubmissionEntity>>>;
    /// Drop all submissions for an instance (fresh round).
    fn clear_submissions(
        &self,
        session_id: Uuid,
        instance_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<()>>;

    /// Probe the backend for liveness.
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
}
