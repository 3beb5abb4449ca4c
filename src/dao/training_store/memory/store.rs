use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};
use std::time::SystemTime;

use dashmap::DashMap;
use futures::future::BoxFuture;
use serde_json::Value;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::dao::models::{
    ActivityInstanceEntity, ParticipantEntity, ParticipantRole, SessionEntity, SubmissionEntity,
};
use crate::dao::storage::StorageResult;
use crate::dao::training_store::TrainingStore;

/// In-memory [`TrainingStore`] implementation.
///
/// All operations complete without suspension; the `active_session` pointer is
/// guarded by a lock so session reset deactivates the prior session and
/// installs its replacement atomically.
pub struct MemoryStore {
    inner: Arc<Inner>,
}

struct Inner {
    sessions: DashMap<Uuid, SessionEntity>,
    active_session: RwLock<Option<Uuid>>,
    participants: DashMap<Uuid, ParticipantEntity>,
    instances: DashMap<Uuid, ActivityInstanceEntity>,
    submissions: DashMap<(Uuid, Uuid, Uuid), SubmissionEntity>,
    submission_seq: AtomicU64,
}

impl MemoryStore {
    /// Create an empty store; the first `ensure_active_session` call seeds it.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                sessions: DashMap::new(),
                active_session: RwLock::new(None),
                participants: DashMap::new(),
                instances: DashMap::new(),
                submissions: DashMap::new(),
                submission_seq: AtomicU64::new(0),
            }),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Inner {
    async fn active(&self) -> Option<SessionEntity> {
        let guard = self.active_session.read().await;
        guard
            .as_ref()
            .and_then(|id| self.sessions.get(id).map(|entry| entry.value().clone()))
    }

    /// Remove every row scoped to `session_id`. Submissions are destroyed by
    /// session reset per the data model contract.
    fn purge_session_scope(&self, session_id: Uuid) {
        self.participants
            .retain(|_, participant| participant.session_id != session_id);
        self.instances
            .retain(|_, instance| instance.session_id != session_id);
        self.submissions.retain(|key, _| key.0 != session_id);
    }
}

impl TrainingStore for MemoryStore {
    fn active_session(&self) -> BoxFuture<'static, StorageResult<Option<SessionEntity>>> {
        let inner = self.inner.clone();
        Box::pin(async move { Ok(inner.active().await) })
    }

    fn ensure_active_session(
        &self,
        title: String,
    ) -> BoxFuture<'static, StorageResult<SessionEntity>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let mut guard = inner.active_session.write().await;
            if let Some(id) = guard.as_ref()
                && let Some(existing) = inner.sessions.get(id)
            {
                return Ok(existing.value().clone());
            }

            let session = SessionEntity::new(title);
            inner.sessions.insert(session.id, session.clone());
            *guard = Some(session.id);
            Ok(session)
        })
    }

    fn save_session(&self, session: SessionEntity) -> BoxFuture<'static, StorageResult<()>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            inner.sessions.insert(session.id, session);
            Ok(())
        })
    }

    fn reset_active_session(
        &self,
        title: String,
    ) -> BoxFuture<'static, StorageResult<SessionEntity>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let mut guard = inner.active_session.write().await;
            if let Some(previous_id) = guard.take() {
                if let Some(mut previous) = inner.sessions.get_mut(&previous_id) {
                    previous.is_active = false;
                }
                inner.purge_session_scope(previous_id);
            }

            let session = SessionEntity::new(title);
            inner.sessions.insert(session.id, session.clone());
            *guard = Some(session.id);
            Ok(session)
        })
    }

    fn save_participant(
        &self,
        participant: ParticipantEntity,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            inner.participants.insert(participant.id, participant);
            Ok(())
        })
    }

    fn find_participant_by_credential(
        &self,
        credential: String,
    ) -> BoxFuture<'static, StorageResult<Option<ParticipantEntity>>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let found = inner
                .participants
                .iter()
                .find(|entry| entry.value().credential == credential)
                .map(|entry| entry.value().clone());
            Ok(found)
        })
    }

    fn find_participant_by_name(
        &self,
        session_id: Uuid,
        name: String,
        role: ParticipantRole,
    ) -> BoxFuture<'static, StorageResult<Option<ParticipantEntity>>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let found = inner
                .participants
                .iter()
                .find(|entry| {
                    let participant = entry.value();
                    participant.session_id == session_id
                        && participant.role == role
                        && participant.name == name
                })
                .map(|entry| entry.value().clone());
            Ok(found)
        })
    }

    fn count_participants(&self, session_id: Uuid) -> BoxFuture<'static, StorageResult<u64>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let count = inner
                .participants
                .iter()
                .filter(|entry| entry.value().session_id == session_id)
                .count();
            Ok(count as u64)
        })
    }

    fn save_instance(
        &self,
        instance: ActivityInstanceEntity,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            inner.instances.insert(instance.id, instance);
            Ok(())
        })
    }

    fn delete_instance(&self, id: Uuid) -> BoxFuture<'static, StorageResult<()>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            inner.instances.remove(&id);
            inner.submissions.retain(|key, _| key.1 != id);
            Ok(())
        })
    }

    fn find_instance(
        &self,
        id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<ActivityInstanceEntity>>> {
        let inner = self.inner.clone();
        Box::pin(async move { Ok(inner.instances.get(&id).map(|entry| entry.value().clone())) })
    }

    fn list_instances(
        &self,
        session_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<ActivityInstanceEntity>>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let mut instances: Vec<ActivityInstanceEntity> = inner
                .instances
                .iter()
                .filter(|entry| entry.value().session_id == session_id)
                .map(|entry| entry.value().clone())
                .collect();
            instances.sort_by_key(|instance| instance.created_at);
            Ok(instances)
        })
    }

    fn upsert_submission(
        &self,
        session_id: Uuid,
        instance_id: Uuid,
        participant_id: Uuid,
        data: Value,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let key = (session_id, instance_id, participant_id);
            let now = SystemTime::now();
            match inner.submissions.get_mut(&key) {
                Some(mut existing) => {
                    existing.data = data;
                    existing.updated_at = now;
                }
                None => {
                    let seq = inner.submission_seq.fetch_add(1, Ordering::Relaxed);
                    inner.submissions.insert(
                        key,
                        SubmissionEntity {
                            session_id,
                            instance_id,
                            participant_id,
                            data,
                            seq,
                            created_at: now,
                            updated_at: now,
                        },
                    );
                }
            }
            Ok(())
        })
    }

    fn list_submissions(
        &self,
        session_id: Uuid,
        instance_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<SubmissionEntity>>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let mut submissions: Vec<SubmissionEntity> = inner
                .submissions
                .iter()
                .filter(|entry| {
                    let key = entry.key();
                    key.0 == session_id && key.1 == instance_id
                })
                .map(|entry| entry.value().clone())
                .collect();
            submissions.sort_by_key(|submission| submission.seq);
            Ok(submissions)
        })
    }

    fn clear_submissions(
        &self,
        session_id: Uuid,
        instance_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            inner
                .submissions
                .retain(|key, _| !(key.0 == session_id && key.1 == instance_id));
            Ok(())
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async move { Ok(()) })
    }
}
