pub mod registry;
pub mod state_machine;

use std::{sync::Arc, time::Duration};

use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::warn;
use uuid::Uuid;

use crate::{
    activities::{ActivityContext, ActivityRegistry},
    config::AppConfig,
    dao::{models::ActivityInstanceEntity, training_store::TrainingStore},
    error::ServiceError,
};

pub use self::registry::{ClientConnection, ConnectionRegistry, ConnectionRole};
pub use self::state_machine::{
    AbortError, ActivityPhase, ApplyError, Plan, PlanError, PlanId, SessionEvent,
};
use self::state_machine::SessionStateMachine;

/// Shared handle to the application state.
pub type SharedState = Arc<AppState>;
/// Upper bound on the side effects of a single state transition.
pub const DEFAULT_TRANSITION_TIMEOUT: Duration = Duration::from_secs(5);

/// Handle to the currently scheduled auto-stop timer.
///
/// Replacing the handle aborts the previous timer, so at most one scheduled
/// stop is authoritative per activity instance.
pub struct CountdownHandle {
    instance_id: Uuid,
    handle: JoinHandle<()>,
}

impl CountdownHandle {
    /// Wrap a spawned timer task together with the instance it will stop.
    pub fn new(instance_id: Uuid, handle: JoinHandle<()>) -> Self {
        Self { instance_id, handle }
    }

    /// Instance the timer is armed for.
    pub fn instance_id(&self) -> Uuid {
        self.instance_id
    }

    fn abort(&self) {
        self.handle.abort();
    }
}

/// Central application state storing live connections, the storage handle,
/// the activity registry and the session state machine.
pub struct AppState {
    config: AppConfig,
    store: Arc<dyn TrainingStore>,
    registry: Arc<ConnectionRegistry>,
    activities: ActivityRegistry,
    machine: RwLock<SessionStateMachine>,
    transition_gate: Mutex<()>,
    transition_timeout: Option<Duration>,
    countdown: Mutex<Option<CountdownHandle>>,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    pub fn new(
        config: AppConfig,
        store: Arc<dyn TrainingStore>,
        activities: ActivityRegistry,
    ) -> SharedState {
        Arc::new(Self {
            config,
            store,
            registry: Arc::new(ConnectionRegistry::new()),
            activities,
            machine: RwLock::new(SessionStateMachine::new()),
            transition_gate: Mutex::new(()),
            transition_timeout: Some(DEFAULT_TRANSITION_TIMEOUT),
            countdown: Mutex::new(None),
        })
    }

    /// Immutable runtime configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Obtain a handle to the training store.
    pub fn store(&self) -> Arc<dyn TrainingStore> {
        self.store.clone()
    }

    /// Registry of live WebSocket connections.
    pub fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    /// Cloneable handle to the connection registry for activity contexts.
    pub fn registry_handle(&self) -> Arc<ConnectionRegistry> {
        self.registry.clone()
    }

    /// Registry of activity implementations keyed by definition id.
    pub fn activities(&self) -> &ActivityRegistry {
        &self.activities
    }

    /// Snapshot the current phase of the shared session state machine.
    pub async fn machine_phase(&self) -> ActivityPhase {
        self.machine.read().await.phase()
    }

    /// Build the context handed to activity implementations.
    pub fn activity_context(
        &self,
        session_id: Uuid,
        instance: ActivityInstanceEntity,
    ) -> ActivityContext {
        ActivityContext {
            session_id,
            instance,
            store: self.store(),
            registry: self.registry_handle(),
        }
    }

    /// Plan a transition on the shared session state machine, returning the plan.
    async fn plan_transition(&self, event: SessionEvent) -> Result<Plan, PlanError> {
        let mut machine = self.machine.write().await;
        machine.plan(event)
    }

    /// Apply the planned transition, returning the next phase.
    async fn apply_planned_transition(&self, plan_id: PlanId) -> Result<ActivityPhase, ApplyError> {
        let mut machine = self.machine.write().await;
        machine.apply(plan_id)
    }

    /// Abort a planned transition of the shared session state machine.
    async fn abort_transition(&self, plan_id: PlanId) -> Result<(), AbortError> {
        let mut machine = self.machine.write().await;
        machine.abort(plan_id)
    }

    /// Run `work` as the side effects of the `event` transition.
    ///
    /// The transition is planned first, then the work future runs under the
    /// serializing gate; the phase is only applied (and the new phase
    /// returned) once the work committed. A failed or timed-out work future
    /// aborts the plan, leaving the phase untouched so no broadcast can ever
    /// precede its state change.
    pub async fn run_transition<F, Fut, T>(
        &self,
        event: SessionEvent,
        work: F,
    ) -> Result<(T, ActivityPhase), ServiceError>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<T, ServiceError>>,
    {
        let gate = self.transition_gate.lock().await;
        let Plan { id: plan_id, .. } = self.plan_transition(event).await?;

        let work_future = work();
        let outcome = if let Some(limit) = self.transition_timeout {
            match timeout(limit, work_future).await {
                Ok(result) => result,
                Err(_) => {
                    if let Err(abort_err) = self.abort_transition(plan_id).await {
                        warn!(
                            event = ?event,
                            plan_id = %plan_id,
                            error = ?abort_err,
                            "failed to abort transition after timeout"
                        );
                    }
                    drop(gate);
                    return Err(ServiceError::Timeout);
                }
            }
        } else {
            work_future.await
        };

        match outcome {
            Ok(value) => {
                let next = self.apply_planned_transition(plan_id).await?;
                drop(gate);
                Ok((value, next))
            }
            Err(err) => {
                if let Err(abort_err) = self.abort_transition(plan_id).await {
                    warn!(
                        event = ?event,
                        plan_id = %plan_id,
                        error = ?abort_err,
                        "failed to abort transition after work error"
                    );
                }
                drop(gate);
                Err(err)
            }
        }
    }

    /// Install a new countdown timer, aborting any previously scheduled one.
    pub async fn replace_countdown(&self, handle: CountdownHandle) {
        let mut slot = self.countdown.lock().await;
        if let Some(previous) = slot.replace(handle) {
            tracing::debug!(instance = %previous.instance_id(), "aborting previously scheduled countdown");
            previous.abort();
        }
    }

    /// Abort and drop the scheduled countdown timer, if any.
    pub async fn clear_countdown(&self) {
        let mut slot = self.countdown.lock().await;
        if let Some(previous) = slot.take() {
            previous.abort();
        }
    }

    /// Return the state machine to idle, used when the session is replaced.
    pub async fn reset_machine(&self) {
        let mut machine = self.machine.write().await;
        *machine = SessionStateMachine::new();
    }
}
