use std::time::Instant;

use thiserror::Error;
use uuid::Uuid;

/// Phase of the activity lifecycle within the active session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityPhase {
    /// No activity instance is on stage.
    Idle,
    /// The referenced instance accepts submissions.
    Running {
        /// Instance currently on stage.
        instance_id: Uuid,
    },
    /// The referenced instance shows its results.
    Results {
        /// Instance whose results are on stage.
        instance_id: Uuid,
    },
}

/// Events that can be applied to the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// Host puts an activity instance on stage.
    ///
    /// Valid from idle, from results, and from running only when the id
    /// matches the instance already on stage (an explicit restart producing a
    /// fresh round). Switching instances requires a stop or reset first.
    StartActivity {
        /// Instance to start.
        instance_id: Uuid,
    },
    /// Host closes submissions and moves to results. Idempotent from results.
    StopActivity,
    /// Host clears the stage entirely, returning to idle. Valid from any phase.
    ResetActivity,
}

/// Error returned when attempting to apply an invalid transition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid transition: {event:?} cannot be applied while in {from:?}")]
pub struct InvalidTransition {
    /// The phase the state machine was in when the invalid event was received.
    pub from: ActivityPhase,
    /// The event that cannot be applied from this phase.
    pub event: SessionEvent,
}

/// Errors that can occur when planning a state machine transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanError {
    /// A transition is already pending and must be applied or aborted.
    AlreadyPending,
    /// The requested transition is not valid from the current phase.
    InvalidTransition(InvalidTransition),
}

/// Errors that can occur when applying a planned state machine transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyError {
    /// No transition is currently pending.
    NoPending,
    /// Plan ID does not match the pending plan.
    IdMismatch {
        /// Expected plan ID.
        expected: PlanId,
        /// Provided plan ID.
        got: PlanId,
    },
    /// State machine phase changed since the plan was created.
    PhaseMismatch {
        /// Phase when plan was created.
        expected: ActivityPhase,
        /// Current phase.
        actual: ActivityPhase,
    },
    /// State machine version changed since the plan was created.
    VersionMismatch {
        /// Version when plan was created.
        expected: usize,
        /// Current version.
        actual: usize,
    },
}

/// Errors that can occur when aborting a planned state machine transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbortError {
    /// No transition is currently pending.
    NoPending,
    /// Plan ID does not match the pending plan.
    IdMismatch {
        /// Expected plan ID.
        expected: PlanId,
        /// Provided plan ID.
        got: PlanId,
    },
}

/// Unique identifier for a planned state transition.
pub type PlanId = Uuid;

/// A planned transition that has been validated but not yet applied.
#[derive(Debug, Clone)]
pub struct Plan {
    /// Unique identifier for this plan.
    pub id: PlanId,
    /// Phase the state machine is currently in.
    pub from: ActivityPhase,
    /// Phase the state machine will transition to.
    pub to: ActivityPhase,
    /// Event that triggered this transition.
    pub event: SessionEvent,
    /// Version number after applying this transition.
    pub version_next: usize,
    /// Timestamp when this plan was created.
    pub pending_since: Instant,
}

/// State machine owning the idle → running → results → idle activity flow.
///
/// Transitions are two-step: `plan` validates an event and records it as
/// pending, `apply` commits it after the caller's side effects (storage
/// write, activity invocation) succeeded, `abort` discards it otherwise.
/// Broadcasts only ever follow an applied plan.
#[derive(Debug, Clone)]
pub struct SessionStateMachine {
    phase: ActivityPhase,
    version: usize,
    pending: Option<Plan>,
}

impl Default for SessionStateMachine {
    fn default() -> Self {
        Self {
            phase: ActivityPhase::Idle,
            version: 0,
            pending: None,
        }
    }
}

impl SessionStateMachine {
    /// Create a new state machine initialised in the idle state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inspect the current phase.
    pub fn phase(&self) -> ActivityPhase {
        self.phase
    }

    /// Plan a transition by validating that the event can be applied from the
    /// current phase. Returns a Plan that can later be applied or aborted.
    pub fn plan(&mut self, event: SessionEvent) -> Result<Plan, PlanError> {
        if self.pending.is_some() {
            return Err(PlanError::AlreadyPending);
        }

        let next = self
            .compute_transition(event)
            .map_err(PlanError::InvalidTransition)?;

        let plan = Plan {
            id: Uuid::new_v4(),
            from: self.phase,
            to: next,
            event,
            version_next: self.version + 1,
            pending_since: Instant::now(),
        };

        self.pending = Some(plan.clone());

        Ok(plan)
    }

    /// Apply a planned transition, moving the state machine to the next phase.
    /// Returns the new phase after the transition.
    pub fn apply(&mut self, plan_id: PlanId) -> Result<ActivityPhase, ApplyError> {
        let plan = self.pending.take().ok_or(ApplyError::NoPending)?;

        if plan.id != plan_id {
            let expected_plan_id = plan.id;
            self.pending = Some(plan);
            return Err(ApplyError::IdMismatch {
                expected: expected_plan_id,
                got: plan_id,
            });
        }

        if self.phase != plan.from {
            return Err(ApplyError::PhaseMismatch {
                expected: plan.from,
                actual: self.phase,
            });
        }

        if self.version + 1 != plan.version_next {
            return Err(ApplyError::VersionMismatch {
                expected: plan.version_next,
                actual: self.version + 1,
            });
        }

        self.phase = plan.to;
        self.version = plan.version_next;
        self.pending = None;

        Ok(self.phase)
    }

    /// Abort a planned transition without applying it.
    pub fn abort(&mut self, plan_id: PlanId) -> Result<(), AbortError> {
        let plan = self.pending.as_ref().ok_or(AbortError::NoPending)?;

        if plan.id != plan_id {
            return Err(AbortError::IdMismatch {
                expected: plan.id,
                got: plan_id,
            });
        }

        self.pending = None;
        Ok(())
    }

    /// Compute a transition from an event if the transition is valid.
    fn compute_transition(&self, event: SessionEvent) -> Result<ActivityPhase, InvalidTransition> {
        let next = match (self.phase, event) {
            (ActivityPhase::Idle, SessionEvent::StartActivity { instance_id }) => {
                ActivityPhase::Running { instance_id }
            }
            (ActivityPhase::Results { .. }, SessionEvent::StartActivity { instance_id }) => {
                ActivityPhase::Running { instance_id }
            }
            (
                ActivityPhase::Running { instance_id: current },
                SessionEvent::StartActivity { instance_id },
            ) if current == instance_id => ActivityPhase::Running { instance_id },
            (ActivityPhase::Running { instance_id }, SessionEvent::StopActivity) => {
                ActivityPhase::Results { instance_id }
            }
            (ActivityPhase::Results { instance_id }, SessionEvent::StopActivity) => {
                ActivityPhase::Results { instance_id }
            }
            (_, SessionEvent::ResetActivity) => ActivityPhase::Idle,
            (from, event) => return Err(InvalidTransition { from, event }),
        };

        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn apply(sm: &mut SessionStateMachine, event: SessionEvent) -> ActivityPhase {
        let plan = sm.plan(event).unwrap();
        sm.apply(plan.id).unwrap()
    }

    #[test]
    fn initial_state_is_idle() {
        let sm = SessionStateMachine::new();
        assert_eq!(sm.phase(), ActivityPhase::Idle);
    }

    #[test]
    fn full_happy_path_through_a_round() {
        let mut sm = SessionStateMachine::new();
        let instance_id = Uuid::new_v4();

        assert_eq!(
            apply(&mut sm, SessionEvent::StartActivity { instance_id }),
            ActivityPhase::Running { instance_id }
        );
        assert_eq!(
            apply(&mut sm, SessionEvent::StopActivity),
            ActivityPhase::Results { instance_id }
        );
        assert_eq!(apply(&mut sm, SessionEvent::ResetActivity), ActivityPhase::Idle);
    }

    #[test]
    fn restarting_the_same_instance_is_allowed() {
        let mut sm = SessionStateMachine::new();
        let instance_id = Uuid::new_v4();

        apply(&mut sm, SessionEvent::StartActivity { instance_id });
        assert_eq!(
            apply(&mut sm, SessionEvent::StartActivity { instance_id }),
            ActivityPhase::Running { instance_id }
        );
    }

    #[test]
    fn starting_another_instance_while_running_is_rejected() {
        let mut sm = SessionStateMachine::new();
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();

        apply(&mut sm, SessionEvent::StartActivity { instance_id: first });

        let err = sm
            .plan(SessionEvent::StartActivity { instance_id: second })
            .unwrap_err();
        match err {
            PlanError::InvalidTransition(invalid) => {
                assert_eq!(invalid.from, ActivityPhase::Running { instance_id: first });
                assert_eq!(
                    invalid.event,
                    SessionEvent::StartActivity { instance_id: second }
                );
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn starting_from_results_moves_to_the_next_round() {
        let mut sm = SessionStateMachine::new();
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();

        apply(&mut sm, SessionEvent::StartActivity { instance_id: first });
        apply(&mut sm, SessionEvent::StopActivity);
        assert_eq!(
            apply(&mut sm, SessionEvent::StartActivity { instance_id: second }),
            ActivityPhase::Running { instance_id: second }
        );
    }

    #[test]
    fn double_stop_is_idempotent() {
        let mut sm = SessionStateMachine::new();
        let instance_id = Uuid::new_v4();

        apply(&mut sm, SessionEvent::StartActivity { instance_id });
        apply(&mut sm, SessionEvent::StopActivity);
        assert_eq!(
            apply(&mut sm, SessionEvent::StopActivity),
            ActivityPhase::Results { instance_id }
        );
    }

    #[test]
    fn stop_without_a_running_activity_is_rejected() {
        let mut sm = SessionStateMachine::new();
        let err = sm.plan(SessionEvent::StopActivity).unwrap_err();
        match err {
            PlanError::InvalidTransition(invalid) => {
                assert_eq!(invalid.from, ActivityPhase::Idle);
                assert_eq!(invalid.event, SessionEvent::StopActivity);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn reset_is_valid_from_any_phase() {
        let mut sm = SessionStateMachine::new();
        assert_eq!(apply(&mut sm, SessionEvent::ResetActivity), ActivityPhase::Idle);

        let instance_id = Uuid::new_v4();
        apply(&mut sm, SessionEvent::StartActivity { instance_id });
        assert_eq!(apply(&mut sm, SessionEvent::ResetActivity), ActivityPhase::Idle);
    }

    #[test]
    fn abort_clears_pending() {
        let mut sm = SessionStateMachine::new();
        let plan = sm
            .plan(SessionEvent::StartActivity {
                instance_id: Uuid::new_v4(),
            })
            .unwrap();
        sm.abort(plan.id).unwrap();
        assert!(sm.pending.is_none());
    }

    #[test]
    fn planning_twice_without_resolution_is_rejected() {
        let mut sm = SessionStateMachine::new();
        let instance_id = Uuid::new_v4();
        sm.plan(SessionEvent::StartActivity { instance_id }).unwrap();
        assert_eq!(
            sm.plan(SessionEvent::StopActivity).unwrap_err(),
            PlanError::AlreadyPending
        );
    }
}
