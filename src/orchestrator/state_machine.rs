use chrono::Utc;
use std::sync::Arc;
use tokio::sync::watch;
use uuid::Uuid;

use super::detector::CacheInvalidator;
use super::errors::{OrchestratorError, OrchestratorResult};
use super::observer::OrchestrationObserver;
use crate::domain::events::OrchestrationEvent;
use crate::domain::execution_state::{ExecutionState, InvalidTransition, StateTransition};
use crate::domain::repositories::ExecutionStateRepository;

/// Owns the persisted run state of each team
///
/// Every operation is a read-modify-write against the repository. A pause
/// or stop requested while a cycle is in flight is only observed by the
/// driver at the next cycle boundary.
pub struct ExecutionStateMachine {
    states: Arc<dyn ExecutionStateRepository>,
    invalidator: Arc<dyn CacheInvalidator>,
    observer: Arc<dyn OrchestrationObserver>,
    changes: watch::Sender<u64>,
}

impl ExecutionStateMachine {
    pub fn new(
        states: Arc<dyn ExecutionStateRepository>,
        invalidator: Arc<dyn CacheInvalidator>,
        observer: Arc<dyn OrchestrationObserver>,
    ) -> Self {
        Self {
            states,
            invalidator,
            observer,
            changes: watch::channel(0).0,
        }
    }

    /// Current state of a team; teams never started are idle
    pub async fn current(&self, team_id: Uuid) -> OrchestratorResult<ExecutionState> {
        Ok(self
            .states
            .find_by_team(team_id)
            .await
            .map_err(OrchestratorError::Repository)?
            .unwrap_or_else(|| ExecutionState::new(team_id)))
    }

    pub async fn is_running(&self, team_id: Uuid) -> OrchestratorResult<bool> {
        Ok(self.current(team_id).await?.is_running())
    }

    /// idle|stopped -> running
    ///
    /// Restarting a stopped team resets its cycle count and clears every
    /// cached detection result for it.
    pub async fn start(&self, team_id: Uuid) -> OrchestratorResult<ExecutionState> {
        let (state, transition) = self
            .transition(team_id, |state| state.start(Uuid::new_v4(), Utc::now()))
            .await?;

        if transition.reset {
            self.invalidator.invalidate(team_id).await;
            tracing::info!(%team_id, "restarted after stop, cycle count and caches reset");
        }

        Ok(state)
    }

    /// running -> paused
    pub async fn pause(&self, team_id: Uuid) -> OrchestratorResult<ExecutionState> {
        let (state, _) = self
            .transition(team_id, |state| state.pause(Utc::now()))
            .await?;
        Ok(state)
    }

    /// paused -> running
    pub async fn resume(&self, team_id: Uuid) -> OrchestratorResult<ExecutionState> {
        let (state, _) = self.transition(team_id, |state| state.resume()).await?;
        Ok(state)
    }

    /// running|paused -> stopped
    pub async fn stop(&self, team_id: Uuid) -> OrchestratorResult<ExecutionState> {
        let (state, _) = self
            .transition(team_id, |state| state.stop(Utc::now()))
            .await?;
        Ok(state)
    }

    /// Count a finished cycle and touch `last_activity_at`
    pub async fn record_cycle(&self, team_id: Uuid) -> OrchestratorResult<ExecutionState> {
        let mut state = self.current(team_id).await?;
        state.record_cycle(Utc::now());
        self.persist(&state).await;
        Ok(state)
    }

    /// Receiver that sees every state transition of any team
    ///
    /// Mark the current version as seen before reading a state, then await
    /// `changed()`; a transition in between is not lost.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.changes.subscribe()
    }

    async fn transition<F>(
        &self,
        team_id: Uuid,
        apply: F,
    ) -> OrchestratorResult<(ExecutionState, StateTransition)>
    where
        F: FnOnce(&mut ExecutionState) -> Result<StateTransition, InvalidTransition>,
    {
        let mut state = self.current(team_id).await?;
        let transition = apply(&mut state)?;

        self.persist(&state).await;
        self.observer.on_event(&OrchestrationEvent::StateChanged {
            team_id,
            from: transition.from,
            to: transition.to,
        });
        self.changes.send_modify(|version| *version = version.wrapping_add(1));

        Ok((state, transition))
    }

    async fn persist(&self, state: &ExecutionState) {
        if let Err(e) = self.states.save(state).await {
            tracing::warn!(team_id = %state.team_id, error = %e, "failed to persist execution state");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::execution_state::RunState;
    use crate::infrastructure::repositories::InMemoryExecutionStateRepository;
    use crate::orchestrator::observer::TracingObserver;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingInvalidator {
        invalidated: Mutex<Vec<Uuid>>,
    }

    #[async_trait]
    impl CacheInvalidator for RecordingInvalidator {
        async fn invalidate(&self, team_id: Uuid) {
            self.invalidated.lock().unwrap().push(team_id);
        }
    }

    fn machine() -> (ExecutionStateMachine, Arc<RecordingInvalidator>) {
        let invalidator = Arc::new(RecordingInvalidator::default());
        let machine = ExecutionStateMachine::new(
            Arc::new(InMemoryExecutionStateRepository::new()),
            invalidator.clone(),
            Arc::new(TracingObserver),
        );
        (machine, invalidator)
    }

    #[tokio::test]
    async fn unknown_team_is_idle() {
        let (machine, _) = machine();
        let state = machine.current(Uuid::new_v4()).await.unwrap();
        assert_eq!(state.state, RunState::Idle);
    }

    #[tokio::test]
    async fn start_from_idle_does_not_invalidate() {
        let (machine, invalidator) = machine();
        let team_id = Uuid::new_v4();

        let state = machine.start(team_id).await.unwrap();

        assert_eq!(state.state, RunState::Running);
        assert!(invalidator.invalidated.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn restart_after_stop_resets_and_invalidates() {
        let (machine, invalidator) = machine();
        let team_id = Uuid::new_v4();

        machine.start(team_id).await.unwrap();
        machine.record_cycle(team_id).await.unwrap();
        machine.record_cycle(team_id).await.unwrap();
        machine.stop(team_id).await.unwrap();
        assert_eq!(machine.current(team_id).await.unwrap().total_cycles, 2);

        let state = machine.start(team_id).await.unwrap();

        assert_eq!(state.total_cycles, 0);
        assert_eq!(*invalidator.invalidated.lock().unwrap(), vec![team_id]);
    }

    #[tokio::test]
    async fn pause_while_idle_is_rejected() {
        let (machine, _) = machine();

        let result = machine.pause(Uuid::new_v4()).await;

        assert!(matches!(
            result,
            Err(OrchestratorError::InvalidStateTransition {
                from: RunState::Idle,
                to: RunState::Paused
            })
        ));
    }

    #[tokio::test]
    async fn pause_resume_round_trip_keeps_counters() {
        let (machine, _) = machine();
        let team_id = Uuid::new_v4();

        machine.start(team_id).await.unwrap();
        machine.record_cycle(team_id).await.unwrap();
        machine.pause(team_id).await.unwrap();
        assert!(!machine.is_running(team_id).await.unwrap());

        let state = machine.resume(team_id).await.unwrap();
        assert!(state.is_running());
        assert_eq!(state.total_cycles, 1);
    }

    #[tokio::test]
    async fn transitions_are_seen_by_subscribers() {
        let (machine, _) = machine();
        let team_id = Uuid::new_v4();
        let mut changes = machine.subscribe();
        changes.borrow_and_update();

        machine.start(team_id).await.unwrap();

        tokio::time::timeout(std::time::Duration::from_secs(1), changes.changed())
            .await
            .expect("transition should be seen")
            .unwrap();
    }

    #[tokio::test]
    async fn record_cycle_is_not_a_transition() {
        let (machine, _) = machine();
        let team_id = Uuid::new_v4();
        machine.start(team_id).await.unwrap();
        let mut changes = machine.subscribe();
        changes.borrow_and_update();

        machine.record_cycle(team_id).await.unwrap();

        assert!(!changes.has_changed().unwrap());
    }
}
