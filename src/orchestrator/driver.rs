use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use uuid::Uuid;

use super::controller::{CycleController, CycleRequest};
use super::errors::{OrchestratorError, OrchestratorResult};
use super::observer::OrchestrationObserver;
use super::state_machine::ExecutionStateMachine;
use crate::domain::decision::DecisionAction;
use crate::domain::events::OrchestrationEvent;
use crate::domain::execution_state::RunState;

#[derive(Debug, Clone)]
pub struct DriverSettings {
    /// Delay after a `continue` decision
    pub cycle_interval: Duration,
    pub max_cycles: Option<u32>,
}

impl Default for DriverSettings {
    fn default() -> Self {
        Self {
            cycle_interval: Duration::from_secs(10),
            max_cycles: None,
        }
    }
}

/// Sequential control loop for one team
///
/// Cycles run back to back while the team is `running`. A paused team
/// parks the loop until the next state change; idle or stopped ends it.
pub struct TeamDriver {
    machine: Arc<ExecutionStateMachine>,
    controller: Arc<CycleController>,
    observer: Arc<dyn OrchestrationObserver>,
    settings: DriverSettings,
}

impl TeamDriver {
    pub fn new(
        machine: Arc<ExecutionStateMachine>,
        controller: Arc<CycleController>,
        observer: Arc<dyn OrchestrationObserver>,
        settings: DriverSettings,
    ) -> Self {
        Self {
            machine,
            controller,
            observer,
            settings,
        }
    }

    /// Run the loop on its own task
    pub fn spawn(self: Arc<Self>, team_id: Uuid) -> JoinHandle<OrchestratorResult<u32>> {
        tokio::spawn(async move { self.run(team_id).await })
    }

    /// Drive cycles until the team leaves the running state
    ///
    /// Returns the number of cycles run.
    pub async fn run(&self, team_id: Uuid) -> OrchestratorResult<u32> {
        let mut cycles_run = 0;
        let mut changes = self.machine.subscribe();

        loop {
            changes.borrow_and_update();
            let state = self.machine.current(team_id).await?;
            match state.state {
                RunState::Running => {}
                RunState::Paused => {
                    tracing::debug!(%team_id, "paused, waiting for a state change");
                    // The machine outlives this loop, so the channel never closes
                    let _ = changes.changed().await;
                    continue;
                }
                RunState::Idle | RunState::Stopped => {
                    tracing::info!(%team_id, state = %state.state, cycles_run, "driver exiting");
                    break;
                }
            }

            let request = CycleRequest {
                cycle: state.total_cycles + 1,
                max_cycles: self.settings.max_cycles,
            };
            let started_at = Utc::now();

            let summary = match self.controller.run_cycle(team_id, request).await {
                Ok(summary) => summary,
                Err(e) => {
                    self.controller
                        .report_fatal(team_id, request.cycle, &e, started_at)
                        .await
                }
            };
            self.machine.record_cycle(team_id).await?;
            cycles_run += 1;

            let wait = match summary.decision.action {
                DecisionAction::Stop => {
                    if let Some(reason) = &summary.fatal_error {
                        self.observer.on_event(&OrchestrationEvent::ExecutionHalted {
                            team_id,
                            reason: reason.clone(),
                        });
                    }
                    self.halt(team_id, &summary.decision.reason).await?;
                    break;
                }
                DecisionAction::Pause => {
                    Duration::from_millis(summary.decision.duration_ms.unwrap_or_default())
                }
                DecisionAction::Continue => self.settings.cycle_interval,
            };

            // Wake early only when this team leaves the running state
            let deadline = tokio::time::Instant::now() + wait;
            while !wait.is_zero() {
                tokio::select! {
                    _ = tokio::time::sleep_until(deadline) => break,
                    _ = changes.changed() => {
                        if !self.machine.is_running(team_id).await? {
                            break;
                        }
                    }
                }
            }
        }

        Ok(cycles_run)
    }

    async fn halt(&self, team_id: Uuid, reason: &str) -> OrchestratorResult<()> {
        tracing::info!(%team_id, %reason, "stopping execution");
        match self.machine.stop(team_id).await {
            Ok(_) => Ok(()),
            // Already stopped by an operator while the cycle ran
            Err(OrchestratorError::InvalidStateTransition { .. }) => Ok(()),
            Err(e) => Err(e),
        }
    }
}
