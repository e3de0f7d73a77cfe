// Observer surface for dashboards and metrics
//
// Delivery is best-effort: observers never fail the cycle that emits to them.

use std::sync::Arc;
use tokio::sync::broadcast;

use crate::domain::events::OrchestrationEvent;

/// Receives orchestration events as they happen
pub trait OrchestrationObserver: Send + Sync {
    fn on_event(&self, event: &OrchestrationEvent);
}

/// Writes every event to the `tracing` subscriber
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl OrchestrationObserver for TracingObserver {
    fn on_event(&self, event: &OrchestrationEvent) {
        match event {
            OrchestrationEvent::CycleStarted { team_id, cycle } => {
                tracing::info!(%team_id, cycle, "cycle started");
            }
            OrchestrationEvent::WaveStarted {
                team_id,
                wave,
                agents,
                forced,
            } => {
                tracing::info!(%team_id, wave, ?agents, forced, "wave started");
            }
            OrchestrationEvent::NodeCompleted {
                team_id,
                node_id,
                agent_type,
                status,
                error,
            } => match error {
                Some(error) => {
                    tracing::warn!(%team_id, %node_id, %agent_type, ?status, %error, "agent failed")
                }
                None => tracing::info!(%team_id, %node_id, %agent_type, ?status, "agent completed"),
            },
            OrchestrationEvent::WaveCompleted {
                team_id,
                wave,
                succeeded,
                failed,
            } => {
                tracing::info!(%team_id, wave, succeeded, failed, "wave completed");
            }
            OrchestrationEvent::SchedulingDegraded { team_id, remaining } => {
                tracing::warn!(%team_id, ?remaining, "dependency order abandoned, forcing final wave");
            }
            OrchestrationEvent::CycleCompleted { summary } => {
                tracing::info!(
                    team_id = %summary.team_id,
                    cycle = summary.cycle,
                    agents = summary.agents_run.len(),
                    waves = summary.wave_count,
                    parallel = summary.parallel_executions,
                    succeeded = summary.succeeded,
                    failed = summary.failed,
                    degraded = summary.degraded_scheduling,
                    decision = %summary.decision.action,
                    "cycle completed"
                );
                if tracing::enabled!(tracing::Level::DEBUG) {
                    if let Ok(json) = serde_json::to_string(summary) {
                        tracing::debug!(team_id = %summary.team_id, summary = %json, "cycle summary");
                    }
                }
            }
            OrchestrationEvent::StateChanged { team_id, from, to } => {
                tracing::info!(%team_id, %from, %to, "execution state changed");
            }
            OrchestrationEvent::ExecutionHalted { team_id, reason } => {
                tracing::error!(%team_id, %reason, "execution halted");
            }
        }
    }
}

/// Forwards events to a broadcast channel
///
/// Having no subscribers is not an error; the event is simply dropped.
#[derive(Debug, Clone)]
pub struct BroadcastObserver {
    sender: broadcast::Sender<OrchestrationEvent>,
}

impl BroadcastObserver {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<OrchestrationEvent> {
        self.sender.subscribe()
    }
}

impl OrchestrationObserver for BroadcastObserver {
    fn on_event(&self, event: &OrchestrationEvent) {
        let _ = self.sender.send(event.clone());
    }
}

/// Delivers each event to several observers in order
#[derive(Clone, Default)]
pub struct FanoutObserver {
    observers: Vec<Arc<dyn OrchestrationObserver>>,
}

impl FanoutObserver {
    pub fn new(observers: Vec<Arc<dyn OrchestrationObserver>>) -> Self {
        Self { observers }
    }
}

impl OrchestrationObserver for FanoutObserver {
    fn on_event(&self, event: &OrchestrationEvent) {
        for observer in &self.observers {
            observer.on_event(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[tokio::test]
    async fn broadcast_observer_delivers_to_subscribers() {
        let observer = BroadcastObserver::new(8);
        let mut rx = observer.subscribe();
        let team_id = Uuid::new_v4();

        observer.on_event(&OrchestrationEvent::CycleStarted { team_id, cycle: 1 });

        let received = rx.recv().await.unwrap();
        assert_eq!(received.team_id(), team_id);
    }

    #[test]
    fn broadcast_without_subscribers_is_ignored() {
        let observer = BroadcastObserver::new(8);
        observer.on_event(&OrchestrationEvent::CycleStarted {
            team_id: Uuid::new_v4(),
            cycle: 1,
        });
    }

    #[tokio::test]
    async fn fanout_reaches_every_observer() {
        let first = BroadcastObserver::new(4);
        let second = BroadcastObserver::new(4);
        let mut rx1 = first.subscribe();
        let mut rx2 = second.subscribe();

        let fanout = FanoutObserver::new(vec![
            Arc::new(first),
            Arc::new(second),
            Arc::new(TracingObserver),
        ]);
        fanout.on_event(&OrchestrationEvent::ExecutionHalted {
            team_id: Uuid::new_v4(),
            reason: "gone".to_string(),
        });

        assert!(rx1.recv().await.is_ok());
        assert!(rx2.recv().await.is_ok());
    }
}
