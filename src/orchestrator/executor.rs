use chrono::Utc;
use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;

use super::agent_executor::AgentExecutor;
use super::observer::OrchestrationObserver;
use super::scheduler::WavePlan;
use crate::domain::events::OrchestrationEvent;
use crate::domain::graph::{AgentOutcome, AgentRunResult, ExecutionGraph};

/// Default pause between waves, easing pressure on shared agent services
pub const DEFAULT_INTER_WAVE_DELAY: Duration = Duration::from_secs(5);

/// Runs an execution graph wave by wave
///
/// Every member of a wave runs on its own task and owns its result; results
/// are merged into the graph only after the whole wave has settled. A failed
/// (or panicking) agent marks its node failed and nothing else.
pub struct WaveExecutor {
    agents: Arc<dyn AgentExecutor>,
    observer: Arc<dyn OrchestrationObserver>,
    inter_wave_delay: Duration,
}

impl WaveExecutor {
    pub fn new(
        agents: Arc<dyn AgentExecutor>,
        observer: Arc<dyn OrchestrationObserver>,
        inter_wave_delay: Duration,
    ) -> Self {
        Self {
            agents,
            observer,
            inter_wave_delay,
        }
    }

    /// Execute every wave of `plan` against the graph and stamp its completion time
    ///
    /// `plan` must come from `compute_waves` over this graph's nodes.
    pub async fn execute(&self, mut graph: ExecutionGraph, plan: &WavePlan) -> ExecutionGraph {
        let team_id = graph.team_id();

        if plan.is_degraded() {
            self.observer.on_event(&OrchestrationEvent::SchedulingDegraded {
                team_id,
                remaining: degraded_ids(plan),
            });
        }

        for (index, wave) in plan.waves.iter().enumerate() {
            if index > 0 && !self.inter_wave_delay.is_zero() {
                tracing::debug!(
                    %team_id,
                    delay_ms = self.inter_wave_delay.as_millis() as u64,
                    "waiting before next wave"
                );
                tokio::time::sleep(self.inter_wave_delay).await;
            }

            self.observer.on_event(&OrchestrationEvent::WaveStarted {
                team_id,
                wave: index,
                agents: wave.iter().map(|n| n.agent_type).collect(),
                forced: plan.forced_wave == Some(index),
            });

            let started_at = Utc::now();
            for node in wave {
                if let Some(node) = graph.get_node_mut(&node.id) {
                    node.mark_running(started_at);
                }
            }

            let handles: Vec<_> = wave
                .iter()
                .map(|node| {
                    let agents = Arc::clone(&self.agents);
                    let node_id = node.id.clone();
                    let agent_type = node.agent_type;
                    tokio::spawn(async move {
                        let outcome = agents.execute_agent(agent_type, team_id).await;
                        AgentRunResult {
                            node_id,
                            agent_type,
                            outcome: outcome.into(),
                            finished_at: Utc::now(),
                        }
                    })
                })
                .collect();

            let settled = join_all(handles).await;

            let mut succeeded = 0;
            let mut failed = 0;
            for (node, joined) in wave.iter().zip(settled) {
                let result = joined.unwrap_or_else(|e| AgentRunResult {
                    node_id: node.id.clone(),
                    agent_type: node.agent_type,
                    outcome: AgentOutcome::Failure(format!(
                        "{} agent task aborted: {}",
                        node.agent_type, e
                    )),
                    finished_at: Utc::now(),
                });

                if result.outcome.is_success() {
                    succeeded += 1;
                } else {
                    failed += 1;
                }

                if let Some(graph_node) = graph.get_node_mut(&result.node_id) {
                    graph_node.settle(result.outcome, result.finished_at);
                    self.observer.on_event(&OrchestrationEvent::NodeCompleted {
                        team_id,
                        node_id: graph_node.id.clone(),
                        agent_type: graph_node.agent_type,
                        status: graph_node.status,
                        error: graph_node.error.clone(),
                    });
                }
            }

            self.observer.on_event(&OrchestrationEvent::WaveCompleted {
                team_id,
                wave: index,
                succeeded,
                failed,
            });
        }

        graph.metadata.completed_at = Some(Utc::now());
        graph
    }
}

fn degraded_ids(plan: &WavePlan) -> Vec<String> {
    plan.forced_wave
        .and_then(|index| plan.waves.get(index))
        .map(|wave| wave.iter().map(|n| n.id.clone()).collect())
        .unwrap_or_default()
}
