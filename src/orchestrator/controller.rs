use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::detector::{CacheInvalidator, WorkDetector};
use super::errors::{OrchestratorError, OrchestratorResult};
use super::executor::WaveExecutor;
use super::graph_builder;
use super::observer::OrchestrationObserver;
use super::scheduler::{compute_waves, WavePlan};
use crate::domain::decision::OrchestratorDecision;
use crate::domain::events::OrchestrationEvent;
use crate::domain::graph::{ExecutionGraph, NodeStatus};
use crate::domain::repositories::CycleSummaryRepository;
use crate::domain::summary::{NodeFailure, OrchestrationSummary};
use crate::domain::work::WorkStatus;

/// Maps a cycle's outcome to continue, pause or stop
#[derive(Debug, Clone)]
pub struct DecisionPolicy {
    /// Pause after the first idle cycle
    pub idle_backoff_base: Duration,
    /// Upper bound for the idle pause
    pub idle_backoff_max: Duration,
}

impl Default for DecisionPolicy {
    fn default() -> Self {
        Self {
            idle_backoff_base: Duration::from_secs(30),
            idle_backoff_max: Duration::from_secs(300),
        }
    }
}

impl DecisionPolicy {
    /// Pause length after `streak` consecutive idle cycles (doubling, capped)
    pub fn idle_backoff(&self, streak: u32) -> Duration {
        let factor = 2u32.saturating_pow(streak.saturating_sub(1));
        self.idle_backoff_base
            .saturating_mul(factor)
            .min(self.idle_backoff_max)
    }
}

/// Cycle number and optional bound supplied by the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleRequest {
    /// 1-based number of the cycle about to run
    pub cycle: u32,
    pub max_cycles: Option<u32>,
}

impl CycleRequest {
    pub fn unbounded(cycle: u32) -> Self {
        Self {
            cycle,
            max_cycles: None,
        }
    }

    fn bound_reached(&self) -> bool {
        self.max_cycles.is_some_and(|max| self.cycle >= max)
    }
}

/// Runs one detect, build, schedule, execute pass for a team
pub struct CycleController {
    detector: Arc<WorkDetector>,
    executor: WaveExecutor,
    summaries: Arc<dyn CycleSummaryRepository>,
    observer: Arc<dyn OrchestrationObserver>,
    policy: DecisionPolicy,
    idle_streaks: Mutex<HashMap<Uuid, u32>>,
}

impl CycleController {
    pub fn new(
        detector: Arc<WorkDetector>,
        executor: WaveExecutor,
        summaries: Arc<dyn CycleSummaryRepository>,
        observer: Arc<dyn OrchestrationObserver>,
        policy: DecisionPolicy,
    ) -> Self {
        Self {
            detector,
            executor,
            summaries,
            observer,
            policy,
            idle_streaks: Mutex::new(HashMap::new()),
        }
    }

    /// Run a full cycle for a team
    ///
    /// # Errors
    /// Only fatal conditions unwind: the team record is missing or unreadable.
    /// Agent failures and degraded scheduling are reported in the summary.
    pub async fn run_cycle(
        &self,
        team_id: Uuid,
        request: CycleRequest,
    ) -> OrchestratorResult<OrchestrationSummary> {
        self.observer.on_event(&OrchestrationEvent::CycleStarted {
            team_id,
            cycle: request.cycle,
        });

        let work = self.detector.detect(team_id).await?;
        Ok(self.run_with(work, request).await)
    }

    /// Run a cycle against an already computed work status
    pub async fn run_with(&self, work: WorkStatus, request: CycleRequest) -> OrchestrationSummary {
        let team_id = work.team_id;
        let started_at = Utc::now();

        let graph = graph_builder::build(&work);
        let plan = compute_waves(&graph.nodes);
        let graph = self.executor.execute(graph, &plan).await;

        // The next cycle must see data that changed during this one or during the pause
        self.detector.invalidate(team_id).await;

        let decision = self.decide(&work, &graph, request).await;
        let summary = analyze(&graph, &plan, request.cycle, decision, started_at);

        self.record(team_id, &summary).await;
        summary
    }

    /// Record and publish the summary of a cycle that could not run
    pub async fn report_fatal(
        &self,
        team_id: Uuid,
        cycle: u32,
        error: &OrchestratorError,
        started_at: DateTime<Utc>,
    ) -> OrchestrationSummary {
        tracing::error!(%team_id, cycle, %error, "cycle aborted");
        let summary = OrchestrationSummary::fatal(team_id, cycle, error.to_string(), started_at);
        self.record(team_id, &summary).await;
        summary
    }

    async fn record(&self, team_id: Uuid, summary: &OrchestrationSummary) {
        if let Err(e) = self.summaries.record_cycle_summary(team_id, summary).await {
            tracing::warn!(%team_id, cycle = summary.cycle, error = %e, "failed to record cycle summary");
        }
        self.observer.on_event(&OrchestrationEvent::CycleCompleted {
            summary: Box::new(summary.clone()),
        });
    }

    async fn decide(
        &self,
        work: &WorkStatus,
        graph: &ExecutionGraph,
        request: CycleRequest,
    ) -> OrchestratorDecision {
        let team_id = work.team_id;

        if work.phase.is_terminal() {
            self.idle_streaks.lock().await.remove(&team_id);
            return OrchestratorDecision::stop(format!(
                "The team is {}, so there is nothing left to orchestrate",
                work.phase
            ));
        }

        if request.bound_reached() {
            return OrchestratorDecision::stop(format!(
                "Reached the requested bound of {} cycle(s)",
                request.cycle
            ));
        }

        if graph.is_empty() {
            let mut streaks = self.idle_streaks.lock().await;
            let streak = streaks.entry(team_id).or_insert(0);
            *streak += 1;
            let duration = self.policy.idle_backoff(*streak);
            return OrchestratorDecision::pause_for(
                duration.as_millis() as u64,
                format!(
                    "No agent had work for {} consecutive cycle(s), backing off",
                    streak
                ),
                Utc::now(),
            );
        }

        self.idle_streaks.lock().await.remove(&team_id);
        let failed = graph.count_with_status(NodeStatus::Failed);
        if failed > 0 {
            OrchestratorDecision::continue_now(format!(
                "{} agent(s) ran, {} failed; retrying on the next cycle",
                graph.nodes.len(),
                failed
            ))
        } else {
            OrchestratorDecision::continue_now(format!("{} agent(s) ran", graph.nodes.len()))
        }
    }
}

#[async_trait]
impl CacheInvalidator for CycleController {
    async fn invalidate(&self, team_id: Uuid) {
        self.detector.invalidate(team_id).await;
        self.idle_streaks.lock().await.remove(&team_id);
    }
}

fn analyze(
    graph: &ExecutionGraph,
    plan: &WavePlan,
    cycle: u32,
    decision: OrchestratorDecision,
    started_at: DateTime<Utc>,
) -> OrchestrationSummary {
    let failures = graph
        .nodes
        .iter()
        .filter(|n| n.status == NodeStatus::Failed)
        .map(|n| NodeFailure {
            agent_type: n.agent_type,
            error: n.error.clone().unwrap_or_default(),
        })
        .collect();

    OrchestrationSummary {
        team_id: graph.team_id(),
        cycle,
        agents_run: graph.nodes.iter().map(|n| n.agent_type).collect(),
        waves: plan
            .waves
            .iter()
            .map(|wave| wave.iter().map(|n| n.agent_type).collect())
            .collect(),
        wave_count: plan.len(),
        parallel_executions: plan.max_parallelism(),
        duration_ms: graph.duration_ms(),
        succeeded: graph.count_with_status(NodeStatus::Completed),
        failed: graph.count_with_status(NodeStatus::Failed),
        failures,
        degraded_scheduling: plan.is_degraded(),
        fatal_error: None,
        decision,
        started_at,
        completed_at: graph.metadata.completed_at.unwrap_or_else(Utc::now),
    }
}
