use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::agent::AgentType;
use super::decision::OrchestratorDecision;

/// A failed node, as shown inline on the dashboard
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeFailure {
    pub agent_type: AgentType,
    pub error: String,
}

/// Outcome of one cycle for one team
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestrationSummary {
    pub team_id: Uuid,
    pub cycle: u32,
    pub agents_run: Vec<AgentType>,
    /// Roles per wave, in execution order
    pub waves: Vec<Vec<AgentType>>,
    pub wave_count: usize,
    /// Largest wave size
    pub parallel_executions: usize,
    pub duration_ms: i64,
    pub succeeded: usize,
    pub failed: usize,
    pub failures: Vec<NodeFailure>,
    /// Set when dependency resolution gave up and a forced wave ran
    pub degraded_scheduling: bool,
    /// Set when the whole cycle was aborted
    pub fatal_error: Option<String>,
    pub decision: OrchestratorDecision,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
}

impl OrchestrationSummary {
    /// Summary of a cycle that could not run at all
    pub fn fatal(
        team_id: Uuid,
        cycle: u32,
        error: impl Into<String>,
        started_at: DateTime<Utc>,
    ) -> Self {
        let error = error.into();
        let completed_at = Utc::now();
        Self {
            team_id,
            cycle,
            agents_run: Vec::new(),
            waves: Vec::new(),
            wave_count: 0,
            parallel_executions: 0,
            duration_ms: (completed_at - started_at).num_milliseconds(),
            succeeded: 0,
            failed: 0,
            failures: Vec::new(),
            degraded_scheduling: false,
            decision: OrchestratorDecision::stop(format!("Execution halted: {}", error)),
            fatal_error: Some(error),
            started_at,
            completed_at,
        }
    }

    pub fn is_fatal(&self) -> bool {
        self.fatal_error.is_some()
    }

    pub fn is_idle(&self) -> bool {
        self.agents_run.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::decision::DecisionAction;

    #[test]
    fn fatal_summary_escalates_to_stop() {
        let summary = OrchestrationSummary::fatal(Uuid::new_v4(), 3, "Team not found", Utc::now());

        assert!(summary.is_fatal());
        assert_eq!(summary.decision.action, DecisionAction::Stop);
        assert!(summary.decision.reason.contains("Team not found"));
        assert_eq!(summary.cycle, 3);
    }
}
