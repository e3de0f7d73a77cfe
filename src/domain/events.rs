use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::agent::AgentType;
use super::execution_state::RunState;
use super::graph::NodeStatus;
use super::summary::OrchestrationSummary;

/// Events emitted while a team's control loop runs
///
/// These are the only observability channel toward dashboards:
/// - one event per wave start and end
/// - one per settled node
/// - one per forced (degraded) wave
/// - one per cycle summary and per state transition
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OrchestrationEvent {
    CycleStarted {
        team_id: Uuid,
        cycle: u32,
    },
    WaveStarted {
        team_id: Uuid,
        wave: usize,
        agents: Vec<AgentType>,
        forced: bool,
    },
    NodeCompleted {
        team_id: Uuid,
        node_id: String,
        agent_type: AgentType,
        status: NodeStatus,
        error: Option<String>,
    },
    WaveCompleted {
        team_id: Uuid,
        wave: usize,
        succeeded: usize,
        failed: usize,
    },
    /// Dependency resolution failed and the remaining nodes were forced into one wave
    SchedulingDegraded {
        team_id: Uuid,
        remaining: Vec<String>,
    },
    CycleCompleted {
        summary: Box<OrchestrationSummary>,
    },
    StateChanged {
        team_id: Uuid,
        from: RunState,
        to: RunState,
    },
    ExecutionHalted {
        team_id: Uuid,
        reason: String,
    },
}

impl OrchestrationEvent {
    /// Returns the team this event belongs to
    pub fn team_id(&self) -> Uuid {
        match self {
            OrchestrationEvent::CycleStarted { team_id, .. } => *team_id,
            OrchestrationEvent::WaveStarted { team_id, .. } => *team_id,
            OrchestrationEvent::NodeCompleted { team_id, .. } => *team_id,
            OrchestrationEvent::WaveCompleted { team_id, .. } => *team_id,
            OrchestrationEvent::SchedulingDegraded { team_id, .. } => *team_id,
            OrchestrationEvent::CycleCompleted { summary } => summary.team_id,
            OrchestrationEvent::StateChanged { team_id, .. } => *team_id,
            OrchestrationEvent::ExecutionHalted { team_id, .. } => *team_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wave_started_event() {
        let team_id = Uuid::new_v4();
        let event = OrchestrationEvent::WaveStarted {
            team_id,
            wave: 0,
            agents: vec![AgentType::Builder],
            forced: false,
        };

        assert_eq!(event.team_id(), team_id);
    }

    #[test]
    fn events_serialize_with_type_tag() {
        let event = OrchestrationEvent::StateChanged {
            team_id: Uuid::new_v4(),
            from: RunState::Running,
            to: RunState::Paused,
        };

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "state_changed");
        assert_eq!(json["to"], "paused");
    }
}
