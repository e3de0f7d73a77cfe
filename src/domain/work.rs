use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use super::agent::AgentType;
use super::team::TeamStatus;

/// Highest priority a role can report
pub const MAX_PRIORITY: u8 = 10;

/// Whether one role has something to do this cycle, and why
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentWorkStatus {
    pub has_work: bool,
    /// 0 to 10, higher runs first within a wave
    pub priority: u8,
    /// Prose explanation for operators
    pub reason: String,
    /// Roles that should run before this one
    pub dependencies: Vec<AgentType>,
}

impl AgentWorkStatus {
    pub fn work(priority: u8, reason: impl Into<String>, dependencies: Vec<AgentType>) -> Self {
        Self {
            has_work: true,
            priority: priority.min(MAX_PRIORITY),
            reason: reason.into(),
            dependencies,
        }
    }

    pub fn idle(reason: impl Into<String>) -> Self {
        Self {
            has_work: false,
            priority: 0,
            reason: reason.into(),
            dependencies: Vec::new(),
        }
    }
}

/// Work status of every role of one team
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkStatus {
    pub team_id: Uuid,
    /// Lifecycle phase the statuses were computed against
    pub phase: TeamStatus,
    pub agents: BTreeMap<AgentType, AgentWorkStatus>,
    pub computed_at: DateTime<Utc>,
}

impl WorkStatus {
    pub fn new(team_id: Uuid) -> Self {
        Self {
            team_id,
            phase: TeamStatus::Active,
            agents: BTreeMap::new(),
            computed_at: Utc::now(),
        }
    }

    pub fn with_phase(mut self, phase: TeamStatus) -> Self {
        self.phase = phase;
        self
    }

    pub fn with(mut self, agent: AgentType, status: AgentWorkStatus) -> Self {
        self.agents.insert(agent, status);
        self
    }

    pub fn get(&self, agent: AgentType) -> Option<&AgentWorkStatus> {
        self.agents.get(&agent)
    }

    /// Roles reporting work, in enumeration order
    pub fn agents_with_work(&self) -> Vec<AgentType> {
        self.agents
            .iter()
            .filter(|(_, status)| status.has_work)
            .map(|(agent, _)| *agent)
            .collect()
    }

    pub fn is_idle(&self) -> bool {
        self.agents.values().all(|status| !status.has_work)
    }
}
