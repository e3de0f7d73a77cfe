use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::agent::AgentType;

/// Status of a node in the execution graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl NodeStatus {
    /// Completed and failed nodes both satisfy their dependents
    pub fn is_settled(&self) -> bool {
        matches!(self, NodeStatus::Completed | NodeStatus::Failed)
    }
}

/// One agent run scheduled for this cycle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphNode {
    /// `<role>-<graph creation millis>`, unique within a graph
    pub id: String,
    pub agent_type: AgentType,
    pub status: NodeStatus,
    pub priority: u8,
    /// Node ids; ids missing from the graph count as already satisfied
    pub dependencies: Vec<String>,
    pub result: Option<String>,
    pub error: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
}

impl GraphNode {
    pub fn new(id: String, agent_type: AgentType, priority: u8, dependencies: Vec<String>) -> Self {
        Self {
            id,
            agent_type,
            status: NodeStatus::Pending,
            priority,
            dependencies,
            result: None,
            error: None,
            start_time: None,
            end_time: None,
        }
    }

    pub fn mark_running(&mut self, at: DateTime<Utc>) {
        self.status = NodeStatus::Running;
        self.start_time = Some(at);
    }

    /// Folds a settled agent run into the node
    pub fn settle(&mut self, outcome: AgentOutcome, at: DateTime<Utc>) {
        match outcome {
            AgentOutcome::Success(text) => {
                self.status = NodeStatus::Completed;
                self.result = Some(text);
            }
            AgentOutcome::Failure(reason) => {
                self.status = NodeStatus::Failed;
                self.error = Some(reason);
            }
        }
        self.end_time = Some(at);
    }
}

/// Node id for a role in a graph created at `created_at`
pub fn node_id(agent_type: AgentType, created_at: DateTime<Utc>) -> String {
    format!("{}-{}", agent_type, created_at.timestamp_millis())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphMetadata {
    pub team_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Execution graph for one cycle of one team
///
/// Owned by the cycle that built it and never shared with another cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionGraph {
    pub nodes: Vec<GraphNode>,
    pub metadata: GraphMetadata,
}

impl ExecutionGraph {
    pub fn new(team_id: Uuid, created_at: DateTime<Utc>) -> Self {
        Self {
            nodes: Vec::new(),
            metadata: GraphMetadata {
                team_id,
                created_at,
                completed_at: None,
            },
        }
    }

    pub fn team_id(&self) -> Uuid {
        self.metadata.team_id
    }

    pub fn get_node(&self, id: &str) -> Option<&GraphNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn get_node_mut(&mut self, id: &str) -> Option<&mut GraphNode> {
        self.nodes.iter_mut().find(|n| n.id == id)
    }

    pub fn node_for(&self, agent_type: AgentType) -> Option<&GraphNode> {
        self.nodes.iter().find(|n| n.agent_type == agent_type)
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn count_with_status(&self, status: NodeStatus) -> usize {
        self.nodes.iter().filter(|n| n.status == status).count()
    }

    /// Milliseconds between creation and completion, zero while unfinished
    pub fn duration_ms(&self) -> i64 {
        self.metadata
            .completed_at
            .map(|done| (done - self.metadata.created_at).num_milliseconds())
            .unwrap_or(0)
    }
}

/// How a single agent call ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "text", rename_all = "lowercase")]
pub enum AgentOutcome {
    Success(String),
    Failure(String),
}

impl AgentOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, AgentOutcome::Success(_))
    }
}

impl From<Result<String, String>> for AgentOutcome {
    fn from(result: Result<String, String>) -> Self {
        match result {
            Ok(text) => AgentOutcome::Success(text),
            Err(reason) => AgentOutcome::Failure(reason),
        }
    }
}

/// Result handed back by a wave member once it has settled
#[derive(Debug, Clone)]
pub struct AgentRunResult {
    pub node_id: String,
    pub agent_type: AgentType,
    pub outcome: AgentOutcome,
    pub finished_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_id_combines_role_and_timestamp() {
        let created_at = DateTime::from_timestamp_millis(1_700_000_000_123).unwrap();
        assert_eq!(node_id(AgentType::Builder, created_at), "builder-1700000000123");
    }

    #[test]
    fn settle_success_sets_result() {
        let mut node = GraphNode::new("builder-1".to_string(), AgentType::Builder, 7, vec![]);
        let now = Utc::now();

        node.mark_running(now);
        assert_eq!(node.status, NodeStatus::Running);

        node.settle(AgentOutcome::Success("shipped".to_string()), now);
        assert_eq!(node.status, NodeStatus::Completed);
        assert_eq!(node.result.as_deref(), Some("shipped"));
        assert!(node.error.is_none());
        assert!(node.end_time.is_some());
    }

    #[test]
    fn settle_failure_sets_error() {
        let mut node = GraphNode::new("reviewer-1".to_string(), AgentType::Reviewer, 5, vec![]);

        node.settle(AgentOutcome::Failure("rate limited".to_string()), Utc::now());
        assert_eq!(node.status, NodeStatus::Failed);
        assert_eq!(node.error.as_deref(), Some("rate limited"));
        assert!(node.status.is_settled());
    }

    #[test]
    fn duration_is_zero_until_completed() {
        let created_at = Utc::now();
        let mut graph = ExecutionGraph::new(Uuid::new_v4(), created_at);
        assert_eq!(graph.duration_ms(), 0);

        graph.metadata.completed_at = Some(created_at + chrono::Duration::milliseconds(1500));
        assert_eq!(graph.duration_ms(), 1500);
    }

    #[test]
    fn outcome_from_result() {
        assert!(AgentOutcome::from(Ok::<_, String>("ok".to_string())).is_success());
        assert!(!AgentOutcome::from(Err::<String, _>("boom".to_string())).is_success());
    }
}
