//! Turns a work status into an execution graph

use chrono::{DateTime, Utc};

use crate::domain::graph::{node_id, ExecutionGraph, GraphNode};
use crate::domain::work::WorkStatus;

/// Build the graph for this cycle, stamped with the current time
pub fn build(work: &WorkStatus) -> ExecutionGraph {
    build_at(work, Utc::now())
}

/// Build the graph with an explicit creation time
///
/// One node per role with work. Roles without work get no node, but a
/// dependency on them still names their would-be id, which the scheduler
/// treats as already satisfied. Nodes are sorted by priority descending,
/// ties broken by role enumeration order.
pub fn build_at(work: &WorkStatus, created_at: DateTime<Utc>) -> ExecutionGraph {
    let mut graph = ExecutionGraph::new(work.team_id, created_at);

    for (agent, status) in work.agents.iter().filter(|(_, s)| s.has_work) {
        let dependencies = status
            .dependencies
            .iter()
            .filter(|dep| *dep != agent)
            .map(|dep| node_id(*dep, created_at))
            .collect();

        graph.nodes.push(GraphNode::new(
            node_id(*agent, created_at),
            *agent,
            status.priority,
            dependencies,
        ));
    }

    graph
        .nodes
        .sort_by(|a, b| b.priority.cmp(&a.priority).then(a.agent_type.cmp(&b.agent_type)));

    tracing::debug!(
        team_id = %work.team_id,
        nodes = graph.nodes.len(),
        "execution graph built"
    );

    graph
}
