//! Wave scheduling: groups graph nodes into dependency-respecting waves

use std::collections::HashSet;

use crate::domain::graph::GraphNode;

/// Ordered waves for one graph
#[derive(Debug, Clone, Default)]
pub struct WavePlan {
    pub waves: Vec<Vec<GraphNode>>,
    /// Index of the wave that was forced because dependencies could not be resolved
    pub forced_wave: Option<usize>,
}

impl WavePlan {
    /// True when the last wave ran without a valid dependency order
    pub fn is_degraded(&self) -> bool {
        self.forced_wave.is_some()
    }

    /// Largest number of nodes in any one wave
    pub fn max_parallelism(&self) -> usize {
        self.waves.iter().map(Vec::len).max().unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.waves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waves.is_empty()
    }
}

/// Partition nodes into waves
///
/// A node joins the next wave once every dependency is either scheduled in
/// an earlier wave or absent from `nodes` (absent ids count as satisfied).
/// Within a wave, input order is preserved.
///
/// When an iteration selects nothing while nodes remain, the dependency set
/// is circular or unsatisfiable: all remaining nodes are forced into one
/// final wave so scheduling always terminates without dropping work.
pub fn compute_waves(nodes: &[GraphNode]) -> WavePlan {
    let all_ids: HashSet<&str> = nodes.iter().map(|n| n.id.as_str()).collect();
    let mut scheduled: HashSet<&str> = HashSet::new();
    let mut remaining: Vec<&GraphNode> = nodes.iter().collect();
    let mut plan = WavePlan::default();

    while !remaining.is_empty() {
        let (ready, blocked): (Vec<&GraphNode>, Vec<&GraphNode>) =
            remaining.into_iter().partition(|node| {
                node.dependencies.iter().all(|dep| {
                    scheduled.contains(dep.as_str()) || !all_ids.contains(dep.as_str())
                })
            });

        if ready.is_empty() {
            let ids: Vec<&str> = blocked.iter().map(|n| n.id.as_str()).collect();
            tracing::warn!(
                remaining = ?ids,
                "circular or unsatisfiable dependencies, forcing remaining nodes into a final wave"
            );
            plan.forced_wave = Some(plan.waves.len());
            plan.waves.push(blocked.into_iter().cloned().collect());
            break;
        }

        scheduled.extend(ready.iter().map(|n| n.id.as_str()));
        plan.waves.push(ready.into_iter().cloned().collect());
        remaining = blocked;
    }

    plan
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::agent::AgentType;

    fn make_node(id: &str, agent_type: AgentType, deps: Vec<&str>) -> GraphNode {
        GraphNode::new(
            id.to_string(),
            agent_type,
            5,
            deps.into_iter().map(String::from).collect(),
        )
    }

    fn wave_ids(plan: &WavePlan) -> Vec<Vec<String>> {
        plan.waves
            .iter()
            .map(|wave| wave.iter().map(|n| n.id.clone()).collect())
            .collect()
    }

    fn wave_index(plan: &WavePlan, id: &str) -> usize {
        plan.waves
            .iter()
            .position(|wave| wave.iter().any(|n| n.id == id))
            .unwrap()
    }

    #[test]
    fn test_independent_nodes_share_a_wave() {
        let nodes = vec![
            make_node("communicator", AgentType::Communicator, vec![]),
            make_node("builder", AgentType::Builder, vec![]),
        ];

        let plan = compute_waves(&nodes);

        assert_eq!(wave_ids(&plan), vec![vec!["communicator", "builder"]]);
        assert_eq!(plan.max_parallelism(), 2);
        assert!(!plan.is_degraded());
    }

    #[test]
    fn test_chain_produces_one_wave_per_link() {
        let nodes = vec![
            make_node("reviewer", AgentType::Reviewer, vec!["builder"]),
            make_node("builder", AgentType::Builder, vec!["planner"]),
            make_node("planner", AgentType::Planner, vec![]),
        ];

        let plan = compute_waves(&nodes);

        assert_eq!(
            wave_ids(&plan),
            vec![vec!["planner"], vec!["builder"], vec!["reviewer"]]
        );
    }

    #[test]
    fn test_dependents_land_strictly_after_dependencies() {
        let nodes = vec![
            make_node("communicator", AgentType::Communicator, vec![]),
            make_node("planner", AgentType::Planner, vec![]),
            make_node("builder", AgentType::Builder, vec!["planner"]),
            make_node("reviewer", AgentType::Reviewer, vec!["builder", "planner"]),
        ];

        let plan = compute_waves(&nodes);

        for node in &nodes {
            let own = wave_index(&plan, &node.id);
            for dep in &node.dependencies {
                assert!(own > wave_index(&plan, dep), "{} ran before {}", node.id, dep);
            }
        }
    }

    #[test]
    fn test_every_node_scheduled_exactly_once() {
        let nodes = vec![
            make_node("planner", AgentType::Planner, vec![]),
            make_node("builder", AgentType::Builder, vec!["planner"]),
            make_node("communicator", AgentType::Communicator, vec!["ghost"]),
            make_node("reviewer", AgentType::Reviewer, vec!["builder"]),
        ];

        let plan = compute_waves(&nodes);
        let mut seen: Vec<String> = plan.waves.iter().flatten().map(|n| n.id.clone()).collect();
        seen.sort();

        let mut expected: Vec<String> = nodes.iter().map(|n| n.id.clone()).collect();
        expected.sort();
        assert_eq!(seen, expected);
    }

    #[test]
    fn test_absent_dependency_is_satisfied() {
        let nodes = vec![make_node("builder", AgentType::Builder, vec!["planner-123"])];

        let plan = compute_waves(&nodes);

        assert_eq!(wave_ids(&plan), vec![vec!["builder"]]);
        assert!(!plan.is_degraded());
    }

    #[test]
    fn test_cycle_is_forced_into_final_wave() {
        let nodes = vec![
            make_node("a", AgentType::Builder, vec!["b"]),
            make_node("b", AgentType::Reviewer, vec!["a"]),
        ];

        let plan = compute_waves(&nodes);

        assert_eq!(plan.len(), 1);
        assert_eq!(plan.waves[0].len(), 2);
        assert_eq!(plan.forced_wave, Some(0));
        assert!(plan.is_degraded());
    }

    #[test]
    fn test_cycle_after_valid_waves() {
        let nodes = vec![
            make_node("communicator", AgentType::Communicator, vec![]),
            make_node("builder", AgentType::Builder, vec!["reviewer"]),
            make_node("reviewer", AgentType::Reviewer, vec!["builder"]),
        ];

        let plan = compute_waves(&nodes);

        assert_eq!(
            wave_ids(&plan),
            vec![vec!["communicator"], vec!["builder", "reviewer"]]
        );
        assert_eq!(plan.forced_wave, Some(1));
    }

    #[test]
    fn test_empty_graph_has_no_waves() {
        let plan = compute_waves(&[]);
        assert!(plan.is_empty());
        assert_eq!(plan.max_parallelism(), 0);
    }
}
