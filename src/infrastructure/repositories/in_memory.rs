use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::context::TeamContext;
use crate::domain::execution_state::ExecutionState;
use crate::domain::repositories::{
    CycleSummaryRepository, ExecutionStateRepository, TeamContextRepository,
};
use crate::domain::summary::OrchestrationSummary;

/// In-process team contexts, for local runs and tests
#[derive(Default)]
pub struct InMemoryTeamContextRepository {
    contexts: RwLock<HashMap<Uuid, TeamContext>>,
}

impl InMemoryTeamContextRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the context of a team
    pub async fn insert(&self, context: TeamContext) {
        self.contexts.write().await.insert(context.team_id(), context);
    }

    pub async fn remove(&self, team_id: Uuid) {
        self.contexts.write().await.remove(&team_id);
    }
}

#[async_trait]
impl TeamContextRepository for InMemoryTeamContextRepository {
    async fn get_team_context(&self, team_id: Uuid) -> Result<Option<TeamContext>, String> {
        Ok(self.contexts.read().await.get(&team_id).cloned())
    }
}

#[derive(Default)]
pub struct InMemoryExecutionStateRepository {
    states: RwLock<HashMap<Uuid, ExecutionState>>,
}

impl InMemoryExecutionStateRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ExecutionStateRepository for InMemoryExecutionStateRepository {
    async fn find_by_team(&self, team_id: Uuid) -> Result<Option<ExecutionState>, String> {
        Ok(self.states.read().await.get(&team_id).cloned())
    }

    async fn save(&self, state: &ExecutionState) -> Result<(), String> {
        self.states
            .write()
            .await
            .insert(state.team_id, state.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryCycleSummaryRepository {
    summaries: RwLock<HashMap<Uuid, Vec<OrchestrationSummary>>>,
}

impl InMemoryCycleSummaryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CycleSummaryRepository for InMemoryCycleSummaryRepository {
    async fn record_cycle_summary(
        &self,
        team_id: Uuid,
        summary: &OrchestrationSummary,
    ) -> Result<(), String> {
        self.summaries
            .write()
            .await
            .entry(team_id)
            .or_default()
            .push(summary.clone());
        Ok(())
    }

    async fn recent(&self, team_id: Uuid, limit: usize) -> Result<Vec<OrchestrationSummary>, String> {
        Ok(self
            .summaries
            .read()
            .await
            .get(&team_id)
            .map(|all| all.iter().rev().take(limit).cloned().collect())
            .unwrap_or_default())
    }
}
