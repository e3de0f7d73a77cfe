use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::execution_state::ExecutionState;

/// Repository for the persisted run state of each team
#[async_trait]
pub trait ExecutionStateRepository: Send + Sync {
    /// Find the run state of a team, if one was ever saved
    async fn find_by_team(&self, team_id: Uuid) -> Result<Option<ExecutionState>, String>;

    /// Save a run state (insert or update, last writer wins)
    async fn save(&self, state: &ExecutionState) -> Result<(), String>;
}
