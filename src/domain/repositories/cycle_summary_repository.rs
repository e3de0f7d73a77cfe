use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::summary::OrchestrationSummary;

/// Append-only log of cycle summaries
#[async_trait]
pub trait CycleSummaryRepository: Send + Sync {
    /// Record the summary of one cycle
    async fn record_cycle_summary(
        &self,
        team_id: Uuid,
        summary: &OrchestrationSummary,
    ) -> Result<(), String>;

    /// Most recent summaries for a team, newest first
    async fn recent(&self, team_id: Uuid, limit: usize) -> Result<Vec<OrchestrationSummary>, String>;
}
