use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::repositories::CycleSummaryRepository;
use crate::domain::summary::OrchestrationSummary;

use super::column;

/// PostgreSQL implementation of CycleSummaryRepository
///
/// Summaries are stored whole as JSONB, one row per cycle.
pub struct PostgresCycleSummaryRepository {
    pool: PgPool,
}

impl PostgresCycleSummaryRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CycleSummaryRepository for PostgresCycleSummaryRepository {
    async fn record_cycle_summary(
        &self,
        team_id: Uuid,
        summary: &OrchestrationSummary,
    ) -> Result<(), String> {
        sqlx::query(
            r#"
            INSERT INTO cycle_summaries (team_id, cycle, summary)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(team_id)
        .bind(i64::from(summary.cycle))
        .bind(Json(summary))
        .execute(&self.pool)
        .await
        .map_err(|e| format!("Failed to record cycle summary: {}", e))?;

        Ok(())
    }

    async fn recent(&self, team_id: Uuid, limit: usize) -> Result<Vec<OrchestrationSummary>, String> {
        let rows = sqlx::query(
            r#"
            SELECT summary
            FROM cycle_summaries
            WHERE team_id = $1
            ORDER BY id DESC
            LIMIT $2
            "#,
        )
        .bind(team_id)
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| format!("Failed to load cycle summaries: {}", e))?;

        rows.iter()
            .map(|r| column::<Json<OrchestrationSummary>>(r, "summary").map(|json| json.0))
            .collect()
    }
}
