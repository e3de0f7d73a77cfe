use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::execution_state::{ExecutionState, RunState};
use crate::domain::repositories::ExecutionStateRepository;

use super::column;

/// PostgreSQL implementation of ExecutionStateRepository
///
/// One row per team, upserted on every save.
pub struct PostgresExecutionStateRepository {
    pool: PgPool,
}

impl PostgresExecutionStateRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ExecutionStateRepository for PostgresExecutionStateRepository {
    async fn find_by_team(&self, team_id: Uuid) -> Result<Option<ExecutionState>, String> {
        let row = sqlx::query(
            r#"
            SELECT team_id, state, started_at, paused_at, stopped_at,
                   last_activity_at, total_cycles, driver_id
            FROM execution_states
            WHERE team_id = $1
            "#,
        )
        .bind(team_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| format!("Failed to find execution state: {}", e))?;

        row.map(|r| {
            let state: RunState = column::<String>(&r, "state")?.parse()?;
            let total_cycles: i32 = column(&r, "total_cycles")?;

            Ok(ExecutionState {
                team_id: column(&r, "team_id")?,
                state,
                started_at: column(&r, "started_at")?,
                paused_at: column(&r, "paused_at")?,
                stopped_at: column(&r, "stopped_at")?,
                last_activity_at: column(&r, "last_activity_at")?,
                total_cycles: u32::try_from(total_cycles)
                    .map_err(|_| format!("Negative cycle count: {}", total_cycles))?,
                driver_id: column(&r, "driver_id")?,
            })
        })
        .transpose()
    }

    async fn save(&self, state: &ExecutionState) -> Result<(), String> {
        let total_cycles = i32::try_from(state.total_cycles)
            .map_err(|_| format!("Cycle count out of range: {}", state.total_cycles))?;

        sqlx::query(
            r#"
            INSERT INTO execution_states (
                team_id, state, started_at, paused_at, stopped_at,
                last_activity_at, total_cycles, driver_id
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (team_id) DO UPDATE SET
                state = EXCLUDED.state,
                started_at = EXCLUDED.started_at,
                paused_at = EXCLUDED.paused_at,
                stopped_at = EXCLUDED.stopped_at,
                last_activity_at = EXCLUDED.last_activity_at,
                total_cycles = EXCLUDED.total_cycles,
                driver_id = EXCLUDED.driver_id
            "#,
        )
        .bind(state.team_id)
        .bind(state.state.to_string())
        .bind(state.started_at)
        .bind(state.paused_at)
        .bind(state.stopped_at)
        .bind(state.last_activity_at)
        .bind(total_cycles)
        .bind(state.driver_id)
        .execute(&self.pool)
        .await
        .map_err(|e| format!("Failed to save execution state: {}", e))?;

        Ok(())
    }
}
