// Repository implementations (data access layer)
// Adapters that implement the domain repository ports

pub mod in_memory;
pub mod postgres_cycle_summary_repository;
pub mod postgres_execution_state_repository;
pub mod postgres_team_context_repository;

pub use in_memory::{
    InMemoryCycleSummaryRepository, InMemoryExecutionStateRepository,
    InMemoryTeamContextRepository,
};
pub use postgres_cycle_summary_repository::PostgresCycleSummaryRepository;
pub use postgres_execution_state_repository::PostgresExecutionStateRepository;
pub use postgres_team_context_repository::PostgresTeamContextRepository;

use sqlx::postgres::PgRow;
use sqlx::Row;

/// Decode one column, naming it in the error
fn column<'r, T>(row: &'r PgRow, name: &str) -> Result<T, String>
where
    T: sqlx::Decode<'r, sqlx::Postgres> + sqlx::Type<sqlx::Postgres>,
{
    row.try_get(name)
        .map_err(|e| format!("Failed to decode column {}: {}", name, e))
}
