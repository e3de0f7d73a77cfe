use async_trait::async_trait;
use sqlx::PgPool;
use std::collections::HashMap;
use uuid::Uuid;

use crate::domain::agent::AgentType;
use crate::domain::context::{
    AgentMemory, Artifact, Message, ProjectIdea, SourceResult, Task, TeamContext,
};
use crate::domain::repositories::TeamContextRepository;
use crate::domain::team::{Team, TeamStatus};

use super::column;

/// PostgreSQL implementation of TeamContextRepository
///
/// The team row is read first; a failure there fails the whole call. Every
/// other source is queried separately and its error kept in the context.
pub struct PostgresTeamContextRepository {
    pool: PgPool,
}

impl PostgresTeamContextRepository {
    /// Creates a new PostgresTeamContextRepository
    ///
    /// # Arguments
    /// * `pool` - SQLx connection pool for PostgreSQL
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn find_team(&self, team_id: Uuid) -> Result<Option<Team>, String> {
        let row = sqlx::query(
            r#"
            SELECT id, name, status, created_at, started_at, completed_at
            FROM teams
            WHERE id = $1
            "#,
        )
        .bind(team_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| format!("Failed to find team by id: {}", e))?;

        row.map(|r| {
            Ok(Team::from_persistence(
                column(&r, "id")?,
                column(&r, "name")?,
                column::<TeamStatus>(&r, "status")?,
                column(&r, "created_at")?,
                column(&r, "started_at")?,
                column(&r, "completed_at")?,
            ))
        })
        .transpose()
    }

    async fn tasks(&self, team_id: Uuid) -> SourceResult<Vec<Task>> {
        let rows = sqlx::query(
            r#"
            SELECT id, title, status, created_at
            FROM tasks
            WHERE team_id = $1
            ORDER BY created_at
            "#,
        )
        .bind(team_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| format!("Failed to load tasks: {}", e))?;

        rows.iter()
            .map(|r| {
                Ok(Task {
                    id: column(r, "id")?,
                    title: column(r, "title")?,
                    status: column::<String>(r, "status")?.parse()?,
                    created_at: column(r, "created_at")?,
                })
            })
            .collect()
    }

    async fn unread_messages(&self, team_id: Uuid) -> SourceResult<Vec<Message>> {
        let rows = sqlx::query(
            r#"
            SELECT id, sender, body, created_at
            FROM messages
            WHERE team_id = $1 AND read_at IS NULL
            ORDER BY created_at
            "#,
        )
        .bind(team_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| format!("Failed to load unread messages: {}", e))?;

        rows.iter()
            .map(|r| {
                Ok(Message {
                    id: column(r, "id")?,
                    sender: column(r, "sender")?,
                    body: column(r, "body")?,
                    created_at: column(r, "created_at")?,
                })
            })
            .collect()
    }

    async fn latest_artifact(&self, team_id: Uuid) -> SourceResult<Option<Artifact>> {
        let row = sqlx::query(
            r#"
            SELECT id, kind, reviewed, created_at
            FROM artifacts
            WHERE team_id = $1
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(team_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| format!("Failed to load latest artifact: {}", e))?;

        row.map(|r| {
            Ok(Artifact {
                id: column(&r, "id")?,
                kind: column(&r, "kind")?,
                reviewed: column(&r, "reviewed")?,
                created_at: column(&r, "created_at")?,
            })
        })
        .transpose()
    }

    async fn agent_memory(&self, team_id: Uuid) -> SourceResult<HashMap<AgentType, AgentMemory>> {
        let rows = sqlx::query(
            r#"
            SELECT agent_type, last_run_at, last_output, last_reviewed_artifact_id
            FROM agent_memory
            WHERE team_id = $1
            "#,
        )
        .bind(team_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| format!("Failed to load agent memory: {}", e))?;

        rows.iter()
            .map(|r| {
                let agent: AgentType = column::<String>(r, "agent_type")?.parse()?;
                let memory = AgentMemory {
                    last_run_at: column(r, "last_run_at")?,
                    last_output: column(r, "last_output")?,
                    last_reviewed_artifact_id: column(r, "last_reviewed_artifact_id")?,
                };
                Ok((agent, memory))
            })
            .collect()
    }

    async fn project_idea(&self, team_id: Uuid) -> SourceResult<Option<ProjectIdea>> {
        let row = sqlx::query(
            r#"
            SELECT id, title, active
            FROM project_ideas
            WHERE team_id = $1
            ORDER BY active DESC, created_at DESC
            LIMIT 1
            "#,
        )
        .bind(team_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| format!("Failed to load project idea: {}", e))?;

        row.map(|r| {
            Ok(ProjectIdea {
                id: column(&r, "id")?,
                title: column(&r, "title")?,
                active: column(&r, "active")?,
            })
        })
        .transpose()
    }
}

#[async_trait]
impl TeamContextRepository for PostgresTeamContextRepository {
    async fn get_team_context(&self, team_id: Uuid) -> Result<Option<TeamContext>, String> {
        let team = match self.find_team(team_id).await? {
            Some(team) => team,
            None => return Ok(None),
        };

        let (tasks, unread_messages, latest_artifact, agent_memory, project_idea) = tokio::join!(
            self.tasks(team_id),
            self.unread_messages(team_id),
            self.latest_artifact(team_id),
            self.agent_memory(team_id),
            self.project_idea(team_id),
        );

        Ok(Some(
            TeamContext::new(team)
                .with_tasks(tasks)
                .with_unread_messages(unread_messages)
                .with_latest_artifact(latest_artifact)
                .with_agent_memory(agent_memory)
                .with_project_idea(project_idea),
        ))
    }
}
