use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use super::agent::AgentType;
use super::team::{Team, TeamStatus};

/// Outcome of reading one data source for a team
///
/// Each source is read independently so that one unreadable source only
/// degrades the roles that depend on it.
pub type SourceResult<T> = Result<T, String>;

/// Status of a task on the team's board
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Todo,
    InProgress,
    Done,
}

impl std::str::FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "todo" => Ok(TaskStatus::Todo),
            "in_progress" => Ok(TaskStatus::InProgress),
            "done" => Ok(TaskStatus::Done),
            other => Err(format!("Unknown task status: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: Uuid,
    pub title: String,
    pub status: TaskStatus,
    pub created_at: DateTime<Utc>,
}

/// An unread message addressed to the team
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub sender: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

/// Something the builder produced
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Artifact {
    pub id: Uuid,
    pub kind: String,
    pub created_at: DateTime<Utc>,
    pub reviewed: bool,
}

/// What an agent remembers from its previous runs
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentMemory {
    pub last_run_at: Option<DateTime<Utc>>,
    pub last_output: Option<String>,
    pub last_reviewed_artifact_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectIdea {
    pub id: Uuid,
    pub title: String,
    pub active: bool,
}

/// Read-only snapshot of everything the work detector looks at
#[derive(Debug, Clone)]
pub struct TeamContext {
    pub team: Team,
    pub tasks: SourceResult<Vec<Task>>,
    pub unread_messages: SourceResult<Vec<Message>>,
    pub latest_artifact: SourceResult<Option<Artifact>>,
    pub agent_memory: SourceResult<HashMap<AgentType, AgentMemory>>,
    pub project_idea: SourceResult<Option<ProjectIdea>>,
}

impl TeamContext {
    /// Context for a team with every source readable and empty
    pub fn new(team: Team) -> Self {
        Self {
            team,
            tasks: Ok(Vec::new()),
            unread_messages: Ok(Vec::new()),
            latest_artifact: Ok(None),
            agent_memory: Ok(HashMap::new()),
            project_idea: Ok(None),
        }
    }

    pub fn team_id(&self) -> Uuid {
        self.team.id()
    }

    /// The team's lifecycle phase
    pub fn phase(&self) -> TeamStatus {
        self.team.status()
    }

    pub fn with_tasks(mut self, tasks: SourceResult<Vec<Task>>) -> Self {
        self.tasks = tasks;
        self
    }

    pub fn with_unread_messages(mut self, messages: SourceResult<Vec<Message>>) -> Self {
        self.unread_messages = messages;
        self
    }

    pub fn with_latest_artifact(mut self, artifact: SourceResult<Option<Artifact>>) -> Self {
        self.latest_artifact = artifact;
        self
    }

    pub fn with_agent_memory(
        mut self,
        memory: SourceResult<HashMap<AgentType, AgentMemory>>,
    ) -> Self {
        self.agent_memory = memory;
        self
    }

    pub fn with_project_idea(mut self, idea: SourceResult<Option<ProjectIdea>>) -> Self {
        self.project_idea = idea;
        self
    }
}
