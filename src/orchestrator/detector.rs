use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::errors::{OrchestratorError, OrchestratorResult};
use crate::domain::agent::AgentType;
use crate::domain::context::{TaskStatus, TeamContext};
use crate::domain::repositories::TeamContextRepository;
use crate::domain::work::{AgentWorkStatus, WorkStatus};

/// Clears memoized per-team state
///
/// Invoked when a stopped team is started again so that nothing computed
/// before the stop leaks into the new run.
#[async_trait]
pub trait CacheInvalidator: Send + Sync {
    async fn invalidate(&self, team_id: Uuid);
}

/// Tuning for the detection heuristics
#[derive(Debug, Clone)]
pub struct DetectorSettings {
    /// Below this many pending todos the planner tops up the board
    pub min_pending_todos: usize,
    /// How long a computed status may be reused; zero disables the cache
    pub cache_ttl: Duration,
}

impl Default for DetectorSettings {
    fn default() -> Self {
        Self {
            min_pending_todos: 3,
            cache_ttl: Duration::from_secs(60),
        }
    }
}

struct CachedStatus {
    status: WorkStatus,
    cached_at: Instant,
}

/// Decides which roles have work for a team
pub struct WorkDetector {
    contexts: Arc<dyn TeamContextRepository>,
    settings: DetectorSettings,
    cache: RwLock<HashMap<Uuid, CachedStatus>>,
}

impl WorkDetector {
    pub fn new(contexts: Arc<dyn TeamContextRepository>, settings: DetectorSettings) -> Self {
        Self {
            contexts,
            settings,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Work status for every role of a team
    ///
    /// # Errors
    /// * `TeamNotFound` - The team record does not exist
    /// * `Repository` - The team record could not be read
    ///
    /// A failure reading any other source only downgrades the affected roles.
    pub async fn detect(&self, team_id: Uuid) -> OrchestratorResult<WorkStatus> {
        if let Some(status) = self.cached(team_id).await {
            tracing::debug!(%team_id, "reusing cached work status");
            return Ok(status);
        }

        let context = self
            .contexts
            .get_team_context(team_id)
            .await
            .map_err(OrchestratorError::Repository)?
            .ok_or(OrchestratorError::TeamNotFound(team_id))?;

        let status = evaluate(&context, &self.settings);

        if !self.settings.cache_ttl.is_zero() {
            self.cache.write().await.insert(
                team_id,
                CachedStatus {
                    status: status.clone(),
                    cached_at: Instant::now(),
                },
            );
        }

        Ok(status)
    }

    async fn cached(&self, team_id: Uuid) -> Option<WorkStatus> {
        let cache = self.cache.read().await;
        cache
            .get(&team_id)
            .filter(|entry| entry.cached_at.elapsed() < self.settings.cache_ttl)
            .map(|entry| entry.status.clone())
    }
}

#[async_trait]
impl CacheInvalidator for WorkDetector {
    async fn invalidate(&self, team_id: Uuid) {
        if self.cache.write().await.remove(&team_id).is_some() {
            tracing::debug!(%team_id, "work detection cache invalidated");
        }
    }
}

/// Applies the per-role heuristics to a context snapshot
pub fn evaluate(context: &TeamContext, settings: &DetectorSettings) -> WorkStatus {
    let team_id = context.team_id();
    let phase = context.phase();

    let mut status = WorkStatus::new(team_id).with_phase(phase);

    for agent in AgentType::ALL {
        let agent_status = if phase.is_terminal() {
            AgentWorkStatus::idle(format!(
                "The team is {}, so no further work is scheduled for the {}",
                phase, agent
            ))
        } else {
            match agent {
                AgentType::Planner => planner_status(context, settings.min_pending_todos),
                AgentType::Builder => builder_status(context),
                AgentType::Communicator => communicator_status(context),
                AgentType::Reviewer => reviewer_status(context),
            }
        };

        if !agent_status.has_work {
            tracing::debug!(%team_id, %agent, reason = %agent_status.reason, "no work");
        }
        status.agents.insert(agent, agent_status);
    }

    status
}

fn unreadable(agent: AgentType, source: &str, err: &str) -> AgentWorkStatus {
    tracing::warn!(%agent, source, error = %err, "context source unreadable");
    AgentWorkStatus::idle(format!(
        "The {} is standing by because the {} could not be read: {}",
        agent, source, err
    ))
}

fn planner_status(context: &TeamContext, min_pending_todos: usize) -> AgentWorkStatus {
    let idea = match &context.project_idea {
        Ok(idea) => idea,
        Err(e) => return unreadable(AgentType::Planner, "project idea", e),
    };

    let idea = match idea.as_ref().filter(|idea| idea.active) {
        Some(idea) => idea,
        None => {
            return AgentWorkStatus::work(
                10,
                "There is no active project idea yet, so the planner has to choose one \
                 before anyone else can make progress",
                vec![],
            )
        }
    };

    let tasks = match &context.tasks {
        Ok(tasks) => tasks,
        Err(e) => return unreadable(AgentType::Planner, "task board", e),
    };

    let pending = tasks.iter().filter(|t| t.status == TaskStatus::Todo).count();
    if pending < min_pending_todos {
        AgentWorkStatus::work(
            6,
            format!(
                "Only {} todo(s) remain for \"{}\", fewer than the {} needed to keep \
                 the builder busy, so the plan needs topping up",
                pending, idea.title, min_pending_todos
            ),
            vec![],
        )
    } else {
        AgentWorkStatus::idle(format!(
            "The board already holds {} pending todos for \"{}\", which is enough queued work",
            pending, idea.title
        ))
    }
}

fn builder_status(context: &TeamContext) -> AgentWorkStatus {
    let tasks = match &context.tasks {
        Ok(tasks) => tasks,
        Err(e) => return unreadable(AgentType::Builder, "task board", e),
    };

    let pending: Vec<_> = tasks
        .iter()
        .filter(|t| t.status == TaskStatus::Todo)
        .collect();
    let newest_todo = match pending.iter().map(|t| t.created_at).max() {
        Some(at) => at,
        None => {
            return AgentWorkStatus::idle(
                "No todos are pending, so there is nothing for the builder to implement",
            )
        }
    };

    let artifact = match &context.latest_artifact {
        Ok(artifact) => artifact,
        Err(e) => return unreadable(AgentType::Builder, "latest artifact", e),
    };

    match artifact {
        Some(artifact) if artifact.created_at >= newest_todo => AgentWorkStatus::idle(format!(
            "A {} artifact was already produced after the newest todo was added, \
             so the builder waits for it to be reviewed",
            artifact.kind
        )),
        _ => AgentWorkStatus::work(
            7,
            format!(
                "{} todo(s) are waiting and nothing has been built for them yet",
                pending.len()
            ),
            vec![AgentType::Planner],
        ),
    }
}

fn communicator_status(context: &TeamContext) -> AgentWorkStatus {
    let messages = match &context.unread_messages {
        Ok(messages) => messages,
        Err(e) => return unreadable(AgentType::Communicator, "inbox", e),
    };

    match messages.iter().min_by_key(|m| m.created_at) {
        None => AgentWorkStatus::idle("The inbox is empty, so nobody is waiting on a reply"),
        Some(oldest) => AgentWorkStatus::work(
            9,
            format!(
                "{} unread message(s) are waiting on a reply, the oldest from {}",
                messages.len(),
                oldest.sender
            ),
            vec![],
        ),
    }
}

fn reviewer_status(context: &TeamContext) -> AgentWorkStatus {
    let artifact = match &context.latest_artifact {
        Ok(Some(artifact)) => artifact,
        Ok(None) => {
            return AgentWorkStatus::idle("Nothing has been built yet, so there is nothing to review")
        }
        Err(e) => return unreadable(AgentType::Reviewer, "latest artifact", e),
    };

    let memory = match &context.agent_memory {
        Ok(memory) => memory,
        Err(e) => return unreadable(AgentType::Reviewer, "agent memory", e),
    };

    let already_reviewed = artifact.reviewed
        || memory
            .get(&AgentType::Reviewer)
            .and_then(|m| m.last_reviewed_artifact_id)
            == Some(artifact.id);

    if already_reviewed {
        AgentWorkStatus::idle(format!(
            "The latest {} artifact has already been reviewed",
            artifact.kind
        ))
    } else {
        AgentWorkStatus::work(
            5,
            format!(
                "A new {} artifact is waiting for its first review",
                artifact.kind
            ),
            vec![AgentType::Builder],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::context::{AgentMemory, Artifact, Message, ProjectIdea, Task};
    use crate::domain::team::{Team, TeamStatus};
    use crate::infrastructure::repositories::InMemoryTeamContextRepository;
    use chrono::{Duration as ChronoDuration, Utc};

    fn team(status: TeamStatus) -> Team {
        Team::from_persistence(
            Uuid::new_v4(),
            "Stack".to_string(),
            status,
            Utc::now(),
            None,
            None,
        )
    }

    fn todo(title: &str) -> Task {
        Task {
            id: Uuid::new_v4(),
            title: title.to_string(),
            status: TaskStatus::Todo,
            created_at: Utc::now(),
        }
    }

    fn idea() -> Option<ProjectIdea> {
        Some(ProjectIdea {
            id: Uuid::new_v4(),
            title: "Recipe app".to_string(),
            active: true,
        })
    }

    fn artifact(reviewed: bool) -> Artifact {
        Artifact {
            id: Uuid::new_v4(),
            kind: "code".to_string(),
            created_at: Utc::now(),
            reviewed,
        }
    }

    #[test]
    fn planner_has_top_priority_without_an_idea() {
        let context = TeamContext::new(team(TeamStatus::Active));
        let status = evaluate(&context, &DetectorSettings::default());

        let planner = status.get(AgentType::Planner).unwrap();
        assert!(planner.has_work);
        assert_eq!(planner.priority, 10);
        assert!(planner.reason.contains("no active project idea"));
    }

    #[test]
    fn planner_tops_up_a_thin_board() {
        let context = TeamContext::new(team(TeamStatus::Active))
            .with_project_idea(Ok(idea()))
            .with_tasks(Ok(vec![todo("one")]));

        let status = evaluate(&context, &DetectorSettings::default());
        let planner = status.get(AgentType::Planner).unwrap();

        assert!(planner.has_work);
        assert_eq!(planner.priority, 6);
        assert!(planner.reason.contains("Recipe app"));
    }

    #[test]
    fn planner_idle_when_board_is_full() {
        let context = TeamContext::new(team(TeamStatus::Active))
            .with_project_idea(Ok(idea()))
            .with_tasks(Ok(vec![todo("a"), todo("b"), todo("c")]));

        let status = evaluate(&context, &DetectorSettings::default());
        assert!(!status.get(AgentType::Planner).unwrap().has_work);
    }

    #[test]
    fn builder_works_on_pending_todos_and_depends_on_planner() {
        let context = TeamContext::new(team(TeamStatus::Active))
            .with_project_idea(Ok(idea()))
            .with_tasks(Ok(vec![todo("login page")]));

        let status = evaluate(&context, &DetectorSettings::default());
        let builder = status.get(AgentType::Builder).unwrap();

        assert!(builder.has_work);
        assert_eq!(builder.priority, 7);
        assert_eq!(builder.dependencies, vec![AgentType::Planner]);
    }

    #[test]
    fn builder_waits_when_artifact_is_newer_than_todos() {
        let mut old_todo = todo("old");
        old_todo.created_at = Utc::now() - ChronoDuration::hours(1);
        let context = TeamContext::new(team(TeamStatus::Active))
            .with_tasks(Ok(vec![old_todo]))
            .with_latest_artifact(Ok(Some(artifact(false))));

        let status = evaluate(&context, &DetectorSettings::default());
        let builder = status.get(AgentType::Builder).unwrap();

        assert!(!builder.has_work);
        assert!(builder.reason.contains("waits for it to be reviewed"));
    }

    #[test]
    fn communicator_works_on_unread_messages() {
        let context = TeamContext::new(team(TeamStatus::Active)).with_unread_messages(Ok(vec![
            Message {
                id: Uuid::new_v4(),
                sender: "mentor".to_string(),
                body: "How is it going?".to_string(),
                created_at: Utc::now(),
            },
        ]));

        let status = evaluate(&context, &DetectorSettings::default());
        let communicator = status.get(AgentType::Communicator).unwrap();

        assert!(communicator.has_work);
        assert_eq!(communicator.priority, 9);
        assert!(communicator.reason.contains("mentor"));
    }

    #[test]
    fn reviewer_works_on_unreviewed_artifact() {
        let context = TeamContext::new(team(TeamStatus::Active))
            .with_latest_artifact(Ok(Some(artifact(false))));

        let status = evaluate(&context, &DetectorSettings::default());
        let reviewer = status.get(AgentType::Reviewer).unwrap();

        assert!(reviewer.has_work);
        assert_eq!(reviewer.dependencies, vec![AgentType::Builder]);
    }

    #[test]
    fn reviewer_remembers_what_it_reviewed() {
        let latest = artifact(false);
        let mut memory = HashMap::new();
        memory.insert(
            AgentType::Reviewer,
            AgentMemory {
                last_reviewed_artifact_id: Some(latest.id),
                ..AgentMemory::default()
            },
        );
        let context = TeamContext::new(team(TeamStatus::Active))
            .with_latest_artifact(Ok(Some(latest)))
            .with_agent_memory(Ok(memory));

        let status = evaluate(&context, &DetectorSettings::default());
        assert!(!status.get(AgentType::Reviewer).unwrap().has_work);
    }

    #[test]
    fn unreadable_source_degrades_only_dependent_roles() {
        let context = TeamContext::new(team(TeamStatus::Active))
            .with_tasks(Err("connection reset".to_string()))
            .with_unread_messages(Ok(vec![Message {
                id: Uuid::new_v4(),
                sender: "judge".to_string(),
                body: "ping".to_string(),
                created_at: Utc::now(),
            }]));

        let status = evaluate(&context, &DetectorSettings::default());
        let builder = status.get(AgentType::Builder).unwrap();

        assert!(!builder.has_work);
        assert!(builder.reason.contains("could not be read: connection reset"));
        assert!(status.get(AgentType::Communicator).unwrap().has_work);
    }

    #[test]
    fn terminal_team_has_no_work() {
        let context = TeamContext::new(team(TeamStatus::Completed))
            .with_latest_artifact(Ok(Some(artifact(false))));

        let status = evaluate(&context, &DetectorSettings::default());
        assert!(status.is_idle());
        assert!(status
            .get(AgentType::Reviewer)
            .unwrap()
            .reason
            .contains("completed"));
    }

    #[tokio::test]
    async fn detect_fails_hard_for_missing_team() {
        let repo = Arc::new(InMemoryTeamContextRepository::new());
        let detector = WorkDetector::new(repo, DetectorSettings::default());
        let team_id = Uuid::new_v4();

        let result = detector.detect(team_id).await;
        assert!(matches!(result, Err(OrchestratorError::TeamNotFound(id)) if id == team_id));
    }

    #[tokio::test]
    async fn detect_reuses_cache_until_invalidated() {
        let repo = Arc::new(InMemoryTeamContextRepository::new());
        let context = TeamContext::new(team(TeamStatus::Active)).with_project_idea(Ok(idea()));
        let team_id = context.team_id();
        repo.insert(context.clone()).await;

        let detector = WorkDetector::new(repo.clone(), DetectorSettings::default());
        let first = detector.detect(team_id).await.unwrap();

        // A new unread message is not seen while the cache is fresh
        repo.insert(context.with_unread_messages(Ok(vec![Message {
            id: Uuid::new_v4(),
            sender: "mentor".to_string(),
            body: "hi".to_string(),
            created_at: Utc::now(),
        }])))
        .await;
        let cached = detector.detect(team_id).await.unwrap();
        assert_eq!(cached.computed_at, first.computed_at);

        detector.invalidate(team_id).await;
        let fresh = detector.detect(team_id).await.unwrap();
        assert!(fresh.get(AgentType::Communicator).unwrap().has_work);
    }

    #[tokio::test]
    async fn zero_ttl_disables_cache() {
        let repo = Arc::new(InMemoryTeamContextRepository::new());
        let context = TeamContext::new(team(TeamStatus::Active));
        let team_id = context.team_id();
        repo.insert(context).await;

        let detector = WorkDetector::new(
            repo,
            DetectorSettings {
                cache_ttl: Duration::ZERO,
                ..DetectorSettings::default()
            },
        );
        detector.detect(team_id).await.unwrap();

        assert!(detector.cache.read().await.is_empty());
    }
}
