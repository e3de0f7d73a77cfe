use super::value_objects::TeamStatus;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Team record as seen by the orchestrator
///
/// Represents one participant's isolated stack. The orchestrator only reads
/// it: the lifecycle phase decides whether any agent may be scheduled and
/// whether the control loop should stop.
///
/// # Example
/// ```
/// use stack_orchestrator::domain::team::{Team, TeamStatus};
/// use uuid::Uuid;
///
/// let team = Team::new(Uuid::new_v4(), "Night owls".to_string()).expect("valid team");
///
/// assert_eq!(team.name(), "Night owls");
/// assert_eq!(team.status(), TeamStatus::Pending);
/// ```
#[derive(Debug, Clone)]
pub struct Team {
    id: Uuid,
    name: String,
    status: TeamStatus,
    created_at: DateTime<Utc>,
    started_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
}

impl Team {
    /// Creates a new pending team
    ///
    /// # Returns
    /// * `Err(String)` - If the name is empty
    pub fn new(id: Uuid, name: String) -> Result<Self, String> {
        if name.trim().is_empty() {
            return Err("Team name cannot be empty".to_string());
        }

        Ok(Self {
            id,
            name,
            status: TeamStatus::Pending,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
        })
    }

    // ===== Getters =====

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the team's current lifecycle phase
    pub fn status(&self) -> TeamStatus {
        self.status
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    /// Reconstructs a Team from persistence layer data
    ///
    /// Bypasses validation since the data was validated when stored.
    /// Only to be used by repository implementations.
    pub fn from_persistence(
        id: Uuid,
        name: String,
        status: TeamStatus,
        created_at: DateTime<Utc>,
        started_at: Option<DateTime<Utc>>,
        completed_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            id,
            name,
            status,
            created_at,
            started_at,
            completed_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_team_with_valid_name() {
        let id = Uuid::new_v4();
        let team = Team::new(id, "Stack A".to_string()).unwrap();

        assert_eq!(team.id(), id);
        assert_eq!(team.status(), TeamStatus::Pending);
        assert!(team.started_at().is_none());
        assert!(team.completed_at().is_none());
    }

    #[test]
    fn create_team_with_empty_name_fails() {
        let result = Team::new(Uuid::new_v4(), "  ".to_string());
        assert!(result.unwrap_err().contains("cannot be empty"));
    }

    #[test]
    fn from_persistence_keeps_stored_phase() {
        let created_at = Utc::now();
        let team = Team::from_persistence(
            Uuid::new_v4(),
            "Stack B".to_string(),
            TeamStatus::Completed,
            created_at,
            Some(created_at),
            Some(created_at),
        );

        assert_eq!(team.status(), TeamStatus::Completed);
        assert_eq!(team.name(), "Stack B");
        assert_eq!(team.completed_at(), Some(created_at));
    }
}
