use serde::{Deserialize, Serialize};

/// Lifecycle phase of a team's stack
///
/// Owned by the system that manages teams; the orchestrator only reads it.
/// Completed, failed and archived teams get no further agent runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "team_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TeamStatus {
    Pending,
    Planning,
    Active,
    Completed,
    Failed,
    Archived,
}

impl TeamStatus {
    /// Whether the team has reached the end of its lifecycle
    ///
    /// No agent is scheduled for a terminal team and the controller stops
    /// the loop as soon as it observes one.
    ///
    /// # Example
    /// ```
    /// use stack_orchestrator::domain::team::TeamStatus;
    ///
    /// assert!(TeamStatus::Archived.is_terminal());
    /// assert!(!TeamStatus::Planning.is_terminal());
    /// ```
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TeamStatus::Completed | TeamStatus::Failed | TeamStatus::Archived
        )
    }
}

impl std::fmt::Display for TeamStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let phase = match self {
            TeamStatus::Pending => "pending",
            TeamStatus::Planning => "planning",
            TeamStatus::Active => "active",
            TeamStatus::Completed => "completed",
            TeamStatus::Failed => "failed",
            TeamStatus::Archived => "archived",
        };
        f.write_str(phase)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_phases() {
        assert!(TeamStatus::Completed.is_terminal());
        assert!(TeamStatus::Failed.is_terminal());
        assert!(TeamStatus::Archived.is_terminal());
        assert!(!TeamStatus::Pending.is_terminal());
        assert!(!TeamStatus::Active.is_terminal());
    }

    #[test]
    fn phase_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&TeamStatus::Active).unwrap(),
            "\"active\""
        );
        assert_eq!(TeamStatus::Archived.to_string(), "archived");
    }
}
