use thiserror::Error;
use uuid::Uuid;

use crate::domain::execution_state::{InvalidTransition, RunState};

/// Errors that abort a cycle or reject a control request
///
/// Everything else (an unreadable source, a failed agent, an unresolvable
/// dependency set) is absorbed into the cycle summary instead.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("Team not found: {0}")]
    TeamNotFound(Uuid),

    #[error("Invalid state transition from {from} to {to}")]
    InvalidStateTransition { from: RunState, to: RunState },

    #[error("Repository error: {0}")]
    Repository(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<InvalidTransition> for OrchestratorError {
    fn from(err: InvalidTransition) -> Self {
        OrchestratorError::InvalidStateTransition {
            from: err.from,
            to: err.to,
        }
    }
}

impl From<crate::config::ConfigError> for OrchestratorError {
    fn from(err: crate::config::ConfigError) -> Self {
        OrchestratorError::Config(err.to_string())
    }
}

pub type OrchestratorResult<T> = Result<T, OrchestratorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_transition_converts() {
        let err: OrchestratorError = InvalidTransition {
            from: RunState::Idle,
            to: RunState::Paused,
        }
        .into();

        assert_eq!(err.to_string(), "Invalid state transition from idle to paused");
    }
}
