use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Run state of a team's control loop
///
/// # State Transitions
/// ```text
/// Idle ----start----> Running <---resume--- Paused
/// Stopped --start--->    |    ----pause---->   |
///    ^                   └------stop------┬----┘
///    └------------------------------------┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunState {
    Idle,
    Running,
    Paused,
    Stopped,
}

impl RunState {
    /// Checks if moving from this state to `next` is a legal edge
    ///
    /// # Example
    /// ```
    /// use stack_orchestrator::domain::execution_state::RunState;
    ///
    /// assert!(RunState::Idle.can_transition_to(RunState::Running));
    /// assert!(!RunState::Idle.can_transition_to(RunState::Paused));
    /// ```
    pub fn can_transition_to(&self, next: RunState) -> bool {
        use RunState::*;
        matches!(
            (self, next),
            (Idle, Running)
                | (Stopped, Running)
                | (Running, Paused)
                | (Paused, Running)
                | (Running, Stopped)
                | (Paused, Stopped)
        )
    }
}

impl std::fmt::Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunState::Idle => write!(f, "idle"),
            RunState::Running => write!(f, "running"),
            RunState::Paused => write!(f, "paused"),
            RunState::Stopped => write!(f, "stopped"),
        }
    }
}

impl std::str::FromStr for RunState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "idle" => Ok(RunState::Idle),
            "running" => Ok(RunState::Running),
            "paused" => Ok(RunState::Paused),
            "stopped" => Ok(RunState::Stopped),
            other => Err(format!("Unknown run state: {}", other)),
        }
    }
}

/// A requested transition that is not an edge of the state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Invalid state transition from {from} to {to}")]
pub struct InvalidTransition {
    pub from: RunState,
    pub to: RunState,
}

/// Record of a transition that was applied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateTransition {
    pub from: RunState,
    pub to: RunState,
    /// Set when `start` followed a `stop` and counters were cleared
    pub reset: bool,
}

/// Persisted run state of one team
///
/// The only mutable record shared across cycles. Writers use
/// read-modify-write and the last writer wins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionState {
    pub team_id: Uuid,
    pub state: RunState,
    pub started_at: Option<DateTime<Utc>>,
    pub paused_at: Option<DateTime<Utc>>,
    pub stopped_at: Option<DateTime<Utc>>,
    pub last_activity_at: Option<DateTime<Utc>>,
    pub total_cycles: u32,
    /// Identifies the driver loop currently attached to this team
    pub driver_id: Option<Uuid>,
}

impl ExecutionState {
    /// A freshly created, idle state
    pub fn new(team_id: Uuid) -> Self {
        Self {
            team_id,
            state: RunState::Idle,
            started_at: None,
            paused_at: None,
            stopped_at: None,
            last_activity_at: None,
            total_cycles: 0,
            driver_id: None,
        }
    }

    fn check(&self, next: RunState) -> Result<(), InvalidTransition> {
        if self.state.can_transition_to(next) {
            Ok(())
        } else {
            Err(InvalidTransition {
                from: self.state,
                to: next,
            })
        }
    }

    /// idle|stopped -> running
    ///
    /// Restarting from `stopped` resets the cycle count; the caller is
    /// responsible for invalidating cached detection results when
    /// `reset` is set on the returned transition.
    pub fn start(&mut self, driver_id: Uuid, now: DateTime<Utc>) -> Result<StateTransition, InvalidTransition> {
        if !matches!(self.state, RunState::Idle | RunState::Stopped) {
            return Err(InvalidTransition {
                from: self.state,
                to: RunState::Running,
            });
        }

        let from = self.state;
        let reset = from == RunState::Stopped;
        if reset {
            self.total_cycles = 0;
            self.stopped_at = None;
        }

        self.state = RunState::Running;
        self.started_at = Some(now);
        self.paused_at = None;
        self.driver_id = Some(driver_id);

        Ok(StateTransition {
            from,
            to: RunState::Running,
            reset,
        })
    }

    /// running -> paused
    pub fn pause(&mut self, now: DateTime<Utc>) -> Result<StateTransition, InvalidTransition> {
        self.check(RunState::Paused)?;

        let from = self.state;
        self.state = RunState::Paused;
        self.paused_at = Some(now);

        Ok(StateTransition {
            from,
            to: RunState::Paused,
            reset: false,
        })
    }

    /// paused -> running, keeping counters
    pub fn resume(&mut self) -> Result<StateTransition, InvalidTransition> {
        if self.state != RunState::Paused {
            return Err(InvalidTransition {
                from: self.state,
                to: RunState::Running,
            });
        }

        self.state = RunState::Running;
        self.paused_at = None;

        Ok(StateTransition {
            from: RunState::Paused,
            to: RunState::Running,
            reset: false,
        })
    }

    /// running|paused -> stopped, detaching the driver
    pub fn stop(&mut self, now: DateTime<Utc>) -> Result<StateTransition, InvalidTransition> {
        self.check(RunState::Stopped)?;

        let from = self.state;
        self.state = RunState::Stopped;
        self.stopped_at = Some(now);
        self.paused_at = None;
        self.driver_id = None;

        Ok(StateTransition {
            from,
            to: RunState::Stopped,
            reset: false,
        })
    }

    /// Counts a finished cycle
    pub fn record_cycle(&mut self, now: DateTime<Utc>) {
        self.total_cycles += 1;
        self.last_activity_at = Some(now);
    }

    pub fn is_running(&self) -> bool {
        self.state == RunState::Running
    }
}
