use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecisionAction {
    Continue,
    Pause,
    Stop,
}

impl std::fmt::Display for DecisionAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DecisionAction::Continue => write!(f, "continue"),
            DecisionAction::Pause => write!(f, "pause"),
            DecisionAction::Stop => write!(f, "stop"),
        }
    }
}

/// What the control loop should do after a cycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrchestratorDecision {
    pub action: DecisionAction,
    /// Only set for `pause`
    pub duration_ms: Option<u64>,
    pub reason: String,
    pub next_poll_time: Option<DateTime<Utc>>,
}

impl OrchestratorDecision {
    pub fn continue_now(reason: impl Into<String>) -> Self {
        Self {
            action: DecisionAction::Continue,
            duration_ms: None,
            reason: reason.into(),
            next_poll_time: None,
        }
    }

    pub fn pause_for(duration_ms: u64, reason: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            action: DecisionAction::Pause,
            duration_ms: Some(duration_ms),
            reason: reason.into(),
            next_poll_time: Some(now + chrono::Duration::milliseconds(duration_ms as i64)),
        }
    }

    pub fn stop(reason: impl Into<String>) -> Self {
        Self {
            action: DecisionAction::Stop,
            duration_ms: None,
            reason: reason.into(),
            next_poll_time: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pause_sets_next_poll_time() {
        let now = Utc::now();
        let decision = OrchestratorDecision::pause_for(30_000, "idle", now);

        assert_eq!(decision.action, DecisionAction::Pause);
        assert_eq!(decision.duration_ms, Some(30_000));
        assert_eq!(
            decision.next_poll_time,
            Some(now + chrono::Duration::seconds(30))
        );
    }

    #[test]
    fn continue_and_stop_have_no_delay() {
        assert!(OrchestratorDecision::continue_now("busy").duration_ms.is_none());
        assert!(OrchestratorDecision::stop("done").next_poll_time.is_none());
    }
}
