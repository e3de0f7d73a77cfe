use serde::{Deserialize, Serialize};

/// The roles that cooperate on a team's stack
///
/// Declaration order is the enumeration order used to break priority ties,
/// which is why `Ord` is derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentType {
    Planner,
    Builder,
    Communicator,
    Reviewer,
}

impl AgentType {
    /// Every role, in enumeration order
    pub const ALL: [AgentType; 4] = [
        AgentType::Planner,
        AgentType::Builder,
        AgentType::Communicator,
        AgentType::Reviewer,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AgentType::Planner => "planner",
            AgentType::Builder => "builder",
            AgentType::Communicator => "communicator",
            AgentType::Reviewer => "reviewer",
        }
    }
}

impl std::fmt::Display for AgentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for AgentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "planner" => Ok(AgentType::Planner),
            "builder" => Ok(AgentType::Builder),
            "communicator" => Ok(AgentType::Communicator),
            "reviewer" => Ok(AgentType::Reviewer),
            other => Err(format!("Unknown agent type: {}", other)),
        }
    }
}
