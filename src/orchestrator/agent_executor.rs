use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use uuid::Uuid;

use crate::domain::agent::AgentType;

/// Runs one agent role for a team
///
/// The agent's reasoning is opaque to the orchestrator: it yields the
/// agent's text output or a failure description. Implementations bound
/// their own calls with a timeout; the orchestrator never cancels a call
/// in flight.
#[async_trait]
pub trait AgentExecutor: Send + Sync {
    async fn execute_agent(&self, agent_type: AgentType, team_id: Uuid) -> Result<String, String>;
}

/// Runs agents as an external program: `<program> <role> <team id>`
///
/// Trimmed stdout is the agent output. A non-zero exit, a spawn error or
/// the timeout elapsing all count as failures.
#[derive(Debug, Clone)]
pub struct CommandAgentExecutor {
    program: String,
    timeout: Duration,
}

impl CommandAgentExecutor {
    pub fn new(program: impl Into<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }
}

#[async_trait]
impl AgentExecutor for CommandAgentExecutor {
    async fn execute_agent(&self, agent_type: AgentType, team_id: Uuid) -> Result<String, String> {
        let mut command = Command::new(&self.program);
        command
            .arg(agent_type.as_str())
            .arg(team_id.to_string())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        tracing::debug!(program = %self.program, %agent_type, %team_id, "spawning agent");

        let output = tokio::time::timeout(self.timeout, command.output())
            .await
            .map_err(|_| {
                format!(
                    "{} agent timed out after {}s",
                    agent_type,
                    self.timeout.as_secs()
                )
            })?
            .map_err(|e| format!("Failed to spawn {} agent: {}", agent_type, e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(format!(
                "{} agent exited with {}: {}",
                agent_type,
                output.status,
                stderr.trim()
            ));
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}
