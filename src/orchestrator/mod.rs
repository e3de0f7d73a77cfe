// Orchestration core
//
// Detects which agents have work, builds and schedules the execution graph,
// runs it in waves and decides whether the team's control loop continues.

pub mod agent_executor;
pub mod controller;
pub mod detector;
pub mod driver;
pub mod errors;
pub mod executor;
pub mod graph_builder;
pub mod observer;
pub mod scheduler;
pub mod state_machine;

// Re-export main types
pub use agent_executor::{AgentExecutor, CommandAgentExecutor};
pub use controller::{CycleController, CycleRequest, DecisionPolicy};
pub use detector::{CacheInvalidator, DetectorSettings, WorkDetector};
pub use driver::{DriverSettings, TeamDriver};
pub use errors::{OrchestratorError, OrchestratorResult};
pub use executor::WaveExecutor;
pub use observer::{BroadcastObserver, FanoutObserver, OrchestrationObserver, TracingObserver};
pub use scheduler::{compute_waves, WavePlan};
pub use state_machine::ExecutionStateMachine;
