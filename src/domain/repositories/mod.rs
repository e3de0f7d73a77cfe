// Repository ports
// Interfaces the orchestrator consumes; adapters live in infrastructure

pub mod cycle_summary_repository;
pub mod execution_state_repository;
pub mod team_context_repository;

pub use cycle_summary_repository::CycleSummaryRepository;
pub use execution_state_repository::ExecutionStateRepository;
pub use team_context_repository::TeamContextRepository;
