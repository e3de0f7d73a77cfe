// Infrastructure layer module
// Persistence adapters for the orchestrator's repository ports

pub mod repositories;
