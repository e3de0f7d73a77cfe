// Domain layer: orchestration types and the repository ports they are read
// from and written to. Nothing here depends on infrastructure.

pub mod agent;
pub mod context;
pub mod decision;
pub mod events;
pub mod execution_state;
pub mod graph;
pub mod repositories;
pub mod summary;
pub mod team;
pub mod work;
