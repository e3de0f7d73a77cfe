// Team record and its lifecycle phase, read-only to the orchestrator

#![allow(clippy::module_inception)]

pub mod team;
pub mod value_objects;

pub use team::Team;
pub use value_objects::TeamStatus;
