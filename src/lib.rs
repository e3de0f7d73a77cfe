//! Stack Orchestrator Library
//!
//! Coordinates the planner, builder, communicator and reviewer agents of a
//! team: work detection, wave scheduling, concurrent execution and the
//! run-state machine that gates the control loop.

pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod orchestrator;
