//! Orchestrator - main simulation loop
//!
//! See `engine.rs` for the step loop, `scheduler.rs` for step length
//! selection and `checkpoint.rs` for save/restore.

pub mod checkpoint;
pub mod engine;
pub mod scheduler;

pub use engine::{
    Orchestrator, OrchestratorConfig, RunSummary, RunTotals, Scenario, SimulationError, StepResult,
};
pub use scheduler::{AdaptiveScheduler, StepMode, StepPlan, StepReason, StepRecord};

pub use checkpoint::{compute_config_hash, StateSnapshot, CHECKPOINT_VERSION};
