//! Fleet Simulator Core - Rust Engine
//!
//! Adaptive-step, quota-driven simulation of a fleet of entities that wear
//! out, get repaired and are retired over a day horizon.
//!
//! # Architecture
//!
//! - **core**: Simulation clock
//! - **models**: Domain types (entities, groups, store, usage index, audit log)
//! - **schedule**: Input tables (targets, usage, spawns) and the boundary calendar
//! - **lifecycle**: Per-entity state machine and repair rules
//! - **events**: Per-step notification bus
//! - **quota**: Per-group promotion / demotion decisions
//! - **spawn**: Scheduled and dynamic spawning
//! - **orchestrator**: Step loop, adaptive step selection, checkpoints
//! - **trace**: Optional per-entity trace rows
//! - **validation**: Input checks and step invariants
//!
//! # Critical Invariants
//!
//! 1. Usage values are u64 and only ever grow (overhaul usage resets on repair)
//! 2. No randomness: identical inputs produce identical runs
//! 3. Adaptive and daily stepping produce identical end states
//! 4. FFI boundary is minimal and safe

pub mod core;
pub mod events;
pub mod lifecycle;
pub mod models;
pub mod orchestrator;
pub mod quota;
pub mod schedule;
pub mod spawn;
pub mod trace;
pub mod validation;

pub use core::time::{Day, SimClock};
pub use models::{
    EntityId, EntitySnapshot, EntityState, EntityStore, Event, EventLog, GroupConfig, GroupId,
    ResourceLimits, Usage, UsagePrefixIndex,
};
pub use orchestrator::{
    Orchestrator, OrchestratorConfig, RunSummary, Scenario, SimulationError, StepMode, StepReason,
    StepResult,
};
pub use schedule::{ScenarioInputs, SpawnSchedule, TargetTable, UsageSchedule};
pub use spawn::SpawnCapacity;
pub use trace::{TraceGranularity, TraceRow};

// FFI module (when feature enabled)
#[cfg(feature = "pyo3")]
pub mod ffi;

#[cfg(feature = "pyo3")]
use pyo3::prelude::*;

#[cfg(feature = "pyo3")]
#[pymodule]
fn fleet_simulator_core_rs(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<ffi::orchestrator::PyFleetSimulator>()?;
    Ok(())
}
