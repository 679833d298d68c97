//! Conversions between Python values and simulation types

use pyo3::exceptions::{PyRuntimeError, PyValueError};
use pyo3::prelude::*;
use pyo3::types::PyDict;
use serde::Serialize;

use crate::orchestrator::{RunSummary, Scenario, SimulationError, StepResult};

/// Map a simulation error onto a Python exception
///
/// Input problems become `ValueError`, everything else `RuntimeError`.
pub fn to_py_err(err: SimulationError) -> PyErr {
    match err {
        SimulationError::InvalidConfig(_)
        | SimulationError::InvalidInput(_)
        | SimulationError::Schedule(_)
        | SimulationError::SerializationError(_)
        | SimulationError::ConfigMismatch { .. } => PyValueError::new_err(err.to_string()),
        other => PyRuntimeError::new_err(other.to_string()),
    }
}

/// Parse a scenario document
pub fn parse_scenario(json: &str) -> PyResult<Scenario> {
    serde_json::from_str(json)
        .map_err(|e| PyValueError::new_err(format!("Invalid scenario JSON: {}", e)))
}

/// Serialize any result type to a JSON string
pub fn to_json<T: Serialize>(value: &T) -> PyResult<String> {
    serde_json::to_string(value)
        .map_err(|e| PyRuntimeError::new_err(format!("Serialization failed: {}", e)))
}

/// Convert a step result to a Python dict
pub fn step_result_to_py(py: Python, result: &StepResult) -> PyResult<Py<PyDict>> {
    let dict = PyDict::new_bound(py);
    dict.set_item("step", result.step)?;
    dict.set_item("day", result.day)?;
    dict.set_item("length", result.length)?;
    dict.set_item("reason", result.reason.map(|r| r.label()))?;
    dict.set_item("spawned", result.spawned)?;
    dict.set_item("exits", result.exits)?;
    dict.set_item("repairs_completed", result.repairs_completed)?;
    dict.set_item("repairs_admitted", result.repairs_admitted)?;
    dict.set_item("demotions", result.demotions)?;
    dict.set_item("promotions", result.promotions)?;
    dict.set_item("shortfall", result.shortfall)?;
    dict.set_item("operations", result.operations)?;
    dict.set_item("usage", result.usage)?;
    Ok(dict.into())
}

/// Convert a run summary to a Python dict
pub fn summary_to_py(py: Python, summary: &RunSummary) -> PyResult<Py<PyDict>> {
    let dict = PyDict::new_bound(py);
    dict.set_item("run_id", summary.run_id.to_string())?;
    dict.set_item("steps", summary.steps)?;
    dict.set_item("final_day", summary.final_day)?;
    dict.set_item("horizon_days", summary.horizon_days)?;
    dict.set_item("reasons", summary.reasons.clone())?;
    dict.set_item("shortfall_days", summary.shortfall_days)?;
    dict.set_item("spawned", summary.spawned)?;
    dict.set_item("dropped_spawns", summary.dropped_spawns)?;
    dict.set_item("promotions", summary.promotions)?;
    dict.set_item("demotions", summary.demotions)?;
    dict.set_item("states", summary.states.clone())?;
    Ok(dict.into())
}
