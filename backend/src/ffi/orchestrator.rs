//! PyO3 wrapper for Orchestrator
//!
//! This module provides the Python interface to the Rust orchestrator.

use pyo3::prelude::*;
use pyo3::types::PyDict;

use super::types::{parse_scenario, step_result_to_py, summary_to_py, to_json, to_py_err};
use crate::orchestrator::Orchestrator as RustOrchestrator;

/// Python wrapper for Rust Orchestrator
///
/// # Example (from Python)
///
/// ```python
/// from fleet_simulator_core_rs import FleetSimulator
///
/// sim = FleetSimulator(open("scenario.json").read())
/// summary = sim.run()
/// print(summary["shortfall_days"], sim.trace_json()[:80])
/// ```
#[pyclass(name = "FleetSimulator")]
pub struct PyFleetSimulator {
    inner: RustOrchestrator,
}

#[pymethods]
impl PyFleetSimulator {
    /// Create a simulator from a scenario JSON document
    ///
    /// Raises ValueError when the document or its tables are invalid.
    #[new]
    fn new(scenario_json: &str) -> PyResult<Self> {
        let scenario = parse_scenario(scenario_json)?;
        let inner = RustOrchestrator::from_scenario(scenario).map_err(to_py_err)?;
        Ok(Self { inner })
    }

    /// Restore a simulator from `save_state` output
    #[staticmethod]
    fn load_state(scenario_json: &str, state_json: &str) -> PyResult<Self> {
        let scenario = parse_scenario(scenario_json)?;
        let inner = RustOrchestrator::load_state(scenario.config, scenario.inputs, state_json)
            .map_err(to_py_err)?;
        Ok(Self { inner })
    }

    /// Execute one step and return its result
    fn step(&mut self, py: Python) -> PyResult<Py<PyDict>> {
        let result = self.inner.step().map_err(to_py_err)?;
        step_result_to_py(py, &result)
    }

    /// Run to the horizon and return the summary
    fn run(&mut self, py: Python) -> PyResult<Py<PyDict>> {
        let summary = self.inner.run().map_err(to_py_err)?;
        summary_to_py(py, &summary)
    }

    fn current_day(&self) -> u32 {
        self.inner.current_day()
    }

    fn is_finished(&self) -> bool {
        self.inner.is_finished()
    }

    fn summary(&self, py: Python) -> PyResult<Py<PyDict>> {
        summary_to_py(py, &self.inner.summary())
    }

    /// Entity rows ordered by id, as JSON
    fn entities_json(&self) -> PyResult<String> {
        to_json(&self.inner.entities())
    }

    /// Recorded trace rows, as JSON
    fn trace_json(&self) -> PyResult<String> {
        to_json(&self.inner.trace_rows())
    }

    /// Audit event log, as JSON
    fn events_json(&self) -> PyResult<String> {
        to_json(self.inner.event_log())
    }

    fn step_log_json(&self) -> PyResult<String> {
        to_json(&self.inner.step_log())
    }

    fn save_state(&self) -> PyResult<String> {
        self.inner.save_state().map_err(to_py_err)
    }
}
