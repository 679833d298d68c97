//! Python bindings (enabled with the `pyo3` feature)
//!
//! The scenario crosses the boundary as a JSON document; results come back
//! as dictionaries or JSON strings.

pub mod orchestrator;
pub mod types;
