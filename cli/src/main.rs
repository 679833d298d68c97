//! Command-line runner for fleet scenarios
//!
//! ```text
//! fleet-simulator <scenario.json> [output.json]
//! ```
//!
//! Prints the run summary as JSON on stdout. When an output path is given,
//! the trace rows, step log and audit events are written there as well.
//! Log verbosity follows `RUST_LOG` (default `fleet_simulator_core_rs=info`).

use anyhow::{bail, Context, Result};
use fleet_simulator_core_rs::{Orchestrator, Scenario};
use std::fs;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("fleet_simulator_core_rs=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    init_tracing();

    let mut args = std::env::args().skip(1);
    let Some(scenario_path) = args.next().map(PathBuf::from) else {
        bail!("usage: fleet-simulator <scenario.json> [output.json]");
    };
    let output_path = args.next().map(PathBuf::from);

    let raw = fs::read_to_string(&scenario_path)
        .with_context(|| format!("reading {}", scenario_path.display()))?;
    let scenario: Scenario = serde_json::from_str(&raw)
        .with_context(|| format!("parsing {}", scenario_path.display()))?;

    let mut orchestrator = Orchestrator::from_scenario(scenario).context("loading scenario")?;
    let summary = orchestrator.run().context("running simulation")?;

    if let Some(path) = output_path {
        let output = serde_json::json!({
            "summary": &summary,
            "steps": orchestrator.step_log(),
            "trace": orchestrator.trace_rows(),
            "events": orchestrator.event_log(),
            "entities": orchestrator.entities(),
        });
        fs::write(&path, serde_json::to_string_pretty(&output)?)
            .with_context(|| format!("writing {}", path.display()))?;
        tracing::info!(path = %path.display(), "results written");
    }

    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
