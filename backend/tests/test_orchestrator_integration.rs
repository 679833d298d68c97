//! Integration tests for the orchestrator step loop
//!
//! A mixed two-group fleet exercising every lifecycle path is run in
//! adaptive and daily mode; both must end in exactly the same state.

use fleet_simulator_core_rs::models::{
    EntitySnapshot, EntityState, Event, GroupConfig, RepairBasis, ResourceLimits,
};
use fleet_simulator_core_rs::orchestrator::{
    Orchestrator, OrchestratorConfig, SimulationError, StepMode,
};
use fleet_simulator_core_rs::schedule::{
    ScenarioInputs, ScheduleError, SpawnSchedule, TargetTable, UsageSchedule,
};
use fleet_simulator_core_rs::trace::{TraceGranularity, TraceRow};

// ============================================================================
// Test Helpers
// ============================================================================

const HORIZON: u32 = 60;

fn groups() -> Vec<GroupConfig> {
    vec![
        GroupConfig::new(1, 7)
            .with_repair_lines(2)
            .with_waiver(150)
            .with_spawn_profile(ResourceLimits::new(4_000, 600, 900)),
        GroupConfig::new(2, 5)
            .with_repair_basis(RepairBasis::Lifetime)
            .with_spawn_profile(ResourceLimits::new(2_000, 700, 1_500))
            .with_dynamic_spawn(40),
    ]
}

fn entity(id: u32, group: u16, state: EntityState, manufacture: i64) -> EntitySnapshot {
    let limits = if group == 1 {
        ResourceLimits::new(5_000, 600, 900)
    } else {
        ResourceLimits::new(4_000, 700, 1_500)
    };
    EntitySnapshot::new(id, group, state, manufacture).with_limits(limits)
}

fn fleet() -> Vec<EntitySnapshot> {
    use EntityState::*;
    vec![
        entity(1, 1, Operations, 10).with_usage(1_000, 100),
        entity(2, 1, Operations, 20)
            .with_limits(ResourceLimits::new(3_000, 400, 900))
            .with_usage(2_800, 0),
        entity(3, 1, Operations, 30).with_limits(ResourceLimits::new(6_000, 800, 0)),
        entity(4, 1, Serviceable, 40),
        entity(5, 1, Reserve, 50),
        entity(6, 1, Unserviceable, 5).with_usage(2_000, 100),
        entity(7, 1, Unserviceable, 6).with_usage(2_000, 600),
        entity(8, 1, Repair, 7).with_usage(2_500, 600).with_repair(7, 3),
        entity(9, 1, Inactive, 8).with_usage(1_500, 550).with_repair(12, 2),
        entity(10, 1, Storage, 9).with_usage(5_000, 0),
        entity(11, 2, Operations, 1).with_usage(1_000, 0),
        entity(12, 2, Operations, 2).with_usage(100, 0),
        entity(13, 2, Serviceable, 3),
    ]
}

fn piecewise(segments: &[(u32, u32)]) -> Vec<u32> {
    let mut row = Vec::new();
    for &(until, value) in segments {
        row.resize(until as usize, value);
    }
    row
}

fn inputs() -> ScenarioInputs {
    let group_one: Vec<u64> = (0..HORIZON as u64).map(|d| 20 + (d * 37 % 11) * 10).collect();
    let group_two: Vec<u64> = (0..HORIZON as u64).map(|d| 50 + (d % 7) * 15).collect();
    let idle_days: Vec<u64> = (0..HORIZON as u64).map(|d| if d % 2 == 0 { 0 } else { 200 }).collect();

    ScenarioInputs {
        entities: fleet(),
        targets: TargetTable::new()
            .with_row(1, piecewise(&[(15, 4), (30, 2), (HORIZON, 5)]))
            .with_row(2, piecewise(&[(40, 2), (HORIZON, 3)])),
        usage: UsageSchedule::new()
            .with_group_row(1, group_one)
            .with_group_row(2, group_two)
            .with_entity_row(3, idle_days),
        spawns: SpawnSchedule::new().with_spawn(1, 20, 2, HORIZON),
    }
}

fn run(mode: StepMode, trace: TraceGranularity) -> Orchestrator {
    let config = OrchestratorConfig::new(HORIZON, groups())
        .with_step_mode(mode)
        .with_trace(trace)
        .with_invariant_checks();
    let mut orch = Orchestrator::new(config, inputs()).unwrap();
    orch.run().unwrap();
    orch
}

/// Audit events that do not depend on step granularity
fn state_events(orch: &Orchestrator) -> Vec<Event> {
    orch.event_log()
        .events()
        .iter()
        .filter(|event| !matches!(event, Event::StepAdvanced { .. } | Event::Shortfall { .. }))
        .cloned()
        .collect()
}

fn without_run_id(rows: &[TraceRow]) -> Vec<TraceRow> {
    rows.iter()
        .map(|row| TraceRow {
            run_id: uuid::Uuid::nil(),
            ..row.clone()
        })
        .collect()
}

// ============================================================================
// Equivalence and determinism
// ============================================================================

#[test]
fn test_adaptive_matches_daily() {
    let adaptive = run(StepMode::Adaptive, TraceGranularity::Off);
    let daily = run(StepMode::Daily, TraceGranularity::Off);

    assert_eq!(adaptive.entities(), daily.entities());
    assert_eq!(state_events(&adaptive), state_events(&daily));

    let a = adaptive.summary();
    let d = daily.summary();
    assert_eq!(a.shortfall_days, d.shortfall_days);
    assert_eq!(a.spawned, d.spawned);
    assert_eq!(a.promotions, d.promotions);
    assert_eq!(a.demotions, d.demotions);
    assert_eq!(a.states, d.states);

    assert_eq!(d.steps, HORIZON as usize);
    assert!(a.steps < d.steps, "adaptive took {} steps", a.steps);
}

#[test]
fn test_every_day_trace_matches_daily() {
    let adaptive = run(StepMode::Adaptive, TraceGranularity::EveryDay);
    let daily = run(StepMode::Daily, TraceGranularity::EveryDay);

    let rows = without_run_id(adaptive.trace_rows());
    assert_eq!(rows, without_run_id(daily.trace_rows()));

    // One row per entity per day
    let first_day = rows.iter().filter(|row| row.day == 0).count();
    assert_eq!(first_day, fleet().len());
    assert_eq!(rows.last().map(|row| row.day), Some(HORIZON - 1));
}

#[test]
fn test_step_boundary_trace_has_one_block_per_step() {
    let orch = run(StepMode::Adaptive, TraceGranularity::StepBoundaries);

    let mut days: Vec<u32> = orch.trace_rows().iter().map(|row| row.day).collect();
    days.dedup();
    let boundaries: Vec<u32> = orch.step_log().iter().map(|record| record.day).collect();
    assert_eq!(days, boundaries);
    assert!(orch.trace_rows().iter().all(|row| row.run_id == orch.run_id()));
}

#[test]
fn test_repeated_runs_are_identical() {
    let first = run(StepMode::Adaptive, TraceGranularity::Off);
    let second = run(StepMode::Adaptive, TraceGranularity::Off);

    assert_eq!(first.entities(), second.entities());
    assert_eq!(first.event_log().events(), second.event_log().events());
    assert_eq!(first.step_log(), second.step_log());
    assert_ne!(first.run_id(), second.run_id());
}

#[test]
fn test_loaded_limiter_dates_are_recomputed() {
    const DAYS: u32 = 30;
    let limits = ResourceLimits::new(1_000, 500, 800);
    let mut operating = EntitySnapshot::new(1, 1, EntityState::Operations, 0).with_limits(limits);
    operating.limiter_date = Some(25);
    let mut standby = EntitySnapshot::new(2, 1, EntityState::Serviceable, 1).with_limits(limits);
    standby.limiter_date = Some(3);

    let build = |mode| {
        let inputs = ScenarioInputs {
            entities: vec![operating.clone(), standby.clone()],
            targets: TargetTable::new().with_constant(1, 1, DAYS),
            usage: UsageSchedule::new().with_group_constant(1, 100, DAYS),
            spawns: SpawnSchedule::new(),
        };
        let config = OrchestratorConfig::new(DAYS, vec![GroupConfig::new(1, 7)])
            .with_step_mode(mode)
            .with_invariant_checks();
        Orchestrator::new(config, inputs).unwrap()
    };

    let fresh = build(StepMode::Adaptive);
    assert_eq!(fresh.entity(1).unwrap().limiter_date, Some(5));
    assert_eq!(fresh.entity(2).unwrap().limiter_date, None);

    let mut adaptive = build(StepMode::Adaptive);
    let mut daily = build(StepMode::Daily);
    adaptive.run().unwrap();
    daily.run().unwrap();

    assert_eq!(adaptive.entities(), daily.entities());
    assert_eq!(state_events(&adaptive), state_events(&daily));

    let first_exit = adaptive
        .event_log()
        .events_for_entity(1)
        .into_iter()
        .find(|event| matches!(event, Event::Exhausted { .. }))
        .cloned();
    assert!(matches!(
        first_exit,
        Some(Event::Exhausted { day: 5, to: EntityState::Unserviceable, .. })
    ));
}

// ============================================================================
// Accounting
// ============================================================================

#[test]
fn test_usage_accounting_is_exact() {
    let config = OrchestratorConfig::new(HORIZON, groups()).with_invariant_checks();
    let mut orch = Orchestrator::new(config, inputs()).unwrap();
    let initial: u64 = fleet().iter().map(|row| row.lifetime_usage).sum();

    let mut accrued = 0;
    let mut days = 0;
    while !orch.is_finished() {
        let result = orch.step().unwrap();
        accrued += result.usage;
        days += result.length;
    }

    let fin: u64 = orch.entities().iter().map(|row| row.lifetime_usage).sum();
    assert_eq!(fin - initial, accrued);
    assert_eq!(days, HORIZON);
}

#[test]
fn test_lifetime_usage_never_decreases() {
    let orch = run(StepMode::Adaptive, TraceGranularity::EveryDay);

    let mut rows = orch.trace_rows().to_vec();
    rows.sort_by_key(|row| (row.entity_id, row.day));
    for pair in rows.windows(2) {
        if pair[0].entity_id == pair[1].entity_id {
            assert!(pair[1].lifetime_usage >= pair[0].lifetime_usage);
        }
    }
}

#[test]
fn test_headcount_never_exceeds_target() {
    let config = OrchestratorConfig::new(HORIZON, groups());
    let mut orch = Orchestrator::new(config, inputs()).unwrap();
    let targets = inputs().targets;

    while !orch.is_finished() {
        let result = orch.step().unwrap();
        for group in [1, 2] {
            let target = targets.target(group, result.day);
            let operations = orch.operations_count(group) as u32;
            assert!(operations <= target, "group {group} day {}", result.day);

            let logged = orch
                .event_log()
                .events_at_day(result.day)
                .into_iter()
                .find_map(|event| match *event {
                    Event::Shortfall {
                        group: g,
                        shortfall,
                        ..
                    } if g == group => Some(shortfall),
                    _ => None,
                })
                .unwrap_or(0);
            assert_eq!(operations + logged, target, "group {group} day {}", result.day);
        }
    }
}

#[test]
fn test_storage_entities_never_leave() {
    let orch = run(StepMode::Adaptive, TraceGranularity::Off);
    assert_eq!(orch.entity(10).unwrap().state, EntityState::Storage);
    assert!(orch
        .event_log()
        .events_for_entity(10)
        .is_empty());
}

#[test]
fn test_summary_reason_counts_cover_every_step() {
    let orch = run(StepMode::Adaptive, TraceGranularity::Off);
    let summary = orch.summary();

    assert_eq!(summary.reasons.values().sum::<usize>(), summary.steps);
    assert_eq!(summary.final_day, HORIZON);
    let total: usize = summary.states.values().flat_map(|states| states.values()).sum();
    assert_eq!(total, orch.store().len());
}

// ============================================================================
// Errors
// ============================================================================

#[test]
fn test_step_after_horizon_fails() {
    let mut orch = run(StepMode::Adaptive, TraceGranularity::Off);
    assert_eq!(orch.step().unwrap_err(), SimulationError::HorizonReached(HORIZON));
}

#[test]
fn test_step_cap_stops_run() {
    let config = OrchestratorConfig::new(HORIZON, groups()).with_max_steps(3);
    let mut orch = Orchestrator::new(config, inputs()).unwrap();

    let summary = orch.run().unwrap();
    assert_eq!(summary.steps, 3);
    assert!(summary.final_day < HORIZON);
    assert_eq!(orch.step().unwrap_err(), SimulationError::StepCapReached(3));
}

#[test]
fn test_missing_target_row_is_rejected() {
    let mut scenario = inputs();
    scenario.targets = TargetTable::new().with_constant(1, 4, HORIZON);

    let err = Orchestrator::new(OrchestratorConfig::new(HORIZON, groups()), scenario)
        .err()
        .unwrap();
    assert_eq!(err, SimulationError::Schedule(ScheduleError::MissingTargets(2)));
}

#[test]
fn test_short_usage_row_is_rejected() {
    let mut scenario = inputs();
    scenario.usage = scenario.usage.with_group_row(2, vec![10; 5]);

    let err = Orchestrator::new(OrchestratorConfig::new(HORIZON, groups()), scenario)
        .err()
        .unwrap();
    assert!(matches!(
        err,
        SimulationError::Schedule(ScheduleError::Arity { actual: 5, .. })
    ));
}

#[test]
fn test_zero_horizon_is_rejected() {
    let scenario = ScenarioInputs::default();
    let err = Orchestrator::new(OrchestratorConfig::new(0, groups()), scenario)
        .err()
        .unwrap();
    assert!(matches!(err, SimulationError::InvalidConfig(_)));
}

#[test]
fn test_scenario_document_roundtrip() {
    let scenario = fleet_simulator_core_rs::Scenario {
        config: OrchestratorConfig::new(HORIZON, groups()),
        inputs: inputs(),
    };
    let json = serde_json::to_string(&scenario).unwrap();
    let parsed: fleet_simulator_core_rs::Scenario = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, scenario);

    let mut orch = Orchestrator::from_scenario(parsed).unwrap();
    assert_eq!(orch.run().unwrap().final_day, HORIZON);
}

#[test]
fn test_demo_scenario_runs_to_horizon() {
    let scenario: fleet_simulator_core_rs::Scenario =
        serde_json::from_str(include_str!("../../demos/scenario_small.json")).unwrap();
    let horizon = scenario.config.horizon_days;

    let mut orch = Orchestrator::from_scenario(scenario).unwrap();
    let summary = orch.run().unwrap();

    assert_eq!(summary.final_day, horizon);
    assert!(summary.steps < horizon as usize);
    assert!(!orch.trace_rows().is_empty());
}
