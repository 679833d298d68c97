//! Lifecycle tests driven through the orchestrator
//!
//! Covers exhaustion routing (repair vs storage), repair lines, the repair
//! waiver and Inactive restoration.

use fleet_simulator_core_rs::models::{
    EntitySnapshot, EntityState, Event, ExhaustedLimit, GroupConfig, RepairBasis, ResourceLimits,
};
use fleet_simulator_core_rs::orchestrator::{Orchestrator, OrchestratorConfig, StepReason};
use fleet_simulator_core_rs::events::ReadyPool;
use fleet_simulator_core_rs::schedule::{CalendarEvent, ScenarioInputs, TargetTable, UsageSchedule};

// ============================================================================
// Test Helpers
// ============================================================================

const HORIZON: u32 = 30;

fn orchestrator(group: GroupConfig, entities: Vec<EntitySnapshot>, target: u32) -> Orchestrator {
    let id = group.id;
    let config = OrchestratorConfig::new(HORIZON, vec![group]).with_invariant_checks();
    let inputs = ScenarioInputs {
        entities,
        targets: TargetTable::new().with_constant(id, target, HORIZON),
        usage: UsageSchedule::new().with_group_constant(id, 100, HORIZON),
        spawns: Default::default(),
    };
    Orchestrator::new(config, inputs).unwrap()
}

fn operating(id: u32, manufacture: i64, limits: ResourceLimits) -> EntitySnapshot {
    EntitySnapshot::new(id, 1, EntityState::Operations, manufacture).with_limits(limits)
}

fn exhausted_events(orch: &Orchestrator) -> Vec<(u32, u32, ExhaustedLimit, EntityState)> {
    orch.event_log()
        .events()
        .iter()
        .filter_map(|event| match *event {
            Event::Exhausted {
                day,
                entity,
                limit,
                to,
                ..
            } => Some((day, entity, limit, to)),
            _ => None,
        })
        .collect()
}

// ============================================================================
// Exhaustion
// ============================================================================

#[test]
fn test_overhaul_exhaustion_goes_to_repair_and_back() {
    // lifetime 1000, overhaul 500, 100/day from day 0
    let mut orch = orchestrator(
        GroupConfig::new(1, 10),
        vec![operating(1, 0, ResourceLimits::new(1_000, 500, 800))],
        1,
    );

    assert_eq!(orch.entity(1).unwrap().limiter_date, Some(5));

    let first = orch.step().unwrap();
    assert_eq!(first.length, 5);
    assert_eq!(first.reason, Some(StepReason::Limiter { entity: 1 }));

    // Day 5: since-overhaul 500 < beyond-repair 800 -> Unserviceable, then
    // admitted straight into repair
    let second = orch.step().unwrap();
    assert_eq!(second.day, 5);
    assert_eq!(second.exits, 1);
    assert_eq!(second.repairs_admitted, 1);
    assert_eq!(second.shortfall, 1);
    assert_eq!(second.reason, Some(StepReason::RepairCompletion { entity: 1 }));
    assert_eq!(orch.entity(1).unwrap().state, EntityState::Repair);
    assert_eq!(orch.current_day(), 15);

    // Day 15: repair complete, restored and promoted
    let third = orch.step().unwrap();
    assert_eq!(third.repairs_completed, 1);
    assert_eq!(third.promotions, 1);
    let row = orch.entity(1).unwrap();
    assert_eq!(row.state, EntityState::Operations);
    assert_eq!(row.limiter_date, Some(20));

    let summary = orch.run().unwrap();
    assert_eq!(summary.steps, 4);
    assert_eq!(summary.final_day, HORIZON);
    assert_eq!(summary.shortfall_days, 20);

    let row = orch.entity(1).unwrap();
    assert_eq!(row.state, EntityState::Storage);
    assert_eq!(row.lifetime_usage, 1_000);
    assert_eq!(row.overhaul_usage, 500);

    assert_eq!(
        exhausted_events(&orch),
        vec![
            (5, 1, ExhaustedLimit::Overhaul, EntityState::Unserviceable),
            (20, 1, ExhaustedLimit::Lifetime, EntityState::Storage),
        ]
    );
}

#[test]
fn test_lifetime_exhaustion_wins_over_overhaul() {
    let mut orch = orchestrator(
        GroupConfig::new(1, 10),
        vec![operating(1, 0, ResourceLimits::new(500, 500, 800))],
        1,
    );
    orch.run().unwrap();

    assert_eq!(
        exhausted_events(&orch),
        vec![(5, 1, ExhaustedLimit::Lifetime, EntityState::Storage)]
    );
}

#[test]
fn test_zero_beyond_repair_threshold_always_retires() {
    let mut orch = orchestrator(
        GroupConfig::new(1, 10),
        vec![operating(1, 0, ResourceLimits::new(10_000, 500, 0))],
        1,
    );
    orch.run().unwrap();

    assert_eq!(
        exhausted_events(&orch),
        vec![(5, 1, ExhaustedLimit::Overhaul, EntityState::Storage)]
    );
    assert_eq!(orch.event_log().count_of_type("RepairAdmitted"), 0);
}

#[test]
fn test_usage_at_beyond_repair_threshold_retires() {
    let mut orch = orchestrator(
        GroupConfig::new(1, 10),
        vec![operating(1, 0, ResourceLimits::new(10_000, 500, 500))],
        1,
    );
    orch.run().unwrap();

    assert_eq!(orch.entity(1).unwrap().state, EntityState::Storage);
}

#[test]
fn test_repair_basis_selects_compared_counter() {
    let entity = || {
        operating(1, 0, ResourceLimits::new(10_000, 500, 1_000)).with_usage(700, 0)
    };

    // Since-overhaul 500 < 1000 -> repair
    let mut since = orchestrator(GroupConfig::new(1, 10), vec![entity()], 1);
    since.step().unwrap();
    since.step().unwrap();
    assert_eq!(since.entity(1).unwrap().state, EntityState::Repair);

    // Lifetime 1200 >= 1000 -> storage
    let mut lifetime = orchestrator(
        GroupConfig::new(1, 10).with_repair_basis(RepairBasis::Lifetime),
        vec![entity()],
        1,
    );
    lifetime.step().unwrap();
    lifetime.step().unwrap();
    assert_eq!(lifetime.entity(1).unwrap().state, EntityState::Storage);
}

#[test]
fn test_storage_is_absorbing() {
    let storage = EntitySnapshot::new(1, 1, EntityState::Storage, 0)
        .with_limits(ResourceLimits::new(10_000, 5_000, 8_000));
    let mut orch = orchestrator(GroupConfig::new(1, 10), vec![storage], 1);

    let summary = orch.run().unwrap();

    assert_eq!(orch.entity(1).unwrap().state, EntityState::Storage);
    assert_eq!(summary.promotions, 0);
    assert_eq!(summary.shortfall_days, HORIZON as u64);
}

// ============================================================================
// Repair lines
// ============================================================================

#[test]
fn test_repair_lines_admit_oldest_first() {
    let limits = ResourceLimits::new(10_000, 300, 800);
    let mut orch = orchestrator(
        GroupConfig::new(1, 5).with_repair_lines(1),
        vec![
            operating(1, 30, limits),
            operating(2, 10, limits),
            operating(3, 20, limits),
        ],
        3,
    );

    orch.step().unwrap(); // 0 -> 3
    orch.step().unwrap(); // all three exit at day 3

    let state = |orch: &Orchestrator, id| orch.entity(id).unwrap().state;
    assert_eq!(state(&orch, 2), EntityState::Repair);
    assert_eq!(state(&orch, 1), EntityState::Unserviceable);
    assert_eq!(state(&orch, 3), EntityState::Unserviceable);
    assert_eq!(orch.current_day(), 8);

    // Day 8: entity 2 completes and returns; the freed line goes to entity 3
    orch.step().unwrap();
    assert_eq!(state(&orch, 2), EntityState::Operations);
    assert_eq!(state(&orch, 3), EntityState::Repair);
    assert_eq!(state(&orch, 1), EntityState::Unserviceable);
}

// ============================================================================
// Waiver and restoration
// ============================================================================

#[test]
fn test_waiver_skips_repair_and_keeps_counters() {
    let unserviceable = EntitySnapshot::new(1, 1, EntityState::Unserviceable, 0)
        .with_limits(ResourceLimits::new(10_000, 500, 800))
        .with_usage(1_000, 100);
    let mut orch = orchestrator(GroupConfig::new(1, 10).with_waiver(200), vec![unserviceable], 1);

    let result = orch.step().unwrap();

    assert_eq!(result.promotions, 1);
    assert_eq!(result.repairs_admitted, 0);
    assert_eq!(orch.event_log().count_of_type("RepairWaived"), 1);

    // 400 remaining at 100/day
    let row = orch.entity(1).unwrap();
    assert_eq!(row.state, EntityState::Operations);
    assert_eq!(row.limiter_date, Some(4));
    assert_eq!(row.overhaul_usage, 500);
    assert_eq!(row.lifetime_usage, 1_400);
}

#[test]
fn test_waiver_threshold_not_met_goes_to_repair() {
    let unserviceable = EntitySnapshot::new(1, 1, EntityState::Unserviceable, 0)
        .with_limits(ResourceLimits::new(10_000, 500, 800))
        .with_usage(1_000, 300);
    let mut orch = orchestrator(GroupConfig::new(1, 10).with_waiver(200), vec![unserviceable], 1);

    orch.step().unwrap();

    assert_eq!(orch.entity(1).unwrap().state, EntityState::Repair);
    assert_eq!(orch.event_log().count_of_type("RepairWaived"), 0);
}

#[test]
fn test_inactive_entity_restored_when_ready() {
    let inactive = EntitySnapshot::new(1, 1, EntityState::Inactive, 0)
        .with_limits(ResourceLimits::new(10_000, 500, 800))
        .with_usage(2_000, 450)
        .with_repair(10, 4);
    let mut orch = orchestrator(GroupConfig::new(1, 10), vec![inactive], 1);

    let first = orch.step().unwrap();
    assert_eq!(first.promotions, 0);
    assert_eq!(first.shortfall, 1);
    assert_eq!(first.length, 6);
    assert_eq!(
        first.reason,
        Some(StepReason::Calendar {
            event: CalendarEvent::InactiveReady
        })
    );

    let second = orch.step().unwrap();
    assert_eq!(second.day, 6);
    assert_eq!(second.promotions, 1);

    let promoted = orch
        .event_log()
        .events_of_type("Promoted")
        .into_iter()
        .cloned()
        .collect::<Vec<_>>();
    assert_eq!(
        promoted,
        vec![Event::Promoted {
            day: 6,
            entity: 1,
            group: 1,
            pool: ReadyPool::Restored,
        }]
    );

    // Restoration resets the since-overhaul counter: full 500 budget again
    let row = orch.entity(1).unwrap();
    assert_eq!(row.limiter_date, Some(11));
    assert_eq!(row.overhaul_usage, 500);
    assert_eq!(row.repair_elapsed, 0);
}
