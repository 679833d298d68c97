//! Orchestrator Engine
//!
//! Main simulation loop integrating all components:
//! - Spawning (scheduled and dynamic)
//! - Per-entity rules (state machine)
//! - Per-step notifications (event bus)
//! - Admission control (quota controller)
//! - Step length selection (adaptive scheduler)
//! - Event logging and tracing
//!
//! # Architecture
//!
//! ```text
//! At each boundary D:
//! 0. Spawn the entities scheduled for D
//! 1. Phase A: evaluate every entity in parallel, publish bus events
//! 2. Phase B: reduce each group's events into a tally
//! 3. Phase C: decide demotions / promotions against target[D]
//! 4. Phase D: apply exits and repair outcomes, demotions, promotions,
//!    dynamic spawns, then admit waiting entities into repair
//! 5. Pick the step length Δ
//! 6. Accrue usage over [D, D+Δ)
//! 7. D += Δ
//! ```
//!
//! # Example
//!
//! ```rust
//! use fleet_simulator_core_rs::models::{EntitySnapshot, EntityState, GroupConfig, ResourceLimits};
//! use fleet_simulator_core_rs::orchestrator::{Orchestrator, OrchestratorConfig};
//! use fleet_simulator_core_rs::schedule::{ScenarioInputs, TargetTable, UsageSchedule};
//!
//! let config = OrchestratorConfig::new(30, vec![GroupConfig::new(1, 10)]);
//! let inputs = ScenarioInputs {
//!     entities: vec![EntitySnapshot::new(1, 1, EntityState::Serviceable, 0)
//!         .with_limits(ResourceLimits::new(10_000, 5_000, 8_000))],
//!     targets: TargetTable::new().with_constant(1, 1, 30),
//!     usage: UsageSchedule::new().with_group_constant(1, 60, 30),
//!     spawns: Default::default(),
//! };
//!
//! let mut orchestrator = Orchestrator::new(config, inputs).unwrap();
//! let summary = orchestrator.run().unwrap();
//!
//! assert_eq!(summary.final_day, 30);
//! assert_eq!(orchestrator.entity(1).unwrap().lifetime_usage, 1_800);
//! ```

use crate::core::time::{Day, SimClock};
use crate::events::EventBus;
use crate::lifecycle::{repair, Action, StateMachine};
use crate::models::{
    EntityId, EntitySnapshot, EntityState, EntityStore, Event, EventLog, GroupConfig, GroupId,
    GroupTable, Ordinal, StoreError, Usage, UsagePrefixIndex, ZERO_ROW,
};
use crate::orchestrator::checkpoint::{compute_config_hash, StateSnapshot, CHECKPOINT_VERSION};
use crate::orchestrator::scheduler::{AdaptiveScheduler, StepMode, StepReason, StepRecord};
use crate::quota::{GroupDecision, QuotaController};
use crate::schedule::{Calendar, CalendarEvent, ScenarioInputs, ScheduleError};
use crate::spawn::{SpawnCapacity, SpawnManager, DEFAULT_SPAWN_ID_BASE};
use crate::trace::{TraceGranularity, TraceRecorder, TraceRow};
use crate::validation::{self, InvariantProbe};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

// ============================================================================
// Configuration Types
// ============================================================================

fn default_spawn_id_base() -> EntityId {
    DEFAULT_SPAWN_ID_BASE
}

/// Complete orchestrator configuration
///
/// # Fields
///
/// * `horizon_days` - Number of simulated days; boundaries are `0..=horizon_days`
/// * `groups` - Per-group rules
/// * `step_mode` - Adaptive steps, or one day per step for verification
/// * `trace` - Trace granularity
/// * `spawn_capacity` - Unbounded, or a fixed number of spawn slots
/// * `spawn_id_base` - First id handed to spawned entities
/// * `start_ordinal` - Manufacture ordinal of day 0
/// * `max_steps` - Diagnostic cap on the number of steps
/// * `check_invariants` - Verify store invariants after every step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    pub horizon_days: Day,

    pub groups: Vec<GroupConfig>,

    #[serde(default)]
    pub step_mode: StepMode,

    #[serde(default)]
    pub trace: TraceGranularity,

    #[serde(default)]
    pub spawn_capacity: SpawnCapacity,

    #[serde(default = "default_spawn_id_base")]
    pub spawn_id_base: EntityId,

    #[serde(default)]
    pub start_ordinal: Ordinal,

    #[serde(default)]
    pub max_steps: Option<usize>,

    #[serde(default)]
    pub check_invariants: bool,
}

impl OrchestratorConfig {
    /// Configuration with defaults for everything but horizon and groups
    pub fn new(horizon_days: Day, groups: Vec<GroupConfig>) -> Self {
        Self {
            horizon_days,
            groups,
            step_mode: StepMode::default(),
            trace: TraceGranularity::default(),
            spawn_capacity: SpawnCapacity::default(),
            spawn_id_base: DEFAULT_SPAWN_ID_BASE,
            start_ordinal: 0,
            max_steps: None,
            check_invariants: false,
        }
    }

    pub fn with_step_mode(mut self, mode: StepMode) -> Self {
        self.step_mode = mode;
        self
    }

    pub fn with_trace(mut self, trace: TraceGranularity) -> Self {
        self.trace = trace;
        self
    }

    pub fn with_spawn_capacity(mut self, capacity: SpawnCapacity) -> Self {
        self.spawn_capacity = capacity;
        self
    }

    pub fn with_invariant_checks(mut self) -> Self {
        self.check_invariants = true;
        self
    }

    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = Some(max_steps);
        self
    }
}

/// The single document accepted by the CLI and the Python binding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scenario {
    pub config: OrchestratorConfig,
    pub inputs: ScenarioInputs,
}

// ============================================================================
// Errors and Results
// ============================================================================

/// Simulation error types
#[derive(Debug, Error, PartialEq)]
pub enum SimulationError {
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Schedule error: {0}")]
    Schedule(#[from] ScheduleError),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("State validation error: {0}")]
    StateValidationError(String),

    #[error("Config mismatch: checkpoint {expected}, current {actual}")]
    ConfigMismatch { expected: String, actual: String },

    #[error("Invariant violated at day {day}: {message}")]
    InvariantViolation { day: Day, message: String },

    #[error("Horizon already reached at day {0}")]
    HorizonReached(Day),

    #[error("Step cap of {0} steps reached")]
    StepCapReached(usize),
}

/// Result of a single step
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepResult {
    pub step: usize,
    /// Boundary the step started at
    pub day: Day,
    pub length: Day,
    pub reason: Option<StepReason>,
    pub spawned: u32,
    pub exits: u32,
    pub repairs_completed: u32,
    pub repairs_admitted: u32,
    pub demotions: u32,
    pub promotions: u32,
    /// Residual shortfall summed over groups at this boundary
    pub shortfall: u32,
    /// Operations headcount after the boundary decisions
    pub operations: u32,
    /// Usage accrued over the step
    pub usage: Usage,
}

/// Totals of a finished (or capped) run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub steps: usize,
    pub final_day: Day,
    pub horizon_days: Day,
    /// Step count per [`StepReason::label`]
    pub reasons: BTreeMap<String, usize>,
    /// Residual shortfall summed over groups and days
    pub shortfall_days: u64,
    pub spawned: u64,
    pub dropped_spawns: u64,
    pub promotions: usize,
    pub demotions: usize,
    /// Final entity count per group and state name
    pub states: BTreeMap<GroupId, BTreeMap<String, usize>>,
}

/// Counters accumulated step by step and carried across checkpoints
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunTotals {
    /// Step count per [`StepReason::label`]
    pub reasons: BTreeMap<String, usize>,
    pub promotions: usize,
    pub demotions: usize,
}

impl RunTotals {
    pub fn record_step(&mut self, reason: StepReason) {
        *self.reasons.entry(reason.label().to_string()).or_default() += 1;
    }

    pub fn steps(&self) -> usize {
        self.reasons.values().sum()
    }
}

// ============================================================================
// Orchestrator
// ============================================================================

/// Main orchestrator owning the simulation state and step loop
///
/// # Determinism
///
/// There is no randomness. Parallel phases produce slot-ordered results and
/// every ranking ties on manufacture ordinal then id, so repeated runs of the
/// same scenario are identical.
pub struct Orchestrator {
    config: OrchestratorConfig,
    inputs: ScenarioInputs,
    groups: GroupTable,
    group_ids: Vec<GroupId>,
    index: UsagePrefixIndex,
    store: EntityStore,
    bus: EventBus,
    quota: QuotaController,
    spawner: SpawnManager,
    scheduler: AdaptiveScheduler,
    calendar: Calendar,
    clock: SimClock,
    event_log: EventLog,
    trace: TraceRecorder,
    step_log: Vec<StepRecord>,
    last_decisions: Vec<GroupDecision>,
    step_count: usize,
    shortfall_days: u64,
    totals: RunTotals,
    run_id: Uuid,
}

impl Orchestrator {
    /// Create an orchestrator positioned at day 0
    ///
    /// # Errors
    /// Any validation failure of the configuration or the input tables.
    pub fn new(config: OrchestratorConfig, inputs: ScenarioInputs) -> Result<Self, SimulationError> {
        let entities = inputs.entities.clone();
        let mut orchestrator = Self::build(config, inputs, &entities, None)?;
        orchestrator.initialise_intents();
        orchestrator.derive_limiters(0);
        info!(
            run_id = %orchestrator.run_id,
            entities = orchestrator.store.len(),
            groups = orchestrator.group_ids.len(),
            horizon = orchestrator.config.horizon_days,
            mode = ?orchestrator.config.step_mode,
            "simulation initialised"
        );
        Ok(orchestrator)
    }

    /// Create an orchestrator from a scenario document
    pub fn from_scenario(scenario: Scenario) -> Result<Self, SimulationError> {
        Self::new(scenario.config, scenario.inputs)
    }

    /// Build every component; `entities` populate the store
    fn build(
        config: OrchestratorConfig,
        inputs: ScenarioInputs,
        entities: &[EntitySnapshot],
        run_id: Option<Uuid>,
    ) -> Result<Self, SimulationError> {
        for warning in validation::validate_scenario(&config, &inputs)? {
            warn!("{warning}");
        }

        let horizon = config.horizon_days;
        let groups = GroupTable::new(&config.groups);
        let group_ids = groups.ids();

        let mut index = UsagePrefixIndex::new(horizon);
        for (&entity, row) in &inputs.usage.entities {
            index.insert_entity_row(entity, row)?;
        }
        for (&group, row) in &inputs.usage.groups {
            index.insert_group_row(group, row)?;
        }

        let mut store = EntityStore::new();
        for row in entities {
            let repair_time = row
                .repair_time
                .unwrap_or_else(|| groups.config(row.group).repair_time);
            let usage_row = index.row_for(row.id, row.group).unwrap_or(ZERO_ROW);
            store.insert_snapshot(row, repair_time, usage_row)?;
        }

        let spawner = SpawnManager::new(
            config.spawn_id_base,
            config.spawn_capacity,
            config.start_ordinal,
        );
        spawner.prepare_store(&mut store);

        let calendar = Self::build_calendar(&config, &inputs, &groups);
        let run_id = run_id.unwrap_or_else(Uuid::new_v4);

        Ok(Self {
            scheduler: AdaptiveScheduler::new(config.step_mode),
            trace: TraceRecorder::new(config.trace, run_id),
            clock: SimClock::new(horizon),
            config,
            inputs,
            groups,
            group_ids,
            index,
            store,
            bus: EventBus::new(),
            quota: QuotaController::new(),
            spawner,
            calendar,
            event_log: EventLog::new(),
            step_log: Vec::new(),
            last_decisions: Vec::new(),
            step_count: 0,
            shortfall_days: 0,
            totals: RunTotals::default(),
            run_id,
        })
    }

    /// Calendar of known boundaries, always derived from the initial inputs
    fn build_calendar(
        config: &OrchestratorConfig,
        inputs: &ScenarioInputs,
        groups: &GroupTable,
    ) -> Calendar {
        let repair_time = |row: &EntitySnapshot| {
            row.repair_time
                .unwrap_or_else(|| groups.config(row.group).repair_time)
        };
        let repair_exits = inputs
            .entities
            .iter()
            .filter(|row| row.state == EntityState::Repair)
            .map(|row| repair_time(row).saturating_sub(row.repair_elapsed));
        let inactive_ready = inputs
            .entities
            .iter()
            .filter(|row| row.state == EntityState::Inactive)
            .map(|row| repair::inactive_ready_day(repair_time(row), row.repair_elapsed));

        let mut calendar = Calendar::build(
            config.horizon_days,
            &inputs.targets,
            &inputs.spawns,
            repair_exits,
            inactive_ready,
        );
        for group in &config.groups {
            if let Some(dynamic) = group.dynamic_spawn {
                calendar.insert(dynamic.activation_day, CalendarEvent::Spawn);
            }
        }
        calendar
    }

    /// Fill in intents missing from the initial snapshot
    fn initialise_intents(&mut self) {
        let machine = StateMachine::new(&self.index, &self.groups);
        for row in &self.inputs.entities {
            let Some(slot) = self.store.slot_of(row.id) else {
                continue;
            };
            if row.intent.is_none() {
                let intent = machine.resting_intent(&self.store, slot, 0);
                self.store.set_intent(slot, intent);
            }
        }
    }

    /// Recompute the limiter of every Operations entity at boundary `day`
    ///
    /// Limiter dates in loaded rows are never trusted. Recomputing from the
    /// remaining budgets at `day` lands on the same day as the computation
    /// made on entry, since accrual up to `day` is exact.
    fn derive_limiters(&mut self, day: Day) {
        let machine = StateMachine::new(&self.index, &self.groups);
        let operating: Vec<_> = self
            .store
            .active_slots()
            .filter(|&slot| self.store.state(slot) == EntityState::Operations)
            .collect();
        for slot in operating {
            let limiter = machine.limiter_date(&self.store, slot, day);
            if self.store.limiter_date(slot) != Some(limiter) {
                debug!(
                    entity = self.store.id(slot),
                    supplied = ?self.store.limiter_date(slot),
                    limiter,
                    "limiter date derived"
                );
            }
            self.store.set_limiter_date(slot, limiter);
        }
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    pub fn current_day(&self) -> Day {
        self.clock.current_day()
    }

    pub fn is_finished(&self) -> bool {
        self.clock.is_finished()
    }

    pub fn step_count(&self) -> usize {
        self.step_count
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn store(&self) -> &EntityStore {
        &self.store
    }

    pub fn usage_index(&self) -> &UsagePrefixIndex {
        &self.index
    }

    pub fn event_log(&self) -> &EventLog {
        &self.event_log
    }

    pub fn step_log(&self) -> &[StepRecord] {
        &self.step_log
    }

    /// Decisions of the most recent step, in group order
    pub fn last_decisions(&self) -> &[GroupDecision] {
        &self.last_decisions
    }

    pub fn trace_rows(&self) -> &[TraceRow] {
        self.trace.rows()
    }

    pub fn take_trace_rows(&mut self) -> Vec<TraceRow> {
        self.trace.take_rows()
    }

    /// Current row of one entity
    pub fn entity(&self, id: EntityId) -> Option<EntitySnapshot> {
        self.store.slot_of(id).map(|slot| self.store.snapshot(slot))
    }

    /// Current rows of every entity, ordered by id
    pub fn entities(&self) -> Vec<EntitySnapshot> {
        self.store.snapshots()
    }

    /// Operations headcount of a group
    pub fn operations_count(&self, group: GroupId) -> usize {
        self.store.count_in_state(group, EntityState::Operations)
    }

    // ========================================================================
    // Step Loop
    // ========================================================================

    /// Run until the horizon (or the step cap)
    pub fn run(&mut self) -> Result<RunSummary, SimulationError> {
        while !self.clock.is_finished() {
            if self.config.max_steps.is_some_and(|cap| self.step_count >= cap) {
                warn!(
                    steps = self.step_count,
                    day = self.clock.current_day(),
                    "step cap reached before the horizon"
                );
                break;
            }
            self.step()?;
        }

        let summary = self.summary();
        info!(
            run_id = %self.run_id,
            steps = summary.steps,
            final_day = summary.final_day,
            shortfall_days = summary.shortfall_days,
            spawned = summary.spawned,
            "simulation finished"
        );
        Ok(summary)
    }

    /// Execute one step from the current boundary
    ///
    /// # Errors
    /// `HorizonReached` once the run is over, `StepCapReached` past the
    /// diagnostic cap, `InvariantViolation` when checks are enabled and fail.
    pub fn step(&mut self) -> Result<StepResult, SimulationError> {
        let day = self.clock.current_day();
        if self.clock.is_finished() {
            return Err(SimulationError::HorizonReached(day));
        }
        if let Some(cap) = self.config.max_steps.filter(|&cap| self.step_count >= cap) {
            return Err(SimulationError::StepCapReached(cap));
        }

        let probe = self
            .config
            .check_invariants
            .then(|| InvariantProbe::capture(&self.store));
        let mut result = StepResult {
            step: self.step_count,
            day,
            ..Default::default()
        };

        let machine = StateMachine::new(&self.index, &self.groups);

        // 0. Scheduled spawns
        let spawned = self.spawner.spawn_scheduled(
            &mut self.store,
            &self.index,
            &self.groups,
            &self.inputs.spawns,
            day,
            &mut self.event_log,
        )?;
        result.spawned = spawned.spawned;

        // Phase A: per-entity verdicts
        let verdicts = machine.evaluate_all(&self.store, day);
        self.bus.clear();
        self.bus.publish_batch(verdicts.iter().filter_map(|v| v.event));
        let published = self.bus.stats();

        // Phase B: per-group tallies
        let tallies = self.quota.tally(&self.bus, &self.group_ids);

        // Phase C: per-group decisions
        let targets: Vec<u32> = self
            .group_ids
            .iter()
            .map(|&group| self.inputs.targets.target(group, day))
            .collect();
        let decisions = self.quota.decide_all(&tallies, &targets, day);

        // Phase D: exits and repair outcomes
        for verdict in &verdicts {
            machine.apply(&mut self.store, verdict, day, &mut self.event_log)?;
            match verdict.action {
                Action::Exit { .. } => result.exits += 1,
                Action::CompleteRepair => result.repairs_completed += 1,
                _ => {}
            }
        }

        // Phase D: quota decisions
        for decision in &decisions {
            for &slot in &decision.demote {
                self.store.set_state(slot, EntityState::Serviceable, day)?;
                let intent = machine.resting_intent(&self.store, slot, day);
                self.store.set_intent(slot, intent);
                self.event_log.log(Event::Demoted {
                    day,
                    entity: self.store.id(slot),
                    group: decision.group,
                });
            }
            for &(slot, pool) in &decision.promote {
                machine.enter_operations(&mut self.store, slot, day)?;
                self.event_log.log(Event::Promoted {
                    day,
                    entity: self.store.id(slot),
                    group: decision.group,
                    pool,
                });
            }
            result.demotions += decision.demote.len() as u32;
            result.promotions += decision.promote.len() as u32;
            self.totals.demotions += decision.demote.len();
            self.totals.promotions += decision.promote.len();

            let mut residual = decision.shortfall;
            if residual > 0 && self.groups.config(decision.group).dynamic_spawn_active(day) {
                let grown = self.spawner.spawn_into_operations(
                    &mut self.store,
                    &machine,
                    &self.index,
                    &self.groups,
                    decision.group,
                    residual,
                    day,
                    &mut self.event_log,
                )?;
                result.spawned += grown.spawned;
                residual = residual.saturating_sub(grown.spawned);
            }
            if residual > 0 {
                self.event_log.log(Event::Shortfall {
                    day,
                    group: decision.group,
                    target: decision.target,
                    operations: decision.target - residual,
                    shortfall: residual,
                });
            }
            result.shortfall += residual;
        }

        // Phase D: repair admission
        for slot in repair::select_admissions(&self.store, &self.groups) {
            machine.admit_repair(&mut self.store, slot, day, &mut self.event_log)?;
            result.repairs_admitted += 1;
        }

        // Step length, trace, accrual
        let plan = self
            .scheduler
            .plan(&self.store, &self.calendar, day, self.config.horizon_days);
        self.trace.record_step(&self.store, &self.index, day, plan.length);
        let accrual = machine.accrue(&mut self.store, day, day + plan.length);

        result.length = plan.length;
        result.reason = Some(plan.reason);
        result.usage = accrual.usage;
        result.operations = accrual.operating as u32;

        if let Some(probe) = probe {
            probe.check(&self.store, day)?;
        }

        self.shortfall_days += result.shortfall as u64 * plan.length as u64;
        self.event_log.log(Event::StepAdvanced {
            day,
            length: plan.length,
            reason: plan.reason,
        });
        self.step_log.push(StepRecord {
            step: self.step_count,
            day,
            length: plan.length,
            reason: plan.reason,
        });
        self.totals.record_step(plan.reason);
        self.last_decisions = decisions;
        self.clock.advance(plan.length);
        self.step_count += 1;

        debug!(
            step = result.step,
            day,
            length = plan.length,
            reason = plan.reason.label(),
            exits = result.exits,
            promotions = result.promotions,
            demotions = result.demotions,
            shortfall = result.shortfall,
            ops_reports = published.ops_reports,
            demounts = published.demounts,
            ready = published.ready,
            "step complete"
        );
        Ok(result)
    }

    // ========================================================================
    // Summary
    // ========================================================================

    /// Totals so far
    pub fn summary(&self) -> RunSummary {
        let mut states: BTreeMap<GroupId, BTreeMap<String, usize>> = self
            .group_ids
            .iter()
            .map(|&group| (group, BTreeMap::new()))
            .collect();
        for slot in self.store.active_slots() {
            *states
                .entry(self.store.group(slot))
                .or_default()
                .entry(self.store.state(slot).name().to_string())
                .or_default() += 1;
        }

        RunSummary {
            run_id: self.run_id,
            steps: self.step_count,
            final_day: self.clock.current_day(),
            horizon_days: self.config.horizon_days,
            reasons: self.totals.reasons.clone(),
            shortfall_days: self.shortfall_days,
            spawned: self.spawner.total_spawned(),
            dropped_spawns: self.spawner.total_dropped(),
            promotions: self.totals.promotions,
            demotions: self.totals.demotions,
            states,
        }
    }

    // ========================================================================
    // Checkpointing
    // ========================================================================

    /// Hash binding a checkpoint to its configuration and input tables
    fn scenario_hash(config: &OrchestratorConfig, inputs: &ScenarioInputs) -> Result<String, SimulationError> {
        #[derive(Serialize)]
        struct Hashed<'a> {
            config: &'a OrchestratorConfig,
            targets: &'a crate::schedule::TargetTable,
            usage: &'a crate::schedule::UsageSchedule,
            spawns: &'a crate::schedule::SpawnSchedule,
        }
        compute_config_hash(&Hashed {
            config,
            targets: &inputs.targets,
            usage: &inputs.usage,
            spawns: &inputs.spawns,
        })
    }

    /// Serialise the current state to JSON
    pub fn save_state(&self) -> Result<String, SimulationError> {
        let snapshot = StateSnapshot {
            version: CHECKPOINT_VERSION,
            run_id: self.run_id,
            clock: self.clock.clone(),
            step_count: self.step_count,
            shortfall_days: self.shortfall_days,
            totals: self.totals.clone(),
            next_spawn_id: self.spawner.next_id(),
            total_spawned: self.spawner.total_spawned(),
            total_dropped: self.spawner.total_dropped(),
            free_slots: self.store.free_slots(),
            entities: self.store.snapshots(),
            config_hash: Self::scenario_hash(&self.config, &self.inputs)?,
        };
        snapshot.to_json()
    }

    /// Restore an orchestrator from [`save_state`](Self::save_state) output
    ///
    /// # Errors
    /// `ConfigMismatch` when `config` or `inputs` differ from the run that
    /// produced the checkpoint.
    pub fn load_state(
        config: OrchestratorConfig,
        inputs: ScenarioInputs,
        json: &str,
    ) -> Result<Self, SimulationError> {
        let snapshot = StateSnapshot::from_json(json)?;
        let actual = Self::scenario_hash(&config, &inputs)?;
        if snapshot.config_hash != actual {
            return Err(SimulationError::ConfigMismatch {
                expected: snapshot.config_hash,
                actual,
            });
        }
        snapshot.validate(config.horizon_days)?;

        // Placeholders are re-reserved from the checkpoint count below
        let mut unreserved = config.clone();
        unreserved.spawn_capacity = SpawnCapacity::Unbounded;
        let mut orchestrator = Self::build(unreserved, inputs, &snapshot.entities, Some(snapshot.run_id))?;
        if let SpawnCapacity::Reserved(_) = config.spawn_capacity {
            orchestrator.store.reserve_placeholders(snapshot.free_slots);
            orchestrator.store.set_growable(false);
        }
        orchestrator.spawner = SpawnManager::new(
            config.spawn_id_base,
            config.spawn_capacity,
            config.start_ordinal,
        );
        orchestrator.spawner.restore(
            snapshot.next_spawn_id,
            snapshot.total_spawned,
            snapshot.total_dropped,
        );
        orchestrator.config = config;
        orchestrator.clock = snapshot.clock;
        orchestrator.step_count = snapshot.step_count;
        orchestrator.shortfall_days = snapshot.shortfall_days;
        orchestrator.totals = snapshot.totals;
        orchestrator.derive_limiters(orchestrator.clock.current_day());

        info!(
            run_id = %orchestrator.run_id,
            day = orchestrator.clock.current_day(),
            entities = orchestrator.store.len(),
            "state restored from checkpoint"
        );
        Ok(orchestrator)
    }
}
