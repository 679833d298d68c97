//! Spawn manager: creation of new entities during the run
//!
//! New entities appear either from the spawn schedule (born Serviceable with
//! intent Operations) or from the dynamic growth process (born straight into
//! Operations to cover a residual shortfall).
//!
//! # Key Principles
//!
//! 1. **Sequential ids**: every created entity takes the next id from
//!    `spawn_id_base`, in group order then request order
//! 2. **Manufacture = birth day**: the ordinal of the spawn day, so spawned
//!    entities rank as the youngest of their group
//! 3. **Capacity never fails the run**: with a reserved capacity, requests
//!    past the last free slot are dropped and counted
//!
//! # Example
//!
//! ```
//! use fleet_simulator_core_rs::models::{EntityStore, EventLog, GroupConfig, GroupTable, UsagePrefixIndex};
//! use fleet_simulator_core_rs::schedule::SpawnSchedule;
//! use fleet_simulator_core_rs::spawn::{SpawnCapacity, SpawnManager};
//!
//! let groups = GroupTable::new(&[GroupConfig::new(1, 30)]);
//! let index = UsagePrefixIndex::new(10);
//! let schedule = SpawnSchedule::new().with_spawn(1, 4, 3, 10);
//!
//! let mut manager = SpawnManager::new(200_000, SpawnCapacity::Reserved(2), 0);
//! let mut store = EntityStore::new();
//! manager.prepare_store(&mut store);
//!
//! let mut log = EventLog::new();
//! let outcome = manager.spawn_scheduled(&mut store, &index, &groups, &schedule, 4, &mut log).unwrap();
//! assert_eq!(outcome.spawned, 2);
//! assert_eq!(outcome.dropped, 1);
//! assert_eq!(store.slot_of(200_001), Some(1));
//! ```

use crate::core::time::Day;
use crate::lifecycle::StateMachine;
use crate::models::{
    EntityId, EntityState, EntityStore, Event, EventLog, GroupId, GroupTable, NewEntity, Ordinal,
    Slot, StoreError, UsagePrefixIndex, ZERO_ROW,
};
use crate::schedule::SpawnSchedule;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Default first id of spawned entities
pub const DEFAULT_SPAWN_ID_BASE: EntityId = 200_000;

/// How many entities may be created during the run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpawnCapacity {
    /// Store grows on demand
    #[default]
    Unbounded,

    /// Exactly this many placeholder slots; excess requests are dropped
    Reserved(usize),
}

/// Result of one spawn call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpawnOutcome {
    pub spawned: u32,
    pub dropped: u32,
    /// Slots of the new entities, in creation order
    pub slots: Vec<Slot>,
}

impl SpawnOutcome {
    fn merge(&mut self, other: SpawnOutcome) {
        self.spawned += other.spawned;
        self.dropped += other.dropped;
        self.slots.extend(other.slots);
    }
}

/// Creates entities from the schedule and for dynamic growth
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpawnManager {
    next_id: EntityId,
    capacity: SpawnCapacity,
    /// Ordinal of day 0
    start_ordinal: Ordinal,
    total_spawned: u64,
    total_dropped: u64,
}

impl SpawnManager {
    pub fn new(id_base: EntityId, capacity: SpawnCapacity, start_ordinal: Ordinal) -> Self {
        Self {
            next_id: id_base,
            capacity,
            start_ordinal,
            total_spawned: 0,
            total_dropped: 0,
        }
    }

    /// Reserve placeholder slots when the capacity is fixed
    pub fn prepare_store(&self, store: &mut EntityStore) {
        if let SpawnCapacity::Reserved(slots) = self.capacity {
            store.reserve_placeholders(slots);
            store.set_growable(false);
        }
    }

    /// Id the next spawned entity will get
    pub fn next_id(&self) -> EntityId {
        self.next_id
    }

    pub fn capacity(&self) -> SpawnCapacity {
        self.capacity
    }

    pub fn total_spawned(&self) -> u64 {
        self.total_spawned
    }

    pub fn total_dropped(&self) -> u64 {
        self.total_dropped
    }

    /// Restore counters after loading a checkpoint
    pub fn restore(&mut self, next_id: EntityId, spawned: u64, dropped: u64) {
        self.next_id = next_id;
        self.total_spawned = spawned;
        self.total_dropped = dropped;
    }

    /// Create `count` Serviceable entities of `group` at `day`
    ///
    /// Only a full store drops a request; any other store error aborts.
    fn spawn_group(
        &mut self,
        store: &mut EntityStore,
        index: &UsagePrefixIndex,
        groups: &GroupTable,
        group: GroupId,
        count: u32,
        day: Day,
        log: &mut EventLog,
    ) -> Result<SpawnOutcome, StoreError> {
        let config = groups.config(group);
        let limits = config.spawn_profile.limits.resolved();
        let usage_row = index.group_row(group).unwrap_or(ZERO_ROW);
        let mut outcome = SpawnOutcome::default();

        for _ in 0..count {
            let entity = NewEntity {
                id: self.next_id,
                group,
                state: EntityState::Serviceable,
                intent: EntityState::Operations,
                lifetime_usage: 0,
                overhaul_usage: 0,
                limits,
                repair_time: config.spawn_repair_time(),
                repair_elapsed: 0,
                manufacture: self.start_ordinal + day as Ordinal,
                status_change_day: day,
                limiter_date: None,
                usage_row,
            };
            match store.allocate(entity) {
                Ok(slot) => {
                    log.log(Event::Spawned {
                        day,
                        entity: entity.id,
                        group,
                        state: EntityState::Serviceable,
                    });
                    outcome.slots.push(slot);
                    outcome.spawned += 1;
                    self.next_id = self.next_id.saturating_add(1);
                }
                Err(StoreError::CapacityExhausted(_)) => outcome.dropped += 1,
                Err(err) => return Err(err),
            }
        }

        if outcome.dropped > 0 {
            warn!(group, day, dropped = outcome.dropped, "spawn requests dropped, no free slot");
            log.log(Event::SpawnDropped {
                day,
                group,
                count: outcome.dropped,
            });
        }
        self.total_spawned += outcome.spawned as u64;
        self.total_dropped += outcome.dropped as u64;
        Ok(outcome)
    }

    /// Materialise the scheduled spawns of `day`, groups in ascending order
    pub fn spawn_scheduled(
        &mut self,
        store: &mut EntityStore,
        index: &UsagePrefixIndex,
        groups: &GroupTable,
        schedule: &SpawnSchedule,
        day: Day,
        log: &mut EventLog,
    ) -> Result<SpawnOutcome, StoreError> {
        let mut outcome = SpawnOutcome::default();
        let requests: Vec<(GroupId, u32)> = schedule
            .groups()
            .map(|group| (group, schedule.count(group, day)))
            .filter(|&(_, count)| count > 0)
            .collect();

        for (group, count) in requests {
            let spawned = self.spawn_group(store, index, groups, group, count, day, log)?;
            outcome.merge(spawned);
        }
        if outcome.spawned > 0 {
            debug!(day, spawned = outcome.spawned, "scheduled spawn");
        }
        Ok(outcome)
    }

    /// Cover a residual shortfall with new entities that enter Operations at
    /// `day`
    pub fn spawn_into_operations(
        &mut self,
        store: &mut EntityStore,
        machine: &StateMachine<'_>,
        index: &UsagePrefixIndex,
        groups: &GroupTable,
        group: GroupId,
        count: u32,
        day: Day,
        log: &mut EventLog,
    ) -> Result<SpawnOutcome, StoreError> {
        let outcome = self.spawn_group(store, index, groups, group, count, day, log)?;
        for &slot in &outcome.slots {
            machine.enter_operations(store, slot, day)?;
        }
        if outcome.spawned > 0 {
            debug!(group, day, spawned = outcome.spawned, "dynamic spawn into operations");
        }
        Ok(outcome)
    }
}
