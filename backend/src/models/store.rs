//! Entity Store
//!
//! The authoritative ledger of every entity and its current attributes, laid
//! out as a structure of arrays. Each entity lives in a slot; columns are
//! indexed by slot and an id map resolves entity ids to slots.
//!
//! Slots are never removed. Entities retire into Storage and keep their slot.
//! Placeholder slots (not yet active) can be reserved up front and are handed
//! out through a free list, so allocation is O(1) whether or not the store is
//! allowed to grow.
//!
//! # Critical Invariants
//!
//! 1. **Closed transitions**: `set_state` only applies transitions allowed by
//!    [`EntityState::can_transition_to`]
//! 2. **Storage is absorbing**: nothing leaves Storage
//! 3. **Limiter date**: present only while the entity is in Operations
//! 4. **Counters**: usage only grows, except the since-overhaul reset after
//!    repair
//! 5. **Unique ids**: every active slot has a distinct id

use crate::core::time::Day;
use crate::models::entity::{
    EntityId, EntitySnapshot, EntityState, GroupId, Ordinal, ResolvedLimits, Usage,
};
use crate::models::usage_index::{RowId, ZERO_ROW};
use std::collections::HashMap;
use thiserror::Error;

/// Position of an entity in the store columns
pub type Slot = usize;

/// Errors raised by store mutations
#[derive(Debug, Error, PartialEq)]
pub enum StoreError {
    #[error("Duplicate entity id: {0}")]
    DuplicateId(EntityId),

    #[error("Unknown entity id: {0}")]
    UnknownId(EntityId),

    #[error("Invalid transition for entity {id}: {from} -> {to}")]
    InvalidTransition {
        id: EntityId,
        from: EntityState,
        to: EntityState,
    },

    #[error("No free slot left for entity {0}")]
    CapacityExhausted(EntityId),
}

/// Attributes of a new entity, shared by snapshot load and spawning
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewEntity {
    pub id: EntityId,
    pub group: GroupId,
    pub state: EntityState,
    pub intent: EntityState,
    pub lifetime_usage: Usage,
    pub overhaul_usage: Usage,
    pub limits: ResolvedLimits,
    pub repair_time: Day,
    pub repair_elapsed: Day,
    pub manufacture: Ordinal,
    pub status_change_day: Day,
    pub limiter_date: Option<Day>,
    pub usage_row: RowId,
}

/// Structure-of-arrays entity ledger
#[derive(Debug, Clone, Default)]
pub struct EntityStore {
    ids: Vec<EntityId>,
    groups: Vec<GroupId>,
    states: Vec<EntityState>,
    intents: Vec<EntityState>,
    lifetime_usage: Vec<Usage>,
    overhaul_usage: Vec<Usage>,
    lifetime_limit: Vec<Usage>,
    overhaul_limit: Vec<Usage>,
    beyond_repair: Vec<Usage>,
    repair_time: Vec<Day>,
    repair_elapsed: Vec<Day>,
    manufacture: Vec<Ordinal>,
    status_change_day: Vec<Day>,
    limiter_date: Vec<Option<Day>>,
    usage_row: Vec<RowId>,
    active: Vec<bool>,

    /// Entity id -> slot, active slots only
    index: HashMap<EntityId, Slot>,

    /// Placeholder slots waiting to be activated (popped from the back)
    free: Vec<Slot>,

    /// Whether `allocate` may append slots once the free list is empty
    growable: bool,

    active_count: usize,
}

impl EntityStore {
    /// Empty store that grows on demand
    ///
    /// # Example
    /// ```
    /// use fleet_simulator_core_rs::models::{EntityStore, EntitySnapshot, EntityState};
    ///
    /// let mut store = EntityStore::new();
    /// let row = EntitySnapshot::new(1, 1, EntityState::Reserve, 100);
    /// let slot = store.insert_snapshot(&row, 30, 0).unwrap();
    ///
    /// assert_eq!(store.len(), 1);
    /// assert_eq!(store.state(slot), EntityState::Reserve);
    /// assert_eq!(store.slot_of(1), Some(slot));
    /// ```
    pub fn new() -> Self {
        Self {
            growable: true,
            ..Default::default()
        }
    }

    /// Store with `placeholders` reserved inactive slots and no growth
    pub fn with_reserved(placeholders: usize) -> Self {
        let mut store = Self::new();
        store.reserve_placeholders(placeholders);
        store.growable = false;
        store
    }

    /// Append `count` inactive placeholder slots to the free list
    pub fn reserve_placeholders(&mut self, count: usize) {
        let first = self.ids.len();
        for _ in 0..count {
            self.push_slot(NewEntity::placeholder());
        }
        // lowest slot handed out first
        self.free.extend((first..first + count).rev());
    }

    /// Insert a snapshot row as an active entity
    ///
    /// A limiter date is only kept on Operations rows.
    pub fn insert_snapshot(
        &mut self,
        row: &EntitySnapshot,
        repair_time: Day,
        usage_row: RowId,
    ) -> Result<Slot, StoreError> {
        self.insert(NewEntity {
            id: row.id,
            group: row.group,
            state: row.state,
            intent: row.intent.unwrap_or(row.state),
            lifetime_usage: row.lifetime_usage,
            overhaul_usage: row.overhaul_usage,
            limits: row.limits.resolved(),
            repair_time,
            repair_elapsed: row.repair_elapsed,
            manufacture: row.manufacture,
            status_change_day: row.status_change_day,
            limiter_date: row
                .limiter_date
                .filter(|_| row.state == EntityState::Operations),
            usage_row,
        })
    }

    /// Insert an active entity, appending a slot
    ///
    /// Snapshot entities always get fresh slots; placeholders are kept for
    /// spawning.
    pub fn insert(&mut self, entity: NewEntity) -> Result<Slot, StoreError> {
        if self.index.contains_key(&entity.id) {
            return Err(StoreError::DuplicateId(entity.id));
        }
        let slot = self.push_slot(entity);
        self.activate(slot, entity.id);
        Ok(slot)
    }

    /// Activate an entity in a free placeholder slot (or a new slot if the
    /// store may grow)
    ///
    /// # Errors
    /// `CapacityExhausted` when no placeholder is left on a fixed-capacity
    /// store. The caller decides whether that is fatal.
    pub fn allocate(&mut self, entity: NewEntity) -> Result<Slot, StoreError> {
        if self.index.contains_key(&entity.id) {
            return Err(StoreError::DuplicateId(entity.id));
        }
        let slot = match self.free.pop() {
            Some(slot) => {
                self.write_slot(slot, entity);
                slot
            }
            None if self.growable => self.push_slot(entity),
            None => return Err(StoreError::CapacityExhausted(entity.id)),
        };
        self.activate(slot, entity.id);
        Ok(slot)
    }

    fn activate(&mut self, slot: Slot, id: EntityId) {
        self.active[slot] = true;
        self.index.insert(id, slot);
        self.active_count += 1;
    }

    fn push_slot(&mut self, e: NewEntity) -> Slot {
        self.ids.push(e.id);
        self.groups.push(e.group);
        self.states.push(e.state);
        self.intents.push(e.intent);
        self.lifetime_usage.push(e.lifetime_usage);
        self.overhaul_usage.push(e.overhaul_usage);
        self.lifetime_limit.push(e.limits.lifetime);
        self.overhaul_limit.push(e.limits.overhaul);
        self.beyond_repair.push(e.limits.beyond_repair);
        self.repair_time.push(e.repair_time);
        self.repair_elapsed.push(e.repair_elapsed);
        self.manufacture.push(e.manufacture);
        self.status_change_day.push(e.status_change_day);
        self.limiter_date.push(e.limiter_date);
        self.usage_row.push(e.usage_row);
        self.active.push(false);
        self.ids.len() - 1
    }

    fn write_slot(&mut self, slot: Slot, e: NewEntity) {
        self.ids[slot] = e.id;
        self.groups[slot] = e.group;
        self.states[slot] = e.state;
        self.intents[slot] = e.intent;
        self.lifetime_usage[slot] = e.lifetime_usage;
        self.overhaul_usage[slot] = e.overhaul_usage;
        self.lifetime_limit[slot] = e.limits.lifetime;
        self.overhaul_limit[slot] = e.limits.overhaul;
        self.beyond_repair[slot] = e.limits.beyond_repair;
        self.repair_time[slot] = e.repair_time;
        self.repair_elapsed[slot] = e.repair_elapsed;
        self.manufacture[slot] = e.manufacture;
        self.status_change_day[slot] = e.status_change_day;
        self.limiter_date[slot] = e.limiter_date;
        self.usage_row[slot] = e.usage_row;
    }

    // ========================================================================
    // Lookup
    // ========================================================================

    /// Number of active entities
    pub fn len(&self) -> usize {
        self.active_count
    }

    pub fn is_empty(&self) -> bool {
        self.active_count == 0
    }

    /// Total slots, placeholders included
    pub fn slot_count(&self) -> usize {
        self.ids.len()
    }

    /// Placeholder slots still available
    pub fn free_slots(&self) -> usize {
        self.free.len()
    }

    /// Allow or forbid appending slots once the free list is empty
    pub fn set_growable(&mut self, growable: bool) {
        self.growable = growable;
    }

    pub fn slot_of(&self, id: EntityId) -> Option<Slot> {
        self.index.get(&id).copied()
    }

    /// Active slots in slot order
    pub fn active_slots(&self) -> impl Iterator<Item = Slot> + '_ {
        self.active
            .iter()
            .enumerate()
            .filter_map(|(slot, &active)| active.then_some(slot))
    }

    pub fn is_active(&self, slot: Slot) -> bool {
        self.active[slot]
    }

    pub fn id(&self, slot: Slot) -> EntityId {
        self.ids[slot]
    }

    pub fn group(&self, slot: Slot) -> GroupId {
        self.groups[slot]
    }

    pub fn state(&self, slot: Slot) -> EntityState {
        self.states[slot]
    }

    pub fn intent(&self, slot: Slot) -> EntityState {
        self.intents[slot]
    }

    pub fn lifetime_usage(&self, slot: Slot) -> Usage {
        self.lifetime_usage[slot]
    }

    pub fn overhaul_usage(&self, slot: Slot) -> Usage {
        self.overhaul_usage[slot]
    }

    pub fn limits(&self, slot: Slot) -> ResolvedLimits {
        ResolvedLimits {
            lifetime: self.lifetime_limit[slot],
            overhaul: self.overhaul_limit[slot],
            beyond_repair: self.beyond_repair[slot],
        }
    }

    pub fn repair_time(&self, slot: Slot) -> Day {
        self.repair_time[slot]
    }

    pub fn repair_elapsed(&self, slot: Slot) -> Day {
        self.repair_elapsed[slot]
    }

    pub fn manufacture(&self, slot: Slot) -> Ordinal {
        self.manufacture[slot]
    }

    pub fn status_change_day(&self, slot: Slot) -> Day {
        self.status_change_day[slot]
    }

    pub fn limiter_date(&self, slot: Slot) -> Option<Day> {
        self.limiter_date[slot]
    }

    pub fn usage_row(&self, slot: Slot) -> RowId {
        self.usage_row[slot]
    }

    /// Remaining lifetime and overhaul budgets
    pub fn remaining_budgets(&self, slot: Slot) -> (Usage, Usage) {
        (
            self.lifetime_limit[slot].saturating_sub(self.lifetime_usage[slot]),
            self.overhaul_limit[slot].saturating_sub(self.overhaul_usage[slot]),
        )
    }

    // ========================================================================
    // Mutation
    // ========================================================================

    /// Move an entity to `next`, recording the change day
    ///
    /// Leaving Operations clears the limiter date.
    pub fn set_state(&mut self, slot: Slot, next: EntityState, day: Day) -> Result<(), StoreError> {
        let current = self.states[slot];
        if !current.can_transition_to(next) {
            return Err(StoreError::InvalidTransition {
                id: self.ids[slot],
                from: current,
                to: next,
            });
        }
        if current != next {
            self.states[slot] = next;
            self.status_change_day[slot] = day;
            if next != EntityState::Operations {
                self.limiter_date[slot] = None;
            }
        }
        Ok(())
    }

    pub fn set_intent(&mut self, slot: Slot, intent: EntityState) {
        self.intents[slot] = intent;
    }

    pub fn set_limiter_date(&mut self, slot: Slot, day: Day) {
        self.limiter_date[slot] = Some(day);
    }

    /// Add usage to both counters
    pub fn accrue_usage(&mut self, slot: Slot, amount: Usage) {
        self.lifetime_usage[slot] = self.lifetime_usage[slot].saturating_add(amount);
        self.overhaul_usage[slot] = self.overhaul_usage[slot].saturating_add(amount);
    }

    pub fn add_repair_elapsed(&mut self, slot: Slot, days: Day) {
        self.repair_elapsed[slot] = self.repair_elapsed[slot].saturating_add(days);
    }

    /// Overhaul done: since-overhaul counter and repair progress back to zero
    pub fn reset_after_repair(&mut self, slot: Slot) {
        self.overhaul_usage[slot] = 0;
        self.repair_elapsed[slot] = 0;
    }

    // ========================================================================
    // Export
    // ========================================================================

    /// Row view of one entity
    pub fn snapshot(&self, slot: Slot) -> EntitySnapshot {
        EntitySnapshot {
            id: self.ids[slot],
            group: self.groups[slot],
            state: self.states[slot],
            intent: Some(self.intents[slot]),
            lifetime_usage: self.lifetime_usage[slot],
            overhaul_usage: self.overhaul_usage[slot],
            limits: self.limits(slot).to_limits(),
            repair_time: Some(self.repair_time[slot]),
            repair_elapsed: self.repair_elapsed[slot],
            manufacture: self.manufacture[slot],
            status_change_day: self.status_change_day[slot],
            limiter_date: self.limiter_date[slot],
        }
    }

    /// Rows of every active entity, ordered by id
    pub fn snapshots(&self) -> Vec<EntitySnapshot> {
        let mut rows: Vec<EntitySnapshot> =
            self.active_slots().map(|slot| self.snapshot(slot)).collect();
        rows.sort_by_key(|row| row.id);
        rows
    }

    /// Active entity count per state for one group
    pub fn count_in_state(&self, group: GroupId, state: EntityState) -> usize {
        self.active_slots()
            .filter(|&slot| self.groups[slot] == group && self.states[slot] == state)
            .count()
    }
}

impl NewEntity {
    fn placeholder() -> Self {
        Self {
            id: EntityId::MAX,
            group: 0,
            state: EntityState::Serviceable,
            intent: EntityState::Serviceable,
            lifetime_usage: 0,
            overhaul_usage: 0,
            limits: ResolvedLimits {
                lifetime: 0,
                overhaul: 0,
                beyond_repair: 0,
            },
            repair_time: 0,
            repair_elapsed: 0,
            manufacture: 0,
            status_change_day: 0,
            limiter_date: None,
            usage_row: ZERO_ROW,
        }
    }
}
