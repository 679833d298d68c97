//! Repair lines, restoration and the repair waiver
//!
//! Unserviceable entities wait for a repair line of their group. Lines free
//! up only when a repair completes, which always happens at a step boundary,
//! so admission never needs a day-level check.
//!
//! Admission order among waiting entities: earliest status change, then
//! earliest manufacture, then smallest id.

use crate::core::time::Day;
use crate::models::{EntityState, EntityStore, GroupConfig, GroupId, GroupTable, Slot};
use std::collections::BTreeMap;

/// Whether the group waiver lets this entity skip repair
///
/// Stricter than the bare threshold test of [`GroupConfig::waives_repair`]:
/// the counter must also be below the overhaul limit, otherwise the entity
/// would come out of the waiver with no budget left.
pub fn waiver_applies(group: &GroupConfig, store: &EntityStore, slot: Slot) -> bool {
    let since_overhaul = store.overhaul_usage(slot);
    group.waives_repair(since_overhaul) && since_overhaul < store.limits(slot).overhaul
}

/// First boundary at which an Inactive entity is ready by time
pub fn inactive_ready_day(repair_time: Day, repair_elapsed: Day) -> Day {
    repair_time.saturating_sub(repair_elapsed)
}

/// Whether an Inactive entity is ready at boundary `day`
///
/// # Example
/// ```
/// use fleet_simulator_core_rs::lifecycle::repair::inactive_ready_day;
///
/// // 30-day restoration with 12 days already done
/// assert_eq!(inactive_ready_day(30, 12), 18);
/// assert_eq!(inactive_ready_day(30, 45), 0);
/// ```
pub fn inactive_ready(group: &GroupConfig, store: &EntityStore, slot: Slot, day: Day) -> bool {
    day >= inactive_ready_day(store.repair_time(slot), store.repair_elapsed(slot))
        || waiver_applies(group, store, slot)
}

/// Whether the repair of a Repair entity is complete
pub fn repair_complete(store: &EntityStore, slot: Slot) -> bool {
    store.repair_elapsed(slot) >= store.repair_time(slot)
}

/// Days until a Repair entity completes (zero when already due)
pub fn days_to_completion(store: &EntityStore, slot: Slot) -> Day {
    store.repair_time(slot).saturating_sub(store.repair_elapsed(slot))
}

/// Unserviceable entities to admit into Repair at this boundary
///
/// Groups are visited in ascending id order; within a group at most
/// `repair_lines - in_repair` entities are admitted.
pub fn select_admissions(store: &EntityStore, groups: &GroupTable) -> Vec<Slot> {
    let mut waiting: BTreeMap<GroupId, Vec<Slot>> = BTreeMap::new();
    let mut in_repair: BTreeMap<GroupId, u32> = BTreeMap::new();

    for slot in store.active_slots() {
        match store.state(slot) {
            EntityState::Unserviceable => {
                waiting.entry(store.group(slot)).or_default().push(slot)
            }
            EntityState::Repair => *in_repair.entry(store.group(slot)).or_default() += 1,
            _ => {}
        }
    }

    let mut admitted = Vec::new();
    for (group, mut slots) in waiting {
        let free = match groups.config(group).repair_lines {
            Some(lines) => lines.saturating_sub(in_repair.get(&group).copied().unwrap_or(0)),
            None => u32::MAX,
        };
        slots.sort_by_key(|&slot| {
            (
                store.status_change_day(slot),
                store.manufacture(slot),
                store.id(slot),
            )
        });
        admitted.extend(slots.into_iter().take(free as usize));
    }
    admitted
}
