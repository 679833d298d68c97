//! State machine: exit rules, readiness, limiter dates and usage accrual
//!
//! All per-entity rules live here. The state machine never decides
//! promotions or demotions (that is the quota controller's job); it reports
//! what each entity wants and applies what was decided.
//!
//! # Critical Invariants
//!
//! 1. **Exact accrual**: usage over a step is `prefix[D+Δ] - prefix[D]`,
//!    identical for any split of the same days into steps
//! 2. **Lifetime first**: lifetime exhaustion retires the entity even when
//!    the overhaul limit is exhausted too
//! 3. **One limiter per entry**: `limiter_date` is computed once when an
//!    entity enters Operations and never touched while it stays
//! 4. **Storage is terminal**: Storage entities produce no verdict action

use crate::core::time::Day;
use crate::events::{BusEvent, ReadyPool};
use crate::lifecycle::repair;
use crate::models::{
    EntityState, EntityStore, Event, EventLog, ExhaustedLimit, GroupTable, RepairBasis, Slot,
    StoreError, Usage, UsagePrefixIndex,
};
use rayon::prelude::*;
use tracing::trace;

/// What Phase A decided for one entity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Nothing changes at this boundary
    Stay,

    /// Operations entity exhausted a limit
    Exit {
        to: EntityState,
        limit: ExhaustedLimit,
    },

    /// Repair entity finished its repair
    CompleteRepair,

    /// Unserviceable entity skips repair under the group waiver
    WaiveRepair,
}

/// Phase A output for one entity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Verdict {
    pub slot: Slot,
    /// Desired next state
    pub intent: EntityState,
    pub action: Action,
    /// At most one bus event per entity per step
    pub event: Option<BusEvent>,
}

/// Totals of one accrual pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Accrual {
    /// Operations entities that accrued
    pub operating: usize,
    /// Repair entities that progressed
    pub repairing: usize,
    /// Usage added across all entities
    pub usage: Usage,
}

/// Per-entity lifecycle rules over a store
pub struct StateMachine<'a> {
    index: &'a UsagePrefixIndex,
    groups: &'a GroupTable,
}

impl<'a> StateMachine<'a> {
    pub fn new(index: &'a UsagePrefixIndex, groups: &'a GroupTable) -> Self {
        Self { index, groups }
    }

    // ========================================================================
    // Rules
    // ========================================================================

    /// Both remaining budgets are positive
    pub fn eligible(&self, store: &EntityStore, slot: Slot) -> bool {
        let (lifetime, overhaul) = store.remaining_budgets(slot);
        lifetime > 0 && overhaul > 0
    }

    /// Eligibility once a restoration has reset the since-overhaul counter
    fn eligible_after_reset(&self, store: &EntityStore, slot: Slot) -> bool {
        let (lifetime, _) = store.remaining_budgets(slot);
        lifetime > 0 && store.limits(slot).overhaul > 0
    }

    /// Eligibility of a ready Inactive entity, which is restored on promotion
    fn inactive_eligible(&self, store: &EntityStore, slot: Slot) -> bool {
        let group = self.groups.config(store.group(slot));
        if repair::waiver_applies(group, store, slot) {
            self.eligible(store, slot)
        } else {
            self.eligible_after_reset(store, slot)
        }
    }

    /// Where an Operations entity goes when its counters at this boundary
    /// exhaust a limit
    ///
    /// Lifetime exhaustion wins over overhaul exhaustion. On overhaul
    /// exhaustion a beyond-repair threshold of zero always retires; otherwise
    /// the group's repair basis picks the counter compared with it.
    pub fn exit_route(&self, store: &EntityStore, slot: Slot) -> Option<(EntityState, ExhaustedLimit)> {
        let limits = store.limits(slot);
        if store.lifetime_usage(slot) >= limits.lifetime {
            return Some((EntityState::Storage, ExhaustedLimit::Lifetime));
        }
        if store.overhaul_usage(slot) < limits.overhaul {
            return None;
        }

        let compared = match self.groups.config(store.group(slot)).repair_basis {
            RepairBasis::SinceOverhaul => store.overhaul_usage(slot),
            RepairBasis::Lifetime => store.lifetime_usage(slot),
        };
        let to = if limits.beyond_repair > 0 && compared < limits.beyond_repair {
            EntityState::Unserviceable
        } else {
            EntityState::Storage
        };
        Some((to, ExhaustedLimit::Overhaul))
    }

    /// Day this entity exhausts its first budget when operating from `day`
    ///
    /// The minimum of the lifetime and overhaul exhaustion days; the horizon
    /// when neither runs out.
    pub fn limiter_date(&self, store: &EntityStore, slot: Slot, day: Day) -> Day {
        let (lifetime, overhaul) = store.remaining_budgets(slot);
        let row = store.usage_row(slot);
        self.index
            .exhaustion_day(row, day, lifetime)
            .min(self.index.exhaustion_day(row, day, overhaul))
    }

    /// Intent of an entity that stays in its state
    pub fn resting_intent(&self, store: &EntityStore, slot: Slot, day: Day) -> EntityState {
        match store.state(slot) {
            EntityState::Operations => EntityState::Operations,
            state @ (EntityState::Serviceable | EntityState::Reserve) => {
                if self.eligible(store, slot) {
                    EntityState::Operations
                } else {
                    state
                }
            }
            EntityState::Inactive => {
                let group = self.groups.config(store.group(slot));
                if repair::inactive_ready(group, store, slot, day)
                    && self.inactive_eligible(store, slot)
                {
                    EntityState::Operations
                } else {
                    EntityState::Inactive
                }
            }
            EntityState::Repair => EntityState::Serviceable,
            EntityState::Unserviceable => EntityState::Repair,
            EntityState::Storage => EntityState::Storage,
        }
    }

    // ========================================================================
    // Phase A
    // ========================================================================

    /// Evaluate one entity at boundary `day`
    pub fn evaluate(&self, store: &EntityStore, slot: Slot, day: Day) -> Verdict {
        let id = store.id(slot);
        let group = store.group(slot);
        let manufacture = store.manufacture(slot);
        let ready = |pool| Some(BusEvent::ready(slot, id, group, manufacture, pool));

        let stay = |intent, event| Verdict {
            slot,
            intent,
            action: Action::Stay,
            event,
        };

        match store.state(slot) {
            EntityState::Operations => match self.exit_route(store, slot) {
                Some((to, limit)) => Verdict {
                    slot,
                    intent: to,
                    action: Action::Exit { to, limit },
                    event: Some(BusEvent::demount(slot, id, group, manufacture, to)),
                },
                None => stay(
                    EntityState::Operations,
                    Some(BusEvent::ops_report(slot, id, group, manufacture)),
                ),
            },

            EntityState::Repair if repair::repair_complete(store, slot) => {
                let eligible = self.eligible_after_reset(store, slot);
                Verdict {
                    slot,
                    intent: if eligible {
                        EntityState::Operations
                    } else {
                        EntityState::Serviceable
                    },
                    action: Action::CompleteRepair,
                    event: if eligible { ready(ReadyPool::Restored) } else { None },
                }
            }

            EntityState::Unserviceable
                if repair::waiver_applies(self.groups.config(group), store, slot) =>
            {
                let eligible = self.eligible(store, slot);
                Verdict {
                    slot,
                    intent: if eligible {
                        EntityState::Operations
                    } else {
                        EntityState::Serviceable
                    },
                    action: Action::WaiveRepair,
                    event: if eligible { ready(ReadyPool::Restored) } else { None },
                }
            }

            state => {
                let intent = self.resting_intent(store, slot, day);
                let event = if intent == EntityState::Operations {
                    match state {
                        EntityState::Serviceable => ready(ReadyPool::Serviceable),
                        EntityState::Reserve => ready(ReadyPool::Reserve),
                        EntityState::Inactive => ready(ReadyPool::Restored),
                        _ => None,
                    }
                } else {
                    None
                };
                stay(intent, event)
            }
        }
    }

    /// Phase A over every active entity, in parallel
    ///
    /// The result is ordered by slot regardless of thread scheduling.
    pub fn evaluate_all(&self, store: &EntityStore, day: Day) -> Vec<Verdict> {
        let slots: Vec<Slot> = store.active_slots().collect();
        slots
            .par_iter()
            .map(|&slot| self.evaluate(store, slot, day))
            .collect()
    }

    // ========================================================================
    // Phase D
    // ========================================================================

    /// Apply the individual part of a verdict (exits and repair outcomes)
    pub fn apply(
        &self,
        store: &mut EntityStore,
        verdict: &Verdict,
        day: Day,
        log: &mut EventLog,
    ) -> Result<(), StoreError> {
        let slot = verdict.slot;
        let entity = store.id(slot);
        let group = store.group(slot);
        store.set_intent(slot, verdict.intent);

        match verdict.action {
            Action::Stay => {}
            Action::Exit { to, limit } => {
                store.set_state(slot, to, day)?;
                let resting = self.resting_intent(store, slot, day);
                store.set_intent(slot, resting);
                trace!(entity, day, ?limit, to = %to, "limit exhausted");
                log.log(Event::Exhausted {
                    day,
                    entity,
                    group,
                    limit,
                    to,
                });
            }
            Action::CompleteRepair => {
                store.set_state(slot, EntityState::Serviceable, day)?;
                store.reset_after_repair(slot);
                trace!(entity, day, "repair complete");
                log.log(Event::RepairCompleted { day, entity, group });
            }
            Action::WaiveRepair => {
                store.set_state(slot, EntityState::Serviceable, day)?;
                trace!(entity, day, "repair waived");
                log.log(Event::RepairWaived { day, entity, group });
            }
        }
        Ok(())
    }

    /// Move an entity into Operations and fix its limiter date
    ///
    /// Inactive entities are restored on the way: their since-overhaul and
    /// elapsed counters reset unless the group waiver applies.
    pub fn enter_operations(
        &self,
        store: &mut EntityStore,
        slot: Slot,
        day: Day,
    ) -> Result<(), StoreError> {
        if store.state(slot) == EntityState::Inactive {
            let group = self.groups.config(store.group(slot));
            if !repair::waiver_applies(group, store, slot) {
                store.reset_after_repair(slot);
            }
        }
        store.set_state(slot, EntityState::Operations, day)?;
        store.set_intent(slot, EntityState::Operations);
        let limiter = self.limiter_date(store, slot, day);
        store.set_limiter_date(slot, limiter);
        trace!(entity = store.id(slot), day, limiter, "entered operations");
        Ok(())
    }

    /// Admit an Unserviceable entity into Repair
    pub fn admit_repair(
        &self,
        store: &mut EntityStore,
        slot: Slot,
        day: Day,
        log: &mut EventLog,
    ) -> Result<(), StoreError> {
        store.set_state(slot, EntityState::Repair, day)?;
        store.set_intent(slot, EntityState::Serviceable);
        let entity = store.id(slot);
        trace!(entity, day, "admitted to repair");
        log.log(Event::RepairAdmitted {
            day,
            entity,
            group: store.group(slot),
        });
        Ok(())
    }

    // ========================================================================
    // Accrual
    // ========================================================================

    /// Accrue the step `[from, to)`: usage for Operations, elapsed days for
    /// Repair
    ///
    /// Increments are gathered in parallel and applied in slot order.
    pub fn accrue(&self, store: &mut EntityStore, from: Day, to: Day) -> Accrual {
        enum Delta {
            Usage(Usage),
            RepairDays(Day),
        }

        let length = to.saturating_sub(from);
        let slots: Vec<Slot> = store.active_slots().collect();
        let deltas: Vec<(Slot, Delta)> = {
            let store = &*store;
            slots
                .par_iter()
                .filter_map(|&slot| match store.state(slot) {
                    EntityState::Operations => Some((
                        slot,
                        Delta::Usage(self.index.usage_between(store.usage_row(slot), from, to)),
                    )),
                    EntityState::Repair => Some((slot, Delta::RepairDays(length))),
                    _ => None,
                })
                .collect()
        };

        let mut totals = Accrual::default();
        for (slot, delta) in deltas {
            match delta {
                Delta::Usage(amount) => {
                    store.accrue_usage(slot, amount);
                    totals.operating += 1;
                    totals.usage = totals.usage.saturating_add(amount);
                }
                Delta::RepairDays(days) => {
                    store.add_repair_elapsed(slot, days);
                    totals.repairing += 1;
                }
            }
        }
        totals
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::BusEventKind;
    use crate::models::{EntitySnapshot, GroupConfig, ResourceLimits};

    fn setup(rows: &[EntitySnapshot], groups: &[GroupConfig]) -> (EntityStore, UsagePrefixIndex, GroupTable) {
        let mut index = UsagePrefixIndex::new(20);
        let row = index.insert_group_row(1, &[100; 20]).unwrap();
        let mut store = EntityStore::new();
        for snapshot in rows {
            store
                .insert_snapshot(snapshot, snapshot.repair_time.unwrap_or(10), row)
                .unwrap();
        }
        (store, index, GroupTable::new(groups))
    }

    fn operating(id: u32, lifetime: Usage, overhaul: Usage, br: Usage) -> EntitySnapshot {
        EntitySnapshot::new(id, 1, EntityState::Operations, id as i64)
            .with_limits(ResourceLimits::new(lifetime, overhaul, br))
    }

    #[test]
    fn test_limiter_takes_earliest_budget() {
        let (store, index, groups) = setup(&[operating(1, 1000, 500, 800)], &[GroupConfig::new(1, 10)]);
        let sm = StateMachine::new(&index, &groups);
        assert_eq!(sm.limiter_date(&store, 0, 0), 5);
        assert_eq!(sm.limiter_date(&store, 0, 3), 8);
    }

    #[test]
    fn test_lifetime_exhaustion_wins() {
        let row = operating(1, 1000, 500, 800).with_usage(1000, 500);
        let (store, index, groups) = setup(&[row], &[GroupConfig::new(1, 10)]);
        let sm = StateMachine::new(&index, &groups);
        assert_eq!(
            sm.exit_route(&store, 0),
            Some((EntityState::Storage, ExhaustedLimit::Lifetime))
        );
    }

    #[test]
    fn test_overhaul_routing_by_threshold() {
        let rows = [
            operating(1, 1000, 500, 800).with_usage(500, 500),
            operating(2, 1000, 500, 0).with_usage(500, 500),
            operating(3, 1000, 500, 400).with_usage(500, 500),
        ];
        let (store, index, groups) = setup(&rows, &[GroupConfig::new(1, 10)]);
        let sm = StateMachine::new(&index, &groups);
        assert_eq!(sm.exit_route(&store, 0).map(|r| r.0), Some(EntityState::Unserviceable));
        assert_eq!(sm.exit_route(&store, 1).map(|r| r.0), Some(EntityState::Storage));
        assert_eq!(sm.exit_route(&store, 2).map(|r| r.0), Some(EntityState::Storage));
    }

    #[test]
    fn test_lifetime_basis_compares_lifetime() {
        let row = operating(1, 5000, 500, 2000).with_usage(2500, 500);
        let groups = [GroupConfig::new(1, 10).with_repair_basis(RepairBasis::Lifetime)];
        let (store, index, groups) = setup(&[row], &groups);
        let sm = StateMachine::new(&index, &groups);
        assert_eq!(sm.exit_route(&store, 0).map(|r| r.0), Some(EntityState::Storage));
    }

    #[test]
    fn test_operations_entity_reports_every_step() {
        let (store, index, groups) = setup(&[operating(1, 1000, 500, 800)], &[GroupConfig::new(1, 10)]);
        let sm = StateMachine::new(&index, &groups);
        let verdict = sm.evaluate(&store, 0, 0);
        assert_eq!(verdict.action, Action::Stay);
        assert_eq!(verdict.event.map(|e| e.kind), Some(BusEventKind::OpsReport));
    }

    #[test]
    fn test_exhausted_pool_entity_is_held() {
        let row = EntitySnapshot::new(1, 1, EntityState::Serviceable, 0)
            .with_limits(ResourceLimits::new(1000, 500, 800))
            .with_usage(500, 500);
        let (store, index, groups) = setup(&[row], &[GroupConfig::new(1, 10)]);
        let sm = StateMachine::new(&index, &groups);
        let verdict = sm.evaluate(&store, 0, 0);
        assert_eq!(verdict.intent, EntityState::Serviceable);
        assert_eq!(verdict.event, None);
    }

    #[test]
    fn test_accrual_is_exact_for_any_split() {
        let (mut whole, index, groups) = setup(&[operating(1, 10_000, 5_000, 800)], &[GroupConfig::new(1, 10)]);
        let mut split = whole.clone();
        let sm = StateMachine::new(&index, &groups);

        sm.accrue(&mut whole, 0, 7);
        sm.accrue(&mut split, 0, 2);
        sm.accrue(&mut split, 2, 3);
        sm.accrue(&mut split, 3, 7);

        assert_eq!(whole.lifetime_usage(0), 700);
        assert_eq!(split.lifetime_usage(0), whole.lifetime_usage(0));
    }

    #[test]
    fn test_repair_completion_resets_overhaul() {
        let row = EntitySnapshot::new(1, 1, EntityState::Repair, 0)
            .with_limits(ResourceLimits::new(1000, 500, 800))
            .with_usage(600, 500)
            .with_repair(10, 10);
        let (mut store, index, groups) = setup(&[row], &[GroupConfig::new(1, 10)]);
        let sm = StateMachine::new(&index, &groups);
        let mut log = EventLog::new();

        let verdict = sm.evaluate(&store, 0, 4);
        assert_eq!(verdict.action, Action::CompleteRepair);
        assert_eq!(verdict.event.and_then(|e| e.pool()), Some(ReadyPool::Restored));

        sm.apply(&mut store, &verdict, 4, &mut log).unwrap();
        assert_eq!(store.state(0), EntityState::Serviceable);
        assert_eq!(store.overhaul_usage(0), 0);
        assert_eq!(store.lifetime_usage(0), 600);
        assert_eq!(log.count_of_type("RepairCompleted"), 1);
    }

    #[test]
    fn test_inactive_promotion_restores_unless_waived() {
        let rows = [
            EntitySnapshot::new(1, 1, EntityState::Inactive, 0)
                .with_limits(ResourceLimits::new(1000, 500, 800))
                .with_usage(400, 300),
            EntitySnapshot::new(2, 1, EntityState::Inactive, 0)
                .with_limits(ResourceLimits::new(1000, 500, 800))
                .with_usage(400, 100),
        ];
        let (mut store, index, groups) = setup(&rows, &[GroupConfig::new(1, 0).with_waiver(200)]);
        let sm = StateMachine::new(&index, &groups);

        sm.enter_operations(&mut store, 0, 0).unwrap();
        sm.enter_operations(&mut store, 1, 0).unwrap();
        assert_eq!(store.overhaul_usage(0), 0);
        assert_eq!(store.overhaul_usage(1), 100);
        assert_eq!(store.limiter_date(1), Some(4));
    }
}
