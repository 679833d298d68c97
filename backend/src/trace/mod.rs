//! Per-entity trace output
//!
//! Rows describe every active entity at the start of a day, after that day's
//! boundary decisions. With [`TraceGranularity::EveryDay`] the days inside an
//! adaptive step are filled in from the prefix index, so the rows are the
//! same as those of a daily run.

use crate::core::time::Day;
use crate::models::{EntityId, EntityState, EntityStore, GroupId, Slot, Usage, UsagePrefixIndex};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Which days produce trace rows
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TraceGranularity {
    #[default]
    Off,
    StepBoundaries,
    EveryDay,
}

/// State of one entity on one day
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceRow {
    pub run_id: Uuid,
    pub day: Day,
    pub entity_id: EntityId,
    pub group: GroupId,
    pub state: EntityState,
    pub intent: EntityState,
    pub lifetime_usage: Usage,
    pub overhaul_usage: Usage,
    pub repair_elapsed: Day,
    pub repair_time: Day,
    pub limiter_date: Option<Day>,
}

/// Collects trace rows for one run
#[derive(Debug, Clone)]
pub struct TraceRecorder {
    granularity: TraceGranularity,
    run_id: Uuid,
    rows: Vec<TraceRow>,
}

impl TraceRecorder {
    pub fn new(granularity: TraceGranularity, run_id: Uuid) -> Self {
        Self {
            granularity,
            run_id,
            rows: Vec::new(),
        }
    }

    pub fn rows(&self) -> &[TraceRow] {
        &self.rows
    }

    /// Hand the rows over, leaving the recorder empty
    pub fn take_rows(&mut self) -> Vec<TraceRow> {
        std::mem::take(&mut self.rows)
    }

    /// Record the step `[day, day + length)` before accrual
    ///
    /// The boundary row is always written (unless tracing is off); the inner
    /// days only with `EveryDay`.
    pub fn record_step(&mut self, store: &EntityStore, index: &UsagePrefixIndex, day: Day, length: Day) {
        let last = match self.granularity {
            TraceGranularity::Off => return,
            TraceGranularity::StepBoundaries => day,
            TraceGranularity::EveryDay => day + length.max(1) - 1,
        };

        let mut slots: Vec<Slot> = store.active_slots().collect();
        slots.sort_by_key(|&slot| store.id(slot));

        for d in day..=last {
            let offset = d - day;
            for &slot in &slots {
                let row = self.project(store, index, slot, day, offset);
                self.rows.push(row);
            }
        }
    }

    /// Row of `slot` `offset` days after boundary `day`
    fn project(&self, store: &EntityStore, index: &UsagePrefixIndex, slot: Slot, day: Day, offset: Day) -> TraceRow {
        let state = store.state(slot);
        let (usage, elapsed) = match state {
            EntityState::Operations => (index.usage_between(store.usage_row(slot), day, day + offset), 0),
            EntityState::Repair => (0, offset),
            _ => (0, 0),
        };
        TraceRow {
            run_id: self.run_id,
            day: day + offset,
            entity_id: store.id(slot),
            group: store.group(slot),
            state,
            intent: store.intent(slot),
            lifetime_usage: store.lifetime_usage(slot) + usage,
            overhaul_usage: store.overhaul_usage(slot) + usage,
            repair_elapsed: store.repair_elapsed(slot) + elapsed,
            repair_time: store.repair_time(slot),
            limiter_date: store.limiter_date(slot),
        }
    }
}
