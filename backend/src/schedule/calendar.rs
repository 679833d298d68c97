//! Deterministic calendar of known state-changing days
//!
//! Some boundaries are known before the run starts: target changes, scheduled
//! spawns, completions of repairs already under way at day 0 and the days
//! inactive entities become ready. The calendar holds them so the scheduler
//! never steps across one.

use crate::core::time::Day;
use crate::schedule::{SpawnSchedule, TargetTable};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Why a calendar day is a boundary
///
/// When several reasons fall on one day, the first in declaration order is
/// kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalendarEvent {
    TargetChange,
    Spawn,
    RepairExit,
    InactiveReady,
}

/// Sorted set of calendar boundaries
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Calendar {
    days: BTreeMap<Day, CalendarEvent>,
    horizon: Day,
}

impl Calendar {
    /// Empty calendar (day 0 only)
    pub fn new(horizon: Day) -> Self {
        let mut calendar = Self {
            days: BTreeMap::new(),
            horizon,
        };
        calendar.insert(0, CalendarEvent::TargetChange);
        calendar
    }

    /// Precompute every known boundary
    ///
    /// # Arguments
    /// * `repair_exits` - completion days of entities in Repair at day 0
    /// * `inactive_ready` - readiness days of Inactive entities
    ///
    /// # Example
    /// ```
    /// use fleet_simulator_core_rs::schedule::{Calendar, CalendarEvent, SpawnSchedule, TargetTable};
    ///
    /// let targets = TargetTable::new().with_row(1, vec![3, 3, 3, 4, 4, 4]);
    /// let spawns = SpawnSchedule::new().with_spawn(1, 2, 1, 6);
    /// let calendar = Calendar::build(6, &targets, &spawns, [5], []);
    ///
    /// assert_eq!(calendar.next_after(0), Some((2, CalendarEvent::Spawn)));
    /// assert_eq!(calendar.next_after(2), Some((3, CalendarEvent::TargetChange)));
    /// assert_eq!(calendar.next_after(3), Some((5, CalendarEvent::RepairExit)));
    /// assert_eq!(calendar.next_after(5), None);
    /// ```
    pub fn build(
        horizon: Day,
        targets: &TargetTable,
        spawns: &SpawnSchedule,
        repair_exits: impl IntoIterator<Item = Day>,
        inactive_ready: impl IntoIterator<Item = Day>,
    ) -> Self {
        let mut calendar = Self::new(horizon);
        for day in targets.change_days() {
            calendar.insert(day, CalendarEvent::TargetChange);
        }
        for day in spawns.spawn_days() {
            calendar.insert(day, CalendarEvent::Spawn);
        }
        for day in repair_exits {
            calendar.insert(day, CalendarEvent::RepairExit);
        }
        for day in inactive_ready {
            calendar.insert(day, CalendarEvent::InactiveReady);
        }
        calendar
    }

    /// Add a boundary; days at or past the horizon are ignored
    pub fn insert(&mut self, day: Day, event: CalendarEvent) {
        if day >= self.horizon {
            return;
        }
        self.days
            .entry(day)
            .and_modify(|existing| *existing = (*existing).min(event))
            .or_insert(event);
    }

    /// First boundary strictly after `day`
    pub fn next_after(&self, day: Day) -> Option<(Day, CalendarEvent)> {
        self.days
            .range(day.saturating_add(1)..)
            .next()
            .map(|(&d, &event)| (d, event))
    }

    pub fn contains(&self, day: Day) -> bool {
        self.days.contains_key(&day)
    }

    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }
}
