//! External input tables
//!
//! The engine is driven by three daily tables supplied before the run:
//! - [`TargetTable`]: Operations headcount per group per day
//! - [`UsageSchedule`]: usage increment per entity (or per group) per day
//! - [`SpawnSchedule`]: new entities per group per day
//!
//! Every table row holds exactly one value per horizon day; row `d` is the
//! value that applies during day `d`. Arity and group keys are checked once,
//! before step 0.

pub mod calendar;

pub use calendar::{Calendar, CalendarEvent};

use crate::core::time::Day;
use crate::models::entity::{EntityId, EntitySnapshot, GroupId, Usage};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Errors in the shape of the input tables
#[derive(Debug, Error, PartialEq)]
pub enum ScheduleError {
    #[error("{table}: expected {expected} daily values, got {actual}")]
    Arity {
        table: String,
        expected: usize,
        actual: usize,
    },

    #[error("{table}: unknown group {group}")]
    UnknownGroup { table: String, group: GroupId },

    #[error("No target row for group {0}")]
    MissingTargets(GroupId),

    #[error("No usage row for entity {entity} or its group {group}")]
    MissingUsage { entity: EntityId, group: GroupId },
}

fn check_rows<T>(
    table: &str,
    rows: &BTreeMap<GroupId, Vec<T>>,
    horizon: Day,
    groups: &[GroupId],
) -> Result<(), ScheduleError> {
    for (&group, row) in rows {
        if !groups.contains(&group) {
            return Err(ScheduleError::UnknownGroup {
                table: table.to_string(),
                group,
            });
        }
        if row.len() != horizon as usize {
            return Err(ScheduleError::Arity {
                table: format!("{table} of group {group}"),
                expected: horizon as usize,
                actual: row.len(),
            });
        }
    }
    Ok(())
}

// ============================================================================
// Targets
// ============================================================================

/// Target Operations headcount per group per day
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TargetTable {
    rows: BTreeMap<GroupId, Vec<u32>>,
}

impl TargetTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: set the whole row of a group
    pub fn with_row(mut self, group: GroupId, row: Vec<u32>) -> Self {
        self.rows.insert(group, row);
        self
    }

    /// Row of a constant target
    pub fn with_constant(self, group: GroupId, target: u32, horizon: Day) -> Self {
        self.with_row(group, vec![target; horizon as usize])
    }

    /// Target of `group` for day `day`; zero past the end of the row
    pub fn target(&self, group: GroupId, day: Day) -> u32 {
        self.rows
            .get(&group)
            .and_then(|row| row.get(day as usize))
            .copied()
            .unwrap_or(0)
    }

    /// Days (other than 0) on which any group's target differs from the day
    /// before
    pub fn change_days(&self) -> Vec<Day> {
        let mut days: Vec<Day> = self
            .rows
            .values()
            .flat_map(|row| {
                row.windows(2)
                    .enumerate()
                    .filter(|(_, pair)| pair[0] != pair[1])
                    .map(|(i, _)| i as Day + 1)
            })
            .collect();
        days.sort_unstable();
        days.dedup();
        days
    }

    /// Check arity and that every configured group has a row
    pub fn validate(&self, horizon: Day, groups: &[GroupId]) -> Result<(), ScheduleError> {
        check_rows("target table", &self.rows, horizon, groups)?;
        for &group in groups {
            if !self.rows.contains_key(&group) {
                return Err(ScheduleError::MissingTargets(group));
            }
        }
        Ok(())
    }
}

// ============================================================================
// Usage
// ============================================================================

/// Daily usage per entity, with per-group rows as the fallback
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageSchedule {
    #[serde(default)]
    pub entities: BTreeMap<EntityId, Vec<Usage>>,

    #[serde(default)]
    pub groups: BTreeMap<GroupId, Vec<Usage>>,
}

impl UsageSchedule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entity_row(mut self, entity: EntityId, row: Vec<Usage>) -> Self {
        self.entities.insert(entity, row);
        self
    }

    pub fn with_group_row(mut self, group: GroupId, row: Vec<Usage>) -> Self {
        self.groups.insert(group, row);
        self
    }

    /// Constant daily usage for a whole group
    pub fn with_group_constant(self, group: GroupId, daily: Usage, horizon: Day) -> Self {
        self.with_group_row(group, vec![daily; horizon as usize])
    }

    /// Check group keys and that every snapshot entity has a row
    ///
    /// Entity rows are checked for arity when the prefix index is built.
    pub fn validate(
        &self,
        horizon: Day,
        groups: &[GroupId],
        entities: &[EntitySnapshot],
    ) -> Result<(), ScheduleError> {
        check_rows("usage schedule", &self.groups, horizon, groups)?;
        for row in entities {
            if !self.entities.contains_key(&row.id) && !self.groups.contains_key(&row.group) {
                return Err(ScheduleError::MissingUsage {
                    entity: row.id,
                    group: row.group,
                });
            }
        }
        Ok(())
    }
}

// ============================================================================
// Spawns
// ============================================================================

/// New entities per group per day
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SpawnSchedule {
    rows: BTreeMap<GroupId, Vec<u32>>,
}

impl SpawnSchedule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_row(mut self, group: GroupId, row: Vec<u32>) -> Self {
        self.rows.insert(group, row);
        self
    }

    /// Single spawn of `count` entities on `day`
    pub fn with_spawn(mut self, group: GroupId, day: Day, count: u32, horizon: Day) -> Self {
        let row = self
            .rows
            .entry(group)
            .or_insert_with(|| vec![0; horizon as usize]);
        if let Some(slot) = row.get_mut(day as usize) {
            *slot += count;
        }
        self
    }

    /// Scheduled count for `group` on `day`
    pub fn count(&self, group: GroupId, day: Day) -> u32 {
        self.rows
            .get(&group)
            .and_then(|row| row.get(day as usize))
            .copied()
            .unwrap_or(0)
    }

    /// Groups with a row, ascending
    pub fn groups(&self) -> impl Iterator<Item = GroupId> + '_ {
        self.rows.keys().copied()
    }

    /// Days with at least one scheduled spawn, ascending
    pub fn spawn_days(&self) -> Vec<Day> {
        let mut days: Vec<Day> = self
            .rows
            .values()
            .flat_map(|row| {
                row.iter()
                    .enumerate()
                    .filter(|(_, count)| **count > 0)
                    .map(|(day, _)| day as Day)
            })
            .collect();
        days.sort_unstable();
        days.dedup();
        days
    }

    /// Total scheduled over the horizon
    pub fn total(&self) -> u64 {
        self.rows
            .values()
            .flat_map(|row| row.iter())
            .map(|&count| count as u64)
            .sum()
    }

    pub fn validate(&self, horizon: Day, groups: &[GroupId]) -> Result<(), ScheduleError> {
        check_rows("spawn schedule", &self.rows, horizon, groups)
    }
}

/// Every table the engine needs besides its configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioInputs {
    /// Initial inventory
    pub entities: Vec<EntitySnapshot>,

    pub targets: TargetTable,

    pub usage: UsageSchedule,

    #[serde(default)]
    pub spawns: SpawnSchedule,
}
