//! Usage Prefix Index - exact cumulative usage lookups
//!
//! Provides O(1) "usage between two days" and O(log horizon) "day a budget is
//! exhausted" queries over the daily usage schedule.
//!
//! # Problem
//!
//! Accruing usage day by day costs O(days) per entity, and finding the day an
//! entity runs out of budget by scanning forward costs the same again. With
//! adaptive steps the engine needs both answers for arbitrary day ranges.
//!
//! # Solution
//!
//! Build each usage row once as a prefix sum:
//! `prefix[0] = 0`, `prefix[d] = prefix[d-1] + daily[d-1]`.
//!
//! Usage over `[from, to)` is `prefix[to] - prefix[from]`, which is exact for
//! any step length. Because prefix rows are non-decreasing, exhaustion is a
//! binary search.
//!
//! Rows are keyed per entity, with a per-group row as the fallback for
//! entities that have no row of their own (including every spawned entity).
//!
//! # Usage
//!
//! ```rust
//! use fleet_simulator_core_rs::models::UsagePrefixIndex;
//!
//! let mut index = UsagePrefixIndex::new(10);
//! let row = index.insert_entity_row(7, &[100; 10]).unwrap();
//!
//! assert_eq!(index.usage_between(row, 2, 5), 300);
//! // 500 units from day 0 are used up by the end of day 4
//! assert_eq!(index.exhaustion_day(row, 0, 500), 5);
//! ```

use crate::core::time::Day;
use crate::models::entity::{EntityId, GroupId, Usage};
use crate::schedule::ScheduleError;
use std::collections::HashMap;

/// Index of a prefix row inside the index
pub type RowId = usize;

/// Row shared by entities that have no usage data at all
pub const ZERO_ROW: RowId = 0;

/// Cumulative usage rows for the whole horizon
#[derive(Debug, Clone)]
pub struct UsagePrefixIndex {
    horizon: Day,

    /// Each row holds `horizon + 1` cumulative values
    rows: Vec<Vec<Usage>>,

    by_entity: HashMap<EntityId, RowId>,
    by_group: HashMap<GroupId, RowId>,
}

impl UsagePrefixIndex {
    /// Create an index with only the all-zero row
    pub fn new(horizon: Day) -> Self {
        Self {
            horizon,
            rows: vec![vec![0; horizon as usize + 1]],
            by_entity: HashMap::new(),
            by_group: HashMap::new(),
        }
    }

    /// Horizon the rows cover
    pub fn horizon(&self) -> Day {
        self.horizon
    }

    /// Add the daily usage row of one entity
    ///
    /// # Errors
    /// `ScheduleError::Arity` when `daily` does not have exactly one value
    /// per horizon day.
    pub fn insert_entity_row(
        &mut self,
        entity: EntityId,
        daily: &[Usage],
    ) -> Result<RowId, ScheduleError> {
        let row = self.push_row(daily, || format!("usage row of entity {entity}"))?;
        self.by_entity.insert(entity, row);
        Ok(row)
    }

    /// Add the fallback daily usage row of a group
    pub fn insert_group_row(
        &mut self,
        group: GroupId,
        daily: &[Usage],
    ) -> Result<RowId, ScheduleError> {
        let row = self.push_row(daily, || format!("usage row of group {group}"))?;
        self.by_group.insert(group, row);
        Ok(row)
    }

    fn push_row(
        &mut self,
        daily: &[Usage],
        table: impl FnOnce() -> String,
    ) -> Result<RowId, ScheduleError> {
        if daily.len() != self.horizon as usize {
            return Err(ScheduleError::Arity {
                table: table(),
                expected: self.horizon as usize,
                actual: daily.len(),
            });
        }

        let mut prefix = Vec::with_capacity(daily.len() + 1);
        let mut running: Usage = 0;
        prefix.push(running);
        for &value in daily {
            running = running.saturating_add(value);
            prefix.push(running);
        }

        self.rows.push(prefix);
        Ok(self.rows.len() - 1)
    }

    /// Row for an entity: its own row, else its group's row
    pub fn row_for(&self, entity: EntityId, group: GroupId) -> Option<RowId> {
        self.by_entity
            .get(&entity)
            .or_else(|| self.by_group.get(&group))
            .copied()
    }

    /// Row for a group, if one was supplied
    pub fn group_row(&self, group: GroupId) -> Option<RowId> {
        self.by_group.get(&group).copied()
    }

    /// Cumulative usage at boundary `day` (usage of days `< day`)
    ///
    /// Days past the horizon read as the horizon value.
    pub fn cumulative(&self, row: RowId, day: Day) -> Usage {
        let prefix = &self.rows[row];
        prefix[(day.min(self.horizon)) as usize]
    }

    /// Usage accrued over `[from, to)`
    pub fn usage_between(&self, row: RowId, from: Day, to: Day) -> Usage {
        if to <= from {
            return 0;
        }
        self.cumulative(row, to) - self.cumulative(row, from)
    }

    /// Daily usage on day `day`
    pub fn daily(&self, row: RowId, day: Day) -> Usage {
        self.usage_between(row, day, day + 1)
    }

    /// Smallest boundary `d >= start` with `prefix[d] - prefix[start] >= budget`
    ///
    /// Returns the horizon when the budget outlasts the horizon, and `start`
    /// when the budget is zero. Pure function of its inputs.
    ///
    /// # Complexity
    /// O(log horizon)
    pub fn exhaustion_day(&self, row: RowId, start: Day, budget: Usage) -> Day {
        let start = start.min(self.horizon);
        if budget == 0 {
            return start;
        }

        let prefix = &self.rows[row];
        let base = prefix[start as usize];
        let Some(goal) = base.checked_add(budget) else {
            return self.horizon;
        };

        let tail = &prefix[start as usize..];
        let offset = tail.partition_point(|&value| value < goal);
        if offset == tail.len() {
            self.horizon
        } else {
            start + offset as Day
        }
    }
}
