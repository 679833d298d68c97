//! Adaptive scheduler: how far the clock may jump
//!
//! The next boundary is the earliest day on which any state can change:
//!
//! ```text
//! step = min(
//!     min over Operations entities of (limiter_date - day),
//!     min over Repair entities of (repair_time - elapsed),
//!     next calendar day - day,
//!     horizon - day,
//! )
//! clamped to [1, horizon - day]
//! ```
//!
//! Nothing changes strictly inside a step, so an adaptive run reaches the
//! same states as a run with one-day steps. [`StepMode::Daily`] forces
//! one-day steps for that comparison.

use crate::core::time::Day;
use crate::lifecycle::repair;
use crate::models::{EntityId, EntityState, EntityStore};
use crate::schedule::{Calendar, CalendarEvent};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Stepping policy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepMode {
    /// Jump to the next state-changing day
    #[default]
    Adaptive,

    /// One day per step
    Daily,
}

/// What bounded a step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StepReason {
    /// An Operations entity exhausts a budget at the next boundary
    Limiter { entity: EntityId },

    /// A repair completes at the next boundary
    RepairCompletion { entity: EntityId },

    /// A precomputed calendar day
    Calendar { event: CalendarEvent },

    /// The horizon ends the run
    Horizon,

    /// A due change forced the one-day minimum
    MinimumStep,

    /// Daily stepping
    Daily,
}

impl StepReason {
    /// Stable label used in summaries
    pub fn label(&self) -> &'static str {
        match self {
            StepReason::Limiter { .. } => "limiter",
            StepReason::RepairCompletion { .. } => "repair_completion",
            StepReason::Calendar { event } => match event {
                CalendarEvent::TargetChange => "calendar_target_change",
                CalendarEvent::Spawn => "calendar_spawn",
                CalendarEvent::RepairExit => "calendar_repair_exit",
                CalendarEvent::InactiveReady => "calendar_inactive_ready",
            },
            StepReason::Horizon => "horizon",
            StepReason::MinimumStep => "minimum_step",
            StepReason::Daily => "daily",
        }
    }
}

/// Chosen step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepPlan {
    pub length: Day,
    pub reason: StepReason,
}

/// One entry of the step log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepRecord {
    pub step: usize,
    pub day: Day,
    pub length: Day,
    pub reason: StepReason,
}

/// Picks the length of the next step
#[derive(Debug, Clone, Copy, Default)]
pub struct AdaptiveScheduler {
    mode: StepMode,
}

impl AdaptiveScheduler {
    pub fn new(mode: StepMode) -> Self {
        Self { mode }
    }

    /// Plan the step starting at boundary `day`
    ///
    /// Ties between candidates of equal length resolve to the first in
    /// declaration order of [`StepReason`]; ties between entities resolve to
    /// the smaller id.
    ///
    /// # Example
    /// ```
    /// use fleet_simulator_core_rs::models::EntityStore;
    /// use fleet_simulator_core_rs::orchestrator::{AdaptiveScheduler, StepMode, StepReason};
    /// use fleet_simulator_core_rs::schedule::Calendar;
    ///
    /// let scheduler = AdaptiveScheduler::new(StepMode::Adaptive);
    /// let plan = scheduler.plan(&EntityStore::new(), &Calendar::new(30), 10, 30);
    /// assert_eq!(plan.length, 20);
    /// assert_eq!(plan.reason, StepReason::Horizon);
    /// ```
    pub fn plan(&self, store: &EntityStore, calendar: &Calendar, day: Day, horizon: Day) -> StepPlan {
        let remaining = horizon.saturating_sub(day).max(1);
        if self.mode == StepMode::Daily {
            return StepPlan {
                length: 1,
                reason: StepReason::Daily,
            };
        }

        let slots: Vec<usize> = store.active_slots().collect();
        let entity_bound = slots
            .par_iter()
            .filter_map(|&slot| match store.state(slot) {
                EntityState::Operations => store
                    .limiter_date(slot)
                    .filter(|&limiter| limiter < horizon)
                    .map(|limiter| {
                        (
                            limiter.saturating_sub(day),
                            StepReason::Limiter {
                                entity: store.id(slot),
                            },
                        )
                    }),
                EntityState::Repair => Some((
                    repair::days_to_completion(store, slot),
                    StepReason::RepairCompletion {
                        entity: store.id(slot),
                    },
                )),
                _ => None,
            })
            .min();

        let mut best = (remaining, StepReason::Horizon);
        if let Some(candidate) = entity_bound {
            best = best.min(candidate);
        }
        if let Some((next, event)) = calendar.next_after(day) {
            best = best.min((next - day, StepReason::Calendar { event }));
        }

        let (length, reason) = best;
        if length == 0 {
            StepPlan {
                length: 1,
                reason: StepReason::MinimumStep,
            }
        } else {
            StepPlan {
                length: length.min(remaining),
                reason,
            }
        }
    }
}
