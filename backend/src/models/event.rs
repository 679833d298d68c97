//! Audit log of simulation events.
//!
//! Every state change the engine applies is recorded here, in the order it
//! was applied. The log supports:
//! - Auditing (verify that every move followed the lifecycle rules)
//! - Debugging (see why an entity was promoted or retired, and when)
//! - Analysis (shortfall over time, spawn and repair volumes)
//!
//! This log is the engine's output record. It is separate from the per-step
//! notification bus in [`crate::events`], which only lives for one step.
//!
//! # Event Types
//!
//! - **Step**: the clock advanced and why
//! - **Exit**: an Operations entity exhausted a limit
//! - **Quota**: promotion, demotion, residual shortfall
//! - **Repair**: admission, completion, waiver
//! - **Spawn**: new entities and dropped requests
//!
//! # Example
//!
//! ```rust
//! use fleet_simulator_core_rs::models::{Event, EventLog};
//!
//! let mut log = EventLog::new();
//! log.log(Event::Demoted { day: 12, entity: 4, group: 1 });
//!
//! assert_eq!(log.events_at_day(12).len(), 1);
//! assert_eq!(log.events_for_entity(4)[0].event_type(), "Demoted");
//! ```

use crate::core::time::Day;
use crate::events::ReadyPool;
use crate::models::entity::{EntityId, EntityState, GroupId};
use crate::orchestrator::StepReason;
use serde::{Deserialize, Serialize};

/// Which limit an exiting entity ran out of
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExhaustedLimit {
    Lifetime,
    Overhaul,
}

/// Simulation event capturing a state change.
///
/// All events carry the boundary day they were applied at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event_type")]
pub enum Event {
    /// Clock advanced from `day` by `length` days
    StepAdvanced {
        day: Day,
        length: Day,
        reason: StepReason,
    },

    /// Operations entity left service after exhausting a limit
    Exhausted {
        day: Day,
        entity: EntityId,
        group: GroupId,
        limit: ExhaustedLimit,
        to: EntityState,
    },

    /// Entity moved from a ready pool into Operations
    Promoted {
        day: Day,
        entity: EntityId,
        group: GroupId,
        pool: ReadyPool,
    },

    /// Operations entity sent back to Serviceable to match the target
    Demoted {
        day: Day,
        entity: EntityId,
        group: GroupId,
    },

    /// Unserviceable entity took a repair line
    RepairAdmitted {
        day: Day,
        entity: EntityId,
        group: GroupId,
    },

    /// Repair finished; entity is Serviceable with a fresh overhaul budget
    RepairCompleted {
        day: Day,
        entity: EntityId,
        group: GroupId,
    },

    /// Unserviceable entity skipped repair under the group waiver
    RepairWaived {
        day: Day,
        entity: EntityId,
        group: GroupId,
    },

    /// New entity created
    Spawned {
        day: Day,
        entity: EntityId,
        group: GroupId,
        state: EntityState,
    },

    /// Spawn requests that found no free slot
    SpawnDropped {
        day: Day,
        group: GroupId,
        count: u32,
    },

    /// Deficit left after every ready pool was used
    Shortfall {
        day: Day,
        group: GroupId,
        target: u32,
        operations: u32,
        shortfall: u32,
    },
}

impl Event {
    /// Boundary day the event was applied at
    pub fn day(&self) -> Day {
        match self {
            Event::StepAdvanced { day, .. }
            | Event::Exhausted { day, .. }
            | Event::Promoted { day, .. }
            | Event::Demoted { day, .. }
            | Event::RepairAdmitted { day, .. }
            | Event::RepairCompleted { day, .. }
            | Event::RepairWaived { day, .. }
            | Event::Spawned { day, .. }
            | Event::SpawnDropped { day, .. }
            | Event::Shortfall { day, .. } => *day,
        }
    }

    /// Short name of the event type
    pub fn event_type(&self) -> &'static str {
        match self {
            Event::StepAdvanced { .. } => "StepAdvanced",
            Event::Exhausted { .. } => "Exhausted",
            Event::Promoted { .. } => "Promoted",
            Event::Demoted { .. } => "Demoted",
            Event::RepairAdmitted { .. } => "RepairAdmitted",
            Event::RepairCompleted { .. } => "RepairCompleted",
            Event::RepairWaived { .. } => "RepairWaived",
            Event::Spawned { .. } => "Spawned",
            Event::SpawnDropped { .. } => "SpawnDropped",
            Event::Shortfall { .. } => "Shortfall",
        }
    }

    /// Entity the event concerns, if any
    pub fn entity(&self) -> Option<EntityId> {
        match self {
            Event::Exhausted { entity, .. }
            | Event::Promoted { entity, .. }
            | Event::Demoted { entity, .. }
            | Event::RepairAdmitted { entity, .. }
            | Event::RepairCompleted { entity, .. }
            | Event::RepairWaived { entity, .. }
            | Event::Spawned { entity, .. } => Some(*entity),
            _ => None,
        }
    }

    /// Group the event concerns, if any
    pub fn group(&self) -> Option<GroupId> {
        match self {
            Event::StepAdvanced { .. } => None,
            Event::Exhausted { group, .. }
            | Event::Promoted { group, .. }
            | Event::Demoted { group, .. }
            | Event::RepairAdmitted { group, .. }
            | Event::RepairCompleted { group, .. }
            | Event::RepairWaived { group, .. }
            | Event::Spawned { group, .. }
            | Event::SpawnDropped { group, .. }
            | Event::Shortfall { group, .. } => Some(*group),
        }
    }
}

/// Event log for storing and querying simulation events.
///
/// A thin wrapper around `Vec<Event>` with query helpers.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventLog {
    events: Vec<Event>,
}

impl EventLog {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn log(&mut self, event: Event) {
        self.events.push(event);
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Events applied at a boundary day
    pub fn events_at_day(&self, day: Day) -> Vec<&Event> {
        self.events.iter().filter(|e| e.day() == day).collect()
    }

    /// Events of one type, by [`Event::event_type`] name
    pub fn events_of_type(&self, event_type: &str) -> Vec<&Event> {
        self.events
            .iter()
            .filter(|e| e.event_type() == event_type)
            .collect()
    }

    pub fn events_for_entity(&self, entity: EntityId) -> Vec<&Event> {
        self.events
            .iter()
            .filter(|e| e.entity() == Some(entity))
            .collect()
    }

    pub fn events_for_group(&self, group: GroupId) -> Vec<&Event> {
        self.events
            .iter()
            .filter(|e| e.group() == Some(group))
            .collect()
    }

    /// Count of events of one type
    pub fn count_of_type(&self, event_type: &str) -> usize {
        self.events
            .iter()
            .filter(|e| e.event_type() == event_type)
            .count()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}
