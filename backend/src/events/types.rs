//! Bus event types
//!
//! Each entity publishes at most one [`BusEvent`] per step. Events only live
//! for the step that produced them.
//!
//! # Design Principles
//!
//! 1. **Mandatory Operations reports**: every Operations entity reports every
//!    step, either `OpsReport` (staying) or `Demount` (leaving), so headcount
//!    is rebuilt from live membership
//! 2. **Self-contained**: events carry the ranking key (manufacture ordinal)
//!    so consumers never read back into the store
//! 3. **Deterministic**: batches are ordered by slot

use crate::models::{EntityId, EntityState, GroupId, Ordinal, Slot};
use serde::{Deserialize, Serialize};

/// Ready pool an entity is offered in, in promotion priority order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadyPool {
    /// P1: Serviceable entities
    Serviceable,

    /// P2: Reserve entities
    Reserve,

    /// P3: ready Inactive entities and entities leaving repair at this
    /// boundary
    Restored,
}

impl ReadyPool {
    /// Every pool, highest priority first
    pub const PRIORITY: [ReadyPool; 3] =
        [ReadyPool::Serviceable, ReadyPool::Reserve, ReadyPool::Restored];

    /// 1-based priority (P1..P3)
    pub fn priority(self) -> u8 {
        match self {
            ReadyPool::Serviceable => 1,
            ReadyPool::Reserve => 2,
            ReadyPool::Restored => 3,
        }
    }
}

/// What an entity reports this step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BusEventKind {
    /// Operations entity staying in Operations
    OpsReport,

    /// Operations entity whose intent moved away from Operations
    Demount { to: EntityState },

    /// Entity eligible for promotion
    Ready { pool: ReadyPool },
}

/// One per-entity notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusEvent {
    pub slot: Slot,
    pub entity: EntityId,
    pub group: GroupId,
    pub manufacture: Ordinal,
    pub kind: BusEventKind,
}

impl BusEvent {
    pub fn ops_report(slot: Slot, entity: EntityId, group: GroupId, manufacture: Ordinal) -> Self {
        Self {
            slot,
            entity,
            group,
            manufacture,
            kind: BusEventKind::OpsReport,
        }
    }

    pub fn demount(
        slot: Slot,
        entity: EntityId,
        group: GroupId,
        manufacture: Ordinal,
        to: EntityState,
    ) -> Self {
        Self {
            slot,
            entity,
            group,
            manufacture,
            kind: BusEventKind::Demount { to },
        }
    }

    pub fn ready(
        slot: Slot,
        entity: EntityId,
        group: GroupId,
        manufacture: Ordinal,
        pool: ReadyPool,
    ) -> Self {
        Self {
            slot,
            entity,
            group,
            manufacture,
            kind: BusEventKind::Ready { pool },
        }
    }

    /// Pool of a READY event
    pub fn pool(&self) -> Option<ReadyPool> {
        match self.kind {
            BusEventKind::Ready { pool } => Some(pool),
            _ => None,
        }
    }
}
