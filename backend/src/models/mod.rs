//! Domain models: entities, groups, the entity store, the usage index and
//! the audit log

pub mod entity;
pub mod event;
pub mod group;
pub mod store;
pub mod usage_index;

pub use entity::{
    EntityId, EntitySnapshot, EntityState, GroupId, Ordinal, ResolvedLimits, ResourceLimits,
    Usage,
};
pub use event::{Event, EventLog, ExhaustedLimit};
pub use group::{DynamicSpawnConfig, GroupConfig, GroupTable, RepairBasis, SpawnProfile};
pub use store::{EntityStore, NewEntity, Slot, StoreError};
pub use usage_index::{RowId, UsagePrefixIndex, ZERO_ROW};
