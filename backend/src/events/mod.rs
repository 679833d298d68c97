//! Per-step notification bus between the state machine and the quota
//! controller

pub mod bus;
pub mod types;

pub use bus::{BusStats, EventBus};
pub use types::{BusEvent, BusEventKind, ReadyPool};
