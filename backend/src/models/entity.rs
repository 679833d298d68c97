//! Entity model
//!
//! An entity is one trackable airframe or component. Each entity has:
//! - A lifecycle state and an intent (the state it wants next)
//! - Two usage counters: lifetime (since new) and since last overhaul
//! - Three limits: lifetime, overhaul and beyond-repair threshold
//! - A repair norm and elapsed repair days
//! - A manufacture ordinal that resolves every ranking tie
//!
//! CRITICAL: usage is integer units (u64). No floating point takes part in
//! accounting.

use crate::core::time::Day;
use serde::{Deserialize, Serialize};

/// Unique entity identifier
pub type EntityId = u32;

/// Equipment group identifier
pub type GroupId = u16;

/// Usage amount in integer units
pub type Usage = u64;

/// Manufacture date as a day ordinal; earlier manufacture = smaller value
pub type Ordinal = i64;

/// Lifecycle state of an entity
///
/// The numeric codes match the state ids of the source data tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityState {
    Inactive,
    Operations,
    Serviceable,
    Repair,
    Reserve,
    Storage,
    Unserviceable,
}

impl EntityState {
    /// Every state, in code order
    pub const ALL: [EntityState; 7] = [
        EntityState::Inactive,
        EntityState::Operations,
        EntityState::Serviceable,
        EntityState::Repair,
        EntityState::Reserve,
        EntityState::Storage,
        EntityState::Unserviceable,
    ];

    /// Numeric state code (1..=7)
    pub fn code(self) -> u8 {
        match self {
            EntityState::Inactive => 1,
            EntityState::Operations => 2,
            EntityState::Serviceable => 3,
            EntityState::Repair => 4,
            EntityState::Reserve => 5,
            EntityState::Storage => 6,
            EntityState::Unserviceable => 7,
        }
    }

    /// Parse a numeric state code
    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.iter().copied().find(|s| s.code() == code)
    }

    /// Lower-case name used in traces and logs
    pub fn name(self) -> &'static str {
        match self {
            EntityState::Inactive => "inactive",
            EntityState::Operations => "operations",
            EntityState::Serviceable => "serviceable",
            EntityState::Repair => "repair",
            EntityState::Reserve => "reserve",
            EntityState::Storage => "storage",
            EntityState::Unserviceable => "unserviceable",
        }
    }

    /// Whether `self -> next` is one of the defined transitions
    ///
    /// Storage is absorbing. Staying in the same state is always allowed.
    ///
    /// # Example
    /// ```
    /// use fleet_simulator_core_rs::models::EntityState;
    ///
    /// assert!(EntityState::Operations.can_transition_to(EntityState::Storage));
    /// assert!(!EntityState::Storage.can_transition_to(EntityState::Operations));
    /// ```
    pub fn can_transition_to(self, next: EntityState) -> bool {
        use EntityState::*;
        if self == next {
            return true;
        }
        matches!(
            (self, next),
            (Operations, Serviceable)
                | (Operations, Unserviceable)
                | (Operations, Storage)
                | (Serviceable, Operations)
                | (Reserve, Operations)
                | (Inactive, Operations)
                | (Unserviceable, Repair)
                | (Unserviceable, Serviceable)
                | (Repair, Serviceable)
        )
    }
}

impl std::fmt::Display for EntityState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Resource limits as supplied by the snapshot
///
/// `None` means the value was missing in the source data and is treated as
/// "never exhausts". A beyond-repair threshold of `Some(0)` is different from
/// `None`: zero marks an entity that can never be repaired.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceLimits {
    /// Lifetime limit (mandatory retirement)
    #[serde(default)]
    pub lifetime: Option<Usage>,

    /// Usage allowed between overhauls
    #[serde(default)]
    pub overhaul: Option<Usage>,

    /// Usage level past which repair is uneconomical
    #[serde(default)]
    pub beyond_repair: Option<Usage>,
}

impl ResourceLimits {
    /// Limits with every value present
    pub fn new(lifetime: Usage, overhaul: Usage, beyond_repair: Usage) -> Self {
        Self {
            lifetime: Some(lifetime),
            overhaul: Some(overhaul),
            beyond_repair: Some(beyond_repair),
        }
    }

    /// Permissive resolution: missing values never exhaust
    pub fn resolved(&self) -> ResolvedLimits {
        ResolvedLimits {
            lifetime: self.lifetime.unwrap_or(Usage::MAX),
            overhaul: self.overhaul.unwrap_or(Usage::MAX),
            beyond_repair: self.beyond_repair.unwrap_or(Usage::MAX),
        }
    }

    /// Names of the limits that are missing
    pub fn missing(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.lifetime.is_none() {
            missing.push("lifetime");
        }
        if self.overhaul.is_none() {
            missing.push("overhaul");
        }
        if self.beyond_repair.is_none() {
            missing.push("beyond_repair");
        }
        missing
    }
}

/// Limits after the permissive default has been applied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedLimits {
    pub lifetime: Usage,
    pub overhaul: Usage,
    pub beyond_repair: Usage,
}

impl ResolvedLimits {
    /// Back to the optional form; `Usage::MAX` reads as missing
    pub fn to_limits(self) -> ResourceLimits {
        let opt = |v: Usage| if v == Usage::MAX { None } else { Some(v) };
        ResourceLimits {
            lifetime: opt(self.lifetime),
            overhaul: opt(self.overhaul),
            beyond_repair: opt(self.beyond_repair),
        }
    }
}

/// One entity row, used for the initial inventory and for checkpoints
///
/// # Example
/// ```
/// use fleet_simulator_core_rs::models::{EntitySnapshot, EntityState, ResourceLimits};
///
/// let row = EntitySnapshot::new(17, 1, EntityState::Serviceable, 1_650)
///     .with_limits(ResourceLimits::new(1000, 500, 800))
///     .with_usage(120, 40);
/// assert_eq!(row.lifetime_usage, 120);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitySnapshot {
    pub id: EntityId,
    pub group: GroupId,
    pub state: EntityState,

    /// Desired next state; derived from the state when absent
    #[serde(default)]
    pub intent: Option<EntityState>,

    /// Usage since new
    #[serde(default)]
    pub lifetime_usage: Usage,

    /// Usage since last overhaul
    #[serde(default)]
    pub overhaul_usage: Usage,

    #[serde(default)]
    pub limits: ResourceLimits,

    /// Repair duration norm in days; the group default applies when absent
    #[serde(default)]
    pub repair_time: Option<Day>,

    /// Repair days already elapsed
    #[serde(default)]
    pub repair_elapsed: Day,

    /// Manufacture date ordinal
    pub manufacture: Ordinal,

    /// Day the current state was entered
    #[serde(default)]
    pub status_change_day: Day,

    /// Cached exhaustion day; only meaningful in Operations
    #[serde(default)]
    pub limiter_date: Option<Day>,
}

impl EntitySnapshot {
    /// Minimal row with zero usage and missing limits
    pub fn new(id: EntityId, group: GroupId, state: EntityState, manufacture: Ordinal) -> Self {
        Self {
            id,
            group,
            state,
            intent: None,
            lifetime_usage: 0,
            overhaul_usage: 0,
            limits: ResourceLimits::default(),
            repair_time: None,
            repair_elapsed: 0,
            manufacture,
            status_change_day: 0,
            limiter_date: None,
        }
    }

    /// Builder: set limits
    pub fn with_limits(mut self, limits: ResourceLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Builder: set lifetime and since-overhaul usage
    pub fn with_usage(mut self, lifetime: Usage, overhaul: Usage) -> Self {
        self.lifetime_usage = lifetime;
        self.overhaul_usage = overhaul;
        self
    }

    /// Builder: set repair norm and elapsed days
    pub fn with_repair(mut self, repair_time: Day, elapsed: Day) -> Self {
        self.repair_time = Some(repair_time);
        self.repair_elapsed = elapsed;
        self
    }
}
