//! Equipment group configuration
//!
//! A group is an equipment class sharing limits, repair norms and a quota
//! target. Everything the engine needs to know about a class that is not part
//! of an individual entity row lives here.

use crate::core::time::Day;
use crate::models::entity::{GroupId, ResourceLimits};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Which counter is compared with the beyond-repair threshold
///
/// When the overhaul limit is exhausted the entity either goes to repair or
/// retires. The comparison value differs between fleets: the default compares
/// usage since overhaul, while some source fleets carry the threshold as a
/// lifetime figure.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepairBasis {
    #[default]
    SinceOverhaul,
    Lifetime,
}

/// Growth process that covers residual shortfall with new entities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DynamicSpawnConfig {
    /// First boundary at which shortfall may be spawned away
    pub activation_day: Day,
}

/// Attributes given to entities created during the run
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SpawnProfile {
    /// Limits of a new entity
    #[serde(default)]
    pub limits: ResourceLimits,

    /// Repair norm; the group default applies when absent
    #[serde(default)]
    pub repair_time: Option<Day>,
}

/// Per-group configuration
///
/// # Example
/// ```
/// use fleet_simulator_core_rs::models::{GroupConfig, RepairBasis};
///
/// let group = GroupConfig::new(1, 30).with_repair_lines(2);
/// assert_eq!(group.repair_basis, RepairBasis::SinceOverhaul);
/// assert_eq!(group.repair_lines, Some(2));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupConfig {
    pub id: GroupId,

    /// Human-readable label used in logs
    #[serde(default)]
    pub name: String,

    /// Default repair duration norm in days
    pub repair_time: Day,

    #[serde(default)]
    pub repair_basis: RepairBasis,

    /// Since-overhaul usage below which repair is skipped entirely
    #[serde(default)]
    pub repair_waiver_threshold: Option<u64>,

    /// Maximum entities of this group in Repair at once (None = unlimited)
    #[serde(default)]
    pub repair_lines: Option<u32>,

    #[serde(default)]
    pub spawn_profile: SpawnProfile,

    #[serde(default)]
    pub dynamic_spawn: Option<DynamicSpawnConfig>,
}

impl GroupConfig {
    /// Group with default rules and the given repair norm
    pub fn new(id: GroupId, repair_time: Day) -> Self {
        Self {
            id,
            name: format!("group_{id}"),
            repair_time,
            repair_basis: RepairBasis::default(),
            repair_waiver_threshold: None,
            repair_lines: None,
            spawn_profile: SpawnProfile::default(),
            dynamic_spawn: None,
        }
    }

    pub fn with_repair_basis(mut self, basis: RepairBasis) -> Self {
        self.repair_basis = basis;
        self
    }

    pub fn with_repair_lines(mut self, lines: u32) -> Self {
        self.repair_lines = Some(lines);
        self
    }

    pub fn with_waiver(mut self, threshold: u64) -> Self {
        self.repair_waiver_threshold = Some(threshold);
        self
    }

    pub fn with_spawn_profile(mut self, limits: ResourceLimits) -> Self {
        self.spawn_profile.limits = limits;
        self
    }

    pub fn with_dynamic_spawn(mut self, activation_day: Day) -> Self {
        self.dynamic_spawn = Some(DynamicSpawnConfig { activation_day });
        self
    }

    /// Repair norm for a new entity of this group
    pub fn spawn_repair_time(&self) -> Day {
        self.spawn_profile.repair_time.unwrap_or(self.repair_time)
    }

    /// Whether `since_overhaul` qualifies for the repair waiver
    pub fn waives_repair(&self, since_overhaul: u64) -> bool {
        self.repair_waiver_threshold
            .is_some_and(|threshold| since_overhaul < threshold)
    }

    /// Whether dynamic spawning is active at `day`
    pub fn dynamic_spawn_active(&self, day: Day) -> bool {
        self.dynamic_spawn
            .is_some_and(|dynamic| day >= dynamic.activation_day)
    }
}

/// Group configurations keyed by id
///
/// Lookups of an unknown id fall back to default rules. Input validation
/// rejects unknown groups before the run, so the fallback is only reachable
/// from hand-built stores.
#[derive(Debug, Clone)]
pub struct GroupTable {
    groups: BTreeMap<GroupId, GroupConfig>,
    fallback: GroupConfig,
}

impl GroupTable {
    pub fn new(groups: &[GroupConfig]) -> Self {
        Self {
            groups: groups.iter().map(|g| (g.id, g.clone())).collect(),
            fallback: GroupConfig::new(GroupId::MAX, 0),
        }
    }

    /// Configuration of `id`, or default rules
    pub fn config(&self, id: GroupId) -> &GroupConfig {
        self.groups.get(&id).unwrap_or(&self.fallback)
    }

    pub fn contains(&self, id: GroupId) -> bool {
        self.groups.contains_key(&id)
    }

    /// Group ids, ascending
    pub fn ids(&self) -> Vec<GroupId> {
        self.groups.keys().copied().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &GroupConfig> {
        self.groups.values()
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}
