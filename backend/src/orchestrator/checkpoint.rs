//! Checkpoint - Save/Load Simulation State
//!
//! Enables serialization and deserialization of complete orchestrator state
//! for pause/resume functionality.
//!
//! # Critical Invariants
//!
//! - **Determinism**: A restored run continues exactly like the original
//! - **Identity**: Entity ids are unique and spawned ids stay below the next id
//! - **Config Matching**: State can only be loaded with matching config and tables

use crate::core::time::{Day, SimClock};
use crate::models::{EntityId, EntitySnapshot, EntityState};
use crate::orchestrator::{RunTotals, SimulationError};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use uuid::Uuid;

/// Bumped whenever the snapshot layout changes
pub const CHECKPOINT_VERSION: u32 = 2;

// ============================================================================
// Snapshot Structures
// ============================================================================

/// Complete orchestrator state snapshot
///
/// Captures everything that evolves during a run. The configuration and the
/// input tables are not stored; `config_hash` binds the snapshot to them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateSnapshot {
    pub version: u32,

    pub run_id: Uuid,

    /// Current boundary, previous boundary and horizon
    pub clock: SimClock,

    pub step_count: usize,

    pub shortfall_days: u64,

    /// Per-reason step counts and quota totals so far
    pub totals: RunTotals,

    /// Spawner position
    pub next_spawn_id: EntityId,
    pub total_spawned: u64,
    pub total_dropped: u64,

    /// Unused spawn placeholders on a fixed-capacity store
    pub free_slots: usize,

    /// Every entity, ordered by id
    pub entities: Vec<EntitySnapshot>,

    /// SHA256 of config and input tables (for validation)
    pub config_hash: String,
}

impl StateSnapshot {
    pub fn to_json(&self) -> Result<String, SimulationError> {
        serde_json::to_string(self).map_err(|e| {
            SimulationError::SerializationError(format!("Snapshot serialization failed: {}", e))
        })
    }

    pub fn from_json(json: &str) -> Result<Self, SimulationError> {
        serde_json::from_str(json).map_err(|e| {
            SimulationError::SerializationError(format!("Snapshot deserialization failed: {}", e))
        })
    }

    /// Validate snapshot integrity against the horizon it will run under
    ///
    /// Checks:
    /// - Layout version
    /// - Clock consistency
    /// - Per-reason step counts add up to the step counter
    /// - Entity id uniqueness and spawner position
    /// - Operations entities carry a limiter date
    pub fn validate(&self, horizon: Day) -> Result<(), SimulationError> {
        if self.version != CHECKPOINT_VERSION {
            return Err(SimulationError::StateValidationError(format!(
                "Unsupported checkpoint version {} (expected {})",
                self.version, CHECKPOINT_VERSION
            )));
        }

        if self.clock.horizon_end() != horizon {
            return Err(SimulationError::StateValidationError(format!(
                "Checkpoint horizon {} does not match configured horizon {}",
                self.clock.horizon_end(),
                horizon
            )));
        }
        if self.clock.prev_day() > self.clock.current_day() {
            return Err(SimulationError::StateValidationError(format!(
                "Previous boundary {} is after current boundary {}",
                self.clock.prev_day(),
                self.clock.current_day()
            )));
        }

        if self.totals.steps() != self.step_count {
            return Err(SimulationError::StateValidationError(format!(
                "Step reasons sum to {} but {} steps were taken",
                self.totals.steps(),
                self.step_count
            )));
        }

        let mut seen = HashSet::new();
        for entity in &self.entities {
            if !seen.insert(entity.id) {
                return Err(SimulationError::StateValidationError(format!(
                    "Duplicate entity {} in checkpoint",
                    entity.id
                )));
            }
            if entity.state == EntityState::Operations && entity.limiter_date.is_none() {
                return Err(SimulationError::StateValidationError(format!(
                    "Entity {} operates without a limiter date",
                    entity.id
                )));
            }
        }

        // Snapshot ids sit below the spawn base and spawned ids below the cursor
        if self.entities.iter().any(|e| e.id >= self.next_spawn_id) {
            return Err(SimulationError::StateValidationError(format!(
                "Entity id at or above next spawn id {}",
                self.next_spawn_id
            )));
        }

        Ok(())
    }
}

// ============================================================================
// Config Hashing
// ============================================================================

/// Compute deterministic SHA256 hash of config
///
/// Uses canonical JSON serialization with sorted keys so the hash does not
/// depend on map iteration order.
pub fn compute_config_hash<T: Serialize>(config: &T) -> Result<String, SimulationError> {
    use serde_json::Value;
    use std::collections::BTreeMap;

    let value = serde_json::to_value(config).map_err(|e| {
        SimulationError::SerializationError(format!("Config serialization failed: {}", e))
    })?;

    fn canonicalize(value: Value) -> Value {
        match value {
            Value::Object(map) => {
                let sorted: BTreeMap<String, Value> =
                    map.into_iter().map(|(k, v)| (k, canonicalize(v))).collect();
                Value::Object(sorted.into_iter().collect())
            }
            Value::Array(arr) => Value::Array(arr.into_iter().map(canonicalize).collect()),
            other => other,
        }
    }

    let json = serde_json::to_string(&canonicalize(value)).map_err(|e| {
        SimulationError::SerializationError(format!("Config serialization failed: {}", e))
    })?;

    let mut hasher = Sha256::new();
    hasher.update(json.as_bytes());
    Ok(format!("{:x}", hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ResourceLimits;

    fn snapshot(entities: Vec<EntitySnapshot>) -> StateSnapshot {
        StateSnapshot {
            version: CHECKPOINT_VERSION,
            run_id: Uuid::nil(),
            clock: SimClock::at(10, 5, 100),
            step_count: 3,
            shortfall_days: 0,
            totals: RunTotals {
                reasons: [("limiter".to_string(), 2), ("calendar_target_change".to_string(), 1)]
                    .into_iter()
                    .collect(),
                promotions: 4,
                demotions: 1,
            },
            next_spawn_id: 200_000,
            total_spawned: 0,
            total_dropped: 0,
            free_slots: 0,
            entities,
            config_hash: "abc".to_string(),
        }
    }

    #[test]
    fn test_compute_config_hash_deterministic() {
        #[derive(Serialize)]
        struct TestConfig {
            value: i32,
            name: String,
        }

        let hash1 = compute_config_hash(&TestConfig { value: 42, name: "fleet".to_string() }).unwrap();
        let hash2 = compute_config_hash(&TestConfig { value: 42, name: "fleet".to_string() }).unwrap();

        assert_eq!(hash1, hash2, "Same config should produce same hash");
        assert_eq!(hash1.len(), 64);
    }

    #[test]
    fn test_compute_config_hash_different_for_different_configs() {
        #[derive(Serialize)]
        struct TestConfig {
            value: i32,
        }

        let hash1 = compute_config_hash(&TestConfig { value: 42 }).unwrap();
        let hash2 = compute_config_hash(&TestConfig { value: 43 }).unwrap();

        assert_ne!(hash1, hash2);
    }

    #[test]
    fn test_snapshot_json_roundtrip_preserves_entities() {
        let entity = EntitySnapshot::new(7, 1, EntityState::Unserviceable, -300)
            .with_limits(ResourceLimits::new(1_000, 500, 800))
            .with_usage(600, 450);
        let original = snapshot(vec![entity]);

        let restored = StateSnapshot::from_json(&original.to_json().unwrap()).unwrap();
        assert_eq!(restored, original);
    }

    #[test]
    fn test_validate_rejects_duplicate_ids() {
        let a = EntitySnapshot::new(1, 1, EntityState::Serviceable, 0);
        let err = snapshot(vec![a.clone(), a]).validate(100).unwrap_err();
        assert!(matches!(err, SimulationError::StateValidationError(_)));
    }

    #[test]
    fn test_validate_rejects_horizon_mismatch() {
        let err = snapshot(Vec::new()).validate(50).unwrap_err();
        assert!(matches!(err, SimulationError::StateValidationError(_)));
    }

    #[test]
    fn test_validate_rejects_operations_without_limiter() {
        let ops = EntitySnapshot::new(1, 1, EntityState::Operations, 0);
        assert!(snapshot(vec![ops]).validate(100).is_err());
    }

    #[test]
    fn test_validate_rejects_step_count_drift() {
        let ok = snapshot(Vec::new());
        assert!(ok.validate(100).is_ok());

        let mut drifted = snapshot(Vec::new());
        drifted.step_count = 5;
        let err = drifted.validate(100).unwrap_err();
        assert!(matches!(err, SimulationError::StateValidationError(_)));
    }

    #[test]
    fn test_from_json_rejects_garbage() {
        let err = StateSnapshot::from_json("{not json").unwrap_err();
        assert!(matches!(err, SimulationError::SerializationError(_)));
    }
}
