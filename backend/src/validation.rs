//! Input validation and step invariants
//!
//! Malformed input is the only hard failure of the engine, and it is caught
//! here before step 0. Permissive defaults (missing limits) are reported as
//! warnings and the run proceeds.
//!
//! When `check_invariants` is enabled the orchestrator also captures an
//! [`InvariantProbe`] before each step and checks the store against it after
//! the step.

use crate::core::time::Day;
use crate::models::{EntityId, EntityState, EntityStore, Usage};
use crate::orchestrator::{OrchestratorConfig, SimulationError};
use crate::schedule::ScenarioInputs;
use std::collections::{HashMap, HashSet};

/// Check a scenario before the run
///
/// # Returns
/// The list of warnings (permissive defaults that were applied).
///
/// # Errors
/// `InvalidConfig` for configuration problems, `InvalidInput` or `Schedule`
/// for table problems.
pub fn validate_scenario(
    config: &OrchestratorConfig,
    inputs: &ScenarioInputs,
) -> Result<Vec<String>, SimulationError> {
    let mut warnings = Vec::new();
    let horizon = config.horizon_days;

    if horizon == 0 {
        return Err(SimulationError::InvalidConfig(
            "horizon_days must be positive".to_string(),
        ));
    }
    if config.groups.is_empty() {
        return Err(SimulationError::InvalidConfig(
            "at least one group is required".to_string(),
        ));
    }
    if config.max_steps == Some(0) {
        return Err(SimulationError::InvalidConfig(
            "max_steps must be positive when set".to_string(),
        ));
    }

    let mut group_ids = Vec::with_capacity(config.groups.len());
    for group in &config.groups {
        if group_ids.contains(&group.id) {
            return Err(SimulationError::InvalidConfig(format!(
                "duplicate group id {}",
                group.id
            )));
        }
        group_ids.push(group.id);

        let missing = group.spawn_profile.limits.missing();
        let spawns_here = inputs.spawns.groups().any(|g| g == group.id);
        if (spawns_here || group.dynamic_spawn.is_some()) && !missing.is_empty() {
            warnings.push(format!(
                "group {}: spawn profile has no {} limit, spawned entities never exhaust it",
                group.id,
                missing.join("/")
            ));
        }
        if spawns_here && !inputs.usage.groups.contains_key(&group.id) {
            warnings.push(format!(
                "group {}: no group usage row, spawned entities accrue nothing",
                group.id
            ));
        }
    }

    inputs.targets.validate(horizon, &group_ids)?;
    inputs.spawns.validate(horizon, &group_ids)?;
    inputs.usage.validate(horizon, &group_ids, &inputs.entities)?;

    let mut seen: HashSet<EntityId> = HashSet::with_capacity(inputs.entities.len());
    for row in &inputs.entities {
        if !seen.insert(row.id) {
            return Err(SimulationError::InvalidInput(format!(
                "duplicate entity id {}",
                row.id
            )));
        }
        if row.id >= config.spawn_id_base {
            return Err(SimulationError::InvalidInput(format!(
                "entity id {} is not below spawn_id_base {}",
                row.id, config.spawn_id_base
            )));
        }
        if !group_ids.contains(&row.group) {
            return Err(SimulationError::InvalidInput(format!(
                "entity {} belongs to unknown group {}",
                row.id, row.group
            )));
        }
        let missing = row.limits.missing();
        if !missing.is_empty() {
            warnings.push(format!(
                "entity {}: missing {} limit, treated as never exhausting",
                row.id,
                missing.join("/")
            ));
        }
    }

    Ok(warnings)
}

// ============================================================================
// Step invariants
// ============================================================================

#[derive(Debug, Clone, Copy)]
struct Observed {
    state: EntityState,
    lifetime: Usage,
    overhaul: Usage,
}

/// Entity attributes captured at the start of a step
#[derive(Debug, Clone, Default)]
pub struct InvariantProbe {
    observed: HashMap<EntityId, Observed>,
}

/// Whether `from` can become `to` within one step
///
/// A step may chain two moves: exit then repair admission, repair
/// completion (or waiver) then promotion.
fn reachable_in_step(from: EntityState, to: EntityState) -> bool {
    from.can_transition_to(to)
        || EntityState::ALL
            .iter()
            .any(|&mid| from.can_transition_to(mid) && mid.can_transition_to(to))
}

impl InvariantProbe {
    pub fn capture(store: &EntityStore) -> Self {
        let observed = store
            .active_slots()
            .map(|slot| {
                (
                    store.id(slot),
                    Observed {
                        state: store.state(slot),
                        lifetime: store.lifetime_usage(slot),
                        overhaul: store.overhaul_usage(slot),
                    },
                )
            })
            .collect();
        Self { observed }
    }

    /// Check the store after the step that started at `day`
    pub fn check(&self, store: &EntityStore, day: Day) -> Result<(), SimulationError> {
        let violation = |message: String| SimulationError::InvariantViolation { day, message };

        for slot in store.active_slots() {
            let id = store.id(slot);
            let state = store.state(slot);

            if state == EntityState::Operations && store.limiter_date(slot).is_none() {
                return Err(violation(format!("entity {id} operates without a limiter date")));
            }

            let Some(before) = self.observed.get(&id) else {
                continue;
            };

            if before.state == EntityState::Storage && state != EntityState::Storage {
                return Err(violation(format!("entity {id} left storage for {state}")));
            }
            if !reachable_in_step(before.state, state) {
                return Err(violation(format!(
                    "entity {id} moved {} -> {state}",
                    before.state
                )));
            }
            if store.lifetime_usage(slot) < before.lifetime {
                return Err(violation(format!("entity {id} lifetime usage decreased")));
            }
            let restored = matches!(
                before.state,
                EntityState::Repair | EntityState::Inactive
            );
            if store.overhaul_usage(slot) < before.overhaul && !restored {
                return Err(violation(format!(
                    "entity {id} since-overhaul usage decreased without repair"
                )));
            }
        }
        Ok(())
    }
}
