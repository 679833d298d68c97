//! Quota controller: per-group admission control
//!
//! Matches each group's Operations headcount to the target of the day.
//!
//! # Algorithm
//!
//! Phase B reduces the step's bus events of one group into a [`GroupTally`]:
//! the Operations entities that stay, the demount count and the three ready
//! pools. Phase C turns a tally and the target into a [`GroupDecision`]:
//!
//! - `balance = current - target`
//! - `balance > 0`: demote `balance` entities, oldest manufacture first
//!   (ties: smaller id)
//! - `balance < 0`: promote from P1, then P2, then P3, youngest manufacture
//!   first within a pool (ties: smaller id), until the deficit is filled
//! - what no pool could fill is the residual shortfall
//!
//! Each group is decided by exactly one call, so no entity can be selected
//! twice.

use crate::core::time::Day;
use crate::events::{BusEvent, BusEventKind, EventBus, ReadyPool};
use crate::models::{EntityId, GroupId, Ordinal, Slot};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;

/// Ranking key of one candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Candidate {
    pub slot: Slot,
    pub entity: EntityId,
    pub manufacture: Ordinal,
}

impl From<&BusEvent> for Candidate {
    fn from(event: &BusEvent) -> Self {
        Self {
            slot: event.slot,
            entity: event.entity,
            manufacture: event.manufacture,
        }
    }
}

/// Phase B reduction of one group's events
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupTally {
    pub group: GroupId,

    /// Operations entities staying in Operations
    pub operations: Vec<Candidate>,

    /// Operations entities leaving this step
    pub demounts: usize,

    /// Ready pools, indexed by `ReadyPool::priority() - 1`
    pub pools: [Vec<Candidate>; 3],
}

impl GroupTally {
    /// Reduce a group's batch from the bus
    pub fn from_events(group: GroupId, events: &[BusEvent]) -> Self {
        let mut tally = Self {
            group,
            ..Default::default()
        };
        for event in events {
            match event.kind {
                BusEventKind::OpsReport => tally.operations.push(event.into()),
                BusEventKind::Demount { .. } => tally.demounts += 1,
                BusEventKind::Ready { pool } => {
                    tally.pools[pool.priority() as usize - 1].push(event.into())
                }
            }
        }
        tally
    }

    /// Entities in Operations with intent Operations
    pub fn headcount(&self) -> u32 {
        self.operations.len() as u32
    }

    pub fn pool(&self, pool: ReadyPool) -> &[Candidate] {
        &self.pools[pool.priority() as usize - 1]
    }

    /// Operations headcount plus every ready pool
    pub fn available(&self) -> u32 {
        (self.operations.len() + self.pools.iter().map(Vec::len).sum::<usize>()) as u32
    }
}

/// Phase C result for one group
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupDecision {
    pub group: GroupId,
    pub day: Day,
    pub target: u32,

    /// Headcount before the decision
    pub current: u32,

    /// Operations entities to send back to Serviceable
    pub demote: Vec<Slot>,

    /// Pool entities to move into Operations, in selection order
    pub promote: Vec<(Slot, ReadyPool)>,

    /// Deficit no pool could fill
    pub shortfall: u32,
}

impl GroupDecision {
    /// Headcount after the decision is applied
    pub fn resulting_headcount(&self) -> u32 {
        self.current - self.demote.len() as u32 + self.promote.len() as u32
    }
}

/// Stateless per-group admission control
#[derive(Debug, Clone, Copy, Default)]
pub struct QuotaController;

impl QuotaController {
    pub fn new() -> Self {
        Self
    }

    /// Phase B: one tally per group, in the order of `groups`
    pub fn tally(&self, bus: &EventBus, groups: &[GroupId]) -> Vec<GroupTally> {
        groups
            .iter()
            .map(|&group| GroupTally::from_events(group, bus.for_group(group)))
            .collect()
    }

    /// Phase C for one group
    ///
    /// # Example
    /// ```
    /// use fleet_simulator_core_rs::events::{BusEvent, ReadyPool};
    /// use fleet_simulator_core_rs::quota::{GroupTally, QuotaController};
    ///
    /// let events = vec![
    ///     BusEvent::ops_report(0, 1, 1, 100),
    ///     BusEvent::ready(1, 2, 1, 300, ReadyPool::Reserve),
    ///     BusEvent::ready(2, 3, 1, 200, ReadyPool::Serviceable),
    /// ];
    /// let tally = GroupTally::from_events(1, &events);
    /// let decision = QuotaController::new().decide(&tally, 2, 0);
    ///
    /// // P1 first, even though the Reserve entity is younger
    /// assert_eq!(decision.promote, vec![(2, ReadyPool::Serviceable)]);
    /// assert_eq!(decision.shortfall, 0);
    /// ```
    pub fn decide(&self, tally: &GroupTally, target: u32, day: Day) -> GroupDecision {
        let current = tally.headcount();
        let mut decision = GroupDecision {
            group: tally.group,
            day,
            target,
            current,
            ..Default::default()
        };

        if current > target {
            let mut ranked = tally.operations.clone();
            ranked.sort_by_key(|c| (c.manufacture, c.entity));
            decision.demote = ranked
                .iter()
                .take((current - target) as usize)
                .map(|c| c.slot)
                .collect();
        } else if current < target {
            let mut deficit = (target - current) as usize;
            for pool in ReadyPool::PRIORITY {
                if deficit == 0 {
                    break;
                }
                let mut ranked = tally.pool(pool).to_vec();
                ranked.sort_by_key(|c| (Reverse(c.manufacture), c.entity));
                let take = deficit.min(ranked.len());
                decision
                    .promote
                    .extend(ranked[..take].iter().map(|c| (c.slot, pool)));
                deficit -= take;
            }
            decision.shortfall = deficit as u32;
        }

        decision
    }

    /// Phase C for every group, groups decided in parallel
    ///
    /// `targets[i]` is the target of `tallies[i]`. Output order follows the
    /// input order.
    pub fn decide_all(&self, tallies: &[GroupTally], targets: &[u32], day: Day) -> Vec<GroupDecision> {
        tallies
            .par_iter()
            .zip(targets.par_iter())
            .map(|(tally, &target)| self.decide(tally, target, day))
            .collect()
    }
}
