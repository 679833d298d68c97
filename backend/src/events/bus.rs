//! Per-step event bus
//!
//! Collects the events published during Phase A and hands each group its own
//! batch. The bus is cleared at the start of every step; nothing on it
//! survives into the next step.

use crate::events::types::{BusEvent, BusEventKind};
use crate::models::GroupId;
use std::collections::BTreeMap;

/// Step-scoped collection of bus events, partitioned by group
///
/// # Example
/// ```
/// use fleet_simulator_core_rs::events::{BusEvent, EventBus, ReadyPool};
///
/// let mut bus = EventBus::new();
/// bus.publish_batch(vec![
///     BusEvent::ops_report(0, 1, 7, 100),
///     BusEvent::ready(1, 2, 7, 200, ReadyPool::Reserve),
/// ]);
///
/// assert_eq!(bus.len(), 2);
/// assert_eq!(bus.for_group(7).len(), 2);
/// assert!(bus.for_group(8).is_empty());
/// ```
#[derive(Debug, Clone, Default)]
pub struct EventBus {
    by_group: BTreeMap<GroupId, Vec<BusEvent>>,
    published: usize,
}

/// Event counts of one step, by kind
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BusStats {
    pub ops_reports: usize,
    pub demounts: usize,
    pub ready: usize,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop the previous step's events
    pub fn clear(&mut self) {
        self.by_group.clear();
        self.published = 0;
    }

    /// Publish one event
    pub fn publish(&mut self, event: BusEvent) {
        self.by_group.entry(event.group).or_default().push(event);
        self.published += 1;
    }

    /// Publish a Phase A batch, keeping its order within each group
    pub fn publish_batch(&mut self, events: impl IntoIterator<Item = BusEvent>) {
        for event in events {
            self.publish(event);
        }
    }

    /// This step's events for one group
    pub fn for_group(&self, group: GroupId) -> &[BusEvent] {
        self.by_group
            .get(&group)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Groups that published anything this step
    pub fn groups(&self) -> impl Iterator<Item = GroupId> + '_ {
        self.by_group.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.published
    }

    pub fn is_empty(&self) -> bool {
        self.published == 0
    }

    pub fn stats(&self) -> BusStats {
        let mut stats = BusStats::default();
        for event in self.by_group.values().flatten() {
            match event.kind {
                BusEventKind::OpsReport => stats.ops_reports += 1,
                BusEventKind::Demount { .. } => stats.demounts += 1,
                BusEventKind::Ready { .. } => stats.ready += 1,
            }
        }
        stats
    }
}
