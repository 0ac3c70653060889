//! Entries of [`RankPriorityQueue`](super::RankPriorityQueue).
use crate::ExperienceId;
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// A pair of priority and experience id.
///
/// Entries are ordered by priority; equal priorities fall back to the id,
/// which has no meaning beyond making the order total.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriorityEntry {
    priority: OrderedFloat<f64>,
    id: ExperienceId,
}

impl PriorityEntry {
    /// Creates an entry.
    pub fn new(priority: f64, id: ExperienceId) -> Self {
        Self {
            priority: OrderedFloat(priority),
            id,
        }
    }

    /// Priority of the entry.
    pub fn priority(&self) -> f64 {
        self.priority.into_inner()
    }

    /// Experience id of the entry.
    pub fn id(&self) -> ExperienceId {
        self.id
    }

    pub(super) fn set_priority(&mut self, priority: f64) {
        self.priority = OrderedFloat(priority);
    }

    /// Returns `(priority, id)`.
    pub fn unpack(self) -> (f64, ExperienceId) {
        (self.priority(), self.id)
    }
}

impl Ord for PriorityEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.priority
            .cmp(&other.priority)
            .then_with(|| self.id.cmp(&other.id))
    }
}

impl PartialOrd for PriorityEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// What [`RankPriorityQueue::push`](super::RankPriorityQueue::push) does on a full queue.
#[derive(Debug, Deserialize, Serialize, PartialEq, Eq, Clone, Copy)]
pub enum OverflowPolicy {
    /// Rejects the new entry and leaves the queue unchanged.
    Reject,

    /// Removes the entry with the lowest priority, then inserts the new one.
    EvictLowest,
}

impl Default for OverflowPolicy {
    fn default() -> Self {
        Self::Reject
    }
}
