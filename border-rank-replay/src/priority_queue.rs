//! Bounded max-priority queue over experience ids.
//!
//! [`RankPriorityQueue`] is a binary max-heap of [`PriorityEntry`] with an
//! index from experience id to heap position. The index is kept in sync on
//! every swap, so [`RankPriorityQueue::update`] is logarithmic.
//!
//! The storage order of the heap is not the rank order. Ranks are resolved
//! against a sorted snapshot that is rebuilt on the first call of
//! [`RankPriorityQueue::rank_to_experience`] after any mutation.
mod entry;
use crate::{ExperienceId, RankReplayError};
pub use entry::{OverflowPolicy, PriorityEntry};
use log::warn;
use std::collections::HashMap;

/// Priority of the maximum of an empty queue.
///
/// New experiences are usually stored with [`RankPriorityQueue::max_priority`],
/// so the first experience gets this value.
pub const DEFAULT_PRIORITY: f64 = 1.0;

/// Bounded max-priority queue keyed by `(priority, experience id)`.
#[derive(Debug, Clone)]
pub struct RankPriorityQueue {
    max_len: usize,
    overflow: OverflowPolicy,
    heap: Vec<PriorityEntry>,

    /// Experience id to index in `heap`.
    pos: HashMap<ExperienceId, usize>,

    /// Experience ids sorted by descending priority, `None` if stale.
    ranked: Option<Vec<ExperienceId>>,
}

impl RankPriorityQueue {
    /// Creates an empty queue.
    pub fn new(max_len: usize, overflow: OverflowPolicy) -> Self {
        Self {
            max_len,
            overflow,
            heap: Vec::with_capacity(max_len),
            pos: HashMap::with_capacity(max_len),
            ranked: None,
        }
    }

    /// Creates a queue from `(priority, id)` pairs.
    ///
    /// Pairs beyond `max_len` are dropped.
    pub fn from_entries(
        max_len: usize,
        entries: impl IntoIterator<Item = (f64, ExperienceId)>,
        overflow: OverflowPolicy,
    ) -> Result<Self, RankReplayError> {
        let entries = entries.into_iter().collect::<Vec<_>>();
        if entries.len() > max_len {
            warn!(
                "{} initial entries given for a queue of max_len {}, {} dropped",
                entries.len(),
                max_len,
                entries.len() - max_len
            );
        }

        let mut queue = Self::new(max_len, overflow);
        for (priority, id) in entries.into_iter().take(max_len) {
            queue.push(priority, id)?;
        }
        Ok(queue)
    }

    /// Capacity of the queue.
    pub fn max_len(&self) -> usize {
        self.max_len
    }

    /// Behavior of [`push`](Self::push) on a full queue.
    pub fn overflow(&self) -> OverflowPolicy {
        self.overflow
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// Returns `true` if the queue has no entries.
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Returns `true` if the queue holds `max_len` entries.
    pub fn is_full(&self) -> bool {
        self.heap.len() >= self.max_len
    }

    /// Returns `true` if the experience is in the queue.
    pub fn contains(&self, id: ExperienceId) -> bool {
        self.pos.contains_key(&id)
    }

    /// The maximum priority, or [`DEFAULT_PRIORITY`] if the queue is empty.
    pub fn max_priority(&self) -> f64 {
        self.heap
            .first()
            .map(PriorityEntry::priority)
            .unwrap_or(DEFAULT_PRIORITY)
    }

    /// The entry with the maximum priority.
    pub fn peek(&self) -> Option<PriorityEntry> {
        self.heap.first().copied()
    }

    /// Inserts an experience with the given priority.
    ///
    /// On a full queue, [`OverflowPolicy::Reject`] fails with
    /// [`RankReplayError::QueueFull`] and [`OverflowPolicy::EvictLowest`]
    /// removes the lowest-priority entry and returns it.
    pub fn push(
        &mut self,
        priority: f64,
        id: ExperienceId,
    ) -> Result<Option<PriorityEntry>, RankReplayError> {
        check_priority(priority)?;
        if self.pos.contains_key(&id) {
            return Err(RankReplayError::DuplicateExperience(id));
        }

        let evicted = if self.is_full() {
            let victim = match self.overflow {
                OverflowPolicy::Reject => None,
                OverflowPolicy::EvictLowest => self.lowest_position(),
            };
            match victim {
                Some(i) => Some(self.remove_at(i)),
                None => {
                    return Err(RankReplayError::QueueFull {
                        max_len: self.max_len,
                    })
                }
            }
        } else {
            None
        };

        let i = self.heap.len();
        self.heap.push(PriorityEntry::new(priority, id));
        self.pos.insert(id, i);
        self.sift_up(i);
        self.ranked = None;

        Ok(evicted)
    }

    /// Removes and returns the entry with the maximum priority.
    pub fn pop(&mut self) -> Result<PriorityEntry, RankReplayError> {
        if self.heap.is_empty() {
            return Err(RankReplayError::InsufficientEntries {
                requested: 1,
                available: 0,
            });
        }
        Ok(self.remove_at(0))
    }

    /// Removes and returns the top `k` entries in descending priority.
    ///
    /// Nothing is removed if the queue has fewer than `k` entries.
    pub fn pop_batch(&mut self, k: usize) -> Result<Vec<PriorityEntry>, RankReplayError> {
        if k > self.heap.len() {
            return Err(RankReplayError::InsufficientEntries {
                requested: k,
                available: self.heap.len(),
            });
        }
        Ok((0..k).map(|_| self.remove_at(0)).collect())
    }

    /// Sets the priority of an experience.
    pub fn update(&mut self, id: ExperienceId, priority: f64) -> Result<(), RankReplayError> {
        check_priority(priority)?;
        let i = *self
            .pos
            .get(&id)
            .ok_or(RankReplayError::UnknownExperience(id))?;
        self.heap[i].set_priority(priority);
        self.restore(i);
        self.ranked = None;
        Ok(())
    }

    /// Priorities in storage order, parallel to [`experience_ids`](Self::experience_ids).
    pub fn priorities(&self) -> Vec<f64> {
        self.heap.iter().map(PriorityEntry::priority).collect()
    }

    /// Experience ids in storage order, parallel to [`priorities`](Self::priorities).
    pub fn experience_ids(&self) -> Vec<ExperienceId> {
        self.heap.iter().map(PriorityEntry::id).collect()
    }

    /// Priorities of the given experiences, `None` for those not in the queue.
    pub fn priorities_of(&self, ids: &[ExperienceId]) -> Vec<Option<f64>> {
        ids.iter()
            .map(|id| self.pos.get(id).map(|&i| self.heap[i].priority()))
            .collect()
    }

    /// Converts 1-based ranks (1 = highest priority) to experience ids.
    ///
    /// All ranks are resolved against the same sorted snapshot.
    pub fn rank_to_experience(
        &mut self,
        ranks: &[usize],
    ) -> Result<Vec<ExperienceId>, RankReplayError> {
        let size = self.heap.len();
        if let Some(&rank) = ranks.iter().find(|&&r| r == 0 || r > size) {
            return Err(RankReplayError::RankOutOfRange { rank, size });
        }

        let ranked = self.ranked_ids();
        Ok(ranks.iter().map(|&r| ranked[r - 1]).collect())
    }

    fn ranked_ids(&mut self) -> &[ExperienceId] {
        let heap = &self.heap;
        self.ranked.get_or_insert_with(|| {
            let mut sorted = heap.clone();
            sorted.sort_unstable_by(|a, b| b.cmp(a));
            sorted.into_iter().map(|e| e.id()).collect()
        })
    }

    /// Index of the minimum entry; it is one of the leaves.
    fn lowest_position(&self) -> Option<usize> {
        let n = self.heap.len();
        (n / 2..n).min_by_key(|&i| self.heap[i])
    }

    fn remove_at(&mut self, i: usize) -> PriorityEntry {
        let entry = self.heap.swap_remove(i);
        self.pos.remove(&entry.id());
        if i < self.heap.len() {
            self.pos.insert(self.heap[i].id(), i);
            self.restore(i);
        }
        self.ranked = None;
        entry
    }

    fn restore(&mut self, i: usize) {
        let i = self.sift_up(i);
        self.sift_down(i);
    }

    fn sift_up(&mut self, mut i: usize) -> usize {
        while i > 0 {
            let parent = (i - 1) / 2;
            if self.heap[i] <= self.heap[parent] {
                break;
            }
            self.swap(i, parent);
            i = parent;
        }
        i
    }

    fn sift_down(&mut self, mut i: usize) {
        let n = self.heap.len();
        loop {
            let (l, r) = (2 * i + 1, 2 * i + 2);
            let mut largest = i;
            if l < n && self.heap[l] > self.heap[largest] {
                largest = l;
            }
            if r < n && self.heap[r] > self.heap[largest] {
                largest = r;
            }
            if largest == i {
                break;
            }
            self.swap(i, largest);
            i = largest;
        }
    }

    fn swap(&mut self, a: usize, b: usize) {
        self.heap.swap(a, b);
        self.pos.insert(self.heap[a].id(), a);
        self.pos.insert(self.heap[b].id(), b);
    }

    #[cfg(test)]
    fn check_invariants(&self) {
        assert!(self.heap.len() <= self.max_len);
        assert_eq!(self.heap.len(), self.pos.len());
        for (i, e) in self.heap.iter().enumerate() {
            assert_eq!(self.pos[&e.id()], i);
            if i > 0 {
                assert!(self.heap[(i - 1) / 2] >= *e);
            }
        }
    }
}

fn check_priority(priority: f64) -> Result<(), RankReplayError> {
    if priority.is_nan() {
        Err(RankReplayError::InvalidPriority(priority))
    } else {
        Ok(())
    }
}
