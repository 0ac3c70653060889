//! Storage of experience payloads.
//!
//! The replay buffer handles experience ids only. Payloads live in an
//! [`ExperienceStore`] given to [`RankReplayBuffer::build`](crate::RankReplayBuffer::build).
use crate::{ExperienceId, RankReplayError};
use std::collections::HashMap;

/// Mapping from experience id to payload.
pub trait ExperienceStore {
    /// Payload of an experience, e.g., a transition `(s1, a, r, s2, t)`.
    type Payload;

    /// Returns the payloads of `ids` in the same order.
    ///
    /// An id that was never stored is a caller error; implementations may
    /// report it with [`RankReplayError::UnknownExperience`].
    fn retrieve(&self, ids: &[ExperienceId]) -> Result<Vec<Self::Payload>, RankReplayError>;
}

/// An in-memory [`ExperienceStore`] that returns clones of the payloads.
#[derive(Debug, Clone)]
pub struct MemoryStore<T> {
    experiences: HashMap<ExperienceId, T>,
}

impl<T> Default for MemoryStore<T> {
    fn default() -> Self {
        Self {
            experiences: HashMap::new(),
        }
    }
}

impl<T> MemoryStore<T> {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a payload, returning the one previously stored with the id.
    pub fn insert(&mut self, id: ExperienceId, payload: T) -> Option<T> {
        self.experiences.insert(id, payload)
    }

    /// Removes a payload.
    pub fn remove(&mut self, id: ExperienceId) -> Option<T> {
        self.experiences.remove(&id)
    }

    /// Returns `true` if a payload is stored with the id.
    pub fn contains(&self, id: ExperienceId) -> bool {
        self.experiences.contains_key(&id)
    }

    /// Number of stored payloads.
    pub fn len(&self) -> usize {
        self.experiences.len()
    }

    /// Returns `true` if no payload is stored.
    pub fn is_empty(&self) -> bool {
        self.experiences.is_empty()
    }
}

impl<T: Clone> ExperienceStore for MemoryStore<T> {
    type Payload = T;

    fn retrieve(&self, ids: &[ExperienceId]) -> Result<Vec<T>, RankReplayError> {
        ids.iter()
            .map(|id| {
                self.experiences
                    .get(id)
                    .cloned()
                    .ok_or(RankReplayError::UnknownExperience(*id))
            })
            .collect()
    }
}
