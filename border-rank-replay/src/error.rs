//! Errors in the library.
use crate::ExperienceId;
use thiserror::Error;

/// Errors in the library.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RankReplayError {
    /// Configuration rejected at construction.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The priority queue holds `max_len` entries and rejects new ones.
    #[error("Priority queue is full (max_len = {max_len})")]
    QueueFull {
        /// Capacity of the queue.
        max_len: usize,
    },

    /// Fewer entries than requested are in the queue.
    #[error("Not enough entries in priority queue: requested {requested}, available {available}")]
    InsufficientEntries {
        /// Number of entries requested.
        requested: usize,

        /// Number of entries in the queue.
        available: usize,
    },

    /// The experience is not in the priority queue.
    #[error("Unknown experience id: {0}")]
    UnknownExperience(ExperienceId),

    /// The experience is already in the priority queue.
    #[error("Duplicate experience id: {0}")]
    DuplicateExperience(ExperienceId),

    /// NaN was given as a priority.
    #[error("Invalid priority: {0}")]
    InvalidPriority(f64),

    /// A rank outside `1..=size`.
    #[error("Rank {rank} is out of range for {size} entries")]
    RankOutOfRange {
        /// Requested rank (1-based).
        rank: usize,

        /// Number of entries in the queue.
        size: usize,
    },

    /// Sampling requested before `learn_start` experiences were stored.
    #[error("Record size {record_size} is less than learn_start {learn_start}")]
    NotWarmedUp {
        /// Number of stored experiences.
        record_size: usize,

        /// Required number of experiences.
        learn_start: usize,
    },

    /// No distribution was built for the partition.
    #[error("No distribution for partition {0}")]
    MissingDistribution(usize),

    /// `ids` and `td_errors` differ in length.
    #[error("Length mismatch: {ids} ids, {td_errors} TD errors")]
    LengthMismatch {
        /// Number of ids.
        ids: usize,

        /// Number of TD errors.
        td_errors: usize,
    },
}
