//! Batch sampled from [`RankReplayBuffer`](super::RankReplayBuffer).
use crate::ExperienceId;

/// A mini-batch with importance weights.
///
/// `payloads`, `weights`, `ids` and `ranks` are index-aligned.
#[derive(Debug, Clone, PartialEq)]
pub struct RankReplayBatch<T> {
    /// Payloads from the experience store.
    pub payloads: Vec<T>,

    /// Importance weights normalized so that the maximum is 1.
    pub weights: Vec<f64>,

    /// Experience ids, used to update priorities after training.
    pub ids: Vec<ExperienceId>,

    /// Sampled ranks (1-based).
    pub ranks: Vec<usize>,

    /// Exponent of the importance weights.
    pub beta: f64,
}

impl<T> RankReplayBatch<T> {
    /// Number of samples.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Returns `true` if the batch has no samples.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Returns `(payloads, weights, ids)`.
    pub fn unpack(self) -> (Vec<T>, Vec<f64>, Vec<ExperienceId>) {
        (self.payloads, self.weights, self.ids)
    }
}
