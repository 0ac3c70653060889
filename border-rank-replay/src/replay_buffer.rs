//! Rank-based prioritized replay buffer.
mod batch;
use crate::{
    BetaScheduler, DistributionTable, ExperienceId, ExperienceStore, PriorityEntry,
    RankPriorityQueue, RankReplayConfig, RankReplayError,
};
pub use batch::RankReplayBatch;
use log::{debug, trace, warn};
use rand::{rngs::StdRng, Rng, SeedableRng};

#[cfg_attr(doc, aquamarine::aquamarine)]
/// Rank-based prioritized experience replay.
///
/// Experiences are kept in a [`RankPriorityQueue`] by id. Sampling picks the
/// precomputed distribution for the current fill size, draws one rank from
/// each stratum, resolves the ranks to ids and fetches the payloads from the
/// [`ExperienceStore`]:
///
/// ```mermaid
/// graph LR
///     store --> RankPriorityQueue
///     update_priority --> RankPriorityQueue
///     DistributionTable -->|ranks| sample
///     RankPriorityQueue -->|ids| sample
///     ExperienceStore -->|payloads| sample
/// ```
///
/// The buffer has no internal locking. When it is shared between a producer
/// and a learner, wrap it in a single `Mutex` so that [`sample`](Self::sample)
/// sees no interleaved mutation.
pub struct RankReplayBuffer<S: ExperienceStore> {
    config: RankReplayConfig,
    queue: RankPriorityQueue,
    distributions: DistributionTable,
    iw_scheduler: BetaScheduler,

    /// Number of stored experiences. Evicting stores leave it unchanged.
    record_size: usize,

    rng: StdRng,
    store: S,
}

impl<S: ExperienceStore> RankReplayBuffer<S> {
    /// Builds a replay buffer.
    ///
    /// The configuration is validated and all distributions are built here.
    pub fn build(config: &RankReplayConfig, store: S) -> Result<Self, RankReplayError> {
        config.validate()?;
        let distributions = DistributionTable::build(config)?;

        Ok(Self {
            config: config.clone(),
            queue: RankPriorityQueue::new(config.max_size, config.overflow),
            distributions,
            iw_scheduler: BetaScheduler::new(
                config.beta_zero,
                config.learn_start,
                config.total_steps,
            ),
            record_size: 0,
            rng: StdRng::seed_from_u64(config.seed),
            store,
        })
    }

    /// Configuration of the buffer.
    pub fn config(&self) -> &RankReplayConfig {
        &self.config
    }

    /// Number of stored experiences.
    pub fn record_size(&self) -> usize {
        self.record_size
    }

    /// Returns `true` if the buffer holds `max_size` experiences.
    pub fn is_full(&self) -> bool {
        self.queue.is_full()
    }

    /// Maximum priority in the buffer, used for new experiences.
    pub fn max_priority(&self) -> f64 {
        self.queue.max_priority()
    }

    /// The priority queue.
    pub fn queue(&self) -> &RankPriorityQueue {
        &self.queue
    }

    /// The precomputed distributions.
    pub fn distributions(&self) -> &DistributionTable {
        &self.distributions
    }

    /// The experience store.
    pub fn experience_store(&self) -> &S {
        &self.store
    }

    /// The experience store, for adding and removing payloads.
    pub fn experience_store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    /// Exponent of importance weights at `global_step`.
    pub fn beta(&self, global_step: usize) -> f64 {
        self.iw_scheduler.beta(global_step)
    }

    /// Stores an experience with the given priority.
    ///
    /// Returns the evicted entry if the buffer is full and configured with
    /// [`OverflowPolicy::EvictLowest`](crate::OverflowPolicy::EvictLowest).
    pub fn store(
        &mut self,
        id: ExperienceId,
        priority: f64,
    ) -> Result<Option<PriorityEntry>, RankReplayError> {
        match self.queue.push(priority, id) {
            Ok(evicted) => {
                match evicted {
                    Some(e) => trace!("Experience {} evicted by {}", e.id(), id),
                    None => self.record_size += 1,
                }
                Ok(evicted)
            }
            Err(e) => {
                warn!("Insert of experience {} failed: {}", id, e);
                Err(e)
            }
        }
    }

    /// Stores an experience with the current maximum priority.
    pub fn store_with_max_priority(
        &mut self,
        id: ExperienceId,
    ) -> Result<Option<PriorityEntry>, RankReplayError> {
        let priority = self.queue.max_priority();
        self.store(id, priority)
    }

    /// Sets the priorities of experiences to the absolute values of TD errors.
    ///
    /// The result for each id is reported in the returned vector; a failure
    /// does not stop the remaining updates. Nothing is updated if the lengths
    /// of `ids` and `td_errors` differ.
    pub fn update_priority(
        &mut self,
        ids: &[ExperienceId],
        td_errors: &[f64],
    ) -> Result<Vec<Result<(), RankReplayError>>, RankReplayError> {
        if ids.len() != td_errors.len() {
            return Err(RankReplayError::LengthMismatch {
                ids: ids.len(),
                td_errors: td_errors.len(),
            });
        }

        Ok(ids
            .iter()
            .zip(td_errors.iter())
            .map(|(&id, &td_error)| {
                let res = self.queue.update(id, td_error.abs());
                if let Err(e) = &res {
                    warn!("Priority update of experience {} failed: {}", id, e);
                }
                res
            })
            .collect())
    }

    /// Returns the payloads of experiences.
    pub fn retrieve(&self, ids: &[ExperienceId]) -> Result<Vec<S::Payload>, RankReplayError> {
        self.store.retrieve(ids)
    }

    /// Samples a batch of `batch_size` experiences.
    ///
    /// One rank is drawn uniformly from each stratum of the distribution for
    /// the current fill size, so the ranks in a batch are distinct. The
    /// importance weight of rank `r` is $(N P(r))^{-\beta}$, divided by the
    /// maximum in the batch.
    pub fn sample(
        &mut self,
        global_step: usize,
    ) -> Result<RankReplayBatch<S::Payload>, RankReplayError> {
        if self.record_size < self.config.learn_start {
            warn!(
                "Record size {} less than learn_start {}, sample failed",
                self.record_size, self.config.learn_start
            );
            return Err(RankReplayError::NotWarmedUp {
                record_size: self.record_size,
                learn_start: self.config.learn_start,
            });
        }

        let distribution = self.distributions.for_record_size(self.record_size)?;
        let n = distribution.len();
        let rng = &mut self.rng;
        let ranks = distribution
            .strata()
            .map(|stratum| rng.gen_range(stratum))
            .collect::<Vec<_>>();

        // (N P(r))^-beta / max_r' (N P(r'))^-beta == (P_min / P(r))^beta
        let beta = self.iw_scheduler.beta(global_step);
        let pdf = distribution.pdf();
        let probs = ranks.iter().map(|&r| pdf[r - 1]).collect::<Vec<_>>();
        let p_min = probs.iter().copied().fold(f64::INFINITY, f64::min);
        let weights = probs
            .into_iter()
            .map(|p| (p_min / p).powf(beta))
            .collect::<Vec<_>>();
        debug!(
            "Sampled {} ranks from {} (step = {}, beta = {})",
            ranks.len(),
            n,
            global_step,
            beta
        );

        let ids = self.queue.rank_to_experience(&ranks)?;
        let payloads = self.store.retrieve(&ids)?;

        Ok(RankReplayBatch {
            payloads,
            weights,
            ids,
            ranks,
            beta,
        })
    }
}
