#![warn(missing_docs)]
//! Rank-based prioritized experience replay.
//!
//! Experiences are ranked by priority (usually the absolute TD error) and
//! sampled with probability proportional to $\mathrm{rank}^{-\alpha}$. The
//! distributions over ranks are precomputed for each partition of the buffer
//! size and split into `batch_size` strata of equal mass; a batch takes one
//! rank from each stratum. Importance weights correct the bias with an
//! exponent annealed from `beta_zero` to 1.
//!
//! ```rust
//! use border_rank_replay::{MemoryStore, RankReplayBuffer, RankReplayConfig};
//!
//! # fn main() -> Result<(), border_rank_replay::RankReplayError> {
//! let config = RankReplayConfig::default()
//!     .max_size(1_000)
//!     .partition_num(10)
//!     .learn_start(100)
//!     .batch_size(8)
//!     .total_steps(10_000);
//! let mut buffer = RankReplayBuffer::build(&config, MemoryStore::new())?;
//!
//! for id in 0..200 {
//!     buffer.experience_store_mut().insert(id, (id as f32, id % 2 == 0));
//!     buffer.store_with_max_priority(id)?;
//! }
//!
//! let batch = buffer.sample(150)?;
//! // ... compute TD errors of the batch ...
//! let td_errors = vec![0.5; batch.len()];
//! buffer.update_priority(&batch.ids, &td_errors)?;
//! # Ok(())
//! # }
//! ```
mod config;
pub mod distribution;
mod error;
mod iw_scheduler;
pub mod priority_queue;
mod replay_buffer;
mod store;

/// Identifier of an experience.
pub type ExperienceId = usize;

pub use config::RankReplayConfig;
pub use distribution::{Distribution, DistributionTable};
pub use error::RankReplayError;
pub use iw_scheduler::BetaScheduler;
pub use priority_queue::{OverflowPolicy, PriorityEntry, RankPriorityQueue, DEFAULT_PRIORITY};
pub use replay_buffer::{RankReplayBatch, RankReplayBuffer};
pub use store::{ExperienceStore, MemoryStore};
