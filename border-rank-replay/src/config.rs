//! Configuration of [`RankReplayBuffer`](crate::RankReplayBuffer).
use crate::{OverflowPolicy, RankReplayError};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::{
    default::Default,
    fs::File,
    io::{BufReader, Write},
    path::Path,
};

/// Configuration of [`RankReplayBuffer`](crate::RankReplayBuffer).
///
/// # Examples
///
/// ```rust
/// use border_rank_replay::RankReplayConfig;
///
/// let config = RankReplayConfig::default()
///     .max_size(10_000)
///     .alpha(0.7)
///     .beta_zero(0.5)
///     .batch_size(32)
///     .learn_start(1_000)
///     .total_steps(100_000)
///     .partition_num(10);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct RankReplayConfig {
    /// Maximum number of experiences in the buffer.
    pub max_size: usize,

    /// Exponent of the power law over ranks. Larger values concentrate
    /// sampling on high-priority experiences.
    pub alpha: f64,

    /// Exponent of importance weights at `learn_start`.
    pub beta_zero: f64,

    /// Number of experiences in a sampled batch, also the number of strata.
    pub batch_size: usize,

    /// Number of experiences required before sampling.
    pub learn_start: usize,

    /// Global step where the exponent of importance weights reaches 1.
    pub total_steps: usize,

    /// Number of partitions of `max_size`. A distribution is precomputed for
    /// each partition that can be reached while sampling.
    pub partition_num: usize,

    /// Random seed for stratified sampling.
    pub seed: u64,

    /// Behavior of storing into a full buffer.
    pub overflow: OverflowPolicy,
}

impl Default for RankReplayConfig {
    fn default() -> Self {
        Self {
            max_size: 100_000,
            alpha: 0.7,
            beta_zero: 0.5,
            batch_size: 32,
            learn_start: 1_000,
            total_steps: 100_000,
            partition_num: 100,
            seed: 42,
            overflow: OverflowPolicy::Reject,
        }
    }
}

impl RankReplayConfig {
    /// Sets the maximum number of experiences.
    pub fn max_size(mut self, v: usize) -> Self {
        self.max_size = v;
        self
    }

    /// Sets the exponent of the power law over ranks.
    pub fn alpha(mut self, v: f64) -> Self {
        self.alpha = v;
        self
    }

    /// Sets the initial exponent of importance weights.
    pub fn beta_zero(mut self, v: f64) -> Self {
        self.beta_zero = v;
        self
    }

    /// Sets the batch size.
    pub fn batch_size(mut self, v: usize) -> Self {
        self.batch_size = v;
        self
    }

    /// Sets the number of experiences required before sampling.
    pub fn learn_start(mut self, v: usize) -> Self {
        self.learn_start = v;
        self
    }

    /// Sets the global step where annealing of importance weights ends.
    pub fn total_steps(mut self, v: usize) -> Self {
        self.total_steps = v;
        self
    }

    /// Sets the number of partitions.
    pub fn partition_num(mut self, v: usize) -> Self {
        self.partition_num = v;
        self
    }

    /// Sets the random seed.
    pub fn seed(mut self, v: u64) -> Self {
        self.seed = v;
        self
    }

    /// Sets the behavior of storing into a full buffer.
    pub fn overflow(mut self, v: OverflowPolicy) -> Self {
        self.overflow = v;
        self
    }

    /// Checks the ranges of the parameters.
    ///
    /// Whether every reachable partition gets a distribution is checked
    /// when the distributions are built.
    pub fn validate(&self) -> Result<(), RankReplayError> {
        let fail = |msg: String| Err(RankReplayError::InvalidConfig(msg));

        if self.max_size == 0 {
            return fail("max_size must be positive".into());
        }
        if !(self.alpha > 0.0 && self.alpha.is_finite()) {
            return fail(format!("alpha must be positive, got {}", self.alpha));
        }
        if !(0.0..=1.0).contains(&self.beta_zero) {
            return fail(format!("beta_zero must be in [0, 1], got {}", self.beta_zero));
        }
        if self.batch_size == 0 || self.batch_size > self.max_size {
            return fail(format!(
                "batch_size must be in 1..={}, got {}",
                self.max_size, self.batch_size
            ));
        }
        if self.learn_start == 0 || self.learn_start > self.max_size {
            return fail(format!(
                "learn_start must be in 1..={}, got {}",
                self.max_size, self.learn_start
            ));
        }
        if self.batch_size > self.learn_start {
            return fail(format!(
                "batch_size {} exceeds learn_start {}",
                self.batch_size, self.learn_start
            ));
        }
        if self.total_steps <= self.learn_start {
            return fail(format!(
                "total_steps {} must exceed learn_start {}",
                self.total_steps, self.learn_start
            ));
        }
        if self.partition_num == 0 || self.max_size % self.partition_num != 0 {
            return fail(format!(
                "partition_num {} must divide max_size {}",
                self.partition_num, self.max_size
            ));
        }

        Ok(())
    }

    /// Constructs [`RankReplayConfig`] from YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        Ok(b)
    }

    /// Saves [`RankReplayConfig`] as YAML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }
}
