//! Precomputed rank-based sampling distributions.
//!
//! For a buffer holding `n` experiences, the probability of sampling rank `i` is
//!
//! $P(i) = i^{-\alpha} / \sum_{j=1}^n j^{-\alpha}$.
//!
//! The ranks are split into `batch_size` strata of roughly equal mass so that
//! one rank can be drawn from each stratum. As `n` grows while the buffer fills,
//! distributions are built for the fill sizes `partition_size, 2 * partition_size, ...`
//! once, in [`DistributionTable::build`].
use crate::{RankReplayConfig, RankReplayError};
use log::info;
use std::ops::RangeInclusive;

/// Power-law distribution over ranks `1..=n`, divided into strata.
#[derive(Debug, Clone, PartialEq)]
pub struct Distribution {
    /// `pdf[i - 1]` is the probability of rank `i`.
    pdf: Vec<f64>,

    /// `strata_ends[0] == 0`, `strata_ends[batch_size] == n`.
    /// Stratum `k` covers ranks `strata_ends[k - 1] + 1..=strata_ends[k]`.
    strata_ends: Vec<usize>,
}

impl Distribution {
    /// Builds the distribution over `n` ranks with `batch_size` strata.
    pub fn new(n: usize, alpha: f64, batch_size: usize) -> Result<Self, RankReplayError> {
        if batch_size == 0 || n < batch_size {
            return Err(RankReplayError::InvalidConfig(format!(
                "cannot split {} ranks into {} strata",
                n, batch_size
            )));
        }
        if !(alpha > 0.0 && alpha.is_finite()) {
            return Err(RankReplayError::InvalidConfig(format!(
                "alpha must be positive, got {}",
                alpha
            )));
        }

        let weights = (1..=n)
            .map(|i| (i as f64).powf(-alpha))
            .collect::<Vec<_>>();
        let total = compensated_sum(weights.iter().copied());
        let pdf = weights.into_iter().map(|w| w / total).collect::<Vec<_>>();

        // Importance weights divide by n * P(n); it must not vanish
        let p_min = pdf[n - 1];
        if !(p_min > 0.0 && (n as f64 * p_min).recip().is_finite()) {
            return Err(RankReplayError::InvalidConfig(format!(
                "alpha = {} underflows the probability of rank {}",
                alpha, n
            )));
        }
        let strata_ends = stratify(&cumulative(&pdf), batch_size);

        Ok(Self { pdf, strata_ends })
    }

    /// Number of ranks.
    pub fn len(&self) -> usize {
        self.pdf.len()
    }

    /// Always `false`; a distribution covers at least one rank.
    pub fn is_empty(&self) -> bool {
        self.pdf.is_empty()
    }

    /// Probabilities of ranks `1..=n`.
    pub fn pdf(&self) -> &[f64] {
        &self.pdf
    }

    /// Probability of a 1-based rank, `None` outside `1..=n`.
    pub fn probability(&self, rank: usize) -> Option<f64> {
        rank.checked_sub(1).and_then(|i| self.pdf.get(i).copied())
    }

    /// Boundaries of the strata, `batch_size + 1` values from `0` to `n`.
    pub fn strata_ends(&self) -> &[usize] {
        &self.strata_ends
    }

    /// Number of strata.
    pub fn n_strata(&self) -> usize {
        self.strata_ends.len() - 1
    }

    /// Ranks of stratum `k`, `None` outside `1..=n_strata()`.
    pub fn stratum(&self, k: usize) -> Option<RangeInclusive<usize>> {
        let start = *self.strata_ends.get(k.checked_sub(1)?)?;
        let end = *self.strata_ends.get(k)?;
        Some(start + 1..=end)
    }

    /// Ranks of all strata in order.
    pub fn strata(&self) -> impl Iterator<Item = RangeInclusive<usize>> + '_ {
        self.strata_ends.windows(2).map(|w| w[0] + 1..=w[1])
    }
}

/// Distributions for every partition reachable while sampling.
///
/// The table is indexed by partition number `p`, covering `p * partition_size` ranks.
#[derive(Debug, Clone)]
pub struct DistributionTable {
    max_size: usize,
    partition_num: usize,
    distributions: Vec<Option<Distribution>>,
}

impl DistributionTable {
    /// Builds distributions for the partitions with `learn_start <= n <= max_size`.
    ///
    /// Fails if sampling could resolve a partition without a distribution,
    /// i.e., if a fill size `record_size >= learn_start` falls into a partition
    /// smaller than `learn_start`.
    pub fn build(config: &RankReplayConfig) -> Result<Self, RankReplayError> {
        let partition_size = config.max_size / config.partition_num;
        let distributions = (0..=config.partition_num)
            .map(|p| {
                let n = p * partition_size;
                if n >= config.learn_start && n > 0 {
                    Distribution::new(n, config.alpha, config.batch_size).map(Some)
                } else {
                    Ok(None)
                }
            })
            .collect::<Result<Vec<_>, _>>()?;

        let table = Self {
            max_size: config.max_size,
            partition_num: config.partition_num,
            distributions,
        };

        let first = table.partition_index(config.learn_start);
        if let Some(p) = (first..=config.partition_num).find(|&p| table.get(p).is_none()) {
            return Err(RankReplayError::InvalidConfig(format!(
                "partition {} ({} ranks) is reachable with learn_start = {} but has no distribution",
                p,
                p * partition_size,
                config.learn_start
            )));
        }

        info!(
            "Built {} rank distributions of {}..={} ranks (alpha = {}, {} strata)",
            table.iter().count(),
            first * partition_size,
            config.max_size,
            config.alpha,
            config.batch_size
        );

        Ok(table)
    }

    /// Number of ranks added per partition.
    pub fn partition_size(&self) -> usize {
        self.max_size / self.partition_num
    }

    /// Partition number used for a buffer holding `record_size` experiences.
    pub fn partition_index(&self, record_size: usize) -> usize {
        record_size * self.partition_num / self.max_size
    }

    /// Distribution of partition `p`.
    pub fn get(&self, p: usize) -> Option<&Distribution> {
        self.distributions.get(p).and_then(Option::as_ref)
    }

    /// Distribution used for a buffer holding `record_size` experiences.
    pub fn for_record_size(
        &self,
        record_size: usize,
    ) -> Result<&Distribution, RankReplayError> {
        let p = self.partition_index(record_size);
        self.get(p).ok_or(RankReplayError::MissingDistribution(p))
    }

    /// Built distributions with their partition numbers.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &Distribution)> {
        self.distributions
            .iter()
            .enumerate()
            .filter_map(|(p, d)| d.as_ref().map(|d| (p, d)))
    }
}

/// Neumaier summation.
fn compensated_sum(xs: impl IntoIterator<Item = f64>) -> f64 {
    let (mut sum, mut c) = (0.0f64, 0.0f64);
    for x in xs {
        let t = sum + x;
        if sum.abs() >= x.abs() {
            c += (sum - t) + x;
        } else {
            c += (x - t) + sum;
        }
        sum = t;
    }
    sum + c
}

/// Running compensated sum, `cdf[i]` is the mass of ranks `1..=i + 1`.
fn cumulative(pdf: &[f64]) -> Vec<f64> {
    let (mut sum, mut c) = (0.0f64, 0.0f64);
    pdf.iter()
        .map(|&x| {
            let t = sum + x;
            if sum.abs() >= x.abs() {
                c += (sum - t) + x;
            } else {
                c += (x - t) + sum;
            }
            sum = t;
            sum + c
        })
        .collect()
}

/// Walks the cdf and places a boundary at the last rank whose cumulative mass
/// is below `k / batch_size`. Boundaries are clamped so that every stratum has
/// at least one rank.
fn stratify(cdf: &[f64], batch_size: usize) -> Vec<usize> {
    let n = cdf.len();
    let mut ends = Vec::with_capacity(batch_size + 1);
    ends.push(0);

    let mut cursor = 1;
    for k in 1..batch_size {
        let target = k as f64 / batch_size as f64;
        while cursor < n && cdf[cursor] < target {
            cursor += 1;
        }
        let end = cursor.clamp(ends[k - 1] + 1, n - (batch_size - k));
        ends.push(end);
        cursor = end;
    }
    ends.push(n);

    ends
}

#[cfg(test)]
mod test {
    use super::*;
    use test_log::test;

    fn assert_valid(d: &Distribution, n: usize, batch_size: usize) {
        assert_eq!(d.len(), n);
        assert!((compensated_sum(d.pdf().iter().copied()) - 1.0).abs() < 1e-9);
        assert!(d.pdf().windows(2).all(|w| w[0] >= w[1]));

        let ends = d.strata_ends();
        assert_eq!(d.n_strata(), batch_size);
        assert_eq!(ends[0], 0);
        assert_eq!(ends[batch_size], n);
        assert!(ends.windows(2).all(|w| w[0] < w[1]));

        let covered = d.strata().flatten().collect::<Vec<_>>();
        assert_eq!(covered, (1..=n).collect::<Vec<_>>());
    }

    #[test]
    fn test_distribution() {
        for &alpha in &[0.4, 0.7, 0.9, 2.0] {
            for &(n, batch_size) in &[(1, 1), (32, 32), (100, 8), (1000, 32), (10000, 64)] {
                let d = Distribution::new(n, alpha, batch_size).unwrap();
                assert_valid(&d, n, batch_size);
            }
        }
    }

    #[test]
    fn test_strata_have_equal_mass() {
        let (n, batch_size) = (10000, 10);
        let d = Distribution::new(n, 0.5, batch_size).unwrap();
        let max_p = d.probability(1).unwrap();
        for k in 1..=batch_size {
            let mass: f64 = d.stratum(k).unwrap().map(|r| d.pdf()[r - 1]).sum();
            assert!(
                (mass - 0.1).abs() <= max_p,
                "stratum {} has mass {}",
                k,
                mass
            );
        }
    }

    #[test]
    fn test_power_law() {
        let d = Distribution::new(4, 1.0, 2).unwrap();
        let z = 1.0 + 1.0 / 2.0 + 1.0 / 3.0 + 1.0 / 4.0;
        for (i, p) in d.pdf().iter().enumerate() {
            assert!((p - 1.0 / ((i + 1) as f64 * z)).abs() < 1e-12);
        }
        // cdf = [0.48, 0.72, 0.88, 1.0], rank 1 alone is below 0.5
        assert_eq!(d.strata_ends(), &[0, 1, 4]);
    }

    #[test]
    fn test_out_of_range_rank_and_stratum() {
        let d = Distribution::new(10, 0.7, 3).unwrap();
        assert!(d.probability(0).is_none());
        assert!(d.probability(11).is_none());
        assert_eq!(d.probability(10), d.pdf().last().copied());
        assert!(d.stratum(0).is_none());
        assert!(d.stratum(4).is_none());
        assert_eq!(d.stratum(3).map(|r| *r.end()), Some(10));
    }

    #[test]
    fn test_underflowing_alpha() {
        // 100^-200 is below the smallest f64
        assert!(matches!(
            Distribution::new(100, 200.0, 4),
            Err(RankReplayError::InvalidConfig(_))
        ));
        let d = Distribution::new(100, 150.0, 4).unwrap();
        assert!(d.pdf().iter().all(|&p| p > 0.0));
    }

    #[test]
    fn test_invalid_distribution() {
        assert!(Distribution::new(4, 0.7, 5).is_err());
        assert!(Distribution::new(4, 0.7, 0).is_err());
        assert!(Distribution::new(4, 0.0, 2).is_err());
        assert!(Distribution::new(4, f64::NAN, 2).is_err());
    }

    #[test]
    fn test_table() {
        let config = RankReplayConfig::default()
            .max_size(1000)
            .partition_num(10)
            .learn_start(300)
            .batch_size(16);
        let table = DistributionTable::build(&config).unwrap();

        assert_eq!(table.partition_size(), 100);
        let built = table.iter().map(|(p, d)| (p, d.len())).collect::<Vec<_>>();
        assert_eq!(
            built,
            (3..=10).map(|p| (p, p * 100)).collect::<Vec<_>>()
        );
        assert!(table.get(2).is_none());
        assert!(table.get(11).is_none());

        assert_eq!(table.partition_index(300), 3);
        assert_eq!(table.partition_index(399), 3);
        assert_eq!(table.partition_index(1000), 10);
        assert_eq!(table.for_record_size(450).unwrap().len(), 400);
        assert_eq!(
            table.for_record_size(150),
            Err(RankReplayError::MissingDistribution(1))
        );
        for (_, d) in table.iter() {
            assert_valid(d, d.len(), 16);
        }
    }

    #[test]
    fn test_unreachable_partition() {
        // record_size = 250 resolves partition 2 with 200 < learn_start ranks
        let config = RankReplayConfig::default()
            .max_size(1000)
            .partition_num(10)
            .learn_start(250)
            .batch_size(16);
        assert!(matches!(
            DistributionTable::build(&config),
            Err(RankReplayError::InvalidConfig(_))
        ));
    }
}
