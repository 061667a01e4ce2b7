//! Relation-duration sampling.
//!
//! Given the time until a person's next relation, produce the duration of
//! the current one:
//!
//! 1. Rank the inter-relation time against all previously seen values
//!    (online percentile estimate).
//! 2. Draw an independent unit uniform.
//! 3. Associate the two with weights (1 - monogamy, monogamy): the result
//!    stays uniform on [0, 1] and, as monogamy approaches 1, tracks the
//!    inter-relation percentile.
//! 4. Map through the inverse CDF of a gamma with the configured mean and
//!    variance, truncated to whole days.
//!
//! The truncation shaves about half a day off the average; rounding up
//! instead would underestimate the shortest durations by half.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use statrs::distribution::{ContinuousCDF, Gamma};

use crate::params::RelationDuration;

/// The percentile database stops growing here; plenty for a stable
/// empirical distribution.
const MAX_SAMPLES: usize = 100_000;

/// Online empirical percentile estimator. Returns conservative lower/upper
/// bounds so ties stay representable: in (0,0,0,0,1), which percentile is a
/// 0?
pub struct PercentileEstimator {
    samples: Vec<i32>, // kept sorted
}

impl PercentileEstimator {
    pub fn new() -> PercentileEstimator {
        PercentileEstimator { samples: Vec::new() }
    }

    /// Lower and upper percentile bounds for `value`, then records it.
    /// With n stored values there are n + 1 insertion positions; position k
    /// maps to (k + 0.5) / (n + 1) so the extremes never report 0 or 1.
    pub fn lower_upper(&mut self, value: i32) -> (f64, f64) {
        let positions = (self.samples.len() + 1) as f64;
        let lower = self.samples.partition_point(|&x| x < value);
        let upper = self.samples.partition_point(|&x| x <= value);
        let percentile_lower = (lower as f64 + 0.5) / positions;
        let percentile_upper = (upper as f64 + 0.5) / positions;

        if self.samples.len() < MAX_SAMPLES {
            self.samples.insert(upper, value);
        }
        (percentile_lower, percentile_upper)
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

impl Default for PercentileEstimator {
    fn default() -> Self {
        Self::new()
    }
}

/// Distribution-free association of two unit uniforms: their weighted sum
/// pushed through its own CDF. Uniform in, uniform out; as the second
/// weight approaches 1 the output approaches the second input.
#[derive(Clone, Copy)]
pub struct RankAssociation {
    weight_random: f64,
    weight_rank: f64,
}

impl RankAssociation {
    pub fn new(weight_random: f64, weight_rank: f64) -> RankAssociation {
        assert!(
            (weight_random + weight_rank - 1.0).abs() < 1e-9,
            "association weights must sum to 1"
        );
        assert!(weight_random >= 0.0 && weight_rank >= 0.0);
        RankAssociation {
            weight_random,
            weight_rank,
        }
    }

    pub fn combine(&self, random: f64, rank: f64) -> f64 {
        let low = self.weight_random.min(self.weight_rank);
        let high = self.weight_random.max(self.weight_rank);
        if low < 1e-12 {
            // One input carries all the weight; its value is already
            // uniform.
            return if self.weight_rank > self.weight_random {
                rank
            } else {
                random
            };
        }

        // The sum of U(0, w1) and U(0, w2) is trapezoidal on [0, 1]; its
        // CDF maps the sum back to a unit uniform.
        let s = self.weight_random * random + self.weight_rank * rank;
        if s <= low {
            s * s / (2.0 * low * high)
        } else if s <= high {
            (2.0 * s - low) / (2.0 * high)
        } else {
            1.0 - (1.0 - s) * (1.0 - s) / (2.0 * low * high)
        }
    }
}

/// Quantile function of the configured duration distribution.
struct DurationDistribution {
    gamma: Gamma,
}

impl DurationDistribution {
    fn new(distribution: &str, mean: f64, variance: f64) -> DurationDistribution {
        assert_eq!(
            distribution, "gamma",
            "only the gamma duration distribution is supported"
        );
        assert!(
            mean * mean >= variance,
            "duration variance exceeds mean^2, impossible for a gamma"
        );
        // statrs parameterizes by shape and rate: shape = mean^2/variance,
        // rate = mean/variance.
        let gamma = Gamma::new(mean * mean / variance, mean / variance)
            .expect("invalid gamma parameters");
        DurationDistribution { gamma }
    }

    fn duration_given_percentile(&self, percentile: f64) -> f64 {
        self.gamma.inverse_cdf(percentile)
    }
}

pub struct DurationSampler {
    percentiles: PercentileEstimator,
    association: RankAssociation,
    distribution: DurationDistribution,
    rng: SmallRng,
}

impl DurationSampler {
    pub fn new(parameters: &RelationDuration, seed: u64) -> DurationSampler {
        assert!(
            (0.0..=1.0).contains(&parameters.monogamy),
            "monogamy must lie in [0, 1]"
        );
        DurationSampler {
            percentiles: PercentileEstimator::new(),
            association: RankAssociation::new(1.0 - parameters.monogamy, parameters.monogamy),
            distribution: DurationDistribution::new(
                &parameters.distribution,
                parameters.mean,
                parameters.variance,
            ),
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    /// The duration in days of a relation whose owner waits
    /// `inter_relation_time` days for the next one. Can be 0.
    pub fn get(&mut self, inter_relation_time: i32) -> i32 {
        let (lower, upper) = self.percentiles.lower_upper(inter_relation_time);
        let mut rank = lower;
        if upper - lower > 0.001 {
            // A real band of ties: pick uniformly inside it.
            rank = (upper - lower) * self.rng.random::<f64>() + lower;
        }

        let percentile = self.association.combine(self.rng.random::<f64>(), rank);
        self.distribution.duration_given_percentile(percentile) as i32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sampler(monogamy: f64, seed: u64) -> DurationSampler {
        let parameters = RelationDuration {
            monogamy,
            ..RelationDuration::default()
        };
        DurationSampler::new(&parameters, seed)
    }

    #[test]
    fn percentile_bounds_are_conservative_and_ordered() {
        let mut estimator = PercentileEstimator::new();
        // Empty database: single possible position, bounds collapse at 0.5.
        assert_eq!(estimator.lower_upper(10), (0.5, 0.5));
        // 10 is stored; 5 goes before it.
        let (lower, upper) = estimator.lower_upper(5);
        assert_eq!((lower, upper), (0.25, 0.25));
        // A tie with the stored 5 spans a band.
        let (lower, upper) = estimator.lower_upper(5);
        assert!(lower < upper);
        assert!(lower > 0.0 && upper < 1.0);
    }

    #[test]
    fn percentile_estimator_caps_its_database() {
        let mut estimator = PercentileEstimator::new();
        for i in 0..120_000 {
            estimator.lower_upper(i);
        }
        assert_eq!(estimator.len(), MAX_SAMPLES);
    }

    #[test]
    fn degenerate_weights_pass_through() {
        let only_rank = RankAssociation::new(0.0, 1.0);
        assert_eq!(only_rank.combine(0.123, 0.77), 0.77);
        let only_random = RankAssociation::new(1.0, 0.0);
        assert_eq!(only_random.combine(0.123, 0.77), 0.123);
    }

    #[test]
    fn association_output_is_uniform() {
        // Histogram of combined values for uniform inputs must be flat.
        let association = RankAssociation::new(0.3, 0.7);
        let mut rng = SmallRng::seed_from_u64(21);
        let mut buckets = [0u32; 10];
        let n = 100_000;
        for _ in 0..n {
            let value = association.combine(rng.random::<f64>(), rng.random::<f64>());
            assert!((0.0..=1.0).contains(&value));
            buckets[((value * 10.0) as usize).min(9)] += 1;
        }
        for &count in &buckets {
            let expected = n as f64 / 10.0;
            assert!(
                (f64::from(count) - expected).abs() < expected * 0.05,
                "bucket count {count}"
            );
        }
    }

    #[test]
    fn concurrent_sampler_matches_gamma_moments() {
        // monogamy = 0: plain gamma(mean 20, variance 40) through its
        // quantile, minus about half a day for the truncation.
        let mut s = sampler(0.0, 4);
        let n = 50_000;
        let mut sum = 0.0;
        let mut sum_sq = 0.0;
        for i in 0..n {
            let d = f64::from(s.get(i % 1000));
            sum += d;
            sum_sq += d * d;
        }
        let mean = sum / f64::from(n);
        let variance = sum_sq / f64::from(n) - mean * mean;
        assert!((19.0..=21.0).contains(&mean), "mean {mean}");
        assert!((36.0..=44.0).contains(&variance), "variance {variance}");
    }

    #[test]
    fn fully_monogamous_first_draw_is_the_median_duration() {
        // With an empty database the percentile is exactly 0.5 and
        // monogamy = 1 passes it straight to the gamma quantile.
        let expected = DurationDistribution::new("gamma", 20.0, 40.0)
            .duration_given_percentile(0.5) as i32;
        for seed in 0..5 {
            let mut s = sampler(1.0, seed);
            assert_eq!(s.get(300), expected);
        }
    }

    #[test]
    fn monogamy_couples_gap_to_duration() {
        // Long gaps must map to systematically longer relations when
        // monogamy is high.
        let mut s = sampler(1.0, 9);
        // Feed a spread of gaps to build the database.
        for i in 0..2000 {
            s.get(i);
        }
        let short: f64 = (0..200).map(|_| f64::from(s.get(1))).sum::<f64>() / 200.0;
        let long: f64 = (0..200).map(|_| f64::from(s.get(5000))).sum::<f64>() / 200.0;
        assert!(
            long > short + 5.0,
            "long-gap durations {long} not above short-gap {short}"
        );
    }

    #[test]
    #[should_panic(expected = "variance exceeds mean^2")]
    fn overdispersed_duration_rejected() {
        let parameters = RelationDuration {
            mean: 5.0,
            variance: 26.0,
            ..RelationDuration::default()
        };
        DurationSampler::new(&parameters, 1);
    }
}
