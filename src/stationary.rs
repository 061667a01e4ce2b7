//! The stationary auto-induced arrival process.
//!
//! A renewal process whose instantaneous rate is a weighted blend of a
//! constant mean and two exponentially decaying arrival kernels:
//!
//! ```text
//! lambda(n) = w_avg * M + w_short * S(n) + w_long * L(n)
//! ```
//!
//! Each kernel decays by `exp(-r * dt)` between arrivals and jumps by `r`
//! at an arrival, which makes it an unbiased running estimate of the recent
//! arrival rate; with the weights summing to one the blend mean-reverts to
//! M. A configurable number of pre-arrivals warms the history so the
//! process is approximately stationary from the first observed arrival.

use rand::rngs::SmallRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Exp};

#[derive(Clone)]
pub struct StationaryProcess {
    average: f64,
    weight_average: f64,
    weight_short: f64,
    weight_long: f64,
    short_decay_rate: f64,
    long_decay_rate: f64,
    short_intensity: f64,
    long_intensity: f64,
    rng: SmallRng,
}

impl StationaryProcess {
    /// `average` is M, the long-run mean arrival rate (per day). The three
    /// weights must sum to 1.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        average: f64,
        weight_average: f64,
        weight_short: f64,
        weight_long: f64,
        short_decay_rate: f64,
        long_decay_rate: f64,
        n_prearrivals: u32,
        seed: u64,
    ) -> StationaryProcess {
        assert!(
            (weight_average + weight_short + weight_long - 1.0).abs() < 1e-9,
            "stationary process weights must sum to 1"
        );
        assert!(average > 0.0, "stationary process average rate must be positive");
        let mut process = StationaryProcess {
            average,
            weight_average,
            weight_short,
            weight_long,
            short_decay_rate,
            long_decay_rate,
            short_intensity: 0.0,
            long_intensity: 0.0,
            rng: SmallRng::seed_from_u64(seed),
        };
        for _ in 0..n_prearrivals {
            process.next_arrival();
        }
        process
    }

    /// The next inter-arrival time, in days. Non-negative.
    pub fn next_arrival(&mut self) -> f64 {
        let rate = self.weight_average * self.average
            + self.weight_short * self.short_intensity
            + self.weight_long * self.long_intensity;
        assert!(rate > 0.0, "stationary process rate collapsed to zero");
        let dt = Exp::new(rate).unwrap().sample(&mut self.rng);

        self.short_intensity =
            self.short_intensity * (-self.short_decay_rate * dt).exp() + self.short_decay_rate;
        self.long_intensity =
            self.long_intensity * (-self.long_decay_rate * dt).exp() + self.long_decay_rate;
        dt
    }

    /// M, the configured mean rate.
    pub fn average_rate(&self) -> f64 {
        self.average
    }

    fn reseed(&mut self, seed: u64) {
        self.rng = SmallRng::seed_from_u64(seed);
    }
}

/// Hands out independent processes while paying the pre-warming cost once:
/// a prototype is warmed at construction and every `get` clones its
/// (stationary) kernel state under a fresh seed.
pub struct StationaryProcessFactory {
    prototype: StationaryProcess,
    seed_rng: SmallRng,
}

impl StationaryProcessFactory {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        average: f64,
        weight_average: f64,
        weight_short: f64,
        weight_long: f64,
        short_decay_rate: f64,
        long_decay_rate: f64,
        n_prearrivals: u32,
        seed: u64,
    ) -> StationaryProcessFactory {
        let mut seed_rng = SmallRng::seed_from_u64(seed);
        let prototype = StationaryProcess::new(
            average,
            weight_average,
            weight_short,
            weight_long,
            short_decay_rate,
            long_decay_rate,
            n_prearrivals,
            rand::RngCore::next_u64(&mut seed_rng),
        );
        StationaryProcessFactory { prototype, seed_rng }
    }

    pub fn get(&mut self) -> StationaryProcess {
        let mut process = self.prototype.clone();
        process.reseed(rand::RngCore::next_u64(&mut self.seed_rng));
        process
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pure_average_process_has_unit_mean_interarrival() {
        // With w_avg = 1 and M = 1 the process is plain Poisson(1).
        let mut process =
            StationaryProcess::new(1.0, 1.0, 0.0, 0.0, 1.0 / 30.0, 1.0 / 3650.0, 0, 7);
        let n = 1_000_000;
        let total: f64 = (0..n).map(|_| process.next_arrival()).sum();
        let mean = total / f64::from(n);
        assert!((mean - 1.0).abs() < 0.01, "mean inter-arrival {mean}");
    }

    #[test]
    fn arrivals_are_non_negative() {
        let mut process =
            StationaryProcess::new(16.0 / 365.0, 0.5, 0.5, 0.0, 1.0 / 30.0, 1.0 / 3650.0, 1000, 3);
        for _ in 0..1000 {
            assert!(process.next_arrival() >= 0.0);
        }
    }

    #[test]
    fn blended_process_stays_near_configured_mean() {
        let mut process = StationaryProcess::new(0.5, 0.4, 0.4, 0.2, 0.1, 0.01, 10_000, 11);
        let n = 200_000;
        let total: f64 = (0..n).map(|_| process.next_arrival()).sum();
        let mean_rate = f64::from(n) / total;
        assert!(
            (mean_rate - 0.5).abs() / 0.5 < 0.05,
            "empirical rate {mean_rate}"
        );
    }

    #[test]
    #[should_panic(expected = "weights must sum to 1")]
    fn weights_must_sum_to_one() {
        StationaryProcess::new(1.0, 0.5, 0.2, 0.2, 0.1, 0.01, 0, 1);
    }

    #[test]
    fn factory_instances_are_independent_but_share_warmth() {
        let mut factory =
            StationaryProcessFactory::new(1.0, 0.5, 0.5, 0.0, 1.0 / 30.0, 1.0 / 3650.0, 5000, 9);
        let mut a = factory.get();
        let mut b = factory.get();
        // Same warmed kernel state, different seeds.
        assert_eq!(a.short_intensity, b.short_intensity);
        assert_ne!(a.next_arrival(), b.next_arrival());
    }
}
