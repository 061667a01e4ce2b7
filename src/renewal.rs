//! Per-person renewal driver: turns the stationary process's arrivals into
//! the ages (days since birth) at which this person starts relationships.
//!
//! The stationary process runs at a constant mean rate while a real person
//! does not, so the cumulative stationary time is stretched/compressed
//! through the integrated age-rate curve. Solving the resulting equation
//! uses a Newton-Raphson iteration clamped to the sexual career.

use crate::age_rate::RateGivenAgeCurve;
use crate::params::{RelationGenerationStart, DAYS_PER_YEAR};
use crate::stationary::StationaryProcess;

/// Returned when no more relations will occur in this person's life.
pub const NO_MORE_RELATIONS: i32 = i32::MAX;

#[derive(Clone)]
pub struct NextRelationTime {
    total_stationary_time: f64,
    onset_days: f64,
    stop_days: f64,
    process: StationaryProcess,
    curve: RateGivenAgeCurve,
}

impl NextRelationTime {
    pub fn new(
        parameters: &RelationGenerationStart,
        process: StationaryProcess,
    ) -> NextRelationTime {
        NextRelationTime {
            total_stationary_time: 0.0,
            onset_days: parameters.sexual_onset * DAYS_PER_YEAR,
            stop_days: parameters.sexual_stop * DAYS_PER_YEAR,
            process,
            curve: RateGivenAgeCurve::new(parameters),
        }
    }

    /// The next relation start in days since birth, truncated to a whole
    /// day. Non-decreasing across calls; [`NO_MORE_RELATIONS`] once the
    /// career is exhausted. Repeated calls may return the same day.
    pub fn next(&mut self) -> i32 {
        let arrival = self.process.next_arrival();
        assert!(arrival >= 0.0, "stationary process produced a negative arrival");
        self.total_stationary_time += arrival;

        match self.to_person_time(self.total_stationary_time) {
            Some(days) => days as i32,
            None => NO_MORE_RELATIONS,
        }
    }

    // Solve primitive(T) - primitive(onset) = stationary_time * M for T.
    fn residual(&self, guess: f64, stationary_time: f64) -> f64 {
        self.curve.primitive(guess) - self.curve.primitive(self.onset_days)
            - stationary_time * self.process.average_rate()
    }

    fn to_person_time(&self, stationary_time: f64) -> Option<f64> {
        let mut estimate = (self.stop_days - self.onset_days) / 2.0 + self.onset_days;
        let mut last_correction = f64::MAX;

        // Accurate to a tenth of a day is plenty for whole-day output.
        while last_correction.abs() > 0.1 {
            let old_estimate = estimate;
            estimate -= self.residual(estimate, stationary_time) / self.curve.rate(estimate);

            // Keep the iteration away from the career bounds where the rate
            // approaches zero.
            if estimate >= self.stop_days - 1.0 {
                estimate = self.stop_days - 1.0;
            }
            if estimate <= self.onset_days + 1.0 {
                estimate = self.onset_days + 1.0;
            }
            last_correction = estimate - old_estimate;
        }

        if estimate >= self.stop_days - 1.0 {
            return None; // The career ends before this arrival.
        }
        Some(estimate)
    }
}
