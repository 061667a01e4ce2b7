//! The rate of acquiring new relationships as a function of days alive.
//!
//! A cubic a*x^3 + b*x^2 + c*x + d is fitted over the sexual career
//! [onset, stop] so that its shape follows the configured skew, then blended
//! with a constant by `age_effect_strength` and scaled so the lifetime
//! integral equals `average_total_lifetime_n_partners`.

use crate::params::{RelationGenerationStart, DAYS_PER_YEAR};

#[derive(Clone, Copy)]
pub struct RateGivenAgeCurve {
    a: f64,
    b: f64,
    c: f64,
    d: f64,
}

impl RateGivenAgeCurve {
    pub fn new(parameters: &RelationGenerationStart) -> RateGivenAgeCurve {
        let b = parameters.sexual_onset * DAYS_PER_YEAR;
        let e = parameters.sexual_stop * DAYS_PER_YEAR;
        let s = parameters.rate_given_age_formula_skew;
        assert!(
            s > 0.01 && s < 0.99,
            "rate_given_age_formula_skew outside (0.01, 0.99): the boundary polynomial is degenerate"
        );
        assert!(e > b, "sexual_stop must exceed sexual_onset");
        let p = 1.0 / (e - b);

        // Shape with average rate 1 over [b, e]; closed forms of the cubic
        // fit in terms of onset, career length and skew.
        let a_unit = p * p * p * (2.0 * s - 1.0) * 12.0;
        let b_unit = p * p * (3.0 * b * p - 6.0 * b * s * p + 1.0 - 3.0 * s) * 12.0;
        let c_unit =
            p * (6.0 * b * b * s * p * p - 3.0 * b * b * p * p + 6.0 * b * s * p - 2.0 * b * p + s)
                * 12.0;
        let d_unit = (b * b * b * p * p * p - 2.0 * b * b * b * s * p * p * p + b * b * p * p
            - 3.0 * b * b * p * p * s
            - b * s * p)
            * 12.0;

        // Weighted average with a constant of the same average rate; w = 1
        // keeps the fitted shape, w = 0 flattens all age effects out.
        let w = parameters.age_effect_strength;
        let a_blend = w * a_unit;
        let b_blend = w * b_unit;
        let c_blend = w * c_unit;
        let d_blend = w * d_unit + (1.0 - w);

        // Right shape, wrong height: rescale from e - b lifetime partners
        // (average rate 1) to the configured total.
        let scale = parameters.average_total_lifetime_n_partners / (e - b);
        RateGivenAgeCurve {
            a: a_blend * scale,
            b: b_blend * scale,
            c: c_blend * scale,
            d: d_blend * scale,
        }
    }

    /// The rate at `age_in_days`.
    pub fn rate(&self, age_in_days: f64) -> f64 {
        let x = age_in_days;
        self.a * x * x * x + self.b * x * x + self.c * x + self.d
    }

    /// The antiderivative of [`Self::rate`] at `age_in_days`.
    pub fn primitive(&self, age_in_days: f64) -> f64 {
        let x = age_in_days;
        self.a / 4.0 * x * x * x * x + self.b / 3.0 * x * x * x + self.c / 2.0 * x * x + self.d * x
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(skew: f64, strength: f64, total: f64) -> RelationGenerationStart {
        RelationGenerationStart {
            rate_given_age_formula_skew: skew,
            age_effect_strength: strength,
            average_total_lifetime_n_partners: total,
            ..RelationGenerationStart::default()
        }
    }

    fn lifetime_integral(p: &RelationGenerationStart) -> f64 {
        let curve = RateGivenAgeCurve::new(p);
        let b = p.sexual_onset * DAYS_PER_YEAR;
        let e = p.sexual_stop * DAYS_PER_YEAR;
        curve.primitive(e) - curve.primitive(b)
    }

    #[test]
    fn integral_matches_lifetime_partner_total() {
        let p = params(0.5, 1.0, 300.0);
        let integral = lifetime_integral(&p);
        assert!((integral - 300.0).abs() / 300.0 < 0.001, "integral {integral}");
    }

    #[test]
    fn integral_invariant_under_skew_and_blend() {
        for &(skew, strength) in &[(0.3, 1.0), (0.7, 0.5), (0.5, 0.0), (0.1, 0.9)] {
            let p = params(skew, strength, 120.0);
            let integral = lifetime_integral(&p);
            assert!(
                (integral - 120.0).abs() / 120.0 < 0.001,
                "skew {skew} strength {strength} integral {integral}"
            );
        }
    }

    #[test]
    fn symmetric_curve_peaks_midway() {
        let p = params(0.5, 1.0, 300.0);
        let curve = RateGivenAgeCurve::new(&p);
        let b = p.sexual_onset * DAYS_PER_YEAR;
        let e = p.sexual_stop * DAYS_PER_YEAR;
        let mid = (b + e) / 2.0;
        assert!(curve.rate(mid) > curve.rate(b + 1.0));
        assert!(curve.rate(mid) > curve.rate(e - 1.0));
        // Symmetry around the midpoint.
        assert!((curve.rate(mid - 1000.0) - curve.rate(mid + 1000.0)).abs() < 1e-9);
    }

    #[test]
    fn zero_strength_is_a_constant_rate() {
        let p = params(0.5, 0.0, 300.0);
        let curve = RateGivenAgeCurve::new(&p);
        let b = p.sexual_onset * DAYS_PER_YEAR;
        let e = p.sexual_stop * DAYS_PER_YEAR;
        let expected = 300.0 / (e - b);
        for age in [b, (b + e) / 2.0, e] {
            assert!((curve.rate(age) - expected).abs() < 1e-12);
        }
    }

    #[test]
    #[should_panic(expected = "rate_given_age_formula_skew")]
    fn boundary_skew_rejected() {
        RateGivenAgeCurve::new(&params(0.0, 1.0, 300.0));
    }
}
