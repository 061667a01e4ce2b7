//! The parameter pack: every knob that determines the inner workings of the
//! model, as one nested serde structure with the model defaults baked into
//! `Default`. Loadable from a JSON file; any field left out keeps its
//! default.
//!
//! Units: parameters describing ages and careers are configured in YEARS for
//! readability; the running model works exclusively in DAYS (one timestep =
//! one day). Year-typed values are multiplied by 365 at the point of
//! consumption.

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::StinetError;

pub const DAYS_PER_YEAR: f64 = 365.0;

#[derive(Clone, Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Demographics {
    /// Constant target size of the sexually active population.
    pub initial_population: u32,
}

impl Default for Demographics {
    fn default() -> Self {
        Demographics {
            initial_population: 23_800,
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RelationGenerationStart {
    /// Mean arrival rate of the stationary process, per year.
    pub stat_process_average: f64,
    /// Arrivals generated to warm the shared prototype process.
    pub stat_process_n_prearrivals: u32,
    pub weight_average: f64,
    pub weight_short_history: f64,
    pub weight_long_history: f64,
    /// Unit is days^-1.
    pub short_decay_rate_days: f64,
    /// Unit is days^-1.
    pub long_decay_rate_days: f64,

    /// In years since birth.
    pub sexual_onset: f64,
    /// In years since birth. Death happens at this age.
    pub sexual_stop: f64,
    pub average_total_lifetime_n_partners: f64,
    /// 0.5 = symmetric peak, < 0.5 early peak, > 0.5 late peak. Must lie in
    /// (0.01, 0.99); the boundary polynomials are degenerate.
    pub rate_given_age_formula_skew: f64,
    /// 1 = fully age-dependent rate, 0 = constant rate.
    pub age_effect_strength: f64,
}

impl Default for RelationGenerationStart {
    fn default() -> Self {
        RelationGenerationStart {
            stat_process_average: 16.0,
            stat_process_n_prearrivals: 1_000_000,
            weight_average: 0.5,
            weight_short_history: 0.5,
            weight_long_history: 0.0,
            short_decay_rate_days: 1.0 / 30.0,
            long_decay_rate_days: 1.0 / 3650.0,
            sexual_onset: 15.0,
            sexual_stop: 80.0,
            average_total_lifetime_n_partners: 300.0,
            rate_given_age_formula_skew: 0.5,
            age_effect_strength: 1.0,
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RelationDuration {
    pub distribution: String,
    /// In days.
    pub mean: f64,
    /// In days^2. Must not exceed mean^2.
    pub variance: f64,
    /// 1 = fully monogamous, 0 = fully concurrent.
    pub monogamy: f64,
}

impl Default for RelationDuration {
    fn default() -> Self {
        RelationDuration {
            distribution: "gamma".to_string(),
            mean: 20.0,
            variance: 40.0,
            monogamy: 0.5,
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MatchMaking {
    /// Contiguous [lower, upper] age intervals in years; upper bound
    /// inclusive, each lower bound equal to the previous upper bound.
    pub age_groups: Vec<(f64, f64)>,
    pub age_group_preference_distribution: String,
    pub age_group_preference_sd: f64,
    /// Contiguous disjoint integer day ranges covering [0, i32::MAX].
    pub duration_groups: Vec<(i32, i32)>,
    pub duration_group_preference_distribution: String,

    /// Lower = better & slower.
    pub weight_new_database_update: f64,
    /// Higher = better & slower.
    pub n_relation_matrix_iterations: u32,
    /// Lower = better & slower.
    pub group_estimate_error_tolerance: f64,
}

impl Default for MatchMaking {
    fn default() -> Self {
        MatchMaking {
            age_groups: vec![
                (15.0, 20.0),
                (20.0, 25.0),
                (25.0, 30.0),
                (30.0, 35.0),
                (35.0, 40.0),
                (40.0, 45.0),
                (45.0, 50.0),
                (50.0, 55.0),
                (55.0, 60.0),
                (60.0, 65.0),
                (65.0, 70.0),
                (70.0, 75.0),
                (75.0, 80.0),
            ],
            age_group_preference_distribution: "normal".to_string(),
            age_group_preference_sd: 12.0,
            duration_groups: vec![
                (0, 0),
                (1, 1),
                (2, 3),
                (4, 7),
                (8, 15),
                (16, 31),
                (32, 61),
                (62, 183),
                (184, 365),
                (366, 730),
                (731, 1825),
                (1826, 3560),
                (3561, i32::MAX),
            ],
            duration_group_preference_distribution: "exact".to_string(),
            weight_new_database_update: 0.001,
            n_relation_matrix_iterations: 50,
            group_estimate_error_tolerance: 0.001,
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SexualBehavior {
    /// In times per day.
    pub sex_frequency: f64,
    /// Fraction of intercourse protected (1 = all the time).
    pub condom_use: f64,
}

impl Default for SexualBehavior {
    fn default() -> Self {
        SexualBehavior {
            sex_frequency: 1.0 / 3.0,
            condom_use: 0.6,
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Hiv {
    /// Probability of transmission per unprotected anal intercourse.
    pub base_rate: f64,
    /// Relative infectivity as a step function of days since infection:
    /// (start day, multiplier) pairs, first entry at day 0.
    pub infectivity_over_time: Vec<(f64, f64)>,
    /// Extra infectivity when the infected partner has gonorrhea.
    pub hiv_pos_has_gonorrhea_multiplier: f64,
    /// Extra susceptibility when the susceptible partner has gonorrhea.
    pub hiv_neg_has_gonorrhea_multiplier: f64,
    /// Persons seeded HIV-positive at simulation start.
    pub initial_seeded: u32,
}

impl Default for Hiv {
    fn default() -> Self {
        Hiv {
            base_rate: 0.005,
            infectivity_over_time: vec![(0.0, 5.0), (400.0, 0.9), (3650.0, 1.1)],
            hiv_pos_has_gonorrhea_multiplier: 1.5,
            hiv_neg_has_gonorrhea_multiplier: 1.5,
            initial_seeded: 500,
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Gonorrhea {
    pub base_rate: f64,
    pub probability_symptomatic: f64,
    /// Days until spontaneous clearance of a symptomatic infection.
    pub natural_cure_symptomatic: i32,
    /// Days until spontaneous clearance of an asymptomatic infection.
    pub natural_cure_asymptomatic: i32,
    /// Persons seeded gonorrhea-positive at simulation start.
    pub initial_seeded: u32,
}

impl Default for Gonorrhea {
    fn default() -> Self {
        Gonorrhea {
            base_rate: 0.30,
            probability_symptomatic: 0.6,
            natural_cure_symptomatic: 45,
            natural_cure_asymptomatic: 200,
            initial_seeded: 500,
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ParameterPack {
    pub demographics: Demographics,
    pub relation_generation_start: RelationGenerationStart,
    pub relation_duration: RelationDuration,
    pub matchmaking: MatchMaking,
    pub sexual_behavior: SexualBehavior,
    pub hiv: Hiv,
    pub gonorrhea: Gonorrhea,
}

impl ParameterPack {
    pub fn from_json_file(path: &Path) -> Result<ParameterPack, StinetError> {
        let text = fs::read_to_string(path)?;
        let pack = serde_json::from_str(&text)?;
        Ok(pack)
    }

    /// Sexual onset in days since birth.
    pub fn sexual_onset_days(&self) -> i32 {
        (self.relation_generation_start.sexual_onset * DAYS_PER_YEAR) as i32
    }

    /// Sexual stop in days since birth; this is also the age of death.
    pub fn sexual_stop_days(&self) -> i32 {
        (self.relation_generation_start.sexual_stop * DAYS_PER_YEAR) as i32
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn defaults_are_consistent() {
        let pack = ParameterPack::default();
        assert_eq!(pack.sexual_onset_days(), 15 * 365);
        assert_eq!(pack.sexual_stop_days(), 80 * 365);
        let w = &pack.relation_generation_start;
        assert!((w.weight_average + w.weight_short_history + w.weight_long_history - 1.0).abs() < 1e-12);
        assert_eq!(pack.matchmaking.duration_groups.last().unwrap().1, i32::MAX);
    }

    #[test]
    fn partial_json_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("params.json");
        let mut file = fs::File::create(&path).unwrap();
        write!(
            file,
            r#"{{"demographics": {{"initial_population": 100}}, "hiv": {{"base_rate": 0.0, "initial_seeded": 0}}}}"#
        )
        .unwrap();

        let pack = ParameterPack::from_json_file(&path).unwrap();
        assert_eq!(pack.demographics.initial_population, 100);
        assert_eq!(pack.hiv.base_rate, 0.0);
        // Untouched sections keep their defaults.
        assert_eq!(pack.gonorrhea.natural_cure_symptomatic, 45);
        assert_eq!(pack.relation_duration.mean, 20.0);
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let bad: Result<ParameterPack, _> =
            serde_json::from_str(r#"{"demographics": {"initial_populaton": 5}}"#);
        assert!(bad.is_err());
    }
}
