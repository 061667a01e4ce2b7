//! The age x requested-duration group partition and the inter-group
//! preference matrix.
//!
//! Both dimensions are independent, so the joint preference is the
//! Kronecker product of the per-dimension matrices. Age preference is
//! normal around the chooser's own age; duration preference is exact (only
//! same-duration-group matches).

use statrs::distribution::{ContinuousCDF, Normal};

use crate::params::MatchMaking;

pub type Matrix = Vec<Vec<f64>>;

/// Age groups: contiguous [lower, upper] intervals in years, upper bound
/// inclusive. Preference from group i to group j is the probability mass a
/// normal centered on the chooser's age puts on j, averaged over sampled
/// ages inside i.
pub struct AgeDimension {
    lower: Vec<f64>,
    upper: Vec<f64>,
    normal: Normal,
}

impl AgeDimension {
    pub fn new(groups: &[(f64, f64)], preference_sd: f64) -> AgeDimension {
        assert!(!groups.is_empty(), "age groups must not be empty");
        for (i, group) in groups.iter().enumerate() {
            assert!(group.0 < group.1, "age group with lower bound above upper bound");
            if i != 0 {
                assert!(
                    group.0 == groups[i - 1].1,
                    "age groups must be contiguous and ascending"
                );
            }
        }
        AgeDimension {
            lower: groups.iter().map(|g| g.0).collect(),
            upper: groups.iter().map(|g| g.1).collect(),
            normal: Normal::new(0.0, preference_sd).expect("invalid age preference sd"),
        }
    }

    pub fn group_of(&self, value: f64) -> usize {
        assert!(
            value >= self.lower[0] && value <= *self.upper.last().unwrap(),
            "age {value} is outside every age group"
        );
        self.upper.partition_point(|&upper| upper < value)
    }

    pub fn n_groups(&self) -> usize {
        self.upper.len()
    }

    pub fn name(&self, group: usize) -> String {
        format!("{}-{}", self.lower[group], self.upper[group])
    }

    /// Estimated by integrating the normal over each target interval for
    /// 100 * n_groups sampled chooser ages, then renormalizing rows (some
    /// preference mass falls outside the modeled age range).
    pub fn preference_matrix(&self) -> Matrix {
        let n = self.n_groups();
        let mut matrix = vec![vec![0.0; n]; n];

        let lower = self.lower[0];
        let upper = *self.upper.last().unwrap();
        let total_samples = 100 * n;
        let step = (upper - lower) / total_samples as f64;

        let mut value = lower + step;
        while value < upper {
            let from = self.group_of(value);
            for to in 0..n {
                matrix[from][to] += self.normal.cdf(self.upper[to] - value)
                    - self.normal.cdf(self.lower[to] - value);
            }
            value += step;
        }

        for row in &mut matrix {
            let row_sum: f64 = row.iter().sum();
            for cell in row.iter_mut() {
                *cell /= row_sum;
            }
        }
        matrix
    }
}

/// Duration groups: contiguous disjoint integer day ranges. Matches only
/// happen within the same group.
pub struct DurationDimension {
    lower: Vec<i32>,
    upper: Vec<i32>,
}

impl DurationDimension {
    pub fn new(groups: &[(i32, i32)]) -> DurationDimension {
        assert!(!groups.is_empty(), "duration groups must not be empty");
        for (i, group) in groups.iter().enumerate() {
            assert!(group.0 <= group.1, "duration group with lower bound above upper bound");
            if i != 0 {
                assert!(
                    group.0 == groups[i - 1].1 + 1,
                    "duration groups must be contiguous and ascending"
                );
            }
        }
        DurationDimension {
            lower: groups.iter().map(|g| g.0).collect(),
            upper: groups.iter().map(|g| g.1).collect(),
        }
    }

    pub fn group_of(&self, value: i32) -> usize {
        assert!(
            value >= self.lower[0] && value <= *self.upper.last().unwrap(),
            "duration {value} is outside every duration group"
        );
        self.upper.partition_point(|&upper| upper < value)
    }

    pub fn n_groups(&self) -> usize {
        self.upper.len()
    }

    pub fn name(&self, group: usize) -> String {
        format!("{}-{}", self.lower[group], self.upper[group])
    }

    pub fn preference_matrix(&self) -> Matrix {
        let n = self.n_groups();
        let mut matrix = vec![vec![0.0; n]; n];
        for (i, row) in matrix.iter_mut().enumerate() {
            row[i] = 1.0;
        }
        matrix
    }
}

/// Maps (age, requested duration) to a flat group index and produces the
/// joint preference matrix.
pub struct GroupHandler {
    age: AgeDimension,
    duration: DurationDimension,
}

impl GroupHandler {
    pub fn new(parameters: &MatchMaking) -> GroupHandler {
        assert_eq!(
            parameters.age_group_preference_distribution, "normal",
            "only normal age-group preference is supported"
        );
        assert_eq!(
            parameters.duration_group_preference_distribution, "exact",
            "only exact duration-group preference is supported"
        );
        GroupHandler {
            age: AgeDimension::new(&parameters.age_groups, parameters.age_group_preference_sd),
            duration: DurationDimension::new(&parameters.duration_groups),
        }
    }

    pub fn group_of(&self, age_years: f64, duration_days: i32) -> usize {
        self.age.group_of(age_years) * self.duration.n_groups()
            + self.duration.group_of(duration_days)
    }

    pub fn n_groups(&self) -> usize {
        self.age.n_groups() * self.duration.n_groups()
    }

    pub fn group_name(&self, group: usize) -> String {
        let age_group = group / self.duration.n_groups();
        let duration_group = group % self.duration.n_groups();
        format!(
            "age group: {} duration group: {}",
            self.age.name(age_group),
            self.duration.name(duration_group)
        )
    }

    /// Joint preference: the Kronecker product of the two dimensions, with
    /// the duration dimension minor.
    pub fn preference_matrix(&self) -> Matrix {
        let n = self.n_groups();
        let n_duration = self.duration.n_groups();
        let age_pref = self.age.preference_matrix();
        let duration_pref = self.duration.preference_matrix();

        let mut matrix = vec![vec![0.0; n]; n];
        for (from, row) in matrix.iter_mut().enumerate() {
            for (to, cell) in row.iter_mut().enumerate() {
                let age_from = from / n_duration;
                let duration_from = from % n_duration;
                let age_to = to / n_duration;
                let duration_to = to % n_duration;
                *cell = age_pref[age_from][age_to] * duration_pref[duration_from][duration_to];
            }
        }
        matrix
    }
}

#[cfg(test)]
pub(crate) fn assert_rows_sum_to_one(matrix: &Matrix, tolerance: f64) {
    for (i, row) in matrix.iter().enumerate() {
        let sum: f64 = row.iter().sum();
        assert!((sum - 1.0).abs() < tolerance, "row {i} sums to {sum}");
    }
}
