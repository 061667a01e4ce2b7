//! From what people want to what they can get.
//!
//! The preference matrix says which group someone would pick given a free
//! choice. Groups differ in size, so not everyone gets their preference:
//! the partner-choice matrix C is the realizable distribution, row
//! stochastic and column-mass consistent with the running estimate of the
//! group proportions pi (sum_i pi_i * C[i][j] = pi_j).

use super::groups::Matrix;

/// The historic exponential weighting rule: uniform averaging while young,
/// tapering to a configured floor. Pure in the call count.
#[derive(Clone, Copy)]
pub struct HistoricWeighting {
    floor: f64,
}

impl HistoricWeighting {
    pub fn new(floor: f64) -> HistoricWeighting {
        assert!(floor > 0.0 && floor <= 1.0, "weighting floor must lie in (0, 1]");
        HistoricWeighting { floor }
    }

    /// The weight of the n-th observation (n counted from 1).
    pub fn weight(&self, n: u64) -> f64 {
        (1.0 / n as f64).max(self.floor)
    }
}

#[derive(Clone, Copy)]
pub struct PartnerChoiceParameters {
    pub weight_new_database_update: f64,
    pub n_relation_matrix_iterations: u32,
    pub group_estimate_error_tolerance: f64,
}

pub struct PartnerChoiceMatrix {
    preference: Matrix,
    proportions: Vec<f64>,
    proportions_at_last_solve: Vec<f64>,
    weighting: HistoricWeighting,
    n_iterations: u32,
    tolerance: f64,
    n_groups: usize,
    n_updates: u64,
    n_solves: u64,
}

impl PartnerChoiceMatrix {
    pub fn new(preference: Matrix, parameters: PartnerChoiceParameters) -> PartnerChoiceMatrix {
        let n_groups = preference.len();
        for (i, row) in preference.iter().enumerate() {
            assert_eq!(row.len(), n_groups, "preference matrix is not square");
            let sum: f64 = row.iter().sum();
            assert!(
                (0.999..1.001).contains(&sum),
                "preference matrix row {i} sums to {sum}, not 1"
            );
        }
        for column in 0..n_groups {
            let column_sum: f64 = preference.iter().map(|row| row[column]).sum();
            assert!(
                column_sum > 0.0,
                "preference matrix column {column} sums to 0: nobody wants this group \
                 and the rescaling cannot converge"
            );
        }

        PartnerChoiceMatrix {
            proportions: vec![0.0; n_groups],
            proportions_at_last_solve: vec![0.0; n_groups],
            weighting: HistoricWeighting::new(parameters.weight_new_database_update),
            n_iterations: parameters.n_relation_matrix_iterations,
            tolerance: parameters.group_estimate_error_tolerance,
            n_groups,
            n_updates: 0,
            n_solves: 0,
            preference,
        }
    }

    /// Mixes a day's observed group counts into the running proportions.
    /// A day with no requests leaves the estimate untouched.
    pub fn update(&mut self, counts: &[i32]) {
        assert_eq!(counts.len(), self.n_groups);
        self.n_updates += 1;
        let total: f64 = counts.iter().map(|&c| f64::from(c)).sum();
        if total == 0.0 {
            return;
        }
        let weight_new = self.weighting.weight(self.n_updates);
        let weight_old = 1.0 - weight_new;
        for (estimate, &count) in self.proportions.iter_mut().zip(counts) {
            *estimate = weight_new * (f64::from(count) / total) + weight_old * *estimate;
        }
    }

    /// True when the proportions drifted past the tolerance since the last
    /// solve, i.e. a recomputation is worth its cost.
    pub fn is_new_matrix_available(&self) -> bool {
        self.proportions
            .iter()
            .zip(&self.proportions_at_last_solve)
            .map(|(now, then)| (now - then).abs())
            .fold(0.0, f64::max)
            > self.tolerance
    }

    /// Solves for the partner-choice matrix: start from the preference,
    /// alternately rescale columns to the target mass and rows to 1 for the
    /// configured number of iterations, then polish.
    pub fn solve(&mut self) -> Matrix {
        self.proportions_at_last_solve = self.proportions.clone();
        self.n_solves += 1;

        let n = self.n_groups;
        let mut matrix = self.preference.clone();
        for _ in 0..self.n_iterations {
            for column in 0..n {
                let column_mass: f64 = (0..n)
                    .map(|row| self.proportions[row] * matrix[row][column])
                    .sum();
                if column_mass != 0.0 && self.proportions[column] != 0.0 {
                    let rescale = self.proportions[column] / column_mass;
                    for row in matrix.iter_mut() {
                        row[column] *= rescale;
                    }
                }
            }
            for row in matrix.iter_mut() {
                let row_sum: f64 = row.iter().sum();
                for cell in row.iter_mut() {
                    *cell /= row_sum;
                }
            }
        }
        self.finishing_touch(matrix)
    }

    // Nudge the iterated matrix into exact column-mass consistency. Every
    // group can form in-group relations (the population is single-sex), so
    // any shortfall of a row can be padded on its diagonal: symmetrize the
    // relation masses, scale them under every group's capacity, fill the
    // remainder in-group, and renormalize rows.
    fn finishing_touch(&self, matrix: Matrix) -> Matrix {
        let n = self.n_groups;
        let pi = &self.proportions;

        // mass[i][j]: share of all relations between i and j (directed).
        let mut mass = vec![vec![0.0; n]; n];
        let mut row_mass_per_capacity = vec![0.0; n];
        for i in 0..n {
            for j in 0..n {
                mass[i][j] = if i == j {
                    pi[i] * matrix[i][i]
                } else {
                    // Groups cannot give out more relations than the other
                    // side can absorb.
                    (pi[i] * matrix[i][j]).min(pi[j] * matrix[j][i])
                };
            }
            if pi[i] > 0.0 {
                row_mass_per_capacity[i] = mass[i].iter().sum::<f64>() / pi[i];
            }
        }

        // Scale so no group is overscheduled.
        let factor = row_mass_per_capacity.iter().fold(0.0, |a: f64, &b| a.max(b));
        if factor > 0.0 {
            for row in &mut mass {
                for cell in row.iter_mut() {
                    *cell /= factor;
                }
            }
        }

        // Pad diagonals so every row's mass equals its group size; rows then
        // sum to the group sizes and the whole matrix to 1.
        for i in 0..n {
            let shortfall = pi[i] - mass[i].iter().sum::<f64>();
            mass[i][i] += shortfall;
        }

        // Back to a row-stochastic choice matrix.
        for (i, row) in mass.iter_mut().enumerate() {
            let row_sum: f64 = row.iter().sum();
            if row_sum != 0.0 {
                for cell in row.iter_mut() {
                    *cell /= row_sum;
                }
            } else {
                // An empty group formally keeps in-group choices.
                for (j, cell) in row.iter_mut().enumerate() {
                    *cell = if i == j { 1.0 } else { 0.0 };
                }
            }
        }
        mass
    }

    pub fn proportion(&self, group: usize) -> f64 {
        self.proportions[group]
    }

    pub fn log_report(&self) -> String {
        format!(
            "Partner-choice matrix report:\n\
             Group updates: {}\n\
             Matrix solves: {}\n\
             Solving is the expensive step; it should stay low relative to updates.\n",
            self.n_updates, self.n_solves
        )
    }
}
