//! Priority-backlog controller.
//!
//! When a group keeps failing to match, its priority queue grows and the
//! matchmaker drifts into slow, inaccurate priority-mode scheduling. This
//! controller watches the backlog per group and advises bounded removals:
//! an exponentially weighted average of the excess over `goal_ratio` times
//! the fresh-queue size, drained at a thousandth per day, never cutting a
//! priority queue below ten. In a healthy configuration the removals stay
//! under a fraction of a percent of all requests.

use super::partner_choice::HistoricWeighting;

pub struct RobustnessCheck {
    n_groups: usize,
    average_excess: Vec<f64>,
    // Fractional removals carry over to later days.
    cumulative_remove: Vec<f64>,
    goal_ratio: f64,
    weighting: HistoricWeighting,
    n_calls: u64,
}

impl RobustnessCheck {
    pub fn new(n_groups: usize, goal_ratio: f64) -> RobustnessCheck {
        RobustnessCheck {
            n_groups,
            average_excess: vec![0.0; n_groups],
            cumulative_remove: vec![0.0; n_groups],
            goal_ratio,
            weighting: HistoricWeighting::new(0.01),
            n_calls: 0,
        }
    }

    /// Folds today's queue sizes into the running excess and returns how
    /// many to remove from each group's priority queue.
    pub fn update_and_advise(&mut self, normal: &[i32], priority: &[i32]) -> Vec<i32> {
        assert_eq!(normal.len(), self.n_groups);
        assert_eq!(priority.len(), self.n_groups);
        self.n_calls += 1;
        self.update(normal, priority);
        self.advise(priority)
    }

    fn update(&mut self, normal: &[i32], priority: &[i32]) {
        let weight_new = self.weighting.weight(self.n_calls);
        for i in 0..self.n_groups {
            let excess =
                (f64::from(priority[i]) - f64::from(normal[i]) * self.goal_ratio).max(0.0);
            self.average_excess[i] =
                weight_new * excess + (1.0 - weight_new) * self.average_excess[i];
        }
    }

    fn advise(&mut self, priority: &[i32]) -> Vec<i32> {
        let mut advice = vec![0; self.n_groups];
        for i in 0..self.n_groups {
            self.cumulative_remove[i] += self.average_excess[i] / 1000.0;
            let mut remove = self.cumulative_remove[i] as i32;
            // Always leave at least ten; tiny queues are noise.
            if remove > priority[i] - 10 {
                remove = (priority[i] - 10).max(0);
            }
            self.cumulative_remove[i] -= f64::from(remove);
            advice[i] = remove;
        }
        advice
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_excess_no_advice() {
        let mut check = RobustnessCheck::new(2, 0.8);
        for _ in 0..100 {
            let advice = check.update_and_advise(&[100, 50], &[60, 20]);
            assert_eq!(advice, vec![0, 0]);
        }
    }

    #[test]
    fn sustained_excess_eventually_drains() {
        let mut check = RobustnessCheck::new(1, 0.8);
        let mut total_removed = 0;
        // Priority queue persistently far above 0.8 * normal.
        for _ in 0..2000 {
            let advice = check.update_and_advise(&[100], &[2000]);
            total_removed += advice[0];
        }
        assert!(total_removed > 0, "excess never drained");
    }

    #[test]
    fn advice_leaves_at_least_ten() {
        let mut check = RobustnessCheck::new(1, 0.8);
        // Build up a large average excess first.
        for _ in 0..5000 {
            check.update_and_advise(&[0], &[100_000]);
        }
        // Now the queue is small; the advice must not cut below ten.
        let advice = check.update_and_advise(&[0], &[12]);
        assert!(advice[0] <= 2);
        let advice = check.update_and_advise(&[0], &[7]);
        assert_eq!(advice[0], 0);
    }

    #[test]
    fn fractional_removals_accumulate() {
        let mut check = RobustnessCheck::new(1, 0.8);
        // Average excess settles near 500; advice per day is near 0.5, so
        // roughly every second day one removal fires.
        let mut removed = 0;
        for _ in 0..1000 {
            removed += check.update_and_advise(&[0], &[500])[0];
        }
        assert!((300..=600).contains(&removed), "removed {removed}");
    }
}
