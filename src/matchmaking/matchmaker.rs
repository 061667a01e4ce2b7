//! The matchmaker decides who gets a relation with whom.
//!
//! Requests arrive over the day and are matched in one daily pass. A
//! request that misses its first day is retried once with priority; after
//! the second day it is dropped. The daily pass keeps three helpers in
//! sync: the partner-choice matrix (what can happen given the group
//! sizes), the link handler (which group pairs are owed matches) and the
//! robustness controller (bounded pruning of runaway priority queues).

use log::debug;
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use super::groups::GroupHandler;
use super::links::LinkHandler;
use super::partner_choice::{PartnerChoiceMatrix, PartnerChoiceParameters};
use super::robustness::RobustnessCheck;
use crate::params::MatchMaking;
use crate::people::PersonId;

/// A person asking for a relation of a given length. Lives at most two
/// simulation days.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RelationRequest {
    pub person_id: PersonId,
    pub duration_in_days: i32,
}

/// Fraction of a group's fresh queue its priority queue may reach before
/// the robustness controller starts pruning.
const PRIORITY_BACKLOG_GOAL_RATIO: f64 = 0.8;

#[derive(Clone, Copy, Default)]
struct MatchmakerStats {
    requests_received: u64,
    dropped_after_first_day: u64,
    dropped_after_second_day: u64,
    scheduled_first_day: u64,
    scheduled_second_day: u64,
}

pub struct Matchmaker {
    group_handler: GroupHandler,
    partner_choice: PartnerChoiceMatrix,
    links: LinkHandler,
    robustness: RobustnessCheck,
    rng: SmallRng,

    // Fresh requests by group, and yesterday's leftovers with priority.
    requests: Vec<Vec<RelationRequest>>,
    priority_requests: Vec<Vec<RelationRequest>>,
    counts: Vec<i32>,
    priority_counts: Vec<i32>,

    stats: MatchmakerStats,
}

impl Matchmaker {
    pub fn new(parameters: &MatchMaking, seed: u64) -> Matchmaker {
        let group_handler = GroupHandler::new(parameters);
        let preference = group_handler.preference_matrix();
        let n_groups = group_handler.n_groups();
        let pcm_parameters = PartnerChoiceParameters {
            weight_new_database_update: parameters.weight_new_database_update,
            n_relation_matrix_iterations: parameters.n_relation_matrix_iterations,
            group_estimate_error_tolerance: parameters.group_estimate_error_tolerance,
        };
        Matchmaker {
            partner_choice: PartnerChoiceMatrix::new(preference.clone(), pcm_parameters),
            links: LinkHandler::new(preference),
            robustness: RobustnessCheck::new(n_groups, PRIORITY_BACKLOG_GOAL_RATIO),
            rng: SmallRng::seed_from_u64(seed),
            requests: vec![Vec::new(); n_groups],
            priority_requests: vec![Vec::new(); n_groups],
            counts: vec![0; n_groups],
            priority_counts: vec![0; n_groups],
            stats: MatchmakerStats::default(),
            group_handler,
        }
    }

    pub fn add_relation_request(&mut self, request: RelationRequest, age_years: f64) {
        self.stats.requests_received += 1;
        let group = self
            .group_handler
            .group_of(age_years, request.duration_in_days);
        self.requests[group].push(request);
        self.counts[group] += 1;
    }

    /// The daily matching pass; returns today's matches.
    pub fn get_matches(&mut self) -> Vec<(RelationRequest, RelationRequest)> {
        let n_groups = self.group_handler.n_groups();
        let mut matches = Vec::new();

        // 1. Shuffle both queues once; popping from the back is then a
        // uniform pick.
        for group in &mut self.requests {
            group.shuffle(&mut self.rng);
        }
        for group in &mut self.priority_requests {
            group.shuffle(&mut self.rng);
        }

        // 2. Fold today's group sizes into the proportion estimate and
        // re-solve the partner-choice matrix when it drifted enough.
        self.partner_choice.update(&self.counts);
        if self.partner_choice.is_new_matrix_available() {
            self.links
                .update_partner_choice_matrix(self.partner_choice.solve());
        }

        // 3. Prune runaway priority queues on the controller's advice,
        // undoing the pruned requests' link contributions.
        let advice = self
            .robustness
            .update_and_advise(&self.counts, &self.priority_counts);
        self.links.sort_by_links();
        for group in 0..n_groups {
            if advice[group] > 0 {
                debug!(
                    "robustness pruning {} priority requests from group {}",
                    advice[group],
                    self.group_handler.group_name(group)
                );
            }
            for _ in 0..advice[group] {
                self.stats.dropped_after_first_day += 1;
                self.priority_counts[group] -= 1;
                self.priority_requests[group].pop();
                self.links.remove_person(group);
            }
        }

        // 4. Credit the links with today's arrivals.
        self.links.add(&self.counts);

        // 5. Priority pass: walk links by descending credit and form any
        // match that places at least one priority request.
        self.links.sort_by_value();
        self.links.point_to_top();
        while self.links.points_to_acceptable_link() {
            let (g1, g2) = self.links.get().groups();
            let feasible = if g1 == g2 {
                self.priority_counts[g1] > 1
                    || (self.priority_counts[g1] > 0 && self.counts[g1] > 0)
            } else {
                (self.priority_counts[g1] > 0
                    && (self.priority_counts[g2] > 0 || self.counts[g2] > 0))
                    || (self.priority_counts[g2] > 0
                        && (self.priority_counts[g1] > 0 || self.counts[g1] > 0))
            };
            if feasible {
                matches.push(self.take_match(g1, g2));
            } else {
                self.links.next();
            }
        }

        // 6. Non-priority pass over positive-credit links. Any match with a
        // priority side would have been formed above.
        self.links.point_to_top();
        while self.links.points_to_positive_link() {
            let (g1, g2) = self.links.get().groups();
            let feasible = if g1 == g2 {
                self.counts[g1] > 1
            } else {
                self.counts[g1] > 0 && self.counts[g2] > 0
            };
            if feasible {
                matches.push(self.take_match(g1, g2));
            } else {
                self.links.next();
            }
        }

        // 7. Requests that sat in the priority queue all day have now
        // waited two days: drop them and undo their link contributions.
        for group in 0..n_groups {
            for _ in 0..self.priority_requests[group].len() {
                self.links.sort_by_links();
                self.stats.dropped_after_second_day += 1;
                self.links.remove_person(group);
            }
            self.priority_requests[group].clear();
            self.priority_counts[group] = 0;
        }

        // 8. Today's unmatched fresh requests become tomorrow's priority.
        std::mem::swap(&mut self.requests, &mut self.priority_requests);
        std::mem::swap(&mut self.counts, &mut self.priority_counts);

        matches
    }

    // One match on the link {group1, group2}: update the link credit and
    // pop one request per side, consuming priority requests first.
    fn take_match(
        &mut self,
        group1: usize,
        group2: usize,
    ) -> (RelationRequest, RelationRequest) {
        self.links.remove();

        let first = self.pop_side(group1);
        let second = self.pop_side(group2);
        (first, second)
    }

    fn pop_side(&mut self, group: usize) -> RelationRequest {
        if self.priority_counts[group] > 0 {
            self.priority_counts[group] -= 1;
            self.stats.scheduled_second_day += 1;
            self.priority_requests[group]
                .pop()
                .expect("priority count out of sync with its queue")
        } else {
            self.counts[group] -= 1;
            self.stats.scheduled_first_day += 1;
            self.requests[group]
                .pop()
                .expect("request count out of sync with its queue")
        }
    }

    pub fn log_report(&self) -> String {
        let mut report = format!(
            "Matchmaker report:\n\
             Relation requests received: {}\n\
             Dropped after day 1 (should be a very low percentage): {}\n\
             Dropped after day 2 (should be a low percentage): {}\n\
             Scheduled on day 1: {}\n\
             Scheduled on day 2: {}\n",
            self.stats.requests_received,
            self.stats.dropped_after_first_day,
            self.stats.dropped_after_second_day,
            self.stats.scheduled_first_day,
            self.stats.scheduled_second_day,
        );
        report.push('\n');
        report.push_str(&self.links.log_report());
        report.push('\n');
        report.push_str(&self.partner_choice.log_report());
        report
    }

    #[cfg(test)]
    fn scheduled(&self) -> u64 {
        self.stats.scheduled_first_day + self.stats.scheduled_second_day
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::MatchMaking;

    fn single_group_parameters() -> MatchMaking {
        MatchMaking {
            age_groups: vec![(15.0, 80.0)],
            duration_groups: vec![(0, i32::MAX)],
            ..MatchMaking::default()
        }
    }

    fn request(id: u64, duration: i32) -> RelationRequest {
        RelationRequest {
            person_id: PersonId(id),
            duration_in_days: duration,
        }
    }

    #[test]
    fn even_single_group_day_matches_everyone() {
        let mut mm = Matchmaker::new(&single_group_parameters(), 1);
        for i in 0..10 {
            mm.add_relation_request(request(i, 30), 40.0);
        }
        let matches = mm.get_matches();
        assert_eq!(matches.len(), 5);
        // No request is handed out twice.
        let mut seen: Vec<PersonId> = matches
            .iter()
            .flat_map(|(a, b)| [a.person_id, b.person_id])
            .collect();
        seen.sort();
        seen.dedup();
        assert_eq!(seen.len(), 10);
    }

    #[test]
    fn odd_one_out_gets_priority_next_day() {
        let mut mm = Matchmaker::new(&single_group_parameters(), 2);
        for i in 0..5 {
            mm.add_relation_request(request(i, 30), 40.0);
        }
        let matches = mm.get_matches();
        assert_eq!(matches.len(), 2);

        // The leftover pairs with a fresh request the next day.
        mm.add_relation_request(request(100, 30), 40.0);
        let matches = mm.get_matches();
        assert_eq!(matches.len(), 1);
        assert_eq!(mm.scheduled(), 6);
        assert_eq!(mm.stats.scheduled_second_day, 1);
    }

    #[test]
    fn unmatched_for_two_days_is_dropped() {
        let mut mm = Matchmaker::new(&single_group_parameters(), 3);
        mm.add_relation_request(request(0, 30), 40.0);
        assert!(mm.get_matches().is_empty()); // day 1: nobody to pair with
        assert!(mm.get_matches().is_empty()); // day 2: still nobody
        assert_eq!(mm.stats.dropped_after_second_day, 1);
        // The dropped request no longer matches.
        mm.add_relation_request(request(1, 30), 40.0);
        assert!(mm.get_matches().is_empty());
    }

    #[test]
    fn throughput_in_steady_state_is_high() {
        let mut mm = Matchmaker::new(&single_group_parameters(), 4);
        let mut id = 0;
        // Warm up, then measure.
        for day in 0..300 {
            let arrivals = 20 + (day % 7);
            for _ in 0..arrivals {
                mm.add_relation_request(request(id, 10 + (id % 50) as i32), 40.0);
                id += 1;
            }
            mm.get_matches();
        }
        let received = mm.stats.requests_received as f64;
        let scheduled = mm.scheduled() as f64;
        assert!(
            scheduled / received >= 0.98,
            "throughput {} of {} requests",
            scheduled,
            received
        );
    }

    #[test]
    fn multi_group_requests_match_within_duration_group() {
        let parameters = MatchMaking {
            age_groups: vec![(15.0, 80.0)],
            duration_groups: vec![(0, 99), (100, i32::MAX)],
            ..MatchMaking::default()
        };
        let mut mm = Matchmaker::new(&parameters, 5);
        for i in 0..6 {
            mm.add_relation_request(request(i, 10), 30.0);
        }
        for i in 6..10 {
            mm.add_relation_request(request(i, 1000), 30.0);
        }
        let matches = mm.get_matches();
        assert_eq!(matches.len(), 5);
        for (a, b) in matches {
            let a_long = a.duration_in_days >= 100;
            let b_long = b.duration_in_days >= 100;
            assert_eq!(a_long, b_long, "cross-duration match {a:?} {b:?}");
        }
    }

    #[test]
    fn report_counts_requests() {
        let mut mm = Matchmaker::new(&single_group_parameters(), 6);
        for i in 0..4 {
            mm.add_relation_request(request(i, 30), 40.0);
        }
        mm.get_matches();
        let report = mm.log_report();
        assert!(report.contains("Relation requests received: 4"));
        assert!(report.contains("Link handler report"));
        assert!(report.contains("Partner-choice matrix report"));
    }
}
