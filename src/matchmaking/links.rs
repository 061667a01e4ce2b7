//! The link handler.
//!
//! A link is an unordered pair of groups. Each link carries a running
//! credit: expected cumulative matches minus matches actually formed, so
//! the links at the top of the ranking are the ones the algorithm owes the
//! most. Links with zero preference get a permanent credit of -inf.
//!
//! The container has two explicit sort orders and the caller must enter the
//! order an operation requires; this saves re-sorting between the many
//! per-day operations.

use super::groups::Matrix;

/// Priority-mode scheduling may overdraw a link; below this credit the link
/// is treated as evidence of instability and stops being offered. The exact
/// value only matters for detecting runaway situations.
const ACCEPTABLE_THRESHOLD: f64 = -50.0;

/// An unordered pair of group indices, stored low-to-high.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct GroupPair {
    low: usize,
    high: usize,
}

impl GroupPair {
    pub fn new(a: usize, b: usize) -> GroupPair {
        if a <= b {
            GroupPair { low: a, high: b }
        } else {
            GroupPair { low: b, high: a }
        }
    }

    pub fn groups(&self) -> (usize, usize) {
        (self.low, self.high)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum SortOrder {
    Unsorted,
    ByLinks,
    ByValue,
}

pub struct LinkHandler {
    n_groups: usize,
    // matrix[i][j]: probability that a person from group i matches into
    // group j. Not symmetric; pi_i * matrix[i][j] == pi_j * matrix[j][i].
    matrix: Matrix,
    links: Vec<(GroupPair, f64)>,
    order: SortOrder,
    cursor: usize,
    n_sorts_by_links: u64,
    n_sorts_by_value: u64,
}

impl LinkHandler {
    /// Seeded from the preference matrix: its zeros are the permanently
    /// impossible links.
    pub fn new(preference: Matrix) -> LinkHandler {
        let n_groups = preference.len();
        assert!(n_groups > 0, "link handler needs at least one group");
        for (i, row) in preference.iter().enumerate() {
            assert_eq!(row.len(), n_groups, "preference matrix is not square");
            let sum: f64 = row.iter().sum();
            assert!(
                (0.9999..1.0001).contains(&sum),
                "preference matrix row {i} sums to {sum}, not 1"
            );
        }

        let mut links = Vec::with_capacity(n_groups * (n_groups + 1) / 2);
        for high in 0..n_groups {
            for low in 0..=high {
                // A zero in one direction implies a zero in the other.
                let credit = if preference[high][low] == 0.0 {
                    f64::NEG_INFINITY
                } else {
                    0.0
                };
                links.push((GroupPair::new(low, high), credit));
            }
        }
        LinkHandler {
            n_groups,
            matrix: preference,
            links,
            order: SortOrder::Unsorted,
            cursor: 0,
            n_sorts_by_links: 0,
            n_sorts_by_value: 0,
        }
    }

    pub fn update_partner_choice_matrix(&mut self, matrix: Matrix) {
        assert_eq!(matrix.len(), self.n_groups);
        self.matrix = matrix;
    }

    pub fn sort_by_links(&mut self) {
        self.n_sorts_by_links += 1;
        // Pairs are unique, so ordering by pair alone is total.
        self.links.sort_by(|a, b| a.0.cmp(&b.0));
        self.order = SortOrder::ByLinks;
    }

    pub fn sort_by_value(&mut self) {
        self.n_sorts_by_value += 1;
        self.links
            .sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap());
        self.order = SortOrder::ByValue;
    }

    /// Credits every link with the expected matches from `counts` people
    /// arriving per group. Each relation is shared between two people,
    /// hence the half.
    pub fn add(&mut self, counts: &[i32]) {
        assert_eq!(counts.len(), self.n_groups, "group count vector has the wrong length");
        assert_eq!(
            self.order,
            SortOrder::ByLinks,
            "add requires the link order; call sort_by_links first"
        );
        for from in 0..self.n_groups {
            for to in 0..self.n_groups {
                let position = self.position_in_link_order(from, to);
                self.links[position].1 += 0.5 * f64::from(counts[from]) * self.matrix[from][to];
            }
        }
    }

    /// Reverses one person's worth of [`Self::add`] for a group.
    pub fn remove_person(&mut self, group: usize) {
        assert_eq!(
            self.order,
            SortOrder::ByLinks,
            "remove_person requires the link order; call sort_by_links first"
        );
        for to in 0..self.n_groups {
            let position = self.position_in_link_order(group, to);
            self.links[position].1 -= 0.5 * self.matrix[group][to];
        }
    }

    pub fn point_to_top(&mut self) {
        self.cursor = 0;
    }

    pub fn next(&mut self) {
        self.cursor += 1;
    }

    /// The link under the cursor.
    pub fn get(&self) -> GroupPair {
        self.links[self.cursor].0
    }

    /// Cursor on a link with positive credit (one we still owe matches).
    pub fn points_to_positive_link(&self) -> bool {
        self.cursor < self.links.len() && self.links[self.cursor].1 > 0.0
    }

    /// Cursor on a link that may still be scheduled in priority mode.
    pub fn points_to_acceptable_link(&self) -> bool {
        self.cursor < self.links.len() && self.links[self.cursor].1 > ACCEPTABLE_THRESHOLD
    }

    /// One match formed on the cursor's link: decrement its credit and let
    /// it sink to its new rank. Partial bubble sort; only the changed entry
    /// moves.
    pub fn remove(&mut self) {
        assert!(
            self.points_to_acceptable_link(),
            "remove called on a link that cannot occur"
        );
        assert_eq!(
            self.order,
            SortOrder::ByValue,
            "remove requires the value order; call sort_by_value first"
        );
        self.links[self.cursor].1 -= 1.0;

        let mut position = self.cursor;
        while position + 1 < self.links.len()
            && self.links[position + 1].1 > self.links[position].1
        {
            self.links.swap(position, position + 1);
            position += 1;
        }
    }

    pub fn log_report(&self) -> String {
        let mut highest = f64::MIN;
        let mut lowest = f64::MAX;
        let mut total = 0.0;
        for &(_, credit) in &self.links {
            if credit != f64::NEG_INFINITY {
                total += credit;
                if credit < lowest {
                    lowest = credit;
                }
            }
            if credit > highest {
                highest = credit;
            }
        }
        format!(
            "Link handler report:\n\
             Highest credit: {highest}\n\
             Lowest credit: {lowest}\n\
             Total credit: {total}\n\
             Times sorted by links: {}\n\
             Times sorted by value: {}\n",
            self.n_sorts_by_links, self.n_sorts_by_value
        )
    }

    /// Sum of all finite credits; diagnostic for the credit bookkeeping.
    pub fn total_credit(&self) -> f64 {
        self.links
            .iter()
            .filter(|(_, c)| *c != f64::NEG_INFINITY)
            .map(|(_, c)| c)
            .sum()
    }

    // Index of the {group1, group2} link when sorted by links. The links
    // are the upper triangle including the diagonal, laid out row by row in
    // pair order, which gives this closed form.
    fn position_in_link_order(&self, group1: usize, group2: usize) -> usize {
        let (low, high) = GroupPair::new(group1, group2).groups();
        low * (2 * self.n_groups - low - 1) / 2 + high
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uniform_preference(n: usize) -> Matrix {
        vec![vec![1.0 / n as f64; n]; n]
    }

    fn handler(n: usize) -> LinkHandler {
        let mut h = LinkHandler::new(uniform_preference(n));
        h.sort_by_links();
        h
    }

    #[test]
    fn position_formula_matches_sorted_layout() {
        let h = handler(4);
        // After sort_by_links the pairs are (0,0),(0,1)..(0,3),(1,1)..
        let mut expected = 0;
        for low in 0..4 {
            for high in low..4 {
                assert_eq!(h.position_in_link_order(low, high), expected);
                assert_eq!(h.position_in_link_order(high, low), expected);
                assert_eq!(h.links[expected].0, GroupPair::new(low, high));
                expected += 1;
            }
        }
    }

    #[test]
    fn credit_sum_is_half_the_people_added() {
        let mut h = handler(3);
        let counts = [12, 30, 9];
        h.add(&counts);
        let expected = 0.5 * f64::from(12 + 30 + 9);
        assert!((h.total_credit() - expected).abs() < 1e-9);
    }

    #[test]
    fn remove_person_undoes_add() {
        let mut h = handler(3);
        h.add(&[1, 0, 0]);
        h.remove_person(0);
        assert!(h.total_credit().abs() < 1e-12);
    }

    #[test]
    fn impossible_links_are_pinned_to_negative_infinity() {
        let preference = vec![
            vec![0.8, 0.2, 0.0],
            vec![0.2, 0.6, 0.2],
            vec![0.0, 0.2, 0.8],
        ];
        let mut h = LinkHandler::new(preference);
        h.sort_by_links();
        h.add(&[100, 100, 100]);
        let position = h.position_in_link_order(0, 2);
        assert_eq!(h.links[position].1, f64::NEG_INFINITY);
        // The finite credits still sum to half the preferred mass.
        h.sort_by_value();
        h.point_to_top();
        while h.points_to_positive_link() {
            let (a, b) = h.get().groups();
            assert!(!(a == 0 && b == 2) && !(a == 2 && b == 0));
            h.next();
        }
    }

    #[test]
    fn cursor_walks_descending_credit() {
        let mut h = handler(3);
        h.add(&[40, 10, 2]);
        h.sort_by_value();
        h.point_to_top();
        let mut previous = f64::MAX;
        while h.points_to_positive_link() {
            let credit = h.links[h.cursor].1;
            assert!(credit <= previous);
            previous = credit;
            h.next();
        }
    }

    #[test]
    fn remove_decrements_and_bubbles_down() {
        let mut h = handler(2);
        h.add(&[10, 2]);
        h.sort_by_value();
        h.point_to_top();
        h.remove();
        // The decremented link sank to its right place.
        for window in h.links.windows(2) {
            assert!(window[0].1 >= window[1].1);
        }
        // 12 people added = 6 expected matches, one formed.
        assert!((h.total_credit() - 5.0).abs() < 1e-9);
    }

    #[test]
    fn acceptable_tracks_the_threshold() {
        let mut h = handler(1);
        h.add(&[2]); // credit 1
        h.sort_by_value();
        h.point_to_top();
        assert!(h.points_to_positive_link());
        h.remove(); // credit 0
        assert!(!h.points_to_positive_link());
        assert!(h.points_to_acceptable_link());
        for _ in 0..50 {
            h.remove();
        }
        // credit -50: no longer acceptable.
        assert!(!h.points_to_acceptable_link());
    }

    #[test]
    #[should_panic(expected = "requires the link order")]
    fn add_requires_link_order() {
        let mut h = handler(2);
        h.sort_by_value();
        h.add(&[1, 1]);
    }

    #[test]
    #[should_panic(expected = "requires the value order")]
    fn remove_requires_value_order() {
        let mut h = handler(2);
        h.add(&[4, 4]);
        h.point_to_top();
        h.remove();
    }
}
