//! Persons and the person store.
//!
//! A person carries identity, day of birth, infection statuses and their own
//! relationship-time producer. Which relations a person is in lives only in
//! the relation store, to avoid duplicate bookkeeping.

use std::collections::BTreeMap;
use std::fmt;

use crate::params::RelationGenerationStart;
use crate::renewal::{NextRelationTime, NO_MORE_RELATIONS};
use crate::stationary::StationaryProcess;

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PersonId(pub u64);

impl fmt::Debug for PersonId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "P{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct HivStatus {
    pub infected: bool,
    t_infected: i32,
}

impl HivStatus {
    pub fn infect(&mut self, time: i32) {
        self.infected = true;
        self.t_infected = time;
    }

    pub fn t_infected(&self) -> i32 {
        assert!(self.infected, "HIV infection time queried on an uninfected person");
        self.t_infected
    }

    pub fn t_since_infection(&self, t_current: i32) -> i32 {
        t_current - self.t_infected()
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct GonorrheaStatus {
    pub infected: bool,
    t_infected: i32,
    symptomatic: bool,
}

impl GonorrheaStatus {
    pub fn infect(&mut self, time: i32, symptomatic: bool) {
        self.infected = true;
        self.t_infected = time;
        self.symptomatic = symptomatic;
    }

    pub fn cure(&mut self) {
        self.infected = false;
        self.t_infected = -1;
        self.symptomatic = false;
    }

    pub fn t_infected(&self) -> i32 {
        assert!(self.infected, "gonorrhea infection time queried on an uninfected person");
        self.t_infected
    }

    pub fn symptomatic(&self) -> bool {
        assert!(self.infected, "symptomatic status queried on an uninfected person");
        self.symptomatic
    }

    pub fn t_since_infection(&self, t_current: i32) -> i32 {
        t_current - self.t_infected()
    }
}

pub struct Person {
    id: PersonId,
    day_of_birth: i32,
    pub hiv: HivStatus,
    pub gonorrhea: GonorrheaStatus,
    next_relation: NextRelationTime,
}

impl Person {
    pub fn new(
        id: PersonId,
        day_of_birth: i32,
        parameters: &RelationGenerationStart,
        process: StationaryProcess,
    ) -> Person {
        Person {
            id,
            day_of_birth,
            hiv: HivStatus::default(),
            gonorrhea: GonorrheaStatus::default(),
            next_relation: NextRelationTime::new(parameters, process),
        }
    }

    pub fn id(&self) -> PersonId {
        self.id
    }

    pub fn day_of_birth(&self) -> i32 {
        self.day_of_birth
    }

    /// The next relation start in absolute simulation days, or
    /// [`NO_MORE_RELATIONS`]. Monotone non-decreasing across calls.
    pub fn next_relation_time(&mut self) -> i32 {
        let person_time = self.next_relation.next();
        if person_time == NO_MORE_RELATIONS {
            NO_MORE_RELATIONS
        } else {
            person_time + self.day_of_birth
        }
    }
}

/// Owns every living person, keyed by id. Iteration is in ascending id
/// order, which keeps aggregate reports and seeding deterministic.
pub struct PersonStore {
    map: BTreeMap<PersonId, Person>,
    next_id: u64,
}

impl PersonStore {
    pub fn new() -> PersonStore {
        PersonStore {
            map: BTreeMap::new(),
            next_id: 0,
        }
    }

    /// Reserves the next unique id.
    pub fn allocate_id(&mut self) -> PersonId {
        let id = PersonId(self.next_id);
        self.next_id += 1;
        id
    }

    pub fn insert(&mut self, person: Person) {
        let id = person.id();
        let previous = self.map.insert(id, person);
        assert!(previous.is_none(), "person id {id:?} inserted twice");
    }

    pub fn remove(&mut self, id: PersonId) {
        self.map.remove(&id);
    }

    pub fn get(&self, id: PersonId) -> &Person {
        self.map
            .get(&id)
            .unwrap_or_else(|| panic!("unknown person {id:?}"))
    }

    pub fn get_mut(&mut self, id: PersonId) -> &mut Person {
        self.map
            .get_mut(&id)
            .unwrap_or_else(|| panic!("unknown person {id:?}"))
    }

    pub fn contains(&self, id: PersonId) -> bool {
        self.map.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Person> {
        self.map.values()
    }
}

impl Default for PersonStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stationary::StationaryProcessFactory;

    fn test_person(store: &mut PersonStore, day_of_birth: i32) -> PersonId {
        let parameters = RelationGenerationStart::default();
        let mut factory = StationaryProcessFactory::new(
            parameters.stat_process_average / 365.0,
            parameters.weight_average,
            parameters.weight_short_history,
            parameters.weight_long_history,
            parameters.short_decay_rate_days,
            parameters.long_decay_rate_days,
            1000,
            1,
        );
        let id = store.allocate_id();
        store.insert(Person::new(id, day_of_birth, &parameters, factory.get()));
        id
    }

    #[test]
    fn ids_are_unique_and_ascending() {
        let mut store = PersonStore::new();
        let a = test_person(&mut store, 0);
        let b = test_person(&mut store, -365);
        assert!(a < b);
        assert_eq!(store.len(), 2);
        let collected: Vec<PersonId> = store.iter().map(Person::id).collect();
        assert_eq!(collected, vec![a, b]);
    }

    #[test]
    fn removal_frees_nothing_but_the_person() {
        let mut store = PersonStore::new();
        let a = test_person(&mut store, 0);
        let b = test_person(&mut store, 0);
        store.remove(a);
        assert!(!store.contains(a));
        assert!(store.contains(b));
        // Ids are never reused.
        let c = store.allocate_id();
        assert!(c > b);
    }

    #[test]
    #[should_panic(expected = "unknown person")]
    fn missing_person_lookup_panics() {
        let store = PersonStore::new();
        store.get(PersonId(99));
    }

    #[test]
    fn hiv_status_tracks_infection_time() {
        let mut status = HivStatus::default();
        status.infect(120);
        assert_eq!(status.t_infected(), 120);
        assert_eq!(status.t_since_infection(150), 30);
    }

    #[test]
    #[should_panic(expected = "uninfected")]
    fn infection_time_requires_infection() {
        let status = GonorrheaStatus::default();
        status.t_infected();
    }

    #[test]
    fn absolute_relation_times_offset_by_birth() {
        let mut store = PersonStore::new();
        let id = test_person(&mut store, -5000);
        let t = store.get_mut(id).next_relation_time();
        // Person time is at least onset + 1 days; absolute time subtracts
        // the preseeded age.
        assert!(t >= 15 * 365 - 5000);
    }
}
