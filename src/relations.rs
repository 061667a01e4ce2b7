//! Relations and the relation multi-index.
//!
//! One owning map by relation id plus an auxiliary person -> relation-ids
//! index, so a person's relations can be enumerated without scanning.
//! Queries hand out copies or ids; the store owns the records.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::people::PersonId;

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RelationId(pub u64);

impl fmt::Debug for RelationId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "R{}", self.0)
    }
}

#[derive(Clone, Copy, Debug)]
pub struct Relation {
    pub id: RelationId,
    pub person1: PersonId,
    pub person2: PersonId,
    pub time_start: i32,
    pub time_end: i32,
}

impl Relation {
    /// The partner of `person` in this relation.
    pub fn partner_of(&self, person: PersonId) -> PersonId {
        if person == self.person1 {
            self.person2
        } else {
            assert!(person == self.person2, "{person:?} is not in {:?}", self.id);
            self.person1
        }
    }
}

pub struct RelationStore {
    relations: BTreeMap<RelationId, Relation>,
    by_person: BTreeMap<PersonId, BTreeSet<RelationId>>,
    next_id: u64,
}

impl RelationStore {
    pub fn new() -> RelationStore {
        RelationStore {
            relations: BTreeMap::new(),
            by_person: BTreeMap::new(),
            next_id: 0,
        }
    }

    /// Creates a relation, indexes it under both partners and returns its
    /// id. End must lie after start.
    pub fn insert(
        &mut self,
        person1: PersonId,
        person2: PersonId,
        time_start: i32,
        time_end: i32,
    ) -> RelationId {
        assert!(
            time_end > time_start,
            "relation created with end {time_end} not after start {time_start}"
        );
        let id = RelationId(self.next_id);
        self.next_id += 1;
        self.relations.insert(
            id,
            Relation {
                id,
                person1,
                person2,
                time_start,
                time_end,
            },
        );
        self.by_person.entry(person1).or_default().insert(id);
        self.by_person.entry(person2).or_default().insert(id);
        id
    }

    pub fn remove(&mut self, id: RelationId) {
        let Some(relation) = self.relations.remove(&id) else {
            return;
        };
        for person in [relation.person1, relation.person2] {
            if let Some(set) = self.by_person.get_mut(&person) {
                set.remove(&id);
                if set.is_empty() {
                    self.by_person.remove(&person);
                }
            }
        }
    }

    pub fn get(&self, id: RelationId) -> Option<Relation> {
        self.relations.get(&id).copied()
    }

    /// Ids of every relation `person` is currently in, ascending.
    pub fn relation_ids_of(&self, person: PersonId) -> Vec<RelationId> {
        self.by_person
            .get(&person)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Copies of every relation `person` is currently in.
    pub fn relations_of(&self, person: PersonId) -> Vec<Relation> {
        self.relation_ids_of(person)
            .into_iter()
            .map(|id| self.relations[&id])
            .collect()
    }

    pub fn count_for(&self, person: PersonId) -> usize {
        self.by_person.get(&person).map_or(0, BTreeSet::len)
    }

    pub fn len(&self) -> usize {
        self.relations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.relations.is_empty()
    }
}

impl Default for RelationStore {
    fn default() -> Self {
        Self::new()
    }
}
