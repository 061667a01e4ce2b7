//! Demographics: the initial population, daily replacement births and
//! death scheduling.
//!
//! Only the sexually active population is modeled: a birth is a person
//! reaching sexual onset, and death happens at sexual stop. The population
//! size is kept deterministically at its configured target; stochastic
//! sizes would make runs much harder to compare.

use log::info;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::event::{Event, EventKind};
use crate::people::{Person, PersonId};
use crate::state::State;

/// Creates the starting population with ages uniform over the sexual
/// career and pre-simulation relation history skipped.
pub fn populate(state: &mut State) {
    assert!(
        state.people.is_empty(),
        "populate called on a non-empty population"
    );
    assert_eq!(state.time, 0, "populate called after the simulation started");

    let onset_days = state.params.sexual_onset_days();
    let stop_days = state.params.sexual_stop_days();
    let n_persons = state.params.demographics.initial_population;
    let mut age_rng = SmallRng::seed_from_u64(state.seed_generator.next_seed());

    for _ in 0..n_persons {
        let age = age_rng.random_range(onset_days..=stop_days);
        add_person(state, -age);
    }
    info!("populated {n_persons} persons");
}

/// Tops the population back up to its target; newborns enter at sexual
/// onset.
pub fn births(state: &mut State) {
    let target = state.params.demographics.initial_population as usize;
    let current = state.people.len();
    for _ in current..target {
        let day_of_birth = state.time - state.params.sexual_onset_days();
        add_person(state, day_of_birth);
    }
}

/// Inserts a person born on `day_of_birth` and schedules their death and
/// first relation start.
pub fn add_person(state: &mut State, day_of_birth: i32) -> PersonId {
    let id = state.people.allocate_id();
    let process = state.stationary_factory.get();
    let person = Person::new(
        id,
        day_of_birth,
        &state.params.relation_generation_start,
        process,
    );
    state.people.insert(person);
    add_death_event(state, id);

    // Arrivals that fall before now belong to the pre-simulation past of a
    // preseeded person; skip them. A person with no relations left keeps
    // the sentinel, which compares larger than any day.
    let mut t_first_relation = state.people.get_mut(id).next_relation_time();
    while t_first_relation <= state.time {
        t_first_relation = state.people.get_mut(id).next_relation_time();
    }
    state.schedule(Event::new(
        t_first_relation,
        EventKind::StartRelation { person: id },
    ));
    id
}

/// Death is deterministic: the day this person's age reaches sexual stop.
pub fn add_death_event(state: &mut State, person: PersonId) {
    let day_of_birth = state.people.get(person).day_of_birth();
    let day_of_death = day_of_birth + state.params.sexual_stop_days();
    state.schedule(Event::new(day_of_death, EventKind::Death { person }));
}
