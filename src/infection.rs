//! Infection, cure and the transmission-clock bookkeeping.
//!
//! Infecting a person flips their status and refreshes the transmission
//! clocks of every relation they are in; curing does the same in reverse.
//! A clock refresh is cancel-then-reschedule through channel 2, never an
//! in-place edit. These are free functions over the state: the engine only
//! computes times, the queue only schedules, and this module composes the
//! two.

use log::trace;
use rand::Rng;

use crate::event::{Event, EventKind, PersonEventCode, Priority, RelationEventCode};
use crate::people::PersonId;
use crate::relations::Relation;
use crate::state::State;
use crate::transmission::NO_TRANSMISSION;

pub fn hiv_infect_person(state: &mut State, person: PersonId) {
    trace!("HIV infection of {person:?} at day {}", state.time);
    let time = state.time;
    state.people.get_mut(person).hiv.infect(time);

    for relation in state.relations.relations_of(person) {
        update_hiv_transmission_event(state, relation);
    }
}

pub fn gn_infect_person(state: &mut State, person: PersonId) {
    trace!("gonorrhea infection of {person:?} at day {}", state.time);
    let symptomatic = state
        .misc_rng
        .random_bool(state.params.gonorrhea.probability_symptomatic);
    let time = state.time;
    state
        .people
        .get_mut(person)
        .gonorrhea
        .infect(time, symptomatic);

    // Gonorrhea also raises HIV transmissibility, so both clocks refresh.
    for relation in state.relations.relations_of(person) {
        update_gn_transmission_event(state, relation);
        update_hiv_transmission_event(state, relation);
    }

    add_cure_event(state, person);
}

/// Spontaneous clearance, after a fixed symptomatic- or asymptomatic-
/// specific delay.
pub fn add_cure_event(state: &mut State, person: PersonId) {
    let days_until_cure = if state.people.get(person).gonorrhea.symptomatic() {
        state.params.gonorrhea.natural_cure_symptomatic
    } else {
        state.params.gonorrhea.natural_cure_asymptomatic
    };
    state.schedule(Event::new(
        state.time + days_until_cure,
        EventKind::GnNaturalCure { person },
    ));
}

pub fn gn_cure(state: &mut State, person: PersonId) {
    trace!("gonorrhea cure of {person:?} at day {}", state.time);
    state.people.get_mut(person).gonorrhea.cure();
    state.notify_person(person, PersonEventCode::GnCured);

    // Both clocks change: gonorrhea transmission from this person stops,
    // and the HIV co-infection multiplier falls away.
    for relation in state.relations.relations_of(person) {
        update_gn_transmission_event(state, relation);
        update_hiv_transmission_event(state, relation);
    }
}

/// Cancels and, for a serodiscordant pair, reschedules the HIV transmission
/// event of this relation.
pub fn update_hiv_transmission_event(state: &mut State, relation: Relation) {
    state.notify_relation(relation.id, RelationEventCode::CancelHivTransmission);

    let infected1 = state.people.get(relation.person1).hiv.infected;
    let infected2 = state.people.get(relation.person2).hiv.infected;
    if infected1 == infected2 {
        return; // Concordant pair, nothing to transmit.
    }
    let (infected, susceptible) = if infected1 {
        (relation.person1, relation.person2)
    } else {
        (relation.person2, relation.person1)
    };

    let people = &state.people;
    let transmission = &mut state.transmission;
    let days_from_now = transmission.hiv_transmission_time(
        people.get(infected),
        people.get(susceptible),
        state.time,
    );

    schedule_transmission(
        state,
        relation,
        days_from_now,
        Priority::HivTransmission,
        EventKind::HivTransmission {
            relation: relation.id,
            person_to_infect: susceptible,
        },
    );
}

/// The gonorrhea twin of [`update_hiv_transmission_event`].
pub fn update_gn_transmission_event(state: &mut State, relation: Relation) {
    state.notify_relation(relation.id, RelationEventCode::CancelGnTransmission);

    let infected1 = state.people.get(relation.person1).gonorrhea.infected;
    let infected2 = state.people.get(relation.person2).gonorrhea.infected;
    if infected1 == infected2 {
        return;
    }
    let (infected, susceptible) = if infected1 {
        (relation.person1, relation.person2)
    } else {
        (relation.person2, relation.person1)
    };

    let people = &state.people;
    let transmission = &mut state.transmission;
    let days_from_now = transmission.gn_transmission_time(
        people.get(infected),
        people.get(susceptible),
        state.time,
    );

    schedule_transmission(
        state,
        relation,
        days_from_now,
        Priority::GnTransmission,
        EventKind::GnTransmission {
            relation: relation.id,
            person_to_infect: susceptible,
        },
    );
}

fn schedule_transmission(
    state: &mut State,
    relation: Relation,
    days_from_now: f64,
    own_priority: Priority,
    kind: EventKind,
) {
    if days_from_now == NO_TRANSMISSION {
        return;
    }
    if days_from_now + f64::from(state.time) > f64::from(relation.time_end) {
        return; // The relation is over before it would happen.
    }

    // If the scheduler already passed this class today, today's slot is
    // gone; the event lands tomorrow.
    let just_infected_mod = if state.current_priority >= own_priority {
        1
    } else {
        0
    };
    let due = state.time + days_from_now as i32 + just_infected_mod;
    assert!(due >= state.time, "transmission event scheduled back in time");
    state.schedule(Event::new(due, kind));
}
