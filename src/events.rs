//! Event execution and notification: the dispatch switch over the tagged
//! event variants, plus the glue that turns matches into relations and
//! relation starts into matchmaker requests.

use rand::Rng;

use crate::demography;
use crate::event::{Event, EventKind, PersonEventCode, Priority, RelationEventCode};
use crate::infection;
use crate::matchmaking::RelationRequest;
use crate::params::DAYS_PER_YEAR;
use crate::people::PersonId;
use crate::state::State;

/// Fires an event. The event has already left the queue; anything it
/// schedules lands behind all events already queued at the same slot.
pub fn execute(event: Event, state: &mut State) {
    match event.kind {
        EventKind::Death { person } => {
            // Interested events exit first, then the relations end, and the
            // person record goes last so handlers can still read it.
            state.notify_person(person, PersonEventCode::Death);
            for relation in state.relations.relation_ids_of(person) {
                state.notify_relation(relation, RelationEventCode::EndDueToDeath);
            }
            state.people.remove(person);
        }

        EventKind::Births => {
            demography::births(state);
            state.schedule(Event::new(event.day + 1, EventKind::Births));
        }

        EventKind::StartRelation { person } => {
            let mut next = state.people.get_mut(person).next_relation_time();
            add_relation_request(state, person, next - state.time);
            // A person can start several relations on one day; drain all
            // same-day arrivals before rescheduling.
            while next == state.time {
                next = state.people.get_mut(person).next_relation_time();
                add_relation_request(state, person, next - state.time);
            }
            state.schedule(Event::new(next, EventKind::StartRelation { person }));
        }

        EventKind::EndRelation { relation } => {
            state.relations.remove(relation);
        }

        EventKind::Matchmaking => {
            let matches = state.matchmaker.get_matches();
            for (first, second) in matches {
                add_relation(state, first, second);
            }
            state.schedule(Event::new(event.day + 1, EventKind::Matchmaking));
        }

        EventKind::HivTransmission { person_to_infect, .. } => {
            // Another relation may have infected this person earlier today;
            // events of the executing priority class are never cancelled.
            if !state.people.get(person_to_infect).hiv.infected {
                infection::hiv_infect_person(state, person_to_infect);
            }
        }

        EventKind::GnTransmission { person_to_infect, .. } => {
            if !state.people.get(person_to_infect).gonorrhea.infected {
                infection::gn_infect_person(state, person_to_infect);
            }
        }

        EventKind::GnNaturalCure { person } => {
            assert!(
                state.people.get(person).gonorrhea.infected,
                "natural cure fired for a person without gonorrhea"
            );
            infection::gn_cure(state, person);
        }
    }
}

/// Channel-1 reaction of a pending event; true asks for removal.
pub fn notify_person(event: &Event, _state: &mut State, code: PersonEventCode) -> bool {
    match event.kind {
        // A dead person requests no further relations and needs no cure.
        EventKind::StartRelation { .. } => code == PersonEventCode::Death,
        // Only one cure event exists per infection, and a GnCured signal is
        // always sent from its own execution; reacting to it would be
        // self-removal.
        EventKind::GnNaturalCure { .. } => code == PersonEventCode::Death,
        _ => false,
    }
}

/// Channel-2 reaction of a pending event; true asks for removal.
pub fn notify_relation(event: &Event, state: &mut State, code: RelationEventCode) -> bool {
    match event.kind {
        EventKind::EndRelation { relation } => {
            if code == RelationEventCode::EndDueToDeath {
                // Premature execution: the relation ends with the death.
                // The queue entry does not fire again; removal is requested
                // here.
                state.relations.remove(relation);
                true
            } else {
                false
            }
        }

        EventKind::HivTransmission { .. } => match code {
            RelationEventCode::EndDueToDeath => true,
            // Never while HIV transmissions are executing: an event must
            // not cancel its own priority class out from under the
            // scheduler.
            RelationEventCode::CancelHivTransmission => {
                state.current_priority != Priority::HivTransmission
            }
            RelationEventCode::CancelGnTransmission => false,
        },

        EventKind::GnTransmission { .. } => match code {
            RelationEventCode::EndDueToDeath => true,
            RelationEventCode::CancelGnTransmission => {
                state.current_priority != Priority::GnTransmission
            }
            RelationEventCode::CancelHivTransmission => false,
        },

        _ => false,
    }
}

/// Samples a duration for the gap to this person's next relation and files
/// the request with the matchmaker.
pub fn add_relation_request(state: &mut State, person: PersonId, inter_relation_time: i32) {
    let duration = state.duration_sampler.get(inter_relation_time);
    let age_years =
        f64::from(state.time - state.people.get(person).day_of_birth()) / DAYS_PER_YEAR;
    state.matchmaker.add_relation_request(
        RelationRequest {
            person_id: person,
            duration_in_days: duration,
        },
        age_years,
    );
}

/// A match becomes official: create the relation, plan its end and install
/// the transmission clocks.
pub fn add_relation(state: &mut State, first: RelationRequest, second: RelationRequest) {
    // The two sides asked for different durations; a fair coin picks.
    let duration = if state.misc_rng.random_bool(0.5) {
        first.duration_in_days
    } else {
        second.duration_in_days
    };
    // End must lie strictly after start.
    let duration = duration.max(1);

    let start = state.time;
    let end = start + duration;
    let id = state
        .relations
        .insert(first.person_id, second.person_id, start, end);
    state.schedule(Event::new(end, EventKind::EndRelation { relation: id }));

    let relation = state.relations.get(id).unwrap();
    infection::update_hiv_transmission_event(state, relation);
    infection::update_gn_transmission_event(state, relation);
}
