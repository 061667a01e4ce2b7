//! The mutable state bundle: everything that determines where the
//! simulation is, owned in one place and passed by mutable reference into
//! event execution. Events carry ids only and receive this state each call.
//!
//! Construction is ordered: subsystems draw their seeds from the seed
//! generator in a fixed sequence, so a run is fully determined by the
//! master seed.

use rand::rngs::SmallRng;
use rand::SeedableRng;

use crate::duration::DurationSampler;
use crate::event::{Event, EventQueue, PersonEventCode, Priority, RelationEventCode};
use crate::events;
use crate::matchmaking::Matchmaker;
use crate::params::{ParameterPack, DAYS_PER_YEAR};
use crate::people::{PersonId, PersonStore};
use crate::random::SeedGenerator;
use crate::relations::{RelationId, RelationStore};
use crate::stationary::StationaryProcessFactory;
use crate::transmission::Transmission;

pub struct State {
    pub time: i32,
    pub current_priority: Priority,
    pub params: ParameterPack,
    pub people: PersonStore,
    pub relations: RelationStore,
    pub events: EventQueue,
    pub seed_generator: SeedGenerator,
    /// Shared generator for the small ad-hoc draws (symptomatic coin,
    /// duration coin).
    pub misc_rng: SmallRng,
    pub stationary_factory: StationaryProcessFactory,
    pub duration_sampler: DurationSampler,
    pub matchmaker: Matchmaker,
    pub transmission: Transmission,
}

impl State {
    pub fn new(params: ParameterPack, seed: u32) -> State {
        let mut seed_generator = SeedGenerator::new(seed);

        let start = &params.relation_generation_start;
        let stationary_factory = StationaryProcessFactory::new(
            start.stat_process_average / DAYS_PER_YEAR,
            start.weight_average,
            start.weight_short_history,
            start.weight_long_history,
            start.short_decay_rate_days,
            start.long_decay_rate_days,
            start.stat_process_n_prearrivals,
            seed_generator.next_seed(),
        );
        let duration_sampler =
            DurationSampler::new(&params.relation_duration, seed_generator.next_seed());
        let misc_rng = SmallRng::seed_from_u64(seed_generator.next_seed());
        let matchmaker = Matchmaker::new(&params.matchmaking, seed_generator.next_seed());
        let transmission = Transmission::new(
            &params.sexual_behavior,
            &params.hiv,
            &params.gonorrhea,
            seed_generator.next_seed(),
        );

        State {
            time: 0,
            current_priority: Priority::Death,
            params,
            people: PersonStore::new(),
            relations: RelationStore::new(),
            events: EventQueue::new(),
            seed_generator,
            misc_rng,
            stationary_factory,
            duration_sampler,
            matchmaker,
            transmission,
        }
    }

    /// Enqueues an event; scheduling into the past is a contract violation.
    pub fn schedule(&mut self, event: Event) {
        assert!(
            event.day >= self.time,
            "event scheduled in the past: due day {} at time {}",
            event.day,
            self.time
        );
        self.events.add(event);
    }

    /// Pops and executes every event due at exactly (day, priority), in
    /// insertion order. Events an execution schedules for this same slot
    /// run after all already-queued ones.
    pub fn execute_all(&mut self, day: i32, priority: Priority) {
        while let Some(event) = self.events.pop_due(day, priority) {
            events::execute(event, self);
        }
    }

    /// Channel 1: tells every event listening on this person what happened
    /// and removes those that ask for it. Handlers may schedule new events;
    /// those do not see this notification.
    pub fn notify_person(&mut self, person: PersonId, code: PersonEventCode) {
        for seq in self.events.channel1_listeners(person) {
            if let Some(taken) = self.events.take(seq) {
                if events::notify_person(&taken.event, self, code) {
                    self.events.discard(taken);
                } else {
                    self.events.put_back(taken);
                }
            }
        }
    }

    /// Channel 2: the relation-keyed twin of [`Self::notify_person`].
    pub fn notify_relation(&mut self, relation: RelationId, code: RelationEventCode) {
        for seq in self.events.channel2_listeners(relation) {
            if let Some(taken) = self.events.take(seq) {
                if events::notify_relation(&taken.event, self, code) {
                    self.events.discard(taken);
                } else {
                    self.events.put_back(taken);
                }
            }
        }
    }
}
