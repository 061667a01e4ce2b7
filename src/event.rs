//! The event manager: a min-priority queue over (due day, priority class,
//! insertion order) with two tag-indexed notification channels.
//!
//! Channel 1 carries "something happened to person P" (death, cure),
//! channel 2 "something happened to relation R" (end, transmission-event
//! invalidation). Notification order over matched events is their insertion
//! order, and handlers may freely add events while a notification runs.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use rustc_hash::FxHashMap;

use crate::people::PersonId;
use crate::relations::RelationId;

/// Within-day execution order; also the tie-breaker among events due the
/// same day.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Priority {
    Death,
    Births,
    RelationStart,
    Matchmaking,
    RelationEnd,
    HivTransmission,
    GnTransmission,
    GnNaturalCure,
}

impl Priority {
    pub const ALL: [Priority; 8] = [
        Priority::Death,
        Priority::Births,
        Priority::RelationStart,
        Priority::Matchmaking,
        Priority::RelationEnd,
        Priority::HivTransmission,
        Priority::GnTransmission,
        Priority::GnNaturalCure,
    ];
}

/// What happened to a person, sent on channel 1.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PersonEventCode {
    Death,
    GnCured,
}

/// What happened to a relation, sent on channel 2.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RelationEventCode {
    EndDueToDeath,
    CancelHivTransmission,
    CancelGnTransmission,
}

/// Every event variant is a plain value; dispatch is a match at execution
/// time (see `events.rs`). Events carry ids only, never references into the
/// state.
#[derive(Clone, Copy, Debug)]
pub enum EventKind {
    Death { person: PersonId },
    Births,
    StartRelation { person: PersonId },
    EndRelation { relation: RelationId },
    Matchmaking,
    HivTransmission { relation: RelationId, person_to_infect: PersonId },
    GnTransmission { relation: RelationId, person_to_infect: PersonId },
    GnNaturalCure { person: PersonId },
}

#[derive(Clone, Copy, Debug)]
pub struct Event {
    pub day: i32,
    pub kind: EventKind,
}

impl Event {
    pub fn new(day: i32, kind: EventKind) -> Event {
        Event { day, kind }
    }

    pub fn priority(&self) -> Priority {
        match self.kind {
            EventKind::Death { .. } => Priority::Death,
            EventKind::Births => Priority::Births,
            EventKind::StartRelation { .. } => Priority::RelationStart,
            EventKind::EndRelation { .. } => Priority::RelationEnd,
            EventKind::Matchmaking => Priority::Matchmaking,
            EventKind::HivTransmission { .. } => Priority::HivTransmission,
            EventKind::GnTransmission { .. } => Priority::GnTransmission,
            EventKind::GnNaturalCure { .. } => Priority::GnNaturalCure,
        }
    }

    /// The channel-1 tag this event listens on, if any.
    pub fn person_tag(&self) -> Option<PersonId> {
        match self.kind {
            EventKind::StartRelation { person } | EventKind::GnNaturalCure { person } => {
                Some(person)
            }
            _ => None,
        }
    }

    /// The channel-2 tag this event listens on, if any.
    pub fn relation_tag(&self) -> Option<RelationId> {
        match self.kind {
            EventKind::EndRelation { relation }
            | EventKind::HivTransmission { relation, .. }
            | EventKind::GnTransmission { relation, .. } => Some(relation),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct EventKey {
    day: i32,
    priority: Priority,
    seq: u64,
}

/// Handle for an event temporarily taken out of the queue during a
/// notification round.
pub struct TakenEvent {
    seq: u64,
    pub event: Event,
}

pub struct EventQueue {
    heap: BinaryHeap<Reverse<EventKey>>,
    // Owned events by sequence number; an id missing here but still in the
    // heap or a channel index has been removed and is skipped lazily.
    events: FxHashMap<u64, Event>,
    channel1: FxHashMap<PersonId, Vec<u64>>,
    channel2: FxHashMap<RelationId, Vec<u64>>,
    seq_counter: u64,
}

impl EventQueue {
    pub fn new() -> EventQueue {
        EventQueue {
            heap: BinaryHeap::new(),
            events: FxHashMap::default(),
            channel1: FxHashMap::default(),
            channel2: FxHashMap::default(),
            seq_counter: 0,
        }
    }

    /// Enqueues an event. Stable with respect to insertion order at equal
    /// (day, priority).
    pub fn add(&mut self, event: Event) {
        let seq = self.seq_counter;
        self.seq_counter += 1;
        self.heap.push(Reverse(EventKey {
            day: event.day,
            priority: event.priority(),
            seq,
        }));
        if let Some(person) = event.person_tag() {
            self.channel1.entry(person).or_default().push(seq);
        }
        if let Some(relation) = event.relation_tag() {
            self.channel2.entry(relation).or_default().push(seq);
        }
        self.events.insert(seq, event);
    }

    /// Pops the head if it is due at exactly (day, priority). Entries whose
    /// event was removed by a notification are discarded on the way.
    pub fn pop_due(&mut self, day: i32, priority: Priority) -> Option<Event> {
        while let Some(Reverse(key)) = self.heap.peek() {
            if key.day != day || key.priority != priority {
                return None;
            }
            let seq = key.seq;
            self.heap.pop();
            if let Some(event) = self.events.remove(&seq) {
                self.detach_tags(seq, &event);
                return Some(event);
            }
        }
        None
    }

    /// Snapshot of the pending events listening for this person, in
    /// insertion order.
    pub fn channel1_listeners(&self, person: PersonId) -> Vec<u64> {
        self.channel1.get(&person).cloned().unwrap_or_default()
    }

    /// Snapshot of the pending events listening for this relation, in
    /// insertion order.
    pub fn channel2_listeners(&self, relation: RelationId) -> Vec<u64> {
        self.channel2.get(&relation).cloned().unwrap_or_default()
    }

    /// Takes an event out of the queue for the duration of its notify call.
    /// Returns None if the event is no longer pending.
    pub fn take(&mut self, seq: u64) -> Option<TakenEvent> {
        self.events.remove(&seq).map(|event| TakenEvent { seq, event })
    }

    /// Puts a taken event back; its heap and index entries never left.
    pub fn put_back(&mut self, taken: TakenEvent) {
        self.events.insert(taken.seq, taken.event);
    }

    /// Drops a taken event for good and clears its index entries.
    pub fn discard(&mut self, taken: TakenEvent) {
        self.detach_tags(taken.seq, &taken.event);
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    fn detach_tags(&mut self, seq: u64, event: &Event) {
        if let Some(person) = event.person_tag() {
            if let Some(ids) = self.channel1.get_mut(&person) {
                ids.retain(|&id| id != seq);
                if ids.is_empty() {
                    self.channel1.remove(&person);
                }
            }
        }
        if let Some(relation) = event.relation_tag() {
            if let Some(ids) = self.channel2.get_mut(&relation) {
                ids.retain(|&id| id != seq);
                if ids.is_empty() {
                    self.channel2.remove(&relation);
                }
            }
        }
    }
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new()
    }
}
