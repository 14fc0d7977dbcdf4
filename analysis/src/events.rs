//! Queryable view over the decoded event streams of a single replay.
//!
//! The table owns every [`Event`] of one replay, ordered by game loop. Game loops are
//! fixed-width counters that may wrap at 2^32, so each stream is unwrapped into a
//! monotonic 64 bit tick before the streams are merged. Ties keep stream order.

use std::collections::HashMap;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
pub enum EventKind {
    Game,
    Message,
    Tracker,
    Attributes,
}

/// Fully qualified event names emitted by the tracker stream.
pub mod names {
    pub const UNIT_BORN: &str = "NNet.Replay.Tracker.SUnitBornEvent";
    pub const UNIT_DIED: &str = "NNet.Replay.Tracker.SUnitDiedEvent";
    pub const UNIT_TYPE_CHANGE: &str = "NNet.Replay.Tracker.SUnitTypeChangeEvent";
    pub const STAT_GAME: &str = "NNet.Replay.Tracker.SStatGameEvent";
    pub const SCORE_RESULT: &str = "NNet.Replay.Tracker.SScoreResultEvent";
}

#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub kind: EventKind,
    pub name: String,
    pub gameloop: u32,
    pub payload: Payload,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// Named game statistic, e.g. `GatesOpen`.
    Stat { event_name: String },
    /// A unit was born or changed its type.
    UnitType { unit_tag: u64, unit_type_name: String },
    UnitDied { unit_tag: u64 },
    /// Instrumentation snapshot, one value list per working set slot.
    ScoreResult { instances: Vec<ScoreInstance> },
    Other,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScoreInstance {
    pub name: String,
    pub values: Vec<Vec<i64>>,
}

impl Event {
    pub fn stat(gameloop: u32, event_name: &str) -> Self {
        Self {
            kind: EventKind::Tracker,
            name: names::STAT_GAME.to_owned(),
            gameloop,
            payload: Payload::Stat {
                event_name: event_name.to_owned(),
            },
        }
    }

    pub fn unit_born(gameloop: u32, unit_tag: u64, unit_type_name: &str) -> Self {
        Self {
            kind: EventKind::Tracker,
            name: names::UNIT_BORN.to_owned(),
            gameloop,
            payload: Payload::UnitType {
                unit_tag,
                unit_type_name: unit_type_name.to_owned(),
            },
        }
    }

    pub fn unit_died(gameloop: u32, unit_tag: u64) -> Self {
        Self {
            kind: EventKind::Tracker,
            name: names::UNIT_DIED.to_owned(),
            gameloop,
            payload: Payload::UnitDied { unit_tag },
        }
    }

    pub fn score_result(gameloop: u32, instances: Vec<ScoreInstance>) -> Self {
        Self {
            kind: EventKind::Tracker,
            name: names::SCORE_RESULT.to_owned(),
            gameloop,
            payload: Payload::ScoreResult { instances },
        }
    }

    pub fn field(&self, field: Field) -> Option<Value<'_>> {
        match (field, &self.payload) {
            (Field::Name, _) => Some(Value::Text(&self.name)),
            (Field::EventName, Payload::Stat { event_name }) => Some(Value::Text(event_name)),
            (Field::UnitTypeName, Payload::UnitType { unit_type_name, .. }) => {
                Some(Value::Text(unit_type_name))
            }
            (
                Field::UnitTag,
                Payload::UnitType { unit_tag, .. } | Payload::UnitDied { unit_tag },
            ) => Some(Value::Tag(*unit_tag)),
            _ => None,
        }
    }
}

/// Columns an event can be matched or joined on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Name,
    EventName,
    UnitTypeName,
    UnitTag,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Value<'a> {
    Text(&'a str),
    Tag(u64),
}

#[derive(Debug, Default)]
pub struct EventTable {
    ticks: Vec<u64>,
    events: Vec<Event>,
}

impl EventTable {
    pub fn new<I>(events: I) -> Self
    where
        I: IntoIterator<Item = Event>,
    {
        let mut last_seen = HashMap::<EventKind, (u32, u64)>::new();

        let mut rows: Vec<(u64, Event)> = events
            .into_iter()
            .map(|event| {
                let (previous, epoch) = last_seen
                    .entry(event.kind)
                    .or_insert((event.gameloop, 0));
                if event.gameloop < *previous {
                    *epoch += 1 << 32;
                }
                *previous = event.gameloop;

                (*epoch + u64::from(event.gameloop), event)
            })
            .collect();
        rows.sort_by_key(|(tick, _)| *tick);

        let (ticks, events) = rows.into_iter().unzip();
        Self { ticks, events }
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Event> + '_ {
        self.events.iter()
    }

    /// Unwrapped tick of every event, in table order.
    pub fn ticks(&self) -> &[u64] {
        &self.ticks
    }

    pub fn all(&self) -> Selection<'_> {
        Selection {
            table: self,
            rows: (0..self.events.len()).collect(),
        }
    }

    pub fn tracker(&self) -> Selection<'_> {
        self.all().kind(EventKind::Tracker)
    }
}

/// An ordered subset of an [`EventTable`]. Rows always stay in tick order.
#[derive(Debug, Clone)]
pub struct Selection<'t> {
    table: &'t EventTable,
    rows: Vec<usize>,
}

impl<'t> Selection<'t> {
    pub fn kind(mut self, kind: EventKind) -> Self {
        let events = &self.table.events;
        self.rows.retain(|row| events[*row].kind == kind);
        self
    }

    pub fn where_eq(mut self, field: Field, value: Value<'_>) -> Self {
        let events = &self.table.events;
        self.rows
            .retain(|row| events[*row].field(field).is_some_and(|v| v == value));
        self
    }

    pub fn where_any(mut self, field: Field, values: &[Value<'_>]) -> Self {
        let events = &self.table.events;
        self.rows.retain(|row| {
            events[*row]
                .field(field)
                .is_some_and(|v| values.contains(&v))
        });
        self
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn first(&self) -> Option<&'t Event> {
        let table = self.table;
        self.rows.first().map(|row| &table.events[*row])
    }

    pub fn last(&self) -> Option<&'t Event> {
        let table = self.table;
        self.rows.last().map(|row| &table.events[*row])
    }

    pub fn iter(&self) -> impl Iterator<Item = &'t Event> + '_ {
        let table = self.table;
        self.rows.iter().map(move |row| &table.events[*row])
    }

    /// Pairs every event of `self` with every event of `later` that shares the same
    /// `field` value and does not precede it. Output follows the order of `later`.
    ///
    /// Both selections must come from the same table.
    pub fn join(&self, later: &Selection<'t>, field: Field) -> Vec<(&'t Event, &'t Event)> {
        debug_assert!(std::ptr::eq(self.table, later.table));

        let table = self.table;

        let mut by_key = HashMap::<Value<'t>, Vec<usize>>::new();
        for row in self.rows.iter().copied() {
            if let Some(key) = table.events[row].field(field) {
                by_key.entry(key).or_default().push(row);
            }
        }

        let mut pairs = Vec::new();
        for right in later.rows.iter().copied() {
            let key = match table.events[right].field(field) {
                Some(k) => k,
                None => continue,
            };

            let lefts = match by_key.get(&key) {
                Some(l) => l,
                None => continue,
            };

            pairs.extend(
                lefts
                    .iter()
                    .filter(|left| **left <= right)
                    .map(|left| (&table.events[*left], &table.events[right])),
            );
        }

        pairs
    }
}
