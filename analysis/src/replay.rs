//! Decoded replay dumps.
//!
//! The binary archive is decoded elsewhere; what arrives here is one JSON document per
//! replay whose members are named after the archive files (`replay.details`,
//! `replay.tracker.events`, ...) and hold the protocol decoder's output.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::events::{names, Event, EventKind, EventTable, Payload, ScoreInstance};
use crate::metrics::{PlayerIdentity, PlayerSlot};

/// Seconds between 1601-01-01 (FILETIME epoch) and 1970-01-01.
pub const FILETIME_EPOCH_OFFSET_SECS: i64 = 11_644_473_600;
pub const FILETIME_TICKS_PER_SECOND: i64 = 10_000_000;

pub const HEADER_MEMBER: &str = "replay.header";
pub const DETAILS_MEMBER: &str = "replay.details";

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parsing replay dump: {0}")]
    Json(#[from] serde_json::Error),
    #[error("replay dump has no `{0}` member")]
    MissingMember(&'static str),
    #[error("malformed event #{index} in `{member}`: {reason}")]
    MalformedEvent {
        member: &'static str,
        index: usize,
        reason: String,
    },
    #[error("replay timestamp {0} is out of range")]
    Timestamp(i64),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Header {
    #[serde(rename = "m_version")]
    pub version: Version,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Version {
    #[serde(rename = "m_baseBuild")]
    pub base_build: u32,
    #[serde(rename = "m_major", default)]
    pub major: u32,
    #[serde(rename = "m_minor", default)]
    pub minor: u32,
    #[serde(rename = "m_revision", default)]
    pub revision: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Details {
    #[serde(rename = "m_title")]
    pub title: String,
    /// 100 ns ticks since 1601-01-01.
    #[serde(rename = "m_timeUTC")]
    pub time_utc: i64,
    #[serde(rename = "m_playerList")]
    pub players: Vec<RosterEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RosterEntry {
    #[serde(rename = "m_name")]
    pub name: String,
    #[serde(rename = "m_hero")]
    pub hero: String,
    #[serde(rename = "m_teamId")]
    pub team_id: u8,
    #[serde(rename = "m_result")]
    pub result: i64,
    #[serde(rename = "m_workingSetSlotId", default)]
    pub working_set_slot_id: Option<usize>,
    #[serde(rename = "m_toon", default)]
    pub toon: Option<Toon>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Toon {
    #[serde(rename = "m_id")]
    pub id: i64,
    #[serde(rename = "m_region", default)]
    pub region: i64,
    #[serde(rename = "m_realm", default)]
    pub realm: i64,
}

impl Details {
    pub fn played_at(&self) -> Result<DateTime<Utc>, DecodeError> {
        let secs = self.time_utc / FILETIME_TICKS_PER_SECOND - FILETIME_EPOCH_OFFSET_SECS;
        DateTime::from_timestamp(secs, 0).ok_or(DecodeError::Timestamp(self.time_utc))
    }

    /// Roster entries that occupy a working set slot, i.e. actual players.
    pub fn roster(&self) -> Vec<PlayerSlot> {
        self.players
            .iter()
            .filter_map(|entry| {
                let slot_id = match entry.working_set_slot_id {
                    Some(s) => s,
                    None => {
                        tracing::debug!(name = %entry.name, "Skipping roster entry without slot");
                        return None;
                    }
                };

                Some(PlayerSlot {
                    slot_id,
                    identity: PlayerIdentity {
                        name: entry.name.clone(),
                        account_id: entry.toon.as_ref().map(|t| t.id).filter(|id| *id != 0),
                    },
                    hero: entry.hero.clone(),
                    team_id: entry.team_id,
                    result: entry.result,
                })
            })
            .collect()
    }
}

/// Turns the raw content of one archive member into events.
pub trait StreamDecoder: Sync {
    fn decode(
        &self,
        stream: &StreamEntry,
        raw: &serde_json::Value,
    ) -> Result<Vec<Event>, DecodeError>;
}

pub struct StreamEntry {
    pub kind: EventKind,
    pub member: &'static str,
    pub required: bool,
    pub decoder: &'static dyn StreamDecoder,
}

pub static STREAM_DECODERS: [StreamEntry; 4] = [
    StreamEntry {
        kind: EventKind::Game,
        member: "replay.game.events",
        required: false,
        decoder: &GenericDecoder,
    },
    StreamEntry {
        kind: EventKind::Message,
        member: "replay.message.events",
        required: false,
        decoder: &GenericDecoder,
    },
    StreamEntry {
        kind: EventKind::Tracker,
        member: "replay.tracker.events",
        required: true,
        decoder: &TrackerDecoder,
    },
    StreamEntry {
        kind: EventKind::Attributes,
        member: "replay.attributes.events",
        required: false,
        decoder: &AttributesDecoder,
    },
];

pub fn stream(kind: EventKind) -> &'static StreamEntry {
    match kind {
        EventKind::Game => &STREAM_DECODERS[0],
        EventKind::Message => &STREAM_DECODERS[1],
        EventKind::Tracker => &STREAM_DECODERS[2],
        EventKind::Attributes => &STREAM_DECODERS[3],
    }
}

#[derive(Deserialize)]
struct RawEvent {
    #[serde(rename = "_event")]
    event: String,
    #[serde(rename = "_gameloop", default)]
    gameloop: Option<u32>,
    #[serde(rename = "m_eventName", default)]
    event_name: Option<String>,
    #[serde(rename = "m_unitTagIndex", default)]
    unit_tag_index: Option<u32>,
    #[serde(rename = "m_unitTagRecycle", default)]
    unit_tag_recycle: Option<u32>,
    #[serde(rename = "m_unitTypeName", default)]
    unit_type_name: Option<String>,
    #[serde(rename = "m_instanceList", default)]
    instance_list: Option<Vec<RawScoreInstance>>,
}

#[derive(Deserialize)]
struct RawScoreInstance {
    #[serde(rename = "m_name")]
    name: String,
    #[serde(rename = "m_values")]
    values: Vec<Vec<RawScoreValue>>,
}

#[derive(Deserialize)]
struct RawScoreValue {
    #[serde(rename = "m_value")]
    value: i64,
}

fn raw_events<'r>(
    stream: &StreamEntry,
    raw: &'r serde_json::Value,
) -> Result<impl Iterator<Item = (usize, Result<RawEvent, serde_json::Error>)> + 'r, DecodeError> {
    let list = raw.as_array().ok_or_else(|| DecodeError::MalformedEvent {
        member: stream.member,
        index: 0,
        reason: "expected a list of events".to_owned(),
    })?;

    Ok(list
        .iter()
        .enumerate()
        .map(|(i, value)| (i, RawEvent::deserialize(value))))
}

fn unit_tag(index: u32, recycle: u32) -> u64 {
    (u64::from(index) << 18) + u64::from(recycle)
}

/// Keeps the event name and game loop, payloads are not interpreted.
pub struct GenericDecoder;

impl StreamDecoder for GenericDecoder {
    fn decode(
        &self,
        stream: &StreamEntry,
        raw: &serde_json::Value,
    ) -> Result<Vec<Event>, DecodeError> {
        raw_events(stream, raw)?
            .map(|(index, event)| {
                let event = event.map_err(|e| DecodeError::MalformedEvent {
                    member: stream.member,
                    index,
                    reason: e.to_string(),
                })?;

                Ok(Event {
                    kind: stream.kind,
                    name: event.event,
                    gameloop: event.gameloop.unwrap_or(0),
                    payload: Payload::Other,
                })
            })
            .collect()
    }
}

pub struct TrackerDecoder;

impl StreamDecoder for TrackerDecoder {
    fn decode(
        &self,
        stream: &StreamEntry,
        raw: &serde_json::Value,
    ) -> Result<Vec<Event>, DecodeError> {
        raw_events(stream, raw)?
            .map(|(index, event)| {
                let malformed = |reason: String| DecodeError::MalformedEvent {
                    member: stream.member,
                    index,
                    reason,
                };

                let event = event.map_err(|e| malformed(e.to_string()))?;
                let gameloop = event
                    .gameloop
                    .ok_or_else(|| malformed("missing `_gameloop`".to_owned()))?;

                let payload = match event.event.as_str() {
                    names::STAT_GAME => Payload::Stat {
                        event_name: event
                            .event_name
                            .ok_or_else(|| malformed("missing `m_eventName`".to_owned()))?,
                    },
                    names::UNIT_BORN | names::UNIT_TYPE_CHANGE => Payload::UnitType {
                        unit_tag: tag_of(&event)
                            .ok_or_else(|| malformed("missing unit tag".to_owned()))?,
                        unit_type_name: event
                            .unit_type_name
                            .ok_or_else(|| malformed("missing `m_unitTypeName`".to_owned()))?,
                    },
                    names::UNIT_DIED => Payload::UnitDied {
                        unit_tag: tag_of(&event)
                            .ok_or_else(|| malformed("missing unit tag".to_owned()))?,
                    },
                    names::SCORE_RESULT => Payload::ScoreResult {
                        instances: event
                            .instance_list
                            .map(score_instances)
                            .ok_or_else(|| malformed("missing `m_instanceList`".to_owned()))?,
                    },
                    _ => Payload::Other,
                };

                Ok(Event {
                    kind: stream.kind,
                    name: event.event,
                    gameloop,
                    payload,
                })
            })
            .collect()
    }
}

fn tag_of(event: &RawEvent) -> Option<u64> {
    Some(unit_tag(event.unit_tag_index?, event.unit_tag_recycle?))
}

fn score_instances(raw: Vec<RawScoreInstance>) -> Vec<ScoreInstance> {
    raw.into_iter()
        .map(|instance| ScoreInstance {
            name: instance.name,
            values: instance
                .values
                .into_iter()
                .map(|per_slot| per_slot.into_iter().map(|v| v.value).collect())
                .collect(),
        })
        .collect()
}

/// The attributes block is a single object rather than a list; it becomes one event
/// at game loop zero.
pub struct AttributesDecoder;

impl StreamDecoder for AttributesDecoder {
    fn decode(
        &self,
        stream: &StreamEntry,
        raw: &serde_json::Value,
    ) -> Result<Vec<Event>, DecodeError> {
        if raw.is_array() {
            return GenericDecoder.decode(stream, raw);
        }

        Ok(vec![Event {
            kind: stream.kind,
            name: "NNet.Replay.Attributes".to_owned(),
            gameloop: 0,
            payload: Payload::Other,
        }])
    }
}

/// Everything the analysis needs from one replay.
#[derive(Debug)]
pub struct DecodedReplay {
    pub header: Header,
    pub details: Details,
    pub events: EventTable,
}

#[derive(Debug)]
pub struct ReplayDump {
    members: serde_json::Map<String, serde_json::Value>,
}

impl ReplayDump {
    pub fn open<P>(path: P) -> Result<Self, DecodeError>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        let io_err = |source| DecodeError::Io {
            path: path.to_owned(),
            source,
        };

        let file = std::fs::File::open(path).map_err(io_err)?;
        // the dump is only read while the map is alive and never written by us
        let mmap = unsafe { memmap2::MmapOptions::new().map(&file) }.map_err(io_err)?;

        Self::from_slice(&mmap)
    }

    pub fn from_slice(buf: &[u8]) -> Result<Self, DecodeError> {
        let members = serde_json::from_slice(buf)?;
        Ok(Self { members })
    }

    pub fn member(&self, name: &str) -> Option<&serde_json::Value> {
        self.members.get(name)
    }

    pub fn header(&self) -> Result<Header, DecodeError> {
        let raw = self
            .member(HEADER_MEMBER)
            .ok_or(DecodeError::MissingMember(HEADER_MEMBER))?;
        Ok(Header::deserialize(raw)?)
    }

    pub fn details(&self) -> Result<Details, DecodeError> {
        let raw = self
            .member(DETAILS_MEMBER)
            .ok_or(DecodeError::MissingMember(DETAILS_MEMBER))?;
        Ok(Details::deserialize(raw)?)
    }

    /// Decodes the requested streams into one table. Optional streams that are absent
    /// contribute nothing.
    pub fn events(&self, kinds: &[EventKind]) -> Result<EventTable, DecodeError> {
        let mut events = Vec::new();
        for kind in kinds {
            let entry = stream(*kind);
            let raw = match (self.member(entry.member), entry.required) {
                (Some(raw), _) => raw,
                (None, true) => return Err(DecodeError::MissingMember(entry.member)),
                (None, false) => continue,
            };

            events.extend(entry.decoder.decode(entry, raw)?);
        }

        Ok(EventTable::new(events))
    }

    /// Header, details and the tracker stream.
    pub fn decode(&self) -> Result<DecodedReplay, DecodeError> {
        Ok(DecodedReplay {
            header: self.header()?,
            details: self.details()?,
            events: self.events(&[EventKind::Tracker])?,
        })
    }
}
