use crate::events::{names, Event, EventTable, Field, Value};
use crate::AnalysisError;

pub const TICKS_PER_SECOND: u32 = 16;

/// Stat event fired when the gates open and the match starts.
pub const GATES_OPEN: &str = "GatesOpen";

/// Unit types whose destruction ends a match.
pub static OBJECTIVE_UNITS: phf::Set<&'static str> = phf::phf_set! {
    "KingsCore",
    "VanndarStormpike",
    "DrekThar",
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum EndStrategy {
    ObjectiveDestroyed,
    LastUnitDeath,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct MatchDuration {
    pub start_tick: u32,
    pub end_tick: u32,
    pub strategy: EndStrategy,
    pub seconds: u32,
}

impl MatchDuration {
    pub fn minutes(&self) -> f64 {
        f64::from(self.seconds) / 60.0
    }
}

/// Whole seconds between two game loops, tolerating a single wrap of the counter.
pub fn elapsed_seconds(start_tick: u32, end_tick: u32) -> u32 {
    end_tick.wrapping_sub(start_tick) / TICKS_PER_SECOND
}

#[tracing::instrument(skip(events), fields(events = events.len()))]
pub fn resolve(events: &EventTable) -> Result<MatchDuration, AnalysisError> {
    let start = events
        .tracker()
        .where_eq(Field::Name, Value::Text(names::STAT_GAME))
        .where_eq(Field::EventName, Value::Text(GATES_OPEN))
        .first()
        .ok_or(AnalysisError::MissingSignal("GatesOpen"))?;

    let (end_tick, strategy) = match objective_death(events)? {
        Some(died) => (died.gameloop, EndStrategy::ObjectiveDestroyed),
        None => {
            tracing::debug!("No objective was destroyed, using the last unit death");

            let died = events
                .tracker()
                .where_eq(Field::Name, Value::Text(names::UNIT_DIED))
                .last()
                .ok_or(AnalysisError::MissingSignal("unit death"))?;
            (died.gameloop, EndStrategy::LastUnitDeath)
        }
    };

    let duration = MatchDuration {
        start_tick: start.gameloop,
        end_tick,
        strategy,
        seconds: elapsed_seconds(start.gameloop, end_tick),
    };
    tracing::debug!(?duration, "Resolved match duration");

    Ok(duration)
}

fn objective_death(events: &EventTable) -> Result<Option<&Event>, AnalysisError> {
    let objectives: Vec<Value<'_>> = OBJECTIVE_UNITS.iter().map(|n| Value::Text(*n)).collect();

    let objective_units = events.tracker().where_any(Field::UnitTypeName, &objectives);
    let deaths = events
        .tracker()
        .where_eq(Field::Name, Value::Text(names::UNIT_DIED));

    let mut died: Vec<&Event> = objective_units
        .join(&deaths, Field::UnitTag)
        .into_iter()
        .map(|(_, death)| death)
        .collect();
    // a unit that was born and later changed type pairs with its death twice
    died.dedup_by(|a, b| std::ptr::eq(*a, *b));

    match died.as_slice() {
        [] => Ok(None),
        [death] => Ok(Some(*death)),
        more => Err(AnalysisError::AmbiguousObjectiveDeath { count: more.len() }),
    }
}
