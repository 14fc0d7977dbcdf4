use std::collections::HashMap;

use crate::events::{names, EventTable, Field, Payload, ScoreInstance, Value};
use crate::AnalysisError;

/// Names of the score instances in the final snapshot.
pub mod metric {
    pub const KILLS: &str = "SoloKill";
    pub const DEATHS: &str = "Deaths";
    pub const ASSISTS: &str = "Assists";
    pub const EXPERIENCE_CONTRIBUTION: &str = "ExperienceContribution";
    pub const HEALING: &str = "Healing";
    pub const DAMAGE_SOAKED: &str = "DamageSoaked";
}

/// Stable identity of a player across replays.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub struct PlayerIdentity {
    pub name: String,
    pub account_id: Option<i64>,
}

/// One roster entry of a replay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerSlot {
    pub slot_id: usize,
    pub identity: PlayerIdentity,
    pub hero: String,
    pub team_id: u8,
    pub result: i64,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct RawPlayerStats {
    pub kills: i64,
    pub deaths: i64,
    pub assists: i64,
    pub experience_contribution: i64,
    pub healing: i64,
    pub damage_soaked: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerMetrics {
    pub identity: PlayerIdentity,
    pub hero: String,
    pub team_id: u8,
    pub slot_id: usize,
    pub won: bool,
    pub stats: RawPlayerStats,
}

/// Maps a roster result code to a win flag: 1 is a win, 2 a loss.
pub fn normalize_result(code: i64) -> Result<bool, AnalysisError> {
    match code {
        1 => Ok(true),
        2 => Ok(false),
        other => Err(AnalysisError::MalformedResult(other)),
    }
}

/// Joins the roster with the last score snapshot of the tracker stream.
#[tracing::instrument(skip_all, fields(players = roster.len()))]
pub fn extract(
    roster: &[PlayerSlot],
    events: &EventTable,
) -> Result<Vec<PlayerMetrics>, AnalysisError> {
    let snapshot = events
        .tracker()
        .where_eq(Field::Name, Value::Text(names::SCORE_RESULT))
        .last()
        .ok_or(AnalysisError::MissingSignal("score result"))?;
    let instances = match &snapshot.payload {
        Payload::ScoreResult { instances } => instances,
        _ => return Err(AnalysisError::MissingSignal("score result")),
    };

    let by_name: HashMap<&str, &ScoreInstance> = instances
        .iter()
        .map(|instance| (instance.name.as_str(), instance))
        .collect();

    let mut players = roster
        .iter()
        .map(|slot| {
            let value = |name: &str| metric_value(&by_name, name, slot.slot_id);

            Ok(PlayerMetrics {
                identity: slot.identity.clone(),
                hero: slot.hero.clone(),
                team_id: slot.team_id,
                slot_id: slot.slot_id,
                won: normalize_result(slot.result)?,
                stats: RawPlayerStats {
                    kills: value(metric::KILLS)?,
                    deaths: value(metric::DEATHS)?,
                    assists: value(metric::ASSISTS)?,
                    experience_contribution: value(metric::EXPERIENCE_CONTRIBUTION)?,
                    healing: value(metric::HEALING)?,
                    damage_soaked: value(metric::DAMAGE_SOAKED)?,
                },
            })
        })
        .collect::<Result<Vec<_>, AnalysisError>>()?;
    players.sort_unstable_by_key(|p| p.slot_id);

    Ok(players)
}

fn metric_value(
    instances: &HashMap<&str, &ScoreInstance>,
    name: &str,
    slot: usize,
) -> Result<i64, AnalysisError> {
    let instance = instances
        .get(name)
        .ok_or_else(|| AnalysisError::MissingMetric(name.to_owned()))?;

    instance
        .values
        .get(slot)
        .and_then(|values| values.first())
        .copied()
        .ok_or_else(|| AnalysisError::UnknownSlot {
            slot,
            metric: name.to_owned(),
        })
}
