use chrono::{DateTime, Utc};

use crate::duration::{self, MatchDuration};
use crate::metrics::{self, PlayerMetrics};
use crate::replay::DecodedReplay;
use crate::AnalysisError;

#[derive(Debug, PartialEq)]
pub struct EndOfGame {
    pub map: String,
    pub played_at: DateTime<Utc>,
    pub base_build: u32,
    pub duration: MatchDuration,
    pub players: Vec<PlayerMetrics>,
}

#[derive(Debug, thiserror::Error)]
pub enum EndOfGameError {
    #[error(transparent)]
    Decode(#[from] crate::replay::DecodeError),
    #[error(transparent)]
    Analysis(#[from] AnalysisError),
}

/// Duration and per player statistics of a decoded replay.
#[tracing::instrument(skip(replay), fields(map = %replay.details.title))]
pub fn parse(replay: &DecodedReplay) -> Result<EndOfGame, EndOfGameError> {
    tracing::debug!(build = replay.header.version.base_build, "Analysing replay");

    let duration = duration::resolve(&replay.events)?;
    let players = metrics::extract(&replay.details.roster(), &replay.events)?;

    Ok(EndOfGame {
        map: replay.details.title.clone(),
        played_at: replay.details.played_at()?,
        base_build: replay.header.version.base_build,
        duration,
        players,
    })
}
