//! Scoring pipeline for decoded game replays.
//!
//! [`replay`] loads a decoded dump, [`endofgame`] resolves its duration and per player
//! counters, [`score`] turns one player round into points and [`aggregate`] builds
//! match and season scores on top, which [`scoreboard`] lays out as a table.

pub mod aggregate;
pub mod duration;
pub mod endofgame;
pub mod events;
pub mod metrics;
pub mod replay;
pub mod score;
pub mod scoreboard;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AnalysisError {
    #[error("replay has no {0} event")]
    MissingSignal(&'static str),
    #[error("found {count} destroyed objectives, at most one is possible")]
    AmbiguousObjectiveDeath { count: usize },
    #[error("final score snapshot has no `{0}` metric")]
    MissingMetric(String),
    #[error("slot {slot} has no value for metric `{metric}`")]
    UnknownSlot { slot: usize, metric: String },
    #[error("unknown result code {0}")]
    MalformedResult(i64),
    #[error("round lasted zero minutes")]
    DivisionUndefined,
    #[error("{player} has more than one entry for match {match_in_season} round {round_in_match}")]
    AmbiguousEntry {
        player: String,
        match_in_season: i32,
        round_in_match: i32,
    },
}
