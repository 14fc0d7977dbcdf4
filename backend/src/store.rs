//! Persistence of leagues, matches, rounds and player statistics.
//!
//! Entities are addressed by integer ids and created through `get_or_create_*`
//! operations keyed on their natural key. Creating an entity that already exists with
//! the same fields returns the existing id, differing fields are a [`StoreError::Conflict`].
//!
//! A match keeps the date it was first stored with. A player is keyed by account id
//! when the replay carries one and by display name otherwise, and keeps its first name.

use analysis::aggregate::RoundRecord;
use analysis::metrics::RawPlayerStats;
use analysis::score::ScoreBreakdown;

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

macro_rules! entity_id {
    ($($name:ident),* $(,)?) => {
        $(
            #[derive(
                Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
            )]
            pub struct $name(pub i32);
        )*
    };
}

entity_id!(LeagueId, SeasonId, MatchId, RoundId, PlayerId, StatId);

#[derive(Debug, Clone, PartialEq)]
pub struct NewMatch {
    pub season: SeasonId,
    pub match_in_season: i32,
    pub date: chrono::NaiveDate,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewRound {
    pub match_id: MatchId,
    pub round_in_match: i32,
    pub map_name: String,
    pub time: chrono::NaiveTime,
    pub duration_seconds: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewPlayer {
    pub name: String,
    pub account_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewPlayerRoundStat {
    pub round: RoundId,
    pub player: PlayerId,
    pub won: bool,
    pub stats: RawPlayerStats,
}

/// Restricts [`Store::query_stats`]. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatsFilter {
    pub league: Option<String>,
    pub season: Option<i32>,
    pub match_in_season: Option<i32>,
    pub round_in_match: Option<i32>,
    pub player: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StatRow {
    pub match_id: MatchId,
    pub player_id: PlayerId,
    pub record: RoundRecord,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{entity} {key} matches {count} rows")]
    AmbiguousEntry {
        entity: &'static str,
        key: String,
        count: usize,
    },
    #[error("{entity} {key} already exists with different values")]
    Conflict { entity: &'static str, key: String },
    #[error("database: {0}")]
    Database(#[from] diesel::result::Error),
    #[error("connecting to database: {0}")]
    Connection(#[from] diesel::ConnectionError),
    #[error("applying migrations: {0}")]
    Migration(String),
    #[error("no open transaction")]
    NoTransaction,
}

impl StoreError {
    /// Whether the store can no longer be trusted to continue a batch.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::Conflict { .. })
    }
}

#[async_trait::async_trait]
pub trait Store: Send {
    /// Starts a unit of writes that [`Store::commit`] keeps and [`Store::rollback`]
    /// discards.
    async fn begin(&mut self) -> Result<(), StoreError>;

    async fn commit(&mut self) -> Result<(), StoreError>;

    async fn rollback(&mut self) -> Result<(), StoreError>;

    async fn get_or_create_league(&mut self, name: &str) -> Result<LeagueId, StoreError>;

    async fn get_or_create_season(
        &mut self,
        league: LeagueId,
        number: i32,
    ) -> Result<SeasonId, StoreError>;

    async fn get_or_create_match(&mut self, new: &NewMatch) -> Result<MatchId, StoreError>;

    async fn get_or_create_round(&mut self, new: &NewRound) -> Result<RoundId, StoreError>;

    async fn get_or_create_player(&mut self, new: &NewPlayer) -> Result<PlayerId, StoreError>;

    async fn get_or_create_player_round_stat(
        &mut self,
        new: &NewPlayerRoundStat,
    ) -> Result<StatId, StoreError>;

    /// Stores the score of a player in a match, replacing an earlier one.
    async fn put_player_score(
        &mut self,
        match_id: MatchId,
        player: PlayerId,
        breakdown: &ScoreBreakdown,
    ) -> Result<(), StoreError>;

    /// Stat rows ordered by match, round and player.
    async fn query_stats(&mut self, filter: &StatsFilter) -> Result<Vec<StatRow>, StoreError>;
}

/// Picks the single row a natural key resolved to.
fn canonical<T>(entity: &'static str, key: impl std::fmt::Display, mut rows: Vec<T>) -> Result<T, StoreError> {
    match rows.len() {
        0 => Err(StoreError::Database(diesel::result::Error::NotFound)),
        1 => Ok(rows.remove(0)),
        count => Err(StoreError::AmbiguousEntry {
            entity,
            key: key.to_string(),
            count,
        }),
    }
}
