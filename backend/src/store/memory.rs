use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;

use analysis::aggregate::RoundRecord;
use analysis::metrics::RawPlayerStats;
use analysis::score::ScoreBreakdown;

use super::*;

/// Rows in insertion order, addressed by their natural key. Ids are 1-based positions.
#[derive(Debug, Clone)]
struct Table<K, V> {
    entity: &'static str,
    rows: Vec<(K, V)>,
    index: HashMap<K, usize>,
}

impl<K, V> Table<K, V>
where
    K: Clone + Eq + Hash + std::fmt::Debug,
    V: PartialEq,
{
    fn new(entity: &'static str) -> Self {
        Self {
            entity,
            rows: Vec::new(),
            index: HashMap::new(),
        }
    }

    fn get_or_create(&mut self, key: K, value: V) -> Result<i32, StoreError> {
        if let Some(&position) = self.index.get(&key) {
            if self.rows[position].1 != value {
                return Err(StoreError::Conflict {
                    entity: self.entity,
                    key: format!("{:?}", key),
                });
            }
            return Ok(position as i32 + 1);
        }

        self.rows.push((key.clone(), value));
        self.index.insert(key, self.rows.len() - 1);
        Ok(self.rows.len() as i32)
    }

    /// Like [`Table::get_or_create`], but an existing row wins over `value`.
    fn get_or_insert(&mut self, key: K, value: V) -> i32 {
        if let Some(&position) = self.index.get(&key) {
            return position as i32 + 1;
        }

        self.rows.push((key.clone(), value));
        self.index.insert(key, self.rows.len() - 1);
        self.rows.len() as i32
    }

    fn get(&self, id: i32) -> Option<&(K, V)> {
        usize::try_from(id - 1).ok().and_then(|i| self.rows.get(i))
    }

    fn iter(&self) -> impl Iterator<Item = (i32, &K, &V)> + '_ {
        self.rows
            .iter()
            .enumerate()
            .map(|(i, (k, v))| (i as i32 + 1, k, v))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum PlayerKey {
    Account(i64),
    Name(String),
}

#[derive(Debug, Clone)]
struct Tables {
    leagues: Table<String, ()>,
    seasons: Table<(LeagueId, i32), ()>,
    matches: Table<(SeasonId, i32), chrono::NaiveDate>,
    rounds: Table<(MatchId, i32), (String, chrono::NaiveTime, u32)>,
    players: Table<PlayerKey, String>,
    stats: Table<(RoundId, PlayerId), (bool, RawPlayerStats)>,
    scores: BTreeMap<(MatchId, PlayerId), ScoreBreakdown>,
}

/// Arena backed [`Store`], for tests and dry runs.
///
/// Transactions snapshot every table on [`Store::begin`]; a rollback puts the snapshot
/// back.
#[derive(Debug)]
pub struct MemoryStore {
    tables: Tables,
    checkpoints: Vec<Tables>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            tables: Tables {
                leagues: Table::new("league"),
                seasons: Table::new("season"),
                matches: Table::new("match"),
                rounds: Table::new("round"),
                players: Table::new("player"),
                stats: Table::new("player round stat"),
                scores: BTreeMap::new(),
            },
            checkpoints: Vec::new(),
        }
    }

    pub fn stat_count(&self) -> usize {
        self.tables.stats.rows.len()
    }

    pub fn round_count(&self) -> usize {
        self.tables.rounds.rows.len()
    }

    pub fn player_count(&self) -> usize {
        self.tables.players.rows.len()
    }

    pub fn player_score(&self, match_id: MatchId, player: PlayerId) -> Option<&ScoreBreakdown> {
        self.tables.scores.get(&(match_id, player))
    }

    pub fn player_scores(&self) -> impl Iterator<Item = (&(MatchId, PlayerId), &ScoreBreakdown)> + '_ {
        self.tables.scores.iter()
    }
}

impl Tables {
    fn stat_row(
        &self,
        filter: &StatsFilter,
        (round, player): (RoundId, PlayerId),
        (won, stats): (bool, RawPlayerStats),
    ) -> Option<StatRow> {
        let ((match_id, round_in_match), (_, _, duration_seconds)) = self.rounds.get(round.0)?;
        let ((season, match_in_season), date) = self.matches.get(match_id.0)?;
        let ((league, number), _) = self.seasons.get(season.0)?;
        let (league_name, _) = self.leagues.get(league.0)?;
        let (_, player_name) = self.players.get(player.0)?;

        let keep = filter.league.as_ref().map_or(true, |l| l == league_name)
            && filter.season.map_or(true, |s| s == *number)
            && filter.match_in_season.map_or(true, |m| m == *match_in_season)
            && filter.round_in_match.map_or(true, |r| r == *round_in_match)
            && filter.player.as_ref().map_or(true, |p| p == player_name);
        if !keep {
            return None;
        }

        Some(StatRow {
            match_id: *match_id,
            player_id: player,
            record: RoundRecord {
                player: player_name.clone(),
                match_in_season: *match_in_season,
                match_date: *date,
                round_in_match: *round_in_match,
                duration_seconds: *duration_seconds,
                won,
                stats,
            },
        })
    }
}

#[async_trait::async_trait]
impl Store for MemoryStore {
    async fn begin(&mut self) -> Result<(), StoreError> {
        self.checkpoints.push(self.tables.clone());
        Ok(())
    }

    async fn commit(&mut self) -> Result<(), StoreError> {
        self.checkpoints.pop().map(drop).ok_or(StoreError::NoTransaction)
    }

    async fn rollback(&mut self) -> Result<(), StoreError> {
        self.tables = self.checkpoints.pop().ok_or(StoreError::NoTransaction)?;
        Ok(())
    }

    async fn get_or_create_league(&mut self, name: &str) -> Result<LeagueId, StoreError> {
        self.tables.leagues.get_or_create(name.to_owned(), ()).map(LeagueId)
    }

    async fn get_or_create_season(
        &mut self,
        league: LeagueId,
        number: i32,
    ) -> Result<SeasonId, StoreError> {
        self.tables.seasons.get_or_create((league, number), ()).map(SeasonId)
    }

    async fn get_or_create_match(&mut self, new: &NewMatch) -> Result<MatchId, StoreError> {
        let id = self
            .tables
            .matches
            .get_or_insert((new.season, new.match_in_season), new.date);
        Ok(MatchId(id))
    }

    async fn get_or_create_round(&mut self, new: &NewRound) -> Result<RoundId, StoreError> {
        self.tables
            .rounds
            .get_or_create(
                (new.match_id, new.round_in_match),
                (new.map_name.clone(), new.time, new.duration_seconds),
            )
            .map(RoundId)
    }

    async fn get_or_create_player(&mut self, new: &NewPlayer) -> Result<PlayerId, StoreError> {
        let key = match new.account_id {
            Some(account) => PlayerKey::Account(account),
            None => PlayerKey::Name(new.name.clone()),
        };
        Ok(PlayerId(self.tables.players.get_or_insert(key, new.name.clone())))
    }

    async fn get_or_create_player_round_stat(
        &mut self,
        new: &NewPlayerRoundStat,
    ) -> Result<StatId, StoreError> {
        self.tables
            .stats
            .get_or_create((new.round, new.player), (new.won, new.stats))
            .map(StatId)
    }

    async fn put_player_score(
        &mut self,
        match_id: MatchId,
        player: PlayerId,
        breakdown: &ScoreBreakdown,
    ) -> Result<(), StoreError> {
        self.tables.scores.insert((match_id, player), *breakdown);
        Ok(())
    }

    async fn query_stats(&mut self, filter: &StatsFilter) -> Result<Vec<StatRow>, StoreError> {
        let tables = &self.tables;
        let mut rows: Vec<StatRow> = tables
            .stats
            .iter()
            .filter_map(|(_, key, value)| tables.stat_row(filter, *key, *value))
            .collect();
        rows.sort_by_key(|row| (row.record.match_in_season, row.record.round_in_match, row.player_id));

        Ok(rows)
    }
}
