use diesel::prelude::*;
use diesel_async::{
    AnsiTransactionManager, AsyncConnection, AsyncPgConnection, RunQueryDsl, TransactionManager,
};

use analysis::aggregate::RoundRecord;
use analysis::metrics::RawPlayerStats;
use analysis::score::ScoreBreakdown;

use super::*;
use crate::models;
use crate::schema::{leagues, matches, player_round_stats, player_scores, players, rounds, seasons};

/// PostgreSQL [`Store`] over a single connection.
///
/// Every `get_or_create_*` is an `INSERT .. ON CONFLICT DO NOTHING` against the unique
/// constraint of the natural key followed by reading back the canonical row.
pub struct PgStore {
    conn: AsyncPgConnection,
}

impl PgStore {
    /// Connects to `url` and applies any pending `migrations`.
    #[tracing::instrument(skip_all)]
    pub async fn open(
        url: &str,
        migrations: &diesel_async_migrations::EmbeddedMigrations,
    ) -> Result<Self, StoreError> {
        let mut conn = AsyncPgConnection::establish(url).await?;

        tracing::info!("Applying Migrations");
        migrations
            .run_pending_migrations(&mut conn)
            .await
            .map_err(|e| StoreError::Migration(e.to_string()))?;
        tracing::info!("Completed Migrations");

        Ok(Self { conn })
    }

    pub fn close(self) {
        drop(self.conn);
    }
}

#[async_trait::async_trait]
impl Store for PgStore {
    async fn begin(&mut self) -> Result<(), StoreError> {
        AnsiTransactionManager::begin_transaction(&mut self.conn).await?;
        Ok(())
    }

    async fn commit(&mut self) -> Result<(), StoreError> {
        AnsiTransactionManager::commit_transaction(&mut self.conn).await?;
        Ok(())
    }

    async fn rollback(&mut self) -> Result<(), StoreError> {
        AnsiTransactionManager::rollback_transaction(&mut self.conn).await?;
        Ok(())
    }

    async fn get_or_create_league(&mut self, name: &str) -> Result<LeagueId, StoreError> {
        diesel::insert_into(leagues::table)
            .values(models::NewLeague { name })
            .on_conflict(leagues::name)
            .do_nothing()
            .execute(&mut self.conn)
            .await?;

        let rows: Vec<models::League> = leagues::table
            .filter(leagues::name.eq(name))
            .select(models::League::as_select())
            .load(&mut self.conn)
            .await?;

        canonical("league", name, rows).map(|row| LeagueId(row.id))
    }

    async fn get_or_create_season(
        &mut self,
        league: LeagueId,
        number: i32,
    ) -> Result<SeasonId, StoreError> {
        diesel::insert_into(seasons::table)
            .values(models::NewSeason {
                league_id: league.0,
                number,
            })
            .on_conflict((seasons::league_id, seasons::number))
            .do_nothing()
            .execute(&mut self.conn)
            .await?;

        let rows: Vec<models::Season> = seasons::table
            .filter(seasons::league_id.eq(league.0))
            .filter(seasons::number.eq(number))
            .select(models::Season::as_select())
            .load(&mut self.conn)
            .await?;

        let key = format!("({}, {})", league.0, number);
        canonical("season", key, rows).map(|row| SeasonId(row.id))
    }

    async fn get_or_create_match(&mut self, new: &NewMatch) -> Result<MatchId, StoreError> {
        diesel::insert_into(matches::table)
            .values(models::NewMatch {
                season_id: new.season.0,
                match_in_season: new.match_in_season,
                date: new.date,
            })
            .on_conflict((matches::season_id, matches::match_in_season))
            .do_nothing()
            .execute(&mut self.conn)
            .await?;

        let rows: Vec<models::Match> = matches::table
            .filter(matches::season_id.eq(new.season.0))
            .filter(matches::match_in_season.eq(new.match_in_season))
            .select(models::Match::as_select())
            .load(&mut self.conn)
            .await?;

        // the first round stored decides the date
        let key = format!("({}, {})", new.season.0, new.match_in_season);
        canonical("match", key, rows).map(|row| MatchId(row.id))
    }

    async fn get_or_create_round(&mut self, new: &NewRound) -> Result<RoundId, StoreError> {
        // at most 2^32 ticks at 16 per second, always fits
        let duration_seconds = new.duration_seconds as i32;

        diesel::insert_into(rounds::table)
            .values(models::NewRound {
                match_id: new.match_id.0,
                round_in_match: new.round_in_match,
                map_name: &new.map_name,
                time: new.time,
                duration_seconds,
            })
            .on_conflict((rounds::match_id, rounds::round_in_match))
            .do_nothing()
            .execute(&mut self.conn)
            .await?;

        let rows: Vec<models::Round> = rounds::table
            .filter(rounds::match_id.eq(new.match_id.0))
            .filter(rounds::round_in_match.eq(new.round_in_match))
            .select(models::Round::as_select())
            .load(&mut self.conn)
            .await?;

        let key = format!("({}, {})", new.match_id.0, new.round_in_match);
        let row = canonical("round", &key, rows)?;
        if row.map_name != new.map_name
            || row.time != new.time
            || row.duration_seconds != duration_seconds
        {
            return Err(StoreError::Conflict {
                entity: "round",
                key,
            });
        }

        Ok(RoundId(row.id))
    }

    async fn get_or_create_player(&mut self, new: &NewPlayer) -> Result<PlayerId, StoreError> {
        // unique on account_id, and on name among rows without one
        diesel::insert_into(players::table)
            .values(models::NewPlayer {
                name: &new.name,
                account_id: new.account_id,
            })
            .on_conflict_do_nothing()
            .execute(&mut self.conn)
            .await?;

        let rows: Vec<models::Player> = match new.account_id {
            Some(account) => {
                players::table
                    .filter(players::account_id.eq(account))
                    .select(models::Player::as_select())
                    .load(&mut self.conn)
                    .await?
            }
            None => {
                players::table
                    .filter(players::name.eq(&new.name))
                    .filter(players::account_id.is_null())
                    .select(models::Player::as_select())
                    .load(&mut self.conn)
                    .await?
            }
        };

        let key = match new.account_id {
            Some(account) => format!("#{}", account),
            None => new.name.clone(),
        };
        canonical("player", key, rows).map(|row| PlayerId(row.id))
    }

    async fn get_or_create_player_round_stat(
        &mut self,
        new: &NewPlayerRoundStat,
    ) -> Result<StatId, StoreError> {
        let s = &new.stats;
        diesel::insert_into(player_round_stats::table)
            .values(models::NewPlayerRoundStat {
                round_id: new.round.0,
                player_id: new.player.0,
                won: new.won,
                kills: s.kills,
                deaths: s.deaths,
                assists: s.assists,
                experience_contribution: s.experience_contribution,
                healing: s.healing,
                damage_soaked: s.damage_soaked,
            })
            .on_conflict((player_round_stats::round_id, player_round_stats::player_id))
            .do_nothing()
            .execute(&mut self.conn)
            .await?;

        let rows: Vec<models::PlayerRoundStat> = player_round_stats::table
            .filter(player_round_stats::round_id.eq(new.round.0))
            .filter(player_round_stats::player_id.eq(new.player.0))
            .select(models::PlayerRoundStat::as_select())
            .load(&mut self.conn)
            .await?;

        let key = format!("({}, {})", new.round.0, new.player.0);
        let row = canonical("player round stat", &key, rows)?;
        let stored = RawPlayerStats {
            kills: row.kills,
            deaths: row.deaths,
            assists: row.assists,
            experience_contribution: row.experience_contribution,
            healing: row.healing,
            damage_soaked: row.damage_soaked,
        };
        if row.won != new.won || stored != new.stats {
            return Err(StoreError::Conflict {
                entity: "player round stat",
                key,
            });
        }

        Ok(StatId(row.id))
    }

    async fn put_player_score(
        &mut self,
        match_id: MatchId,
        player: PlayerId,
        breakdown: &ScoreBreakdown,
    ) -> Result<(), StoreError> {
        let score = models::PlayerScore {
            match_id: match_id.0,
            player_id: player.0,
            kills: breakdown.kills,
            deaths: breakdown.deaths,
            assists: breakdown.assists,
            experience_per_minute: breakdown.experience_per_minute,
            healing: breakdown.healing,
            damage_soaked: breakdown.damage_soaked,
            win: breakdown.win,
            win_under_10_mins: breakdown.win_under_10_mins,
            win_under_15_mins: breakdown.win_under_15_mins,
            total: breakdown.total,
        };

        diesel::insert_into(player_scores::table)
            .values(&score)
            .on_conflict((player_scores::match_id, player_scores::player_id))
            .do_update()
            .set(&score)
            .execute(&mut self.conn)
            .await?;

        Ok(())
    }

    async fn query_stats(&mut self, filter: &StatsFilter) -> Result<Vec<StatRow>, StoreError> {
        let mut query = player_round_stats::table
            .inner_join(players::table)
            .inner_join(
                rounds::table
                    .inner_join(matches::table.inner_join(seasons::table.inner_join(leagues::table))),
            )
            .select((
                matches::id,
                players::id,
                players::name,
                matches::match_in_season,
                matches::date,
                rounds::round_in_match,
                rounds::duration_seconds,
                player_round_stats::won,
                player_round_stats::kills,
                player_round_stats::deaths,
                player_round_stats::assists,
                player_round_stats::experience_contribution,
                player_round_stats::healing,
                player_round_stats::damage_soaked,
            ))
            .order((
                matches::match_in_season.asc(),
                rounds::round_in_match.asc(),
                players::id.asc(),
            ))
            .into_boxed();

        if let Some(league) = &filter.league {
            query = query.filter(leagues::name.eq(league.clone()));
        }
        if let Some(season) = filter.season {
            query = query.filter(seasons::number.eq(season));
        }
        if let Some(match_in_season) = filter.match_in_season {
            query = query.filter(matches::match_in_season.eq(match_in_season));
        }
        if let Some(round_in_match) = filter.round_in_match {
            query = query.filter(rounds::round_in_match.eq(round_in_match));
        }
        if let Some(player) = &filter.player {
            query = query.filter(players::name.eq(player.clone()));
        }

        tracing::trace!(?filter, "Query stats");
        let rows: Vec<models::StatRow> = query.load(&mut self.conn).await?;

        Ok(rows
            .into_iter()
            .map(|row| StatRow {
                match_id: MatchId(row.match_id),
                player_id: PlayerId(row.player_id),
                record: RoundRecord {
                    player: row.player,
                    match_in_season: row.match_in_season,
                    match_date: row.date,
                    round_in_match: row.round_in_match,
                    duration_seconds: u32::try_from(row.duration_seconds).unwrap_or_default(),
                    won: row.won,
                    stats: RawPlayerStats {
                        kills: row.kills,
                        deaths: row.deaths,
                        assists: row.assists,
                        experience_contribution: row.experience_contribution,
                        healing: row.healing,
                        damage_soaked: row.damage_soaked,
                    },
                },
            })
            .collect())
    }
}
