use std::collections::{BTreeMap, BTreeSet};

use analysis::aggregate::{MatchScore, RoundRecord, SeasonScoreboard};
use analysis::scoreboard::{self, ScoreboardTable};
use analysis::AnalysisError;

use crate::store::{PlayerId, StatRow, StatsFilter, Store, StoreError};

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Analysis(#[from] AnalysisError),
}

/// Records labelled by player name. A name shared by several players gets the player
/// id appended, as in `Alice #5`.
pub fn labelled(rows: Vec<StatRow>) -> Vec<RoundRecord> {
    let mut owners = BTreeMap::<String, BTreeSet<PlayerId>>::new();
    for row in rows.iter() {
        owners
            .entry(row.record.player.clone())
            .or_default()
            .insert(row.player_id);
    }

    rows.into_iter()
        .map(|mut row| {
            if owners.get(&row.record.player).map_or(false, |ids| ids.len() > 1) {
                row.record.player = format!("{} #{}", row.record.player, row.player_id.0);
            }
            row.record
        })
        .collect()
}

async fn season<S>(
    store: &mut S,
    league: &str,
    season_number: i32,
) -> Result<SeasonScoreboard, ReportError>
where
    S: Store + ?Sized,
{
    let filter = StatsFilter {
        league: Some(league.to_owned()),
        season: Some(season_number),
        ..Default::default()
    };
    let rows = store.query_stats(&filter).await?;

    Ok(SeasonScoreboard::from_records(&labelled(rows))?)
}

#[tracing::instrument(skip(store))]
pub async fn season_scoreboard<S>(
    store: &mut S,
    league: &str,
    season_number: i32,
) -> Result<ScoreboardTable, ReportError>
where
    S: Store + ?Sized,
{
    let board = season(store, league, season_number).await?;

    Ok(scoreboard::present(&board))
}

/// Match scores of one player over a season, in week then match order. `player` is
/// the label shown on the season scoreboard.
#[tracing::instrument(skip(store))]
pub async fn player_season<S>(
    store: &mut S,
    league: &str,
    season_number: i32,
    player: &str,
) -> Result<Vec<MatchScore>, ReportError>
where
    S: Store + ?Sized,
{
    let board = season(store, league, season_number).await?;

    Ok(board.matches(player).map(|(_, m)| m.clone()).collect())
}
