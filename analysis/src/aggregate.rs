//! Round scores to match scores, match scores to a season scoreboard.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{Datelike, NaiveDate, Weekday};

use crate::metrics::RawPlayerStats;
use crate::score::{self, PlayerRoundStat, ScoreBreakdown};
use crate::AnalysisError;

/// Number of best rounds that count towards a match score.
pub const TOP_ROUNDS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RoundScore {
    pub round_in_match: i32,
    pub breakdown: ScoreBreakdown,
}

/// Averages the [`TOP_ROUNDS`] highest scoring rounds of one player in one match.
///
/// Rounds with equal totals keep ascending `round_in_match` order.
pub fn match_score(rounds: &[RoundScore]) -> Option<ScoreBreakdown> {
    let mut ranked = rounds.to_vec();
    ranked.sort_by_key(|r| r.round_in_match);
    ranked.sort_by(|a, b| b.breakdown.total.total_cmp(&a.breakdown.total));
    ranked.truncate(TOP_ROUNDS);

    ScoreBreakdown::mean(ranked.iter().map(|r| &r.breakdown))
}

/// One persisted stat row, flattened with the identity of its round.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RoundRecord {
    pub player: String,
    pub match_in_season: i32,
    pub match_date: NaiveDate,
    pub round_in_match: i32,
    pub duration_seconds: u32,
    pub won: bool,
    pub stats: RawPlayerStats,
}

impl RoundRecord {
    pub fn round_stat(&self) -> PlayerRoundStat {
        PlayerRoundStat {
            stats: self.stats,
            won: self.won,
            duration_minutes: f64::from(self.duration_seconds) / 60.0,
        }
    }
}

/// ISO-8601 calendar week.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct Week {
    pub year: i32,
    pub week: u32,
}

impl Week {
    pub fn of(date: NaiveDate) -> Self {
        let iso = date.iso_week();
        Self {
            year: iso.year(),
            week: iso.week(),
        }
    }

    pub fn monday(&self) -> Option<NaiveDate> {
        NaiveDate::from_isoywd_opt(self.year, self.week, Weekday::Mon)
    }

    /// Whole weeks from `earlier` to `self`.
    pub fn weeks_since(&self, earlier: &Week) -> Option<i64> {
        Some((self.monday()? - earlier.monday()?).num_weeks())
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct MatchScore {
    pub match_in_season: i32,
    pub date: NaiveDate,
    pub rounds_played: usize,
    pub breakdown: ScoreBreakdown,
}

/// Per player match scores of one season, bucketed by calendar week.
///
/// Matches sharing a week are kept apart under `(week, match_in_season)`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SeasonScoreboard {
    players: BTreeMap<String, BTreeMap<(Week, i32), MatchScore>>,
}

impl SeasonScoreboard {
    /// Scores every record and aggregates them. Rounds that cannot be scored are
    /// logged and left out.
    #[tracing::instrument(skip_all, fields(records = records.len()))]
    pub fn from_records(records: &[RoundRecord]) -> Result<Self, AnalysisError> {
        let mut grouped = BTreeMap::<(&str, i32), (NaiveDate, BTreeMap<i32, RoundScore>)>::new();

        for record in records {
            let breakdown = match score::calculate(&record.round_stat()) {
                Ok(b) => b,
                Err(e) => {
                    tracing::warn!(
                        player = %record.player,
                        match_in_season = record.match_in_season,
                        round_in_match = record.round_in_match,
                        "Excluding round from scoring: {}",
                        e
                    );
                    continue;
                }
            };

            let (_, rounds) = grouped
                .entry((record.player.as_str(), record.match_in_season))
                .or_insert_with(|| (record.match_date, BTreeMap::new()));

            let previous = rounds.insert(
                record.round_in_match,
                RoundScore {
                    round_in_match: record.round_in_match,
                    breakdown,
                },
            );
            if previous.is_some() {
                return Err(AnalysisError::AmbiguousEntry {
                    player: record.player.clone(),
                    match_in_season: record.match_in_season,
                    round_in_match: record.round_in_match,
                });
            }
        }

        let mut players = BTreeMap::<String, BTreeMap<(Week, i32), MatchScore>>::new();
        for ((player, match_in_season), (date, rounds)) in grouped {
            let rounds: Vec<RoundScore> = rounds.into_values().collect();
            let breakdown = match match_score(&rounds) {
                Some(b) => b,
                None => continue,
            };

            players.entry(player.to_owned()).or_default().insert(
                (Week::of(date), match_in_season),
                MatchScore {
                    match_in_season,
                    date,
                    rounds_played: rounds.len(),
                    breakdown,
                },
            );
        }

        Ok(Self { players })
    }

    pub fn players(&self) -> impl Iterator<Item = &str> + '_ {
        self.players.keys().map(|p| p.as_str())
    }

    pub fn matches(&self, player: &str) -> impl Iterator<Item = (&Week, &MatchScore)> + '_ {
        self.players
            .get(player)
            .into_iter()
            .flat_map(|matches| matches.iter().map(|((week, _), score)| (week, score)))
    }

    /// Every week with at least one match, over all players.
    pub fn weeks(&self) -> BTreeSet<Week> {
        self.players
            .values()
            .flat_map(|matches| matches.keys().map(|(week, _)| *week))
            .collect()
    }

    /// Week to score for one player. Several matches in one week collapse to the mean
    /// of their totals.
    pub fn weekly_totals(&self, player: &str) -> BTreeMap<Week, f64> {
        let mut sums = BTreeMap::<Week, (f64, usize)>::new();
        for (week, score) in self.matches(player) {
            let (sum, count) = sums.entry(*week).or_default();
            *sum += score.breakdown.total;
            *count += 1;
        }

        sums.into_iter()
            .map(|(week, (sum, count))| (week, sum / count as f64))
            .collect()
    }

    /// Mean of the weekly totals of one player.
    pub fn average(&self, player: &str) -> Option<f64> {
        let weekly = self.weekly_totals(player);
        if weekly.is_empty() {
            return None;
        }

        Some(weekly.values().sum::<f64>() / weekly.len() as f64)
    }
}
