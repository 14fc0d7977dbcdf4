//! Fantasy score of a single player in a single round.
//!
//! ```text
//! score = 3 kills - deaths + 1.5 assists + 0.0075 xp/min
//!       + 0.0001 healing + 0.0001 damage soaked
//!       + 2 won + 5 won[<10 min] + 2 won[10..15 min]
//! ```

use crate::metrics::RawPlayerStats;
use crate::AnalysisError;

pub mod weights {
    pub const KILL: f64 = 3.0;
    pub const DEATH: f64 = -1.0;
    pub const ASSIST: f64 = 1.5;
    pub const EXPERIENCE_PER_MINUTE: f64 = 0.0075;
    pub const HEALING: f64 = 0.0001;
    pub const DAMAGE_SOAKED: f64 = 0.0001;
    pub const WIN: f64 = 2.0;
    pub const WIN_UNDER_10_MINS: f64 = 5.0;
    pub const WIN_UNDER_15_MINS: f64 = 2.0;
}

#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PlayerRoundStat {
    pub stats: RawPlayerStats,
    pub won: bool,
    pub duration_minutes: f64,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ScoreBreakdown {
    pub kills: f64,
    pub deaths: f64,
    pub assists: f64,
    pub experience_per_minute: f64,
    pub healing: f64,
    pub damage_soaked: f64,
    pub win: f64,
    pub win_under_10_mins: f64,
    pub win_under_15_mins: f64,
    pub total: f64,
}

impl ScoreBreakdown {
    pub fn components(&self) -> [f64; 9] {
        [
            self.kills,
            self.deaths,
            self.assists,
            self.experience_per_minute,
            self.healing,
            self.damage_soaked,
            self.win,
            self.win_under_10_mins,
            self.win_under_15_mins,
        ]
    }

    fn from_components(c: [f64; 9]) -> Self {
        Self {
            kills: c[0],
            deaths: c[1],
            assists: c[2],
            experience_per_minute: c[3],
            healing: c[4],
            damage_soaked: c[5],
            win: c[6],
            win_under_10_mins: c[7],
            win_under_15_mins: c[8],
            total: c.iter().sum(),
        }
    }

    /// Component-wise mean. The total is recomputed from the averaged components.
    pub fn mean<'b, I>(breakdowns: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'b ScoreBreakdown>,
    {
        let mut sums = [0.0; 9];
        let mut count = 0usize;
        for breakdown in breakdowns {
            for (sum, value) in sums.iter_mut().zip(breakdown.components()) {
                *sum += value;
            }
            count += 1;
        }

        if count == 0 {
            return None;
        }

        Some(Self::from_components(sums.map(|s| s / count as f64)))
    }
}

pub fn calculate(stat: &PlayerRoundStat) -> Result<ScoreBreakdown, AnalysisError> {
    let minutes = stat.duration_minutes;
    if !(minutes.is_finite() && minutes > 0.0) {
        return Err(AnalysisError::DivisionUndefined);
    }

    let s = &stat.stats;
    let won = if stat.won { 1.0 } else { 0.0 };
    let under_10 = if minutes < 10.0 { 1.0 } else { 0.0 };
    let under_15 = if (10.0..15.0).contains(&minutes) { 1.0 } else { 0.0 };

    Ok(ScoreBreakdown::from_components([
        weights::KILL * s.kills as f64,
        weights::DEATH * s.deaths as f64,
        weights::ASSIST * s.assists as f64,
        weights::EXPERIENCE_PER_MINUTE * (s.experience_contribution as f64 / minutes),
        weights::HEALING * s.healing as f64,
        weights::DAMAGE_SOAKED * s.damage_soaked as f64,
        weights::WIN * won,
        weights::WIN_UNDER_10_MINS * won * under_10,
        weights::WIN_UNDER_15_MINS * won * under_15,
    ]))
}
