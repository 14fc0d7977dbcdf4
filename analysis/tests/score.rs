use analysis::metrics::RawPlayerStats;
use analysis::score::{self, PlayerRoundStat, ScoreBreakdown};
use analysis::AnalysisError;
use pretty_assertions::assert_eq;

fn round(won: bool, duration_minutes: f64) -> PlayerRoundStat {
    PlayerRoundStat {
        stats: RawPlayerStats {
            kills: 10,
            deaths: 2,
            assists: 5,
            experience_contribution: 3000,
            healing: 0,
            damage_soaked: 0,
        },
        won,
        duration_minutes,
    }
}

#[test]
fn fast_win() {
    let result = score::calculate(&round(true, 8.0)).unwrap();

    assert_eq!(
        result,
        ScoreBreakdown {
            kills: 30.0,
            deaths: -2.0,
            assists: 7.5,
            experience_per_minute: 2.8125,
            healing: 0.0,
            damage_soaked: 0.0,
            win: 2.0,
            win_under_10_mins: 5.0,
            win_under_15_mins: 0.0,
            total: 45.3125,
        }
    );
}

#[test]
fn speed_bonus_needs_a_win() {
    let result = score::calculate(&round(false, 8.0)).unwrap();

    assert_eq!(result.win, 0.0);
    assert_eq!(result.win_under_10_mins, 0.0);
    assert_eq!(result.win_under_15_mins, 0.0);
    assert_eq!(result.total, 30.0 - 2.0 + 7.5 + 2.8125);
}

#[test]
fn bonus_tiers() {
    let ten = score::calculate(&round(true, 10.0)).unwrap();
    assert_eq!((ten.win_under_10_mins, ten.win_under_15_mins), (0.0, 2.0));

    let almost_fifteen = score::calculate(&round(true, 14.9)).unwrap();
    assert_eq!(
        (almost_fifteen.win_under_10_mins, almost_fifteen.win_under_15_mins),
        (0.0, 2.0)
    );

    let fifteen = score::calculate(&round(true, 15.0)).unwrap();
    assert_eq!((fifteen.win_under_10_mins, fifteen.win_under_15_mins), (0.0, 0.0));
}

#[test]
fn healing_and_damage_soaked() {
    let mut stat = round(false, 20.0);
    stat.stats.healing = 50_000;
    stat.stats.damage_soaked = 30_000;

    let result = score::calculate(&stat).unwrap();

    assert!((result.healing - 5.0).abs() < 1e-9);
    assert!((result.damage_soaked - 3.0).abs() < 1e-9);
}

#[test]
fn zero_duration() {
    assert_eq!(
        score::calculate(&round(true, 0.0)),
        Err(AnalysisError::DivisionUndefined)
    );
}

#[test]
fn deterministic() {
    let stat = PlayerRoundStat {
        stats: RawPlayerStats {
            kills: 7,
            deaths: 3,
            assists: 11,
            experience_contribution: 12345,
            healing: 6789,
            damage_soaked: 43210,
        },
        won: true,
        duration_minutes: 13.7,
    };

    let first = score::calculate(&stat).unwrap();
    let second = score::calculate(&stat).unwrap();

    assert_eq!(first.total.to_bits(), second.total.to_bits());
    assert_eq!(first, second);
    assert_eq!(first.total, first.components().iter().sum::<f64>());
}

#[test]
fn mean_of_breakdowns() {
    let a = score::calculate(&round(true, 8.0)).unwrap();
    let b = score::calculate(&round(false, 8.0)).unwrap();

    let mean = ScoreBreakdown::mean([&a, &b]).unwrap();

    assert_eq!(mean.kills, 30.0);
    assert_eq!(mean.win, 1.0);
    assert_eq!(mean.win_under_10_mins, 2.5);
    assert_eq!(mean.total, (a.total + b.total) / 2.0);
    assert_eq!(ScoreBreakdown::mean(std::iter::empty()), None);
}
