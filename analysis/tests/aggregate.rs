use analysis::aggregate::{match_score, RoundRecord, RoundScore, SeasonScoreboard, Week};
use analysis::metrics::RawPlayerStats;
use analysis::score::ScoreBreakdown;
use analysis::AnalysisError;
use chrono::NaiveDate;
use pretty_assertions::assert_eq;
use tracing_test::traced_test;

fn scored(round_in_match: i32, kills: f64, deaths: f64) -> RoundScore {
    RoundScore {
        round_in_match,
        breakdown: ScoreBreakdown {
            kills,
            deaths,
            total: kills + deaths,
            ..Default::default()
        },
    }
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Scores `3 * kills + 2 * won`, the round is long enough for no speed bonus.
fn record(player: &str, match_in_season: i32, day: NaiveDate, round: i32, kills: i64, won: bool) -> RoundRecord {
    RoundRecord {
        player: player.to_owned(),
        match_in_season,
        match_date: day,
        round_in_match: round,
        duration_seconds: 20 * 60,
        won,
        stats: RawPlayerStats {
            kills,
            ..Default::default()
        },
    }
}

#[test]
fn best_three_of_four() {
    let rounds = [
        scored(1, 10.0, 0.0),
        scored(2, 40.0, 0.0),
        scored(3, 20.0, 0.0),
        scored(4, 30.0, 0.0),
    ];

    let result = match_score(&rounds).unwrap();

    assert_eq!(result.total, 30.0);
    assert_eq!(result.kills, 30.0);
}

#[test]
fn fewer_than_three_rounds_are_not_padded() {
    let rounds = [scored(1, 10.0, 0.0), scored(2, 20.0, 0.0)];

    let result = match_score(&rounds).unwrap();

    assert_eq!(result.total, 15.0);
}

#[test]
fn no_rounds() {
    assert_eq!(match_score(&[]), None);
}

#[test]
fn ties_prefer_earlier_rounds() {
    // every round totals 10, the deaths component tells them apart
    let rounds = [
        scored(4, 6.0, 4.0),
        scored(2, 8.0, 2.0),
        scored(1, 9.0, 1.0),
        scored(3, 7.0, 3.0),
    ];

    let result = match_score(&rounds).unwrap();

    assert_eq!(result.total, 10.0);
    assert_eq!(result.deaths, 2.0);
    assert_eq!(result.kills, 8.0);
}

#[test]
fn iso_weeks() {
    assert_eq!(Week::of(date(2024, 3, 4)), Week { year: 2024, week: 10 });
    assert_eq!(Week::of(date(2024, 3, 10)), Week { year: 2024, week: 10 });
    assert_eq!(Week::of(date(2024, 12, 30)), Week { year: 2025, week: 1 });

    let last_of_2024 = Week { year: 2024, week: 52 };
    assert_eq!(Week { year: 2025, week: 1 }.weeks_since(&last_of_2024), Some(1));
    assert_eq!(last_of_2024.monday(), Some(date(2024, 12, 23)));
}

#[test]
#[traced_test]
fn season_by_week() {
    let mut zero = record("Bob", 2, date(2024, 3, 13), 1, 9, true);
    zero.duration_seconds = 0;

    let records = vec![
        record("Alice", 1, date(2024, 3, 4), 1, 4, false),
        record("Alice", 1, date(2024, 3, 4), 2, 2, false),
        record("Alice", 2, date(2024, 3, 13), 1, 5, true),
        record("Bob", 1, date(2024, 3, 4), 1, 1, false),
        zero,
        record("Bob", 2, date(2024, 3, 13), 2, 3, true),
    ];

    let board = SeasonScoreboard::from_records(&records).unwrap();

    assert_eq!(board.players().collect::<Vec<_>>(), vec!["Alice", "Bob"]);
    assert_eq!(
        board.weeks().into_iter().collect::<Vec<_>>(),
        vec![Week { year: 2024, week: 10 }, Week { year: 2024, week: 11 }]
    );

    let alice = board.weekly_totals("Alice");
    assert_eq!(
        alice.into_iter().collect::<Vec<_>>(),
        vec![
            (Week { year: 2024, week: 10 }, 9.0),
            (Week { year: 2024, week: 11 }, 17.0)
        ]
    );
    assert_eq!(board.average("Alice"), Some(13.0));

    // the zero minute round is left out, only round 2 counts
    let bob_second: Vec<_> = board
        .matches("Bob")
        .filter(|(_, m)| m.match_in_season == 2)
        .map(|(_, m)| (m.rounds_played, m.breakdown.total))
        .collect();
    assert_eq!(bob_second, vec![(1, 11.0)]);
    assert_eq!(board.average("Bob"), Some(7.0));
    assert!(logs_contain("Excluding round from scoring"));

    assert_eq!(board.average("Nobody"), None);
}

#[test]
fn matches_in_the_same_week_are_kept_apart() {
    let records = vec![
        record("Alice", 2, date(2024, 3, 13), 1, 5, true),
        record("Alice", 3, date(2024, 3, 14), 1, 1, false),
    ];

    let board = SeasonScoreboard::from_records(&records).unwrap();

    let matches: Vec<_> = board
        .matches("Alice")
        .map(|(week, m)| (week.week, m.match_in_season, m.breakdown.total))
        .collect();
    assert_eq!(matches, vec![(11, 2, 17.0), (11, 3, 3.0)]);
    assert_eq!(
        board.weekly_totals("Alice").into_values().collect::<Vec<_>>(),
        vec![10.0]
    );
}

#[test]
fn duplicate_round() {
    let records = vec![
        record("Alice", 1, date(2024, 3, 4), 1, 4, false),
        record("Alice", 1, date(2024, 3, 4), 1, 5, false),
    ];

    let result = SeasonScoreboard::from_records(&records);

    assert_eq!(
        result,
        Err(AnalysisError::AmbiguousEntry {
            player: "Alice".to_owned(),
            match_in_season: 1,
            round_in_match: 1,
        })
    );
}
