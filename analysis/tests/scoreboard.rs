use analysis::aggregate::{RoundRecord, SeasonScoreboard};
use analysis::metrics::RawPlayerStats;
use analysis::scoreboard::{self, ScoreboardRow, ScoreboardTable};
use chrono::NaiveDate;
use pretty_assertions::assert_eq;

fn record(player: &str, match_in_season: i32, day: u32, round: i32, kills: i64, won: bool) -> RoundRecord {
    RoundRecord {
        player: player.to_owned(),
        match_in_season,
        match_date: NaiveDate::from_ymd_opt(2024, 3, day).unwrap(),
        round_in_match: round,
        duration_seconds: 20 * 60,
        won,
        stats: RawPlayerStats {
            kills,
            ..Default::default()
        },
    }
}

fn season() -> SeasonScoreboard {
    let records = vec![
        record("Alice", 1, 4, 1, 4, false),
        record("Alice", 1, 4, 2, 2, false),
        record("Alice", 2, 13, 1, 5, true),
        record("Bob", 1, 5, 1, 1, false),
        record("Carol", 4, 25, 1, 4, true),
    ];

    SeasonScoreboard::from_records(&records).unwrap()
}

#[test]
fn weeks_relative_to_first() {
    let table = scoreboard::present(&season());

    assert_eq!(
        table,
        ScoreboardTable {
            weeks: vec!["Week 1".to_owned(), "Week 2".to_owned(), "Week 4".to_owned()],
            rows: vec![
                ScoreboardRow {
                    player: "Carol".to_owned(),
                    scores: vec![None, None, Some(14.0)],
                    average: Some(14.0),
                },
                ScoreboardRow {
                    player: "Alice".to_owned(),
                    scores: vec![Some(9.0), Some(17.0), None],
                    average: Some(13.0),
                },
                ScoreboardRow {
                    player: "Bob".to_owned(),
                    scores: vec![Some(3.0), None, None],
                    average: Some(3.0),
                },
            ],
        }
    );
}

#[test]
fn equal_averages_by_name() {
    let records = vec![record("Zed", 1, 4, 1, 2, false), record("Amy", 1, 4, 1, 2, false)];
    let board = SeasonScoreboard::from_records(&records).unwrap();

    let table = scoreboard::present(&board);

    let names: Vec<_> = table.rows.iter().map(|r| r.player.as_str()).collect();
    assert_eq!(names, vec!["Amy", "Zed"]);
}

#[test]
fn empty_season() {
    let table = scoreboard::present(&SeasonScoreboard::default());

    assert_eq!(
        table,
        ScoreboardTable {
            weeks: Vec::new(),
            rows: Vec::new(),
        }
    );
    assert_eq!(table.to_string(), "Player  Avg. Score\n");
}

#[test]
fn render_text() {
    let table = scoreboard::present(&season());

    let expected = "\
Player  Week 1  Week 2  Week 4  Avg. Score
Carol                    14.00       14.00
Alice     9.00   17.00               13.00
Bob       3.00                        3.00
";
    assert_eq!(table.to_string(), expected);
}

#[test]
fn serializes_missing_cells_as_null() {
    let table = scoreboard::present(&season());

    let value = serde_json::to_value(&table).unwrap();

    assert_eq!(value["weeks"][2], "Week 4");
    assert_eq!(value["rows"][0]["player"], "Carol");
    assert!(value["rows"][0]["scores"][0].is_null());
    assert_eq!(value["rows"][0]["scores"][2], 14.0);
}
