use analysis::duration::{EndStrategy, MatchDuration};
use analysis::endofgame::{self, EndOfGameError};
use analysis::metrics::{PlayerIdentity, PlayerMetrics, RawPlayerStats};
use analysis::replay::{DecodedReplay, ReplayDump};
use analysis::AnalysisError;
use pretty_assertions::assert_eq;

fn load(name: &str) -> DecodedReplay {
    let path = format!("{}/../testfiles/{}", env!("CARGO_MANIFEST_DIR"), name);
    ReplayDump::open(path).unwrap().decode().unwrap()
}

fn player(
    name: &str,
    account_id: i64,
    hero: &str,
    team_id: u8,
    slot_id: usize,
    won: bool,
    stats: [i64; 6],
) -> PlayerMetrics {
    PlayerMetrics {
        identity: PlayerIdentity {
            name: name.to_owned(),
            account_id: Some(account_id),
        },
        hero: hero.to_owned(),
        team_id,
        slot_id,
        won,
        stats: RawPlayerStats {
            kills: stats[0],
            deaths: stats[1],
            assists: stats[2],
            experience_contribution: stats[3],
            healing: stats[4],
            damage_soaked: stats[5],
        },
    }
}

#[test]
fn cursed_hollow() {
    let replay = load("cursed_hollow.json");

    let result = endofgame::parse(&replay).unwrap();

    let expected = endofgame::EndOfGame {
        map: "Cursed Hollow".to_owned(),
        played_at: chrono::DateTime::from_timestamp(1_709_583_332, 0).unwrap(),
        base_build: 89754,
        duration: MatchDuration {
            start_tick: 610,
            end_tick: 12138,
            strategy: EndStrategy::ObjectiveDestroyed,
            seconds: 720,
        },
        players: vec![
            player("Alice", 1001, "Raynor", 0, 0, true, [10, 2, 5, 9000, 0, 20000]),
            player("Bob", 1002, "Uther", 0, 1, true, [3, 4, 12, 8000, 45000, 15000]),
            player("Carol", 1003, "Zeratul", 1, 2, false, [6, 5, 4, 7000, 0, 30000]),
            player("Dave", 1004, "Muradin", 1, 3, false, [2, 7, 6, 6500, 12000, 52000]),
        ],
    };

    assert_eq!(result, expected);
}

#[test]
fn braxis_without_core_wraps_game_loop() {
    let replay = load("braxis_wrapped.json");

    let result = endofgame::parse(&replay).unwrap();

    assert_eq!(result.map, "Braxis Outpost");
    assert_eq!(
        result.duration,
        MatchDuration {
            start_tick: u32::MAX - 95,
            end_tick: 9504,
            strategy: EndStrategy::LastUnitDeath,
            seconds: 600,
        }
    );
    assert_eq!(
        result
            .players
            .iter()
            .map(|p| (p.identity.name.as_str(), p.won))
            .collect::<Vec<_>>(),
        vec![("Alice", false), ("Erin", true)]
    );
}

#[test]
fn two_destroyed_cores() {
    let replay = load("two_cores.json");

    let result = endofgame::parse(&replay);

    assert!(matches!(
        result,
        Err(EndOfGameError::Analysis(
            AnalysisError::AmbiguousObjectiveDeath { count: 2 }
        ))
    ));
}

#[test]
fn unknown_result_code() {
    let replay = load("bad_result.json");

    let result = endofgame::parse(&replay);

    assert!(matches!(
        result,
        Err(EndOfGameError::Analysis(AnalysisError::MalformedResult(0)))
    ));
}
