use analysis::duration::{self, elapsed_seconds, EndStrategy};
use analysis::events::{Event, EventTable};
use analysis::AnalysisError;
use pretty_assertions::assert_eq;

#[test]
fn elapsed_is_truncated_division() {
    for (start, end) in [(0, 0), (0, 15), (0, 16), (100, 260), (7, 1_000_007)] {
        assert_eq!(elapsed_seconds(start, end), (end - start) / 16);
    }
}

#[test]
fn elapsed_handles_wraparound() {
    assert_eq!(elapsed_seconds(u32::MAX - 7, 8), elapsed_seconds(0, 16));
    assert_eq!(elapsed_seconds(u32::MAX - 7, 8), 1);
}

#[test]
fn objective_death_ends_match() {
    let table = EventTable::new(vec![
        Event::unit_born(0, 1, "KingsCore"),
        Event::unit_born(0, 2, "KingsCore"),
        Event::stat(100, "GatesOpen"),
        Event::unit_died(16_100, 2),
        // cleanup deaths after the core fell
        Event::unit_died(16_200, 3),
    ]);

    let result = duration::resolve(&table).unwrap();

    assert_eq!(result.start_tick, 100);
    assert_eq!(result.end_tick, 16_100);
    assert_eq!(result.strategy, EndStrategy::ObjectiveDestroyed);
    assert_eq!(result.seconds, 1000);
}

#[test]
fn falls_back_to_last_death() {
    let table = EventTable::new(vec![
        Event::stat(100, "GatesOpen"),
        Event::unit_died(1_000, 3),
        Event::unit_died(1_060, 4),
    ]);

    let result = duration::resolve(&table).unwrap();

    assert_eq!(result.end_tick, 1_060);
    assert_eq!(result.strategy, EndStrategy::LastUnitDeath);
    assert_eq!(result.seconds, 60);
}

#[test]
fn type_change_and_birth_count_as_one_death() {
    let mut changed = Event::unit_born(50, 7, "VanndarStormpike");
    changed.name = analysis::events::names::UNIT_TYPE_CHANGE.to_owned();

    let table = EventTable::new(vec![
        Event::unit_born(0, 7, "VanndarStormpike"),
        changed,
        Event::stat(100, "GatesOpen"),
        Event::unit_died(900, 7),
    ]);

    let result = duration::resolve(&table).unwrap();

    assert_eq!(result.end_tick, 900);
    assert_eq!(result.strategy, EndStrategy::ObjectiveDestroyed);
}

#[test]
fn two_objective_deaths() {
    let table = EventTable::new(vec![
        Event::unit_born(0, 1, "KingsCore"),
        Event::unit_born(0, 2, "KingsCore"),
        Event::stat(100, "GatesOpen"),
        Event::unit_died(500, 1),
        Event::unit_died(600, 2),
    ]);

    let result = duration::resolve(&table);

    assert_eq!(
        result,
        Err(AnalysisError::AmbiguousObjectiveDeath { count: 2 })
    );
}

#[test]
fn missing_gates_open() {
    let table = EventTable::new(vec![Event::unit_died(500, 1)]);

    assert_eq!(
        duration::resolve(&table),
        Err(AnalysisError::MissingSignal("GatesOpen"))
    );
}

#[test]
fn missing_deaths() {
    let table = EventTable::new(vec![Event::stat(100, "GatesOpen")]);

    assert_eq!(
        duration::resolve(&table),
        Err(AnalysisError::MissingSignal("unit death"))
    );
}

#[test]
fn same_tick_is_zero_seconds() {
    let table = EventTable::new(vec![
        Event::stat(100, "GatesOpen"),
        Event::unit_died(100, 1),
    ]);

    let result = duration::resolve(&table).unwrap();

    assert_eq!(result.seconds, 0);
    assert_eq!(result.minutes(), 0.0);
}
