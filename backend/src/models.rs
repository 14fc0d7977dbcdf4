use diesel::prelude::*;

#[derive(Queryable, Selectable, Debug)]
#[diesel(table_name = crate::schema::leagues)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct League {
    pub id: i32,
    pub name: String,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::leagues)]
pub struct NewLeague<'a> {
    pub name: &'a str,
}

#[derive(Queryable, Selectable, Debug)]
#[diesel(table_name = crate::schema::seasons)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Season {
    pub id: i32,
    pub league_id: i32,
    pub number: i32,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::seasons)]
pub struct NewSeason {
    pub league_id: i32,
    pub number: i32,
}

#[derive(Queryable, Selectable, Debug)]
#[diesel(table_name = crate::schema::matches)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Match {
    pub id: i32,
    pub season_id: i32,
    pub match_in_season: i32,
    pub date: chrono::NaiveDate,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::matches)]
pub struct NewMatch {
    pub season_id: i32,
    pub match_in_season: i32,
    pub date: chrono::NaiveDate,
}

#[derive(Queryable, Selectable, Debug)]
#[diesel(table_name = crate::schema::rounds)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Round {
    pub id: i32,
    pub match_id: i32,
    pub round_in_match: i32,
    pub map_name: String,
    pub time: chrono::NaiveTime,
    pub duration_seconds: i32,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::rounds)]
pub struct NewRound<'a> {
    pub match_id: i32,
    pub round_in_match: i32,
    pub map_name: &'a str,
    pub time: chrono::NaiveTime,
    pub duration_seconds: i32,
}

#[derive(Queryable, Selectable, Debug)]
#[diesel(table_name = crate::schema::players)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Player {
    pub id: i32,
    pub name: String,
    pub account_id: Option<i64>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::players)]
pub struct NewPlayer<'a> {
    pub name: &'a str,
    pub account_id: Option<i64>,
}

#[derive(Queryable, Selectable, Debug)]
#[diesel(table_name = crate::schema::player_round_stats)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct PlayerRoundStat {
    pub id: i32,
    pub round_id: i32,
    pub player_id: i32,
    pub won: bool,
    pub kills: i64,
    pub deaths: i64,
    pub assists: i64,
    pub experience_contribution: i64,
    pub healing: i64,
    pub damage_soaked: i64,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::player_round_stats)]
pub struct NewPlayerRoundStat {
    pub round_id: i32,
    pub player_id: i32,
    pub won: bool,
    pub kills: i64,
    pub deaths: i64,
    pub assists: i64,
    pub experience_contribution: i64,
    pub healing: i64,
    pub damage_soaked: i64,
}

#[derive(Insertable, AsChangeset, Debug)]
#[diesel(table_name = crate::schema::player_scores)]
pub struct PlayerScore {
    pub match_id: i32,
    pub player_id: i32,
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

/// One row of the stat query, joined over player and round to match.
#[derive(Queryable, Debug)]
pub struct StatRow {
    pub match_id: i32,
    pub player_id: i32,
    pub player: String,
    pub match_in_season: i32,
    pub date: chrono::NaiveDate,
    pub round_in_match: i32,
    pub duration_seconds: i32,
    pub won: bool,
    pub kills: i64,
    pub deaths: i64,
    pub assists: i64,
    pub experience_contribution: i64,
    pub healing: i64,
    pub damage_soaked: i64,
}
