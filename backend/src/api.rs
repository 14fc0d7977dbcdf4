use std::sync::Arc;

use analysis::aggregate::MatchScore;
use analysis::scoreboard::ScoreboardTable;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use tokio::sync::Mutex;

use crate::store::Store;

type SharedStore<S> = Arc<Mutex<S>>;

/// Read only reporting routes, meant to be nested under `/api`.
pub fn router<S>(store: S) -> axum::Router
where
    S: Store + 'static,
{
    axum::Router::new()
        .route(
            "/leagues/:league/seasons/:season/scoreboard",
            axum::routing::get(scoreboard::<S>),
        )
        .route(
            "/leagues/:league/seasons/:season/players/:player",
            axum::routing::get(player::<S>),
        )
        .with_state(Arc::new(Mutex::new(store)))
}

#[tracing::instrument(skip(store))]
async fn scoreboard<S>(
    State(store): State<SharedStore<S>>,
    Path((league, season)): Path<(String, i32)>,
) -> Result<axum::Json<ScoreboardTable>, StatusCode>
where
    S: Store + 'static,
{
    let mut store = store.lock().await;

    let table = crate::report::season_scoreboard(&mut *store, &league, season)
        .await
        .map_err(|e| {
            tracing::error!("Building scoreboard: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    Ok(axum::Json(table))
}

#[tracing::instrument(skip(store))]
async fn player<S>(
    State(store): State<SharedStore<S>>,
    Path((league, season, player)): Path<(String, i32, String)>,
) -> Result<axum::Json<Vec<MatchScore>>, StatusCode>
where
    S: Store + 'static,
{
    let mut store = store.lock().await;

    let matches = crate::report::player_season(&mut *store, &league, season, &player)
        .await
        .map_err(|e| {
            tracing::error!("Loading player scores: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    if matches.is_empty() {
        return Err(StatusCode::NOT_FOUND);
    }

    Ok(axum::Json(matches))
}
