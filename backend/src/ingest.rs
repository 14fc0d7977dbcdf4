//! Turns replay dumps into stored rounds, stats and match scores.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use analysis::aggregate::{self, RoundScore};
use analysis::duration::MatchDuration;
use analysis::endofgame::{self, EndOfGame, EndOfGameError};
use analysis::replay::{DecodeError, ReplayDump};
use analysis::{score, AnalysisError};
use chrono::FixedOffset;

use crate::store::{
    MatchId, NewMatch, NewPlayer, NewPlayerRoundStat, NewRound, PlayerId, RoundId, StatsFilter,
    Store, StoreError,
};

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    Analysis(#[from] AnalysisError),
    #[error("no `Match <m> Round <r>` in file name {0:?}")]
    Identity(PathBuf),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("analysis task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
    #[error("listing replays: {0}")]
    Io(#[from] std::io::Error),
}

impl From<EndOfGameError> for IngestError {
    fn from(value: EndOfGameError) -> Self {
        match value {
            EndOfGameError::Decode(e) => Self::Decode(e),
            EndOfGameError::Analysis(e) => Self::Analysis(e),
        }
    }
}

impl IngestError {
    /// Fatal errors stop a batch, everything else only fails the current replay.
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::Store(e) => e.is_fatal(),
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ReplayIdentity {
    pub league: String,
    pub season: i32,
    pub match_in_season: i32,
    pub round_in_match: i32,
}

/// Where replays of one run go and how their timestamps are localised.
#[derive(Debug, Clone)]
pub struct IngestSettings {
    pub league: String,
    pub season: i32,
    pub utc_offset: FixedOffset,
}

impl IngestSettings {
    pub fn identity(&self, match_in_season: i32, round_in_match: i32) -> ReplayIdentity {
        ReplayIdentity {
            league: self.league.clone(),
            season: self.season,
            match_in_season,
            round_in_match,
        }
    }

    /// Identity of a replay whose file name carries its match and round.
    pub fn identify(&self, path: &Path) -> Result<ReplayIdentity, IngestError> {
        path.file_stem()
            .and_then(|stem| stem.to_str())
            .and_then(match_and_round)
            .map(|(m, r)| self.identity(m, r))
            .ok_or_else(|| IngestError::Identity(path.to_owned()))
    }
}

/// Finds `Match <m>` and `Round <r>` in a replay file name, ignoring case.
pub fn match_and_round(name: &str) -> Option<(i32, i32)> {
    let words: Vec<String> = name
        .split(|c: char| c.is_whitespace() || c == '-' || c == '_')
        .filter(|w| !w.is_empty())
        .map(|w| w.to_ascii_lowercase())
        .collect();

    let number_after = |label: &str| {
        words
            .windows(2)
            .find(|pair| pair[0] == label)
            .and_then(|pair| pair[1].parse::<i32>().ok())
    };

    Some((number_after("match")?, number_after("round")?))
}

#[derive(Debug, Clone, PartialEq)]
pub struct IngestedReplay {
    pub path: PathBuf,
    pub identity: ReplayIdentity,
    pub match_id: MatchId,
    pub round_id: RoundId,
    pub map: String,
    pub duration: MatchDuration,
    pub players: usize,
}

fn analyse(path: &Path) -> Result<EndOfGame, IngestError> {
    let replay = ReplayDump::open(path)?.decode()?;
    Ok(endofgame::parse(&replay)?)
}

/// Decodes and analyses one replay, stores its round and refreshes the match scores
/// of everyone who played in that match.
///
/// All writes of one replay happen in a single store transaction, a replay that fails
/// leaves nothing behind.
#[tracing::instrument(skip_all, fields(
    path = %path.display(),
    match_in_season = identity.match_in_season,
    round_in_match = identity.round_in_match
))]
pub async fn ingest_replay<S>(
    store: &mut S,
    path: &Path,
    identity: &ReplayIdentity,
    settings: &IngestSettings,
) -> Result<IngestedReplay, IngestError>
where
    S: Store + ?Sized,
{
    let owned = path.to_owned();
    let game = tokio::task::spawn_blocking(move || analyse(&owned)).await??;

    store.begin().await?;
    let (match_id, round_id) = match persist(store, identity, settings, &game).await {
        Ok(ids) => {
            store.commit().await?;
            ids
        }
        Err(e) => {
            store.rollback().await?;
            return Err(e);
        }
    };

    Ok(IngestedReplay {
        path: path.to_owned(),
        identity: identity.clone(),
        match_id,
        round_id,
        map: game.map,
        duration: game.duration,
        players: game.players.len(),
    })
}

async fn persist<S>(
    store: &mut S,
    identity: &ReplayIdentity,
    settings: &IngestSettings,
    game: &EndOfGame,
) -> Result<(MatchId, RoundId), IngestError>
where
    S: Store + ?Sized,
{
    let local = game.played_at.with_timezone(&settings.utc_offset);

    let league = store.get_or_create_league(&identity.league).await?;
    let season = store.get_or_create_season(league, identity.season).await?;
    let match_id = store
        .get_or_create_match(&NewMatch {
            season,
            match_in_season: identity.match_in_season,
            date: local.date_naive(),
        })
        .await?;
    let round_id = store
        .get_or_create_round(&NewRound {
            match_id,
            round_in_match: identity.round_in_match,
            map_name: game.map.clone(),
            time: local.time(),
            duration_seconds: game.duration.seconds,
        })
        .await?;

    for player in game.players.iter() {
        let player_id = store
            .get_or_create_player(&NewPlayer {
                name: player.identity.name.clone(),
                account_id: player.identity.account_id,
            })
            .await?;
        store
            .get_or_create_player_round_stat(&NewPlayerRoundStat {
                round: round_id,
                player: player_id,
                won: player.won,
                stats: player.stats,
            })
            .await?;
    }

    let scored = rescore_match(store, identity, match_id).await?;
    tracing::info!(
        map = %game.map,
        seconds = game.duration.seconds,
        players = game.players.len(),
        scored,
        "Ingested replay"
    );

    Ok((match_id, round_id))
}

/// Recomputes the top round average of every player in a match. Returns the number of
/// scores written.
pub async fn rescore_match<S>(
    store: &mut S,
    identity: &ReplayIdentity,
    match_id: MatchId,
) -> Result<usize, IngestError>
where
    S: Store + ?Sized,
{
    let rows = store
        .query_stats(&StatsFilter {
            league: Some(identity.league.clone()),
            season: Some(identity.season),
            match_in_season: Some(identity.match_in_season),
            ..Default::default()
        })
        .await?;

    let mut rounds = BTreeMap::<PlayerId, Vec<RoundScore>>::new();
    for row in rows {
        match score::calculate(&row.record.round_stat()) {
            Ok(breakdown) => rounds.entry(row.player_id).or_default().push(RoundScore {
                round_in_match: row.record.round_in_match,
                breakdown,
            }),
            Err(e) => tracing::warn!(
                player = %row.record.player,
                round_in_match = row.record.round_in_match,
                "Excluding round from scoring: {}",
                e
            ),
        }
    }

    let mut scored = 0;
    for (player, rounds) in rounds {
        if let Some(breakdown) = aggregate::match_score(&rounds) {
            store.put_player_score(match_id, player, &breakdown).await?;
            scored += 1;
        }
    }

    Ok(scored)
}

/// Ingests a file, taking match and round from its name.
pub async fn ingest_file<S>(
    store: &mut S,
    path: &Path,
    settings: &IngestSettings,
) -> Result<IngestedReplay, IngestError>
where
    S: Store + ?Sized,
{
    let identity = settings.identify(path)?;
    ingest_replay(store, path, &identity, settings).await
}

#[derive(Debug, Default)]
pub struct BatchReport {
    pub ingested: Vec<IngestedReplay>,
    pub failed: Vec<(PathBuf, IngestError)>,
}

/// Ingests `paths` one after another. A replay that fails is recorded and skipped,
/// a fatal store error ends the batch.
///
/// With `fixed` set every file is stored as that `(match, round)` instead of the one in
/// its name.
#[tracing::instrument(skip_all, fields(files = paths.len(), league = %settings.league, season = settings.season))]
pub async fn ingest_batch<S>(
    store: &mut S,
    paths: &[PathBuf],
    settings: &IngestSettings,
    fixed: Option<(i32, i32)>,
) -> Result<BatchReport, IngestError>
where
    S: Store + ?Sized,
{
    let mut report = BatchReport::default();

    for path in paths {
        let result = match fixed {
            Some((m, r)) => ingest_replay(store, path, &settings.identity(m, r), settings).await,
            None => ingest_file(store, path, settings).await,
        };

        match result {
            Ok(ingested) => report.ingested.push(ingested),
            Err(e) if e.is_fatal() => {
                tracing::error!(path = %path.display(), "Aborting batch: {}", e);
                return Err(e);
            }
            Err(e) => {
                tracing::error!(path = %path.display(), "Failed to ingest replay: {}", e);
                report.failed.push((path.clone(), e));
            }
        }
    }

    tracing::info!(
        ingested = report.ingested.len(),
        failed = report.failed.len(),
        "Batch complete"
    );
    Ok(report)
}
