//! Command line of the `backend` binary.

use std::net::SocketAddr;
use std::path::PathBuf;

use chrono::FixedOffset;

use crate::ingest::IngestSettings;

#[derive(Debug, clap::Parser)]
#[command(name = "backend", about = "Score league replays and serve the season scoreboard")]
pub struct Cli {
    /// PostgreSQL connection URL
    #[arg(long, env = "DATABASE_URL", global = true)]
    pub database_url: Option<String>,

    /// Offset from UTC, in minutes, of the league's local time. Decides match dates.
    #[arg(
        long,
        env = "LEAGUE_UTC_OFFSET_MINUTES",
        default_value_t = 0,
        global = true,
        allow_negative_numbers = true
    )]
    pub utc_offset_minutes: i32,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    pub fn utc_offset(&self) -> Option<FixedOffset> {
        FixedOffset::east_opt(self.utc_offset_minutes.checked_mul(60)?)
    }
}

#[derive(Debug, clap::Subcommand)]
pub enum Command {
    /// Apply pending database migrations
    Migrate,
    /// Ingest replay dumps
    Ingest(IngestArgs),
    /// Ingest replay dumps as they show up in a directory
    Watch(WatchArgs),
    /// Print the scoreboard of a season
    Scoreboard(ScoreboardArgs),
    /// Serve the reporting API
    Serve {
        #[arg(long, default_value = "0.0.0.0:3000")]
        bind: SocketAddr,
    },
}

#[derive(Debug, clap::Args)]
pub struct SeasonArgs {
    #[arg(long)]
    pub league: String,
    #[arg(long)]
    pub season: i32,
}

impl SeasonArgs {
    pub fn settings(&self, utc_offset: FixedOffset) -> IngestSettings {
        IngestSettings {
            league: self.league.clone(),
            season: self.season,
            utc_offset,
        }
    }
}

#[derive(Debug, clap::Args)]
pub struct IngestArgs {
    #[command(flatten)]
    pub season: SeasonArgs,

    /// Match in season, instead of reading it from the file name
    #[arg(long = "match", requires = "round_in_match")]
    pub match_in_season: Option<i32>,

    /// Round in match, instead of reading it from the file name
    #[arg(long = "round", requires = "match_in_season")]
    pub round_in_match: Option<i32>,

    #[arg(required = true)]
    pub files: Vec<PathBuf>,
}

impl IngestArgs {
    pub fn fixed(&self) -> Option<(i32, i32)> {
        self.match_in_season.zip(self.round_in_match)
    }
}

#[derive(Debug, clap::Args)]
pub struct WatchArgs {
    #[command(flatten)]
    pub season: SeasonArgs,

    #[arg(long)]
    pub dir: PathBuf,

    #[arg(long, default_value_t = 10)]
    pub interval_secs: u64,

    /// Only files with this extension are ingested
    #[arg(long, default_value = "json")]
    pub extension: String,
}

#[derive(Debug, clap::Args)]
pub struct ScoreboardArgs {
    #[command(flatten)]
    pub season: SeasonArgs,

    /// Print JSON instead of a text table
    #[arg(long)]
    pub json: bool,
}
