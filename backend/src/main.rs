use anyhow::Context;
use clap::Parser;
use tracing_subscriber::prelude::__tracing_subscriber_SubscriberExt;

use backend::config::{Cli, Command};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let registry = tracing_subscriber::Registry::default()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::filter::filter_fn(|meta| {
            meta.target().contains("backend") || meta.target().contains("analysis")
        }));
    tracing::subscriber::set_global_default(registry).context("installing tracing subscriber")?;

    let cli = Cli::parse();
    let utc_offset = cli
        .utc_offset()
        .with_context(|| format!("UTC offset of {} minutes is out of range", cli.utc_offset_minutes))?;
    let database_url = cli
        .database_url
        .as_deref()
        .context("'DATABASE_URL' must be set")?;

    tracing::info!("Starting...");
    let mut store = backend::store::PgStore::open(database_url, &backend::MIGRATIONS)
        .await
        .context("opening database")?;

    match cli.command {
        Command::Migrate => {}
        Command::Ingest(args) => {
            let settings = args.season.settings(utc_offset);
            let report =
                backend::ingest::ingest_batch(&mut store, &args.files, &settings, args.fixed()).await?;

            for (path, error) in report.failed.iter() {
                eprintln!("{}: {}", path.display(), error);
            }
        }
        Command::Watch(args) => {
            let settings = args.season.settings(utc_offset);
            let watch = backend::watch::DirectoryWatch::new(&args.dir, &args.extension);

            watch
                .run(
                    &mut store,
                    &settings,
                    std::time::Duration::from_secs(args.interval_secs),
                )
                .await?;
        }
        Command::Scoreboard(args) => {
            let table =
                backend::report::season_scoreboard(&mut store, &args.season.league, args.season.season)
                    .await?;

            if args.json {
                println!("{}", serde_json::to_string_pretty(&table)?);
            } else {
                print!("{}", table);
            }
        }
        Command::Serve { bind } => {
            let router = axum::Router::new().nest("/api", backend::api::router(store));

            let listener = tokio::net::TcpListener::bind(bind)
                .await
                .with_context(|| format!("binding {}", bind))?;
            tracing::info!(%bind, "Serving");
            axum::serve(listener, router).await?;
            return Ok(());
        }
    }

    store.close();
    Ok(())
}
