pub mod api;
pub mod config;
pub mod ingest;
pub mod models;
pub mod report;
pub mod schema;
pub mod store;
pub mod watch;

pub const MIGRATIONS: diesel_async_migrations::EmbeddedMigrations =
    diesel_async_migrations::embed_migrations!("../migrations/");
