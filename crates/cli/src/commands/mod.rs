//! Subcommand implementations.

pub mod admin;
pub mod migrate;
pub mod seed;
pub mod token;

use marketplace_api::config::{ConfigError, get_database_url};
use sqlx::PgPool;

/// Load `.env` and connect to the marketplace database.
async fn connect() -> Result<PgPool, ConnectError> {
    dotenvy::dotenv().ok();
    let database_url = get_database_url("MARKETPLACE_DATABASE_URL")?;

    tracing::info!("Connecting to marketplace database...");
    Ok(marketplace_api::db::create_pool(&database_url).await?)
}

/// Failure to reach the database.
#[derive(Debug, thiserror::Error)]
pub enum ConnectError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),
}
