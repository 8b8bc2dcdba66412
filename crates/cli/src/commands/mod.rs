//! CLI command implementations.

pub mod migrate;
pub mod roles;
pub mod users;

use secrecy::SecretString;
use sqlx::PgPool;
use thiserror::Error;

/// Errors shared by commands that talk to the database.
#[derive(Debug, Error)]
pub enum CommandError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    /// Database connection error.
    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Read `OPSDESK_DATABASE_URL` (or `DATABASE_URL`) and connect.
pub async fn connect() -> Result<PgPool, CommandError> {
    dotenvy::dotenv().ok();

    let database_url = std::env::var("OPSDESK_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map_err(|_| CommandError::MissingEnvVar("OPSDESK_DATABASE_URL"))?;

    tracing::info!("Connecting to database...");
    Ok(opsdesk_admin::db::create_pool(&SecretString::from(database_url)).await?)
}
