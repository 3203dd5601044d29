//! `PostgreSQL` access for the session store.
//!
//! The storefront keeps no commerce data of its own; the database only holds
//! visitor sessions (client storage, flash notices, contact challenges).
//!
//! # Migrations
//!
//! The session table is created by `tower-sessions-sqlx-store`, either at
//! startup or explicitly via:
//! ```bash
//! cargo run -p shopfront-cli -- migrate
//! ```

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tower_sessions_sqlx_store::PostgresStore;

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Session store over `pool`, with its table created if missing.
///
/// # Errors
///
/// Returns `sqlx::Error` if the migration fails.
pub async fn session_store(pool: PgPool) -> Result<PostgresStore, sqlx::Error> {
    let store = PostgresStore::new(pool);
    store.migrate().await?;
    Ok(store)
}
