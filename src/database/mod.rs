use std::sync::OnceLock;

use anyhow::Result;
use sqlx::{PgPool, postgres::PgPoolOptions};

pub mod models;
pub mod repositories;
pub mod transaction;
pub mod utils;

static POOL: OnceLock<PgPool> = OnceLock::new();

/// Connect to Postgres, run pending migrations and install the shared pool.
/// Calling it again after a successful initialization is a no-op.
pub async fn init_database(database_url: &str, max_connections: u32) -> Result<&'static PgPool> {
    if let Some(pool) = POOL.get() {
        return Ok(pool);
    }

    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .test_before_acquire(true)
        .connect(database_url)
        .await?;

    log::info!("Running database migrations...");
    sqlx::migrate!("./migrations").run(&pool).await?;
    log::info!("Migrations completed successfully");

    // A concurrent initializer may have won the race; keep whichever landed first.
    let _ = POOL.set(pool);
    Ok(get_pool()?)
}

/// The process-wide pool. Every read goes back to the store through it;
/// nothing about guards, credentials or attendance is cached in memory.
pub fn get_pool() -> Result<&'static PgPool, sqlx::Error> {
    POOL.get()
        .ok_or_else(|| sqlx::Error::Configuration("database pool is not initialized".into()))
}
