//! Database connection pool

use std::time::Duration;

use records_shared::config::DatabaseSettings;
use sqlx::{postgres::PgPoolOptions, PgPool};
use tracing::info;

pub async fn create_pool(settings: &DatabaseSettings) -> Result<PgPool, sqlx::Error> {
    let pool = PgPoolOptions::new()
        .max_connections(settings.max_connections)
        .acquire_timeout(Duration::from_secs(settings.acquire_timeout_seconds))
        .connect(&settings.url)
        .await?;

    sqlx::query("SELECT 1").execute(&pool).await?;
    info!(max_connections = settings.max_connections, "Database pool ready");
    Ok(pool)
}
