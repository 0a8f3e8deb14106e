use crate::config::DatabaseConfig;
use crate::types::AppResult;
use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::info;

pub async fn create_pool(config: &DatabaseConfig) -> AppResult<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect_with(config.connect_options())
        .await?;

    health_check(&pool).await?;
    info!(host = %config.host, port = config.port, database = %config.database, "Connected to Postgres");

    Ok(pool)
}

pub async fn health_check(pool: &PgPool) -> AppResult<()> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}
