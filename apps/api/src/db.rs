use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;

/// Creates and returns a PostgreSQL connection pool.
pub async fn create_pool(database_url: &str, max_connections: u32) -> Result<PgPool> {
    info!("Connecting to PostgreSQL...");

    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await?;

    info!("PostgreSQL connection pool established");
    Ok(pool)
}

/// Applies the embedded schema migrations.
pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .context("failed to apply database migrations")?;
    info!("Database migrations applied");
    Ok(())
}

/// Soft-delete read filter.
///
/// Every read path builds its WHERE clause through this helper so that rows
/// carrying a `deleted_at` timestamp never leak, including through joins.
/// Each argument is a table alias used in the query.
pub fn live(aliases: &[&str]) -> String {
    aliases
        .iter()
        .map(|alias| format!("{alias}.deleted_at IS NULL"))
        .collect::<Vec<_>>()
        .join(" AND ")
}
