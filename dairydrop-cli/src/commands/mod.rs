/// Command implementations

pub mod admin;
pub mod migrate;
pub mod seed;

use dairydrop_shared::db::pool::{create_pool, DatabaseConfig};
use sqlx::PgPool;

/// Opens a small pool for a one-shot command
pub async fn connect(database_url: &str) -> anyhow::Result<PgPool> {
    tracing::info!("Connecting to database...");
    let pool = create_pool(DatabaseConfig {
        url: database_url.to_string(),
        max_connections: 2,
        min_connections: 0,
        ..Default::default()
    })
    .await?;
    Ok(pool)
}
