//! Database migration commands.
//!
//! # Usage
//!
//! ```bash
//! # Apply pending migrations (creates the database if needed)
//! dairydrop migrate
//!
//! # Only report what is applied
//! dairydrop migrate --status
//! ```

use dairydrop_shared::db::migrations::{
    ensure_database_exists, get_migration_status, run_migrations, MigrationStatus,
};
use tracing::info;

use super::connect;

/// Creates the database if missing and applies pending migrations
pub async fn run(database_url: &str) -> anyhow::Result<MigrationStatus> {
    ensure_database_exists(database_url).await?;
    let pool = connect(database_url).await?;

    info!("Running migrations...");
    run_migrations(&pool).await?;

    let status = get_migration_status(&pool).await?;
    info!(
        applied = status.applied_migrations,
        latest = ?status.latest_version,
        "Migrations complete"
    );

    pool.close().await;
    Ok(status)
}

/// Reports applied and embedded migration counts without changing anything
pub async fn status(database_url: &str) -> anyhow::Result<MigrationStatus> {
    let pool = connect(database_url).await?;
    let status = get_migration_status(&pool).await?;
    pool.close().await;

    if status.is_up_to_date() {
        info!(applied = status.applied_migrations, "Database schema is up to date");
    } else {
        info!(
            applied = status.applied_migrations,
            known = status.known_migrations,
            "Database has pending migrations"
        );
    }

    Ok(status)
}
