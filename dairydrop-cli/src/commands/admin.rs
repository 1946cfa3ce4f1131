//! Admin user management commands.
//!
//! # Usage
//!
//! ```bash
//! dairydrop admin promote --email owner@example.com
//! ```

use dairydrop_shared::models::user::User;
use sqlx::PgPool;
use tracing::info;

/// Promotes an existing account to admin
///
/// # Errors
///
/// Fails when no account uses `email`; the account must register first.
pub async fn promote(pool: &PgPool, email: &str) -> anyhow::Result<User> {
    let user = User::promote_to_admin(pool, email)
        .await?
        .ok_or_else(|| anyhow::anyhow!("No user with email {}", email.trim()))?;

    info!(user_id = %user.id, email = %user.email, "User promoted to admin");
    Ok(user)
}
