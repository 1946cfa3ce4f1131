/// Startup tasks shared by the server binary and tests

use crate::config::Config;
use dairydrop_shared::{
    media::{cloudinary::CloudinaryStore, DisabledImageStore, ImageStore},
    models::user::{User, UserRole},
};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{info, warn};

/// Promotes the account named by `ADMIN_EMAIL` to admin if it exists
///
/// Returns whether a promotion happened. A missing account is only logged so
/// the server still starts before the admin has registered.
pub async fn ensure_admin(pool: &PgPool, admin_email: Option<&str>) -> Result<bool, sqlx::Error> {
    let Some(email) = admin_email.map(str::trim).filter(|e| !e.is_empty()) else {
        return Ok(false);
    };

    let Some(existing) = User::find_by_email(pool, email).await? else {
        warn!(email = %email, "ADMIN_EMAIL does not match any user yet");
        return Ok(false);
    };

    if existing.role == UserRole::Admin {
        return Ok(false);
    }

    User::promote_to_admin(pool, email).await?;
    info!(user_id = %existing.id, "Promoted ADMIN_EMAIL account to admin");
    Ok(true)
}

/// Builds the image host from configuration
///
/// Falls back to a disabled store, which rejects uploads with 503, when
/// Cloudinary isn't configured or the HTTP client can't be built.
pub fn build_image_store(config: &Config) -> Arc<dyn ImageStore> {
    match &config.cloudinary {
        Some(cloudinary) => match CloudinaryStore::new(cloudinary.clone()) {
            Ok(store) => {
                info!(cloud = %cloudinary.cloud_name, "Cloudinary image uploads enabled");
                Arc::new(store)
            }
            Err(e) => {
                warn!(error = %e, "Failed to initialize Cloudinary client, image uploads disabled");
                Arc::new(DisabledImageStore)
            }
        },
        None => {
            info!("Cloudinary not configured, image uploads disabled");
            Arc::new(DisabledImageStore)
        }
    }
}
