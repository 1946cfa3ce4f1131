/// Authentication and authorization utilities
///
/// # Modules
///
/// - [`password`]: Argon2id password hashing and verification
/// - [`jwt`]: JWT access token generation and validation
/// - [`middleware`]: Bearer token parsing and the `AuthContext` extractor
/// - [`authorization`]: Role checks for admin-only operations
///
/// # Example
///
/// ```no_run
/// use dairydrop_shared::auth::password::{hash_password, verify_password};
/// use dairydrop_shared::auth::jwt::{create_token, Claims};
/// use dairydrop_shared::models::user::UserRole;
/// use chrono::Duration;
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("user_password")?;
/// assert!(verify_password("user_password", &hash)?);
///
/// let claims = Claims::new(Uuid::new_v4(), UserRole::User, Duration::days(1));
/// let token = create_token(&claims, "secret-key")?;
/// # Ok(())
/// # }
/// ```

pub mod authorization;
pub mod jwt;
pub mod middleware;
pub mod password;
