/// Database models for Dairy Drop
///
/// Each model owns its SQL. Multi-step writes (checkout, cancellation,
/// review changes) run in a single transaction and lock the rows they
/// depend on.
///
/// # Example
///
/// ```no_run
/// use dairydrop_shared::db::pool::{create_pool, DatabaseConfig};
/// use dairydrop_shared::models::user::{CreateUser, User, UserRole};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
///
/// let user = User::create(
///     &pool,
///     CreateUser {
///         name: "Asha".to_string(),
///         email: "asha@example.com".to_string(),
///         phone: "9876543210".to_string(),
///         password_hash: "$argon2id$...".to_string(),
///         role: UserRole::User,
///     },
/// )
/// .await?;
/// # Ok(())
/// # }
/// ```

pub mod address;
pub mod cart;
pub mod order;
pub mod page;
pub mod product;
pub mod review;
pub mod user;
