/// User model and database operations
///
/// # Schema
///
/// ```sql
/// CREATE TABLE users (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     name TEXT NOT NULL,
///     email TEXT NOT NULL,            -- unique, always lowercase
///     phone TEXT NOT NULL,            -- unique
///     password_hash TEXT NOT NULL,
///     role user_role NOT NULL DEFAULT 'user',
///     is_active BOOLEAN NOT NULL DEFAULT TRUE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use dairydrop_shared::models::user::{CreateUser, User, UserRole};
/// use dairydrop_shared::db::pool::{create_pool, DatabaseConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
///
/// let user = User::create(&pool, CreateUser {
///     name: "Asha".to_string(),
///     email: "asha@example.com".to_string(),
///     phone: "5550100".to_string(),
///     password_hash: "$argon2id$...".to_string(),
///     role: UserRole::User,
/// }).await?;
///
/// let found = User::find_by_login(&pool, "ASHA@example.com").await?;
/// assert_eq!(found.map(|u| u.id), Some(user.id));
/// # Ok(())
/// # }
/// ```

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool};
use tracing::debug;
use uuid::Uuid;

use super::product::Product;

/// Account role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    /// Regular customer
    User,

    /// Store administrator
    Admin,
}

impl UserRole {
    /// Converts role to its wire and database spelling
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::User => "user",
            UserRole::Admin => "admin",
        }
    }

    /// Parses a role name, returning None for anything unknown
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "user" => Some(UserRole::User),
            "admin" => Some(UserRole::Admin),
            _ => None,
        }
    }

    /// Whether this role grants at least the permissions of `required`
    pub fn satisfies(&self, required: UserRole) -> bool {
        match required {
            UserRole::User => true,
            UserRole::Admin => *self == UserRole::Admin,
        }
    }
}

/// User account
///
/// The password hash is never serialized.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,

    pub name: String,

    /// Lowercased email address, unique across users
    pub email: String,

    /// Phone number, unique across users
    pub phone: String,

    /// Argon2id PHC string
    #[serde(skip_serializing, default)]
    pub password_hash: String,

    pub role: UserRole,

    /// Deactivated accounts cannot log in
    pub is_active: bool,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

/// Input for creating a new user
#[derive(Debug, Clone)]
pub struct CreateUser {
    pub name: String,
    pub email: String,
    pub phone: String,
    /// Argon2id password hash (NOT plaintext password!)
    pub password_hash: String,
    pub role: UserRole,
}

/// Profile fields a user may change about themself
///
/// Only `Some` fields are written.
#[derive(Debug, Clone, Default)]
pub struct UpdateUser {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

/// Normalizes an email for storage and lookup
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

impl User {
    /// Creates a new user
    ///
    /// # Errors
    ///
    /// Returns a unique violation if the email or phone is already registered.
    pub async fn create(pool: &PgPool, data: CreateUser) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (name, email, phone, password_hash, role)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, name, email, phone, password_hash, role, is_active,
                      created_at, updated_at
            "#,
        )
        .bind(data.name.trim())
        .bind(normalize_email(&data.email))
        .bind(data.phone.trim())
        .bind(data.password_hash)
        .bind(data.role)
        .fetch_one(pool)
        .await
    }

    /// Finds a user by ID
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, phone, password_hash, role, is_active,
                   created_at, updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// Finds a user by email (case-insensitive)
    pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, phone, password_hash, role, is_active,
                   created_at, updated_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(normalize_email(email))
        .fetch_optional(pool)
        .await
    }

    /// Finds a user by login identifier, which may be an email or a phone number
    pub async fn find_by_login(
        pool: &PgPool,
        identifier: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, phone, password_hash, role, is_active,
                   created_at, updated_at
            FROM users
            WHERE email = $1 OR phone = $2
            LIMIT 1
            "#,
        )
        .bind(normalize_email(identifier))
        .bind(identifier.trim())
        .fetch_optional(pool)
        .await
    }

    /// Checks whether another account already uses this email or phone
    ///
    /// `exclude` skips the caller's own row when updating a profile.
    pub async fn contact_taken(
        pool: &PgPool,
        email: Option<&str>,
        phone: Option<&str>,
        exclude: Option<Uuid>,
    ) -> Result<bool, sqlx::Error> {
        let taken: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM users
                WHERE (email = $1 OR phone = $2)
                  AND ($3::uuid IS NULL OR id <> $3)
            )
            "#,
        )
        .bind(email.map(normalize_email))
        .bind(phone.map(str::trim))
        .bind(exclude)
        .fetch_one(pool)
        .await?;

        Ok(taken)
    }

    /// Lists all users, newest first
    pub async fn list(pool: &PgPool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, phone, password_hash, role, is_active,
                   created_at, updated_at
            FROM users
            ORDER BY created_at DESC
            "#,
        )
        .fetch_all(pool)
        .await
    }

    /// Updates profile fields, returning None if the user doesn't exist
    pub async fn update_profile(
        pool: &PgPool,
        id: Uuid,
        data: UpdateUser,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET name = COALESCE($2, name),
                email = COALESCE($3, email),
                phone = COALESCE($4, phone),
                updated_at = NOW()
            WHERE id = $1
            RETURNING id, name, email, phone, password_hash, role, is_active,
                      created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(data.name.as_deref().map(str::trim))
        .bind(data.email.as_deref().map(normalize_email))
        .bind(data.phone.as_deref().map(str::trim))
        .fetch_optional(pool)
        .await
    }

    /// Replaces the stored password hash
    pub async fn update_password(
        pool: &PgPool,
        id: Uuid,
        password_hash: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE users SET password_hash = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(password_hash)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Sets the user's role
    pub async fn set_role(
        pool: &PgPool,
        id: Uuid,
        role: UserRole,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET role = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING id, name, email, phone, password_hash, role, is_active,
                      created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(role)
        .fetch_optional(pool)
        .await
    }

    /// Activates or deactivates the account
    pub async fn set_active(
        pool: &PgPool,
        id: Uuid,
        is_active: bool,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET is_active = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING id, name, email, phone, password_hash, role, is_active,
                      created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(is_active)
        .fetch_optional(pool)
        .await
    }

    /// Promotes the account with this email to admin
    ///
    /// Returns None when no such user exists. Promoting an existing admin is a no-op.
    pub async fn promote_to_admin(
        pool: &PgPool,
        email: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET role = 'admin',
                updated_at = CASE WHEN role = 'admin' THEN updated_at ELSE NOW() END
            WHERE email = $1
            RETURNING id, name, email, phone, password_hash, role, is_active,
                      created_at, updated_at
            "#,
        )
        .bind(normalize_email(email))
        .fetch_optional(pool)
        .await
    }

    /// Deletes a user; addresses, cart, orders and reviews cascade
    ///
    /// Stock held by the user's pending and confirmed orders goes back to the
    /// catalog, and ratings of products the user reviewed are recomputed, all
    /// in the same transaction. Locks are taken user, then orders, then
    /// products, matching checkout and status changes.
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let mut tx = pool.begin().await?;

        if !Self::lock(&mut tx, id).await? {
            return Ok(false);
        }

        let open_orders: Vec<Uuid> = sqlx::query_scalar(
            r#"
            SELECT id FROM orders
            WHERE user_id = $1 AND status IN ('Pending', 'Confirmed')
            ORDER BY id
            FOR UPDATE
            "#,
        )
        .bind(id)
        .fetch_all(&mut *tx)
        .await?;

        let held: Vec<(Uuid, i64)> = sqlx::query_as(
            r#"
            SELECT product_id, SUM(quantity)::bigint
            FROM order_items
            WHERE order_id = ANY($1)
            GROUP BY product_id
            "#,
        )
        .bind(&open_orders)
        .fetch_all(&mut *tx)
        .await?;

        let reviewed: Vec<Uuid> =
            sqlx::query_scalar("SELECT product_id FROM reviews WHERE user_id = $1")
                .bind(id)
                .fetch_all(&mut *tx)
                .await?;

        let touched: BTreeSet<Uuid> = reviewed
            .iter()
            .copied()
            .chain(held.iter().map(|(product_id, _)| *product_id))
            .collect();
        for product_id in &touched {
            Product::find_for_update(&mut tx, *product_id).await?;
        }

        for (product_id, quantity) in held {
            let quantity = i32::try_from(quantity).unwrap_or(i32::MAX);
            Product::restock(&mut tx, product_id, quantity).await?;
        }

        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        for product_id in reviewed {
            Product::refresh_rating(&mut tx, product_id).await?;
        }

        tx.commit().await?;

        debug!(user_id = %id, released_orders = open_orders.len(), "Released stock held by open orders");
        Ok(true)
    }

    /// Locks the user row for the remainder of a transaction
    ///
    /// Used to serialize address book and checkout writes for the same user.
    pub async fn lock(conn: &mut PgConnection, id: Uuid) -> Result<bool, sqlx::Error> {
        let found: Option<Uuid> =
            sqlx::query_scalar("SELECT id FROM users WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(conn)
                .await?;

        Ok(found.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_as_str_and_parse() {
        assert_eq!(UserRole::User.as_str(), "user");
        assert_eq!(UserRole::Admin.as_str(), "admin");
        assert_eq!(UserRole::parse("admin"), Some(UserRole::Admin));
        assert_eq!(UserRole::parse("user"), Some(UserRole::User));
        assert_eq!(UserRole::parse("Admin"), None);
        assert_eq!(UserRole::parse("superuser"), None);
    }

    #[test]
    fn test_role_satisfies() {
        assert!(UserRole::Admin.satisfies(UserRole::Admin));
        assert!(UserRole::Admin.satisfies(UserRole::User));
        assert!(UserRole::User.satisfies(UserRole::User));
        assert!(!UserRole::User.satisfies(UserRole::Admin));
    }

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  Asha@Example.COM "), "asha@example.com");
    }

    #[test]
    fn test_password_hash_not_serialized() {
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            name: "Asha".to_string(),
            email: "asha@example.com".to_string(),
            phone: "5550100".to_string(),
            password_hash: "$argon2id$secret".to_string(),
            role: UserRole::User,
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("passwordHash").is_none());
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["role"], "user");
        assert_eq!(json["isActive"], true);
    }
}
