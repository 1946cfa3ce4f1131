/// Saved shipping addresses
///
/// Every write keeps the default invariant: a user has at most one default
/// address (enforced by a partial unique index) and, whenever they have any
/// addresses at all, exactly one of them is the default. Mutating operations
/// take a `&mut PgConnection` so callers run them inside a transaction.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE addresses (
///     id UUID PRIMARY KEY,
///     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     label TEXT, line1 TEXT NOT NULL, line2 TEXT, city TEXT NOT NULL,
///     state TEXT, postal_code TEXT, country TEXT NOT NULL,
///     is_default BOOLEAN NOT NULL DEFAULT FALSE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// CREATE UNIQUE INDEX addresses_one_default_per_user ON addresses (user_id) WHERE is_default;
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, PgConnection, Postgres};
use uuid::Uuid;

/// A saved address
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    pub id: Uuid,

    #[serde(skip_serializing)]
    pub user_id: Uuid,

    /// Free-form label such as "Home"
    pub label: Option<String>,

    pub line1: String,
    pub line2: Option<String>,
    pub city: String,
    pub state: Option<String>,
    pub postal_code: Option<String>,
    pub country: String,

    pub is_default: bool,

    pub created_at: DateTime<Utc>,
}

/// Input for adding an address
#[derive(Debug, Clone, Default)]
pub struct NewAddress {
    pub label: Option<String>,
    pub line1: String,
    pub line2: Option<String>,
    pub city: String,
    pub state: Option<String>,
    pub postal_code: Option<String>,
    pub country: String,
    pub is_default: bool,
}

/// Partial update for an address; `None` leaves a field unchanged
#[derive(Debug, Clone, Default)]
pub struct AddressPatch {
    pub label: Option<String>,
    pub line1: Option<String>,
    pub line2: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
    pub is_default: Option<bool>,
}

impl Address {
    /// Lists a user's addresses in the order they were added
    pub async fn list_for_user<'e, E>(executor: E, user_id: Uuid) -> Result<Vec<Self>, sqlx::Error>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Address>(
            r#"
            SELECT id, user_id, label, line1, line2, city, state, postal_code, country,
                   is_default, created_at
            FROM addresses
            WHERE user_id = $1
            ORDER BY created_at, id
            "#,
        )
        .bind(user_id)
        .fetch_all(executor)
        .await
    }

    /// Adds an address, clearing the previous default when the new one claims it
    pub async fn add(
        conn: &mut PgConnection,
        user_id: Uuid,
        data: NewAddress,
    ) -> Result<Self, sqlx::Error> {
        if data.is_default {
            clear_default(conn, user_id).await?;
        }

        let address = sqlx::query_as::<_, Address>(
            r#"
            INSERT INTO addresses
                (user_id, label, line1, line2, city, state, postal_code, country, is_default)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id, user_id, label, line1, line2, city, state, postal_code, country,
                      is_default, created_at
            "#,
        )
        .bind(user_id)
        .bind(data.label)
        .bind(data.line1)
        .bind(data.line2)
        .bind(data.city)
        .bind(data.state)
        .bind(data.postal_code)
        .bind(data.country)
        .bind(data.is_default)
        .fetch_one(&mut *conn)
        .await?;

        ensure_default(conn, user_id).await?;
        Ok(address)
    }

    /// Applies a partial update to one of the user's addresses
    ///
    /// Returns false if the address doesn't exist or belongs to someone else.
    pub async fn update(
        conn: &mut PgConnection,
        user_id: Uuid,
        id: Uuid,
        patch: AddressPatch,
    ) -> Result<bool, sqlx::Error> {
        if patch.is_default == Some(true) {
            let owned: Option<Uuid> =
                sqlx::query_scalar("SELECT id FROM addresses WHERE id = $1 AND user_id = $2")
                    .bind(id)
                    .bind(user_id)
                    .fetch_optional(&mut *conn)
                    .await?;
            if owned.is_none() {
                return Ok(false);
            }
            clear_default(conn, user_id).await?;
        }

        let result = sqlx::query(
            r#"
            UPDATE addresses
            SET label = COALESCE($3, label),
                line1 = COALESCE($4, line1),
                line2 = COALESCE($5, line2),
                city = COALESCE($6, city),
                state = COALESCE($7, state),
                postal_code = COALESCE($8, postal_code),
                country = COALESCE($9, country),
                is_default = COALESCE($10, is_default)
            WHERE id = $1 AND user_id = $2
            "#,
        )
        .bind(id)
        .bind(user_id)
        .bind(patch.label)
        .bind(patch.line1)
        .bind(patch.line2)
        .bind(patch.city)
        .bind(patch.state)
        .bind(patch.postal_code)
        .bind(patch.country)
        .bind(patch.is_default)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(false);
        }

        ensure_default(conn, user_id).await?;
        Ok(true)
    }

    /// Deletes one of the user's addresses, promoting another to default if needed
    pub async fn delete(
        conn: &mut PgConnection,
        user_id: Uuid,
        id: Uuid,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM addresses WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&mut *conn)
            .await?;

        if result.rows_affected() == 0 {
            return Ok(false);
        }

        ensure_default(conn, user_id).await?;
        Ok(true)
    }

    /// Whether the user already saved an address with this line1, city and postal code
    pub async fn exists_matching(
        conn: &mut PgConnection,
        user_id: Uuid,
        line1: &str,
        city: &str,
        postal_code: Option<&str>,
    ) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM addresses
                WHERE user_id = $1
                  AND line1 = $2
                  AND city = $3
                  AND postal_code IS NOT DISTINCT FROM $4
            )
            "#,
        )
        .bind(user_id)
        .bind(line1)
        .bind(city)
        .bind(postal_code)
        .fetch_one(conn)
        .await
    }
}

async fn clear_default(conn: &mut PgConnection, user_id: Uuid) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE addresses SET is_default = FALSE WHERE user_id = $1 AND is_default")
        .bind(user_id)
        .execute(conn)
        .await?;
    Ok(())
}

/// Marks the oldest address as default when the user has addresses but none is default
async fn ensure_default(conn: &mut PgConnection, user_id: Uuid) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE addresses
        SET is_default = TRUE
        WHERE id = (
            SELECT id FROM addresses
            WHERE user_id = $1
            ORDER BY created_at, id
            LIMIT 1
        )
        AND NOT EXISTS (
            SELECT 1 FROM addresses WHERE user_id = $1 AND is_default
        )
        "#,
    )
    .bind(user_id)
    .execute(conn)
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_serialization_hides_owner() {
        let address = Address {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            label: Some("Home".to_string()),
            line1: "12 Dairy Lane".to_string(),
            line2: None,
            city: "Pune".to_string(),
            state: Some("MH".to_string()),
            postal_code: Some("411001".to_string()),
            country: "India".to_string(),
            is_default: true,
            created_at: Utc::now(),
        };

        let json = serde_json::to_value(&address).unwrap();
        assert!(json.get("userId").is_none());
        assert_eq!(json["postalCode"], "411001");
        assert_eq!(json["isDefault"], true);
    }
}
