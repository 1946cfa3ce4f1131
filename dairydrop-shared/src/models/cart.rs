/// Per-user shopping cart
///
/// Each line snapshots the product's name, price and primary image when it is
/// first added; later quantity changes leave the snapshot untouched. Reads
/// attach the product's live stock, and fill in the image when the snapshot
/// had none.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{Executor, PgConnection, PgPool, Postgres};
use uuid::Uuid;

use super::product::Product;

/// Upper bound on the quantity of a single cart or order line
pub const MAX_LINE_QUANTITY: i32 = 10_000;

/// One cart line
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    #[serde(rename = "product")]
    pub product_id: Uuid,
    pub name: String,
    pub price: Decimal,
    pub image: Option<String>,
    pub quantity: i32,
    pub added_at: DateTime<Utc>,
    /// Current stock of the product; not part of the snapshot
    #[serde(default)]
    pub in_stock: Option<i32>,
}

impl CartItem {
    /// Price times quantity
    pub fn line_total(&self) -> Decimal {
        self.price * Decimal::from(self.quantity)
    }

    /// Lists a user's cart, oldest line first
    pub async fn list_for_user<'e, E>(executor: E, user_id: Uuid) -> Result<Vec<Self>, sqlx::Error>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, CartItem>(
            r#"
            SELECT c.product_id, c.name, c.price,
                   COALESCE(c.image, p.images[1]) AS image,
                   c.quantity, c.added_at, p.in_stock
            FROM cart_items c
            LEFT JOIN products p ON p.id = c.product_id
            WHERE c.user_id = $1
            ORDER BY c.added_at, c.product_id
            "#,
        )
        .bind(user_id)
        .fetch_all(executor)
        .await
    }

    /// Adds `quantity` of a product, incrementing an existing line
    ///
    /// The combined quantity is capped at [`MAX_LINE_QUANTITY`].
    pub async fn add(
        pool: &PgPool,
        user_id: Uuid,
        product: &Product,
        quantity: i32,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO cart_items (user_id, product_id, name, price, image, quantity)
            VALUES ($1, $2, $3, $4, $5, LEAST($6, $7))
            ON CONFLICT (user_id, product_id)
            DO UPDATE SET quantity = LEAST(cart_items.quantity + EXCLUDED.quantity, $7)
            "#,
        )
        .bind(user_id)
        .bind(product.id)
        .bind(&product.name)
        .bind(product.price)
        .bind(product.primary_image())
        .bind(quantity)
        .bind(MAX_LINE_QUANTITY)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Sets the quantity of an existing line; false if the product isn't in the cart
    pub async fn set_quantity(
        pool: &PgPool,
        user_id: Uuid,
        product_id: Uuid,
        quantity: i32,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE cart_items SET quantity = $3 WHERE user_id = $1 AND product_id = $2",
        )
        .bind(user_id)
        .bind(product_id)
        .bind(quantity)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Removes a line; removing a product that isn't in the cart is not an error
    pub async fn remove(pool: &PgPool, user_id: Uuid, product_id: Uuid) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM cart_items WHERE user_id = $1 AND product_id = $2")
            .bind(user_id)
            .bind(product_id)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Empties the cart
    pub async fn clear<'e, E>(executor: E, user_id: Uuid) -> Result<(), sqlx::Error>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("DELETE FROM cart_items WHERE user_id = $1")
            .bind(user_id)
            .execute(executor)
            .await?;
        Ok(())
    }

    /// Reads the cart inside a checkout transaction, locking its rows
    pub async fn list_for_checkout(
        conn: &mut PgConnection,
        user_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, CartItem>(
            r#"
            SELECT product_id, name, price, image, quantity, added_at,
                   NULL::integer AS in_stock
            FROM cart_items
            WHERE user_id = $1
            ORDER BY added_at, product_id
            FOR UPDATE
            "#,
        )
        .bind(user_id)
        .fetch_all(conn)
        .await
    }
}

/// Sum of all line totals
pub fn cart_total(items: &[CartItem]) -> Decimal {
    items.iter().map(CartItem::line_total).sum()
}
