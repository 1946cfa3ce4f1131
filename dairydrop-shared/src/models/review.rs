/// Product reviews
///
/// A user has at most one review per product; posting again replaces the
/// rating and comment. Every write recomputes the product's denormalized
/// `average_rating` and `rating_count` inside the same transaction, with the
/// product row locked so concurrent reviews of one product serialize.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{PgConnection, PgPool};
use tracing::debug;
use uuid::Uuid;

use super::page::PageRequest;
use super::product::Product;

/// Default reviews per page on a product page
pub const DEFAULT_PRODUCT_PAGE_SIZE: u32 = 5;

/// Default reviews per page in the moderation list
pub const DEFAULT_ADMIN_PAGE_SIZE: u32 = 10;

/// A stored review
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: Uuid,
    #[serde(rename = "product")]
    pub product_id: Uuid,
    #[serde(rename = "user")]
    pub user_id: Uuid,
    /// 1 to 5 stars
    pub rating: i16,
    pub comment: Option<String>,
    /// Only approved reviews are public and count toward the rating
    pub is_approved: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Reviewer shown next to a review
#[derive(Debug, Clone, Serialize)]
pub struct ReviewAuthor {
    pub id: Uuid,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// Product reference shown in the moderation list
#[derive(Debug, Clone, Serialize)]
pub struct ReviewProduct {
    pub id: Uuid,
    pub name: String,
}

/// Review joined with its author (and, for moderation, its product)
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewView {
    pub id: Uuid,
    pub product: ReviewProductRef,
    pub user: ReviewAuthor,
    pub rating: i16,
    pub comment: Option<String>,
    pub is_approved: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Product as a bare ID on public listings, or ID and name when moderating
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ReviewProductRef {
    Id(Uuid),
    Summary(ReviewProduct),
}

#[derive(Debug, sqlx::FromRow)]
struct ReviewViewRow {
    id: Uuid,
    product_id: Uuid,
    product_name: String,
    user_id: Uuid,
    user_name: String,
    user_email: String,
    rating: i16,
    comment: Option<String>,
    is_approved: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ReviewViewRow {
    fn into_public(self) -> ReviewView {
        ReviewView {
            id: self.id,
            product: ReviewProductRef::Id(self.product_id),
            user: ReviewAuthor {
                id: self.user_id,
                name: self.user_name,
                email: None,
            },
            rating: self.rating,
            comment: self.comment,
            is_approved: self.is_approved,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    fn into_admin(self) -> ReviewView {
        ReviewView {
            id: self.id,
            product: ReviewProductRef::Summary(ReviewProduct {
                id: self.product_id,
                name: self.product_name,
            }),
            user: ReviewAuthor {
                id: self.user_id,
                name: self.user_name,
                email: Some(self.user_email),
            },
            rating: self.rating,
            comment: self.comment,
            is_approved: self.is_approved,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Builds a case-insensitive substring pattern, escaping LIKE wildcards
pub fn contains_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

impl Review {
    /// Creates or replaces the user's review of a product
    ///
    /// Returns None if the product doesn't exist.
    pub async fn upsert(
        pool: &PgPool,
        product_id: Uuid,
        user_id: Uuid,
        rating: i16,
        comment: Option<String>,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        if Product::find_for_update(&mut tx, product_id).await?.is_none() {
            return Ok(None);
        }

        let review = sqlx::query_as::<_, Review>(
            r#"
            INSERT INTO reviews (product_id, user_id, rating, comment)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (product_id, user_id)
            DO UPDATE SET rating = EXCLUDED.rating,
                          comment = EXCLUDED.comment,
                          updated_at = NOW()
            RETURNING id, product_id, user_id, rating, comment, is_approved, created_at, updated_at
            "#,
        )
        .bind(product_id)
        .bind(user_id)
        .bind(rating)
        .bind(comment)
        .fetch_one(&mut *tx)
        .await?;

        Product::refresh_rating(&mut tx, product_id).await?;
        tx.commit().await?;

        debug!(review_id = %review.id, product_id = %product_id, rating, "Review saved");
        Ok(Some(review))
    }

    /// Approved reviews of a product with reviewer names, newest first
    pub async fn list_for_product(
        pool: &PgPool,
        product_id: Uuid,
        page: PageRequest,
    ) -> Result<(Vec<ReviewView>, i64), sqlx::Error> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM reviews WHERE product_id = $1 AND is_approved",
        )
        .bind(product_id)
        .fetch_one(pool)
        .await?;

        let rows = sqlx::query_as::<_, ReviewViewRow>(
            r#"
            SELECT r.id, r.product_id, p.name AS product_name, r.user_id,
                   u.name AS user_name, u.email AS user_email,
                   r.rating, r.comment, r.is_approved, r.created_at, r.updated_at
            FROM reviews r
            JOIN users u ON u.id = r.user_id
            JOIN products p ON p.id = r.product_id
            WHERE r.product_id = $1 AND r.is_approved
            ORDER BY r.created_at DESC, r.id
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(product_id)
        .bind(page.sql_limit())
        .bind(page.offset())
        .fetch_all(pool)
        .await?;

        Ok((rows.into_iter().map(ReviewViewRow::into_public).collect(), total))
    }

    /// Deletes the user's review of a product; false if there was none
    pub async fn delete_own(
        pool: &PgPool,
        product_id: Uuid,
        user_id: Uuid,
    ) -> Result<bool, sqlx::Error> {
        let mut tx = pool.begin().await?;
        Product::find_for_update(&mut tx, product_id).await?;

        let result = sqlx::query("DELETE FROM reviews WHERE product_id = $1 AND user_id = $2")
            .bind(product_id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Ok(false);
        }

        Product::refresh_rating(&mut tx, product_id).await?;
        tx.commit().await?;
        Ok(true)
    }

    /// All reviews for moderation, newest first
    ///
    /// `search` matches the comment, the reviewer's name or the product name.
    pub async fn list_for_moderation(
        pool: &PgPool,
        search: Option<&str>,
        page: PageRequest,
    ) -> Result<(Vec<ReviewView>, i64), sqlx::Error> {
        let pattern = search
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(contains_pattern);

        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM reviews r
            JOIN users u ON u.id = r.user_id
            JOIN products p ON p.id = r.product_id
            WHERE $1::text IS NULL
               OR r.comment ILIKE $1
               OR u.name ILIKE $1
               OR p.name ILIKE $1
            "#,
        )
        .bind(&pattern)
        .fetch_one(pool)
        .await?;

        let rows = sqlx::query_as::<_, ReviewViewRow>(
            r#"
            SELECT r.id, r.product_id, p.name AS product_name, r.user_id,
                   u.name AS user_name, u.email AS user_email,
                   r.rating, r.comment, r.is_approved, r.created_at, r.updated_at
            FROM reviews r
            JOIN users u ON u.id = r.user_id
            JOIN products p ON p.id = r.product_id
            WHERE $1::text IS NULL
               OR r.comment ILIKE $1
               OR u.name ILIKE $1
               OR p.name ILIKE $1
            ORDER BY r.created_at DESC, r.id
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(&pattern)
        .bind(page.sql_limit())
        .bind(page.offset())
        .fetch_all(pool)
        .await?;

        Ok((rows.into_iter().map(ReviewViewRow::into_admin).collect(), total))
    }

    /// Approves or hides a review; None if it doesn't exist
    pub async fn moderate(
        pool: &PgPool,
        id: Uuid,
        is_approved: bool,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let Some(product_id) = lock_product_of(&mut tx, id).await? else {
            return Ok(None);
        };

        let review = sqlx::query_as::<_, Review>(
            r#"
            UPDATE reviews
            SET is_approved = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING id, product_id, user_id, rating, comment, is_approved, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(is_approved)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(review) = review else {
            return Ok(None);
        };

        Product::refresh_rating(&mut tx, product_id).await?;
        tx.commit().await?;
        Ok(Some(review))
    }

    /// Deletes any review; false if it doesn't exist
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let Some(product_id) = lock_product_of(&mut tx, id).await? else {
            return Ok(false);
        };

        let result = sqlx::query("DELETE FROM reviews WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Ok(false);
        }

        Product::refresh_rating(&mut tx, product_id).await?;
        tx.commit().await?;
        Ok(true)
    }
}

/// Locks the product a review belongs to, before the review row itself
///
/// Review writers always lock the product first, then the review.
async fn lock_product_of(conn: &mut PgConnection, review_id: Uuid) -> Result<Option<Uuid>, sqlx::Error> {
    let product_id: Option<Uuid> = sqlx::query_scalar("SELECT product_id FROM reviews WHERE id = $1")
        .bind(review_id)
        .fetch_optional(&mut *conn)
        .await?;

    match product_id {
        Some(product_id) => {
            Product::find_for_update(conn, product_id).await?;
            Ok(Some(product_id))
        }
        None => Ok(None),
    }
}
