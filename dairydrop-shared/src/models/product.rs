/// Product catalog model
///
/// Listing is the only dynamic query in the crate. Filters are appended with
/// `sqlx::QueryBuilder` so every user-supplied value is a bind parameter, and
/// the sort column comes from the closed [`SortField`] set.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE products (
///     id UUID PRIMARY KEY,
///     name TEXT NOT NULL,
///     description TEXT,
///     images TEXT[] NOT NULL DEFAULT '{}',
///     price NUMERIC(10, 2) NOT NULL CHECK (price >= 0),
///     category TEXT,
///     in_stock INTEGER NOT NULL DEFAULT 0 CHECK (in_stock >= 0),
///     is_active BOOLEAN NOT NULL DEFAULT TRUE,
///     average_rating DOUBLE PRECISION NOT NULL DEFAULT 0,
///     rating_count INTEGER NOT NULL DEFAULT 0,
///     search TSVECTOR GENERATED ALWAYS AS (...) STORED,
///     created_at TIMESTAMPTZ, updated_at TIMESTAMPTZ
/// );
/// ```

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::page::PageRequest;

/// Default number of products per catalog page
pub const DEFAULT_PAGE_SIZE: u32 = 12;

/// A catalog product
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,

    /// Image URLs, first one is the primary image
    pub images: Vec<String>,

    pub price: Decimal,
    pub category: Option<String>,

    /// Units available for sale
    pub in_stock: i32,

    /// Inactive products are hidden from listings and cannot be bought
    pub is_active: bool,

    /// Mean rating of approved reviews (0 when there are none)
    pub average_rating: f64,

    /// Number of approved reviews
    pub rating_count: i32,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// The image that represents this product in carts and orders
    pub fn primary_image(&self) -> Option<&str> {
        self.images.first().map(String::as_str)
    }
}

/// Input for creating a product
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub name: String,
    pub description: Option<String>,
    pub images: Vec<String>,
    pub price: Decimal,
    pub category: Option<String>,
    pub in_stock: i32,
    pub is_active: bool,
}

/// Partial product update; `None` leaves a field unchanged
#[derive(Debug, Clone, Default)]
pub struct ProductPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub images: Option<Vec<String>>,
    pub price: Option<Decimal>,
    pub category: Option<String>,
    pub in_stock: Option<i32>,
    pub is_active: Option<bool>,
}

/// Sortable catalog columns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    CreatedAt,
    Price,
    Name,
    AverageRating,
    RatingCount,
    InStock,
}

impl SortField {
    fn column(&self) -> &'static str {
        match self {
            SortField::CreatedAt => "created_at",
            SortField::Price => "price",
            SortField::Name => "name",
            SortField::AverageRating => "average_rating",
            SortField::RatingCount => "rating_count",
            SortField::InStock => "in_stock",
        }
    }
}

/// Catalog ordering, parsed from strings like `price` or `-createdAt`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProductSort {
    pub field: SortField,
    pub descending: bool,
}

impl Default for ProductSort {
    fn default() -> Self {
        Self {
            field: SortField::CreatedAt,
            descending: true,
        }
    }
}

impl ProductSort {
    /// Parses a sort expression; a leading `-` means descending
    ///
    /// Returns None for fields outside the whitelist.
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        let (descending, name) = match value.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, value),
        };

        let field = match name {
            "createdAt" => SortField::CreatedAt,
            "price" => SortField::Price,
            "name" => SortField::Name,
            "averageRating" => SortField::AverageRating,
            "ratingCount" => SortField::RatingCount,
            "inStock" => SortField::InStock,
            _ => return None,
        };

        Some(Self { field, descending })
    }
}

/// Catalog listing filters
#[derive(Debug, Clone, Default)]
pub struct ProductFilter {
    /// Full-text query over name and description
    pub q: Option<String>,
    pub category: Option<String>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    /// Minimum units in stock
    pub min_stock: Option<i32>,
    /// Minimum average rating
    pub min_rating: Option<f64>,
}

impl ProductFilter {
    /// Reduces a comma-separated rating selection ("4,3") to its lowest value
    ///
    /// Unparseable entries are ignored.
    pub fn min_rating_from_list(ratings: &str) -> Option<f64> {
        ratings
            .split(',')
            .filter_map(|r| r.trim().parse::<f64>().ok())
            .filter(|r| r.is_finite())
            .reduce(f64::min)
    }

    fn push_where(&self, builder: &mut QueryBuilder<'_, Postgres>) {
        builder.push(" WHERE is_active");

        if let Some(q) = self.q.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
            builder
                .push(" AND search @@ plainto_tsquery('english', ")
                .push_bind(q.to_string())
                .push(")");
        }
        if let Some(category) = &self.category {
            builder.push(" AND category = ").push_bind(category.clone());
        }
        if let Some(min) = self.min_price {
            builder.push(" AND price >= ").push_bind(min);
        }
        if let Some(max) = self.max_price {
            builder.push(" AND price <= ").push_bind(max);
        }
        if let Some(stock) = self.min_stock {
            builder.push(" AND in_stock >= ").push_bind(stock);
        }
        if let Some(rating) = self.min_rating {
            builder.push(" AND average_rating >= ").push_bind(rating);
        }
    }
}

impl Product {
    /// Lists active products matching `filter`, returning the page and the total match count
    pub async fn list(
        pool: &PgPool,
        filter: &ProductFilter,
        sort: ProductSort,
        page: PageRequest,
    ) -> Result<(Vec<Self>, i64), sqlx::Error> {
        let mut count_query = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM products");
        filter.push_where(&mut count_query);
        let total: i64 = count_query.build_query_scalar().fetch_one(pool).await?;

        let mut query = QueryBuilder::<Postgres>::new(
            "SELECT id, name, description, images, price, category, in_stock, is_active, \
             average_rating, rating_count, created_at, updated_at FROM products",
        );
        filter.push_where(&mut query);

        let direction = if sort.descending { "DESC" } else { "ASC" };
        query
            .push(" ORDER BY ")
            .push(sort.field.column())
            .push(" ")
            .push(direction)
            .push(", id ")
            .push(direction)
            .push(" LIMIT ")
            .push_bind(page.sql_limit())
            .push(" OFFSET ")
            .push_bind(page.offset());

        let items = query.build_query_as::<Product>().fetch_all(pool).await?;
        Ok((items, total))
    }

    /// Distinct categories of active products, alphabetically
    pub async fn categories(pool: &PgPool) -> Result<Vec<String>, sqlx::Error> {
        sqlx::query_scalar(
            r#"
            SELECT DISTINCT category
            FROM products
            WHERE is_active AND category IS NOT NULL AND category <> ''
            ORDER BY category
            "#,
        )
        .fetch_all(pool)
        .await
    }

    /// Finds a product by ID regardless of its active flag
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Product>(
            r#"
            SELECT id, name, description, images, price, category, in_stock, is_active,
                   average_rating, rating_count, created_at, updated_at
            FROM products
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// Finds a product and locks its row until the surrounding transaction ends
    pub async fn find_for_update(
        conn: &mut PgConnection,
        id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Product>(
            r#"
            SELECT id, name, description, images, price, category, in_stock, is_active,
                   average_rating, rating_count, created_at, updated_at
            FROM products
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(id)
        .fetch_optional(conn)
        .await
    }

    /// Counts all products, active or not
    pub async fn count(pool: &PgPool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(pool)
            .await
    }

    /// Creates a product
    pub async fn create(pool: &PgPool, data: NewProduct) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Product>(
            r#"
            INSERT INTO products (name, description, images, price, category, in_stock, is_active)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, name, description, images, price, category, in_stock, is_active,
                      average_rating, rating_count, created_at, updated_at
            "#,
        )
        .bind(data.name)
        .bind(data.description)
        .bind(data.images)
        .bind(data.price)
        .bind(data.category)
        .bind(data.in_stock)
        .bind(data.is_active)
        .fetch_one(pool)
        .await
    }

    /// Applies a partial update, returning None if the product doesn't exist
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        patch: ProductPatch,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Product>(
            r#"
            UPDATE products
            SET name = COALESCE($2, name),
                description = COALESCE($3, description),
                images = COALESCE($4, images),
                price = COALESCE($5, price),
                category = COALESCE($6, category),
                in_stock = COALESCE($7, in_stock),
                is_active = COALESCE($8, is_active),
                updated_at = NOW()
            WHERE id = $1
            RETURNING id, name, description, images, price, category, in_stock, is_active,
                      average_rating, rating_count, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(patch.name)
        .bind(patch.description)
        .bind(patch.images)
        .bind(patch.price)
        .bind(patch.category)
        .bind(patch.in_stock)
        .bind(patch.is_active)
        .fetch_optional(pool)
        .await
    }

    /// Deletes a product, returning the removed row so its hosted images can be cleaned up
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Product>(
            r#"
            DELETE FROM products
            WHERE id = $1
            RETURNING id, name, description, images, price, category, in_stock, is_active,
                      average_rating, rating_count, created_at, updated_at
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// Takes `quantity` units out of stock if enough are available
    ///
    /// Returns false, changing nothing, when stock is insufficient.
    pub async fn decrement_stock(
        conn: &mut PgConnection,
        id: Uuid,
        quantity: i32,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE products
            SET in_stock = in_stock - $2, updated_at = NOW()
            WHERE id = $1 AND in_stock >= $2
            "#,
        )
        .bind(id)
        .bind(quantity)
        .execute(conn)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Returns units to stock, ignoring products that have since been deleted
    ///
    /// Saturates at the largest stock count the column can hold.
    pub async fn restock(
        conn: &mut PgConnection,
        id: Uuid,
        quantity: i32,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE products
            SET in_stock = LEAST(in_stock::bigint + $2, 2147483647)::integer,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(quantity)
        .execute(conn)
        .await?;
        Ok(())
    }

    /// Recomputes `average_rating` and `rating_count` from approved reviews
    pub async fn refresh_rating(conn: &mut PgConnection, id: Uuid) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE products p
            SET average_rating = stats.average,
                rating_count = stats.count
            FROM (
                SELECT COALESCE(AVG(rating)::float8, 0) AS average,
                       COUNT(*)::int4 AS count
                FROM reviews
                WHERE product_id = $1 AND is_approved
            ) stats
            WHERE p.id = $1
            "#,
        )
        .bind(id)
        .execute(conn)
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_sort_parse() {
        assert_eq!(ProductSort::parse("-createdAt"), Some(ProductSort::default()));
        assert_eq!(
            ProductSort::parse("price"),
            Some(ProductSort {
                field: SortField::Price,
                descending: false
            })
        );
        assert_eq!(
            ProductSort::parse("-averageRating"),
            Some(ProductSort {
                field: SortField::AverageRating,
                descending: true
            })
        );
        assert_eq!(ProductSort::parse("password_hash"), None);
        assert_eq!(ProductSort::parse("price; DROP TABLE products"), None);
        assert_eq!(ProductSort::parse("--price"), None);
    }

    #[test]
    fn test_min_rating_from_list() {
        assert_eq!(ProductFilter::min_rating_from_list("4,3"), Some(3.0));
        assert_eq!(ProductFilter::min_rating_from_list("5"), Some(5.0));
        assert_eq!(ProductFilter::min_rating_from_list(" 4 , x, 2"), Some(2.0));
        assert_eq!(ProductFilter::min_rating_from_list(""), None);
        assert_eq!(ProductFilter::min_rating_from_list("abc"), None);
    }

    #[test]
    fn test_filters_use_bind_parameters() {
        let filter = ProductFilter {
            q: Some("ghee".to_string()),
            category: Some("Milk'; --".to_string()),
            min_price: Some(Decimal::from_str("1.50").unwrap()),
            max_price: None,
            min_stock: Some(10),
            min_rating: Some(4.0),
        };

        let mut builder = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM products");
        filter.push_where(&mut builder);
        let sql = builder.sql();

        assert!(sql.contains("WHERE is_active"));
        assert!(sql.contains("search @@ plainto_tsquery('english', $1)"));
        assert!(sql.contains("category = $2"));
        assert!(sql.contains("price >= $3"));
        assert!(!sql.contains("price <="));
        assert!(sql.contains("in_stock >= $4"));
        assert!(sql.contains("average_rating >= $5"));
        assert!(!sql.contains("Milk"));
    }

    #[test]
    fn test_blank_query_is_ignored() {
        let filter = ProductFilter {
            q: Some("   ".to_string()),
            ..Default::default()
        };

        let mut builder = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM products");
        filter.push_where(&mut builder);
        assert!(!builder.sql().contains("plainto_tsquery"));
    }

    #[test]
    fn test_product_json_shape() {
        let now = Utc::now();
        let product = Product {
            id: Uuid::new_v4(),
            name: "Desi Ghee 500g".to_string(),
            description: None,
            images: vec!["https://img.example/ghee.jpg".to_string()],
            price: Decimal::from_str("7.99").unwrap(),
            category: Some("Ghee".to_string()),
            in_stock: 200,
            is_active: true,
            average_rating: 4.5,
            rating_count: 2,
            created_at: now,
            updated_at: now,
        };

        assert_eq!(product.primary_image(), Some("https://img.example/ghee.jpg"));

        let json = serde_json::to_value(&product).unwrap();
        assert_eq!(json["price"], serde_json::json!(7.99));
        assert_eq!(json["inStock"], 200);
        assert_eq!(json["averageRating"], 4.5);
        assert_eq!(json["isActive"], true);
    }
}
