/// Orders, order items and checkout
///
/// An order is an immutable snapshot of what was bought: item names, prices
/// and images are copied at checkout, and the shipping address is stored as
/// JSONB on the order row. Only `status` and `payment_status` change later.
///
/// # Status Machine
///
/// ```text
/// Pending ──► Confirmed ──► Shipped ──► Delivered
///    │            │
///    └────────────┴──► Cancelled
/// ```
///
/// Checkout, cancellation and status changes each run in a single
/// transaction. Stock is decremented with a guarded update while the product
/// rows are locked, so a failed checkout leaves every stock count untouched.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{types::Json, PgConnection, PgPool};
use tracing::{debug, info};
use uuid::Uuid;

use super::address::{Address, NewAddress};
use super::cart::CartItem;
use super::product::Product;
use super::user::User;

/// Order lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "order_status")]
pub enum OrderStatus {
    /// Placed, awaiting confirmation
    Pending,

    /// Accepted by the shop
    Confirmed,

    /// Handed to delivery
    Shipped,

    /// Received by the customer (cash collected)
    Delivered,

    /// Cancelled by the customer or the shop
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "Pending",
            OrderStatus::Confirmed => "Confirmed",
            OrderStatus::Shipped => "Shipped",
            OrderStatus::Delivered => "Delivered",
            OrderStatus::Cancelled => "Cancelled",
        }
    }

    /// Whether no further transitions are possible
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }

    /// Checks if transition to target status is valid
    pub fn can_transition_to(&self, target: OrderStatus) -> bool {
        match (self, target) {
            (OrderStatus::Pending, OrderStatus::Confirmed) => true,
            (OrderStatus::Pending, OrderStatus::Cancelled) => true,

            (OrderStatus::Confirmed, OrderStatus::Shipped) => true,
            (OrderStatus::Confirmed, OrderStatus::Cancelled) => true,

            (OrderStatus::Shipped, OrderStatus::Delivered) => true,

            _ => false,
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payment method; cash on delivery is the only one offered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "payment_method")]
pub enum PaymentMethod {
    #[sqlx(rename = "COD")]
    #[serde(rename = "COD")]
    Cod,
}

/// Payment state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "payment_status")]
pub enum PaymentStatus {
    Unpaid,
    Paid,
}

/// Shipping address snapshot stored with the order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingAddress {
    /// Recipient name
    pub name: String,
    pub phone: String,
    pub line1: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line2: Option<String>,
    pub city: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
    pub country: String,
}

/// A purchased line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    #[serde(rename = "product")]
    pub product_id: Uuid,
    pub name: String,
    pub price: Decimal,
    pub quantity: i32,
    pub image: Option<String>,
}

impl OrderItem {
    pub fn line_total(&self) -> Decimal {
        self.price * Decimal::from(self.quantity)
    }
}

/// An order with its items
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: Uuid,
    #[serde(rename = "user")]
    pub user_id: Uuid,
    pub items: Vec<OrderItem>,
    pub address: ShippingAddress,
    pub total_amount: Decimal,
    pub status: OrderStatus,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: Uuid,
    user_id: Uuid,
    address: Json<ShippingAddress>,
    total_amount: Decimal,
    status: OrderStatus,
    payment_method: PaymentMethod,
    payment_status: PaymentStatus,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, sqlx::FromRow)]
struct OrderItemRow {
    order_id: Uuid,
    #[sqlx(flatten)]
    item: OrderItem,
}

impl OrderRow {
    fn into_order(self, items: Vec<OrderItem>) -> Order {
        Order {
            id: self.id,
            user_id: self.user_id,
            items,
            address: self.address.0,
            total_amount: self.total_amount,
            status: self.status,
            payment_method: self.payment_method,
            payment_status: self.payment_status,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// A product and quantity requested at checkout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestedItem {
    pub product_id: Uuid,
    pub quantity: i32,
}

/// Checkout input
#[derive(Debug, Clone)]
pub struct PlaceOrder {
    pub address: ShippingAddress,
    /// Explicit items; ignored when `from_cart` is set
    pub items: Vec<RequestedItem>,
    pub from_cart: bool,
}

impl PlaceOrder {
    /// Items come from the cart when asked to, or when no explicit items were given
    pub fn uses_cart(&self) -> bool {
        self.from_cart || self.items.is_empty()
    }
}

/// Error type for order operations
#[derive(Debug, thiserror::Error)]
pub enum OrderError {
    #[error("User not found")]
    UserNotFound,

    #[error("Order not found")]
    NotFound,

    #[error("Cart is empty")]
    CartEmpty,

    #[error("{0}")]
    ProductNotFound(String),

    #[error("Product inactive: {0}")]
    ProductInactive(String),

    #[error("Insufficient stock for {0}")]
    InsufficientStock(String),

    #[error("Only pending orders can be cancelled")]
    NotPending,

    #[error("Order total exceeds the maximum of {max}")]
    TotalTooLarge { max: Decimal },

    #[error("Cannot change order status from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Largest total that fits `orders.total_amount NUMERIC(12, 2)`
pub fn max_order_total() -> Decimal {
    Decimal::new(999_999_999_999, 2)
}

/// Sum of price × quantity over the items
pub fn order_total(items: &[OrderItem]) -> Decimal {
    items.iter().map(OrderItem::line_total).sum()
}

fn checked_total(items: &[OrderItem]) -> Result<Decimal, OrderError> {
    let total = order_total(items);
    let max = max_order_total();
    if total > max {
        return Err(OrderError::TotalTooLarge { max });
    }
    Ok(total)
}

/// Checks every line against the locked products and returns the first problem
///
/// Quantities of repeated products are summed before comparing with stock.
fn check_availability(
    items: &[OrderItem],
    products: &HashMap<Uuid, Product>,
) -> Result<(), OrderError> {
    let mut wanted: BTreeMap<Uuid, i64> = BTreeMap::new();
    for item in items {
        *wanted.entry(item.product_id).or_default() += i64::from(item.quantity);
    }

    for item in items {
        let product = products
            .get(&item.product_id)
            .ok_or_else(|| OrderError::ProductNotFound(format!("Product not found: {}", item.name)))?;

        if !product.is_active {
            return Err(OrderError::ProductInactive(product.name.clone()));
        }
        if i64::from(product.in_stock) < wanted[&item.product_id] {
            return Err(OrderError::InsufficientStock(product.name.clone()));
        }
    }

    Ok(())
}

/// Locks the given products in ID order so concurrent checkouts can't deadlock
async fn lock_products(
    conn: &mut PgConnection,
    ids: impl IntoIterator<Item = Uuid>,
) -> Result<HashMap<Uuid, Product>, sqlx::Error> {
    let mut ids: Vec<Uuid> = ids.into_iter().collect();
    ids.sort();
    ids.dedup();

    let mut products = HashMap::with_capacity(ids.len());
    for id in ids {
        if let Some(product) = Product::find_for_update(conn, id).await? {
            products.insert(id, product);
        }
    }
    Ok(products)
}

async fn load_items(
    conn: &mut PgConnection,
    order_ids: &[Uuid],
) -> Result<HashMap<Uuid, Vec<OrderItem>>, sqlx::Error> {
    let rows = sqlx::query_as::<_, OrderItemRow>(
        r#"
        SELECT order_id, product_id, name, price, quantity, image
        FROM order_items
        WHERE order_id = ANY($1)
        ORDER BY order_id, position
        "#,
    )
    .bind(order_ids)
    .fetch_all(conn)
    .await?;

    let mut grouped: HashMap<Uuid, Vec<OrderItem>> = HashMap::new();
    for row in rows {
        grouped.entry(row.order_id).or_default().push(row.item);
    }
    Ok(grouped)
}

async fn assemble(conn: &mut PgConnection, rows: Vec<OrderRow>) -> Result<Vec<Order>, sqlx::Error> {
    let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
    let mut items = load_items(conn, &ids).await?;

    Ok(rows
        .into_iter()
        .map(|row| {
            let lines = items.remove(&row.id).unwrap_or_default();
            row.into_order(lines)
        })
        .collect())
}

async fn find_row_for_update(
    conn: &mut PgConnection,
    id: Uuid,
    owner: Option<Uuid>,
) -> Result<Option<OrderRow>, sqlx::Error> {
    sqlx::query_as::<_, OrderRow>(
        r#"
        SELECT id, user_id, address, total_amount, status, payment_method, payment_status,
               created_at, updated_at
        FROM orders
        WHERE id = $1 AND ($2::uuid IS NULL OR user_id = $2)
        FOR UPDATE
        "#,
    )
    .bind(id)
    .bind(owner)
    .fetch_optional(conn)
    .await
}

async fn restock_items(conn: &mut PgConnection, order_id: Uuid) -> Result<(), sqlx::Error> {
    let items = load_items(conn, &[order_id]).await?;
    for item in items.get(&order_id).into_iter().flatten() {
        Product::restock(conn, item.product_id, item.quantity).await?;
    }
    Ok(())
}

impl Order {
    /// Places an order for `user_id`
    ///
    /// # Errors
    ///
    /// - `UserNotFound` if the account no longer exists
    /// - `CartEmpty` when checking out an empty cart
    /// - `ProductNotFound`, `ProductInactive`, `InsufficientStock` for bad lines
    pub async fn place(pool: &PgPool, user_id: Uuid, input: PlaceOrder) -> Result<Self, OrderError> {
        let mut tx = pool.begin().await?;

        if !User::lock(&mut tx, user_id).await? {
            return Err(OrderError::UserNotFound);
        }

        let uses_cart = input.uses_cart();
        let items: Vec<OrderItem> = if uses_cart {
            let cart = CartItem::list_for_checkout(&mut tx, user_id).await?;
            if cart.is_empty() {
                return Err(OrderError::CartEmpty);
            }
            cart.into_iter()
                .map(|c| OrderItem {
                    product_id: c.product_id,
                    name: c.name,
                    price: c.price,
                    quantity: c.quantity,
                    image: c.image,
                })
                .collect()
        } else {
            let products = lock_products(&mut tx, input.items.iter().map(|i| i.product_id)).await?;
            input
                .items
                .iter()
                .map(|requested| {
                    let product = products
                        .get(&requested.product_id)
                        .ok_or_else(|| OrderError::ProductNotFound("Product not found".to_string()))?;
                    Ok(OrderItem {
                        product_id: product.id,
                        name: product.name.clone(),
                        price: product.price,
                        quantity: requested.quantity,
                        image: product.primary_image().map(str::to_string),
                    })
                })
                .collect::<Result<_, OrderError>>()?
        };

        let products = lock_products(&mut tx, items.iter().map(|i| i.product_id)).await?;
        check_availability(&items, &products)?;
        let total_amount = checked_total(&items)?;

        for item in &items {
            if !Product::decrement_stock(&mut tx, item.product_id, item.quantity).await? {
                return Err(OrderError::InsufficientStock(item.name.clone()));
            }
        }

        let row = sqlx::query_as::<_, OrderRow>(
            r#"
            INSERT INTO orders (user_id, address, total_amount, status, payment_method, payment_status)
            VALUES ($1, $2, $3, 'Pending', 'COD', 'Unpaid')
            RETURNING id, user_id, address, total_amount, status, payment_method, payment_status,
                      created_at, updated_at
            "#,
        )
        .bind(user_id)
        .bind(Json(&input.address))
        .bind(total_amount)
        .fetch_one(&mut *tx)
        .await?;

        for (position, item) in items.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO order_items (order_id, position, product_id, name, price, quantity, image)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                "#,
            )
            .bind(row.id)
            .bind(position as i32)
            .bind(item.product_id)
            .bind(&item.name)
            .bind(item.price)
            .bind(item.quantity)
            .bind(&item.image)
            .execute(&mut *tx)
            .await?;
        }

        let address = &input.address;
        let known = Address::exists_matching(
            &mut tx,
            user_id,
            &address.line1,
            &address.city,
            address.postal_code.as_deref(),
        )
        .await?;
        if !known {
            debug!(user_id = %user_id, "Saving shipping address to address book");
            Address::add(
                &mut tx,
                user_id,
                NewAddress {
                    label: Some(address.name.clone()),
                    line1: address.line1.clone(),
                    line2: address.line2.clone(),
                    city: address.city.clone(),
                    state: address.state.clone(),
                    postal_code: address.postal_code.clone(),
                    country: address.country.clone(),
                    is_default: false,
                },
            )
            .await?;
        }

        if uses_cart {
            CartItem::clear(&mut *tx, user_id).await?;
        }

        tx.commit().await?;

        info!(
            order_id = %row.id,
            user_id = %user_id,
            items = items.len(),
            total = %total_amount,
            "Order placed"
        );

        Ok(row.into_order(items))
    }

    /// Lists a user's orders, newest first
    pub async fn list_for_user(pool: &PgPool, user_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        let mut conn = pool.acquire().await?;
        let rows = sqlx::query_as::<_, OrderRow>(
            r#"
            SELECT id, user_id, address, total_amount, status, payment_method, payment_status,
                   created_at, updated_at
            FROM orders
            WHERE user_id = $1
            ORDER BY created_at DESC, id
            "#,
        )
        .bind(user_id)
        .fetch_all(&mut *conn)
        .await?;

        assemble(&mut conn, rows).await
    }

    /// Lists all orders, newest first, optionally filtered by status
    pub async fn list_all(
        pool: &PgPool,
        status: Option<OrderStatus>,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let mut conn = pool.acquire().await?;
        let rows = sqlx::query_as::<_, OrderRow>(
            r#"
            SELECT id, user_id, address, total_amount, status, payment_method, payment_status,
                   created_at, updated_at
            FROM orders
            WHERE $1::order_status IS NULL OR status = $1
            ORDER BY created_at DESC, id
            "#,
        )
        .bind(status)
        .fetch_all(&mut *conn)
        .await?;

        assemble(&mut conn, rows).await
    }

    /// Finds one of the user's orders
    pub async fn find_for_user(
        pool: &PgPool,
        user_id: Uuid,
        id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut conn = pool.acquire().await?;
        let row = sqlx::query_as::<_, OrderRow>(
            r#"
            SELECT id, user_id, address, total_amount, status, payment_method, payment_status,
                   created_at, updated_at
            FROM orders
            WHERE id = $1 AND user_id = $2
            "#,
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(&mut *conn)
        .await?;

        match row {
            Some(row) => Ok(assemble(&mut conn, vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    /// Cancels one of the user's pending orders and returns its items to stock
    pub async fn cancel_for_user(
        pool: &PgPool,
        user_id: Uuid,
        id: Uuid,
    ) -> Result<Self, OrderError> {
        let mut tx = pool.begin().await?;

        let row = find_row_for_update(&mut tx, id, Some(user_id))
            .await?
            .ok_or(OrderError::NotFound)?;
        if row.status != OrderStatus::Pending {
            return Err(OrderError::NotPending);
        }

        let row = set_status(&mut tx, id, OrderStatus::Cancelled, row.payment_status).await?;
        restock_items(&mut tx, id).await?;
        let order = assemble(&mut tx, vec![row]).await?.pop().ok_or(OrderError::NotFound)?;

        tx.commit().await?;

        info!(order_id = %id, user_id = %user_id, "Order cancelled by customer");
        Ok(order)
    }

    /// Moves an order to `target` along the status machine
    ///
    /// Setting the current status again is a no-op. `Delivered` marks the
    /// order paid and `Cancelled` returns its items to stock.
    pub async fn update_status(
        pool: &PgPool,
        id: Uuid,
        target: OrderStatus,
    ) -> Result<Self, OrderError> {
        let mut tx = pool.begin().await?;

        let row = find_row_for_update(&mut tx, id, None)
            .await?
            .ok_or(OrderError::NotFound)?;

        let row = if row.status == target {
            row
        } else {
            if !row.status.can_transition_to(target) {
                return Err(OrderError::InvalidTransition {
                    from: row.status,
                    to: target,
                });
            }

            let payment_status = if target == OrderStatus::Delivered {
                PaymentStatus::Paid
            } else {
                row.payment_status
            };
            let updated = set_status(&mut tx, id, target, payment_status).await?;
            if target == OrderStatus::Cancelled {
                restock_items(&mut tx, id).await?;
            }
            info!(order_id = %id, from = %row.status, to = %target, "Order status changed");
            updated
        };

        let order = assemble(&mut tx, vec![row]).await?.pop().ok_or(OrderError::NotFound)?;
        tx.commit().await?;
        Ok(order)
    }
}

async fn set_status(
    conn: &mut PgConnection,
    id: Uuid,
    status: OrderStatus,
    payment_status: PaymentStatus,
) -> Result<OrderRow, sqlx::Error> {
    sqlx::query_as::<_, OrderRow>(
        r#"
        UPDATE orders
        SET status = $2, payment_status = $3, updated_at = NOW()
        WHERE id = $1
        RETURNING id, user_id, address, total_amount, status, payment_method, payment_status,
                  created_at, updated_at
        "#,
    )
    .bind(id)
    .bind(status)
    .bind(payment_status)
    .fetch_one(conn)
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(value: &str) -> Decimal {
        Decimal::from_str(value).unwrap()
    }

    fn product(name: &str, in_stock: i32, is_active: bool) -> Product {
        let now = Utc::now();
        Product {
            id: Uuid::new_v4(),
            name: name.to_string(),
            description: None,
            images: vec![],
            price: dec("2.49"),
            category: Some("Milk".to_string()),
            in_stock,
            is_active,
            average_rating: 0.0,
            rating_count: 0,
            created_at: now,
            updated_at: now,
        }
    }

    fn item_for(product: &Product, quantity: i32) -> OrderItem {
        OrderItem {
            product_id: product.id,
            name: product.name.clone(),
            price: product.price,
            quantity,
            image: None,
        }
    }

    #[test]
    fn test_status_transitions() {
        use OrderStatus::*;

        assert!(Pending.can_transition_to(Confirmed));
        assert!(Pending.can_transition_to(Cancelled));
        assert!(Confirmed.can_transition_to(Shipped));
        assert!(Confirmed.can_transition_to(Cancelled));
        assert!(Shipped.can_transition_to(Delivered));

        assert!(!Pending.can_transition_to(Shipped));
        assert!(!Pending.can_transition_to(Delivered));
        assert!(!Shipped.can_transition_to(Cancelled));
        assert!(!Delivered.can_transition_to(Pending));
        assert!(!Cancelled.can_transition_to(Pending));
        assert!(!Cancelled.can_transition_to(Confirmed));
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(OrderStatus::Delivered.is_terminal());
        assert!(OrderStatus::Cancelled.is_terminal());
        assert!(!OrderStatus::Pending.is_terminal());
        assert!(!OrderStatus::Shipped.is_terminal());
    }

    #[test]
    fn test_status_json_spelling() {
        assert_eq!(serde_json::to_value(OrderStatus::Pending).unwrap(), "Pending");
        assert_eq!(serde_json::to_value(PaymentMethod::Cod).unwrap(), "COD");
        assert_eq!(serde_json::to_value(PaymentStatus::Unpaid).unwrap(), "Unpaid");

        let parsed: OrderStatus = serde_json::from_value(serde_json::json!("Shipped")).unwrap();
        assert_eq!(parsed, OrderStatus::Shipped);
        assert!(serde_json::from_value::<OrderStatus>(serde_json::json!("shipped")).is_err());
    }

    #[test]
    fn test_order_total() {
        let milk = product("Fresh Cow Milk 1L", 10, true);
        let items = vec![item_for(&milk, 2), OrderItem { price: dec("7.99"), ..item_for(&milk, 1) }];

        assert_eq!(order_total(&items), dec("12.97"));
        assert_eq!(order_total(&[]), Decimal::ZERO);
    }

    #[test]
    fn test_checked_total_rejects_totals_beyond_column() {
        let ghee = product("Desi Ghee 500g", 10_000, true);
        let at_limit = vec![OrderItem { price: dec("999999999.99"), ..item_for(&ghee, 10) }];
        assert_eq!(checked_total(&at_limit).unwrap(), dec("9999999999.90"));

        let over = vec![OrderItem { price: dec("99999999.99"), ..item_for(&ghee, 10_000) }];
        match checked_total(&over) {
            Err(e @ OrderError::TotalTooLarge { .. }) => {
                assert_eq!(e.to_string(), "Order total exceeds the maximum of 9999999999.99")
            }
            other => panic!("expected TotalTooLarge, got {:?}", other),
        }
    }

    #[test]
    fn test_check_availability_ok() {
        let milk = product("Fresh Cow Milk 1L", 5, true);
        let items = vec![item_for(&milk, 5)];
        let products = HashMap::from([(milk.id, milk)]);

        assert!(check_availability(&items, &products).is_ok());
    }

    #[test]
    fn test_check_availability_insufficient_stock() {
        let ghee = product("Desi Ghee 500g", 1, true);
        let items = vec![item_for(&ghee, 2)];
        let products = HashMap::from([(ghee.id, ghee)]);

        match check_availability(&items, &products) {
            Err(e @ OrderError::InsufficientStock(_)) => {
                assert_eq!(e.to_string(), "Insufficient stock for Desi Ghee 500g")
            }
            other => panic!("expected InsufficientStock, got {:?}", other),
        }
    }

    #[test]
    fn test_check_availability_sums_repeated_lines() {
        let paneer = product("Paneer 250g", 3, true);
        let items = vec![item_for(&paneer, 2), item_for(&paneer, 2)];
        let products = HashMap::from([(paneer.id, paneer)]);

        assert!(matches!(
            check_availability(&items, &products),
            Err(OrderError::InsufficientStock(_))
        ));
    }

    #[test]
    fn test_check_availability_inactive_and_missing() {
        let yogurt = product("Yogurt 500g", 100, false);
        let items = vec![item_for(&yogurt, 1)];
        let products = HashMap::from([(yogurt.id, yogurt.clone())]);

        let err = check_availability(&items, &products).unwrap_err();
        assert_eq!(err.to_string(), "Product inactive: Yogurt 500g");

        let err = check_availability(&items, &HashMap::new()).unwrap_err();
        assert_eq!(err.to_string(), "Product not found: Yogurt 500g");
    }

    #[test]
    fn test_uses_cart() {
        let address = ShippingAddress {
            name: "Asha".to_string(),
            phone: "5550100".to_string(),
            line1: "12 Dairy Lane".to_string(),
            line2: None,
            city: "Pune".to_string(),
            state: None,
            postal_code: None,
            country: "India".to_string(),
        };
        let requested = vec![RequestedItem { product_id: Uuid::new_v4(), quantity: 1 }];

        let explicit = PlaceOrder { address: address.clone(), items: requested.clone(), from_cart: false };
        assert!(!explicit.uses_cart());

        let forced = PlaceOrder { address: address.clone(), items: requested, from_cart: true };
        assert!(forced.uses_cart());

        let empty = PlaceOrder { address, items: vec![], from_cart: false };
        assert!(empty.uses_cart());
    }

    #[test]
    fn test_invalid_transition_message() {
        let err = OrderError::InvalidTransition {
            from: OrderStatus::Delivered,
            to: OrderStatus::Pending,
        };
        assert_eq!(err.to_string(), "Cannot change order status from Delivered to Pending");
    }
}
