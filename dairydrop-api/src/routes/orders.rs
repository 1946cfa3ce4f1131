/// Order endpoints
///
/// # Endpoints
///
/// - `POST /api/orders` - Checkout from the cart or an explicit item list
/// - `GET /api/orders/me` - Caller's orders
/// - `GET /api/orders/:id` - One of the caller's orders
/// - `POST /api/orders/:id/cancel` - Cancel a pending order
/// - `GET /api/orders` - All orders (admin)
/// - `PATCH /api/orders/:id/status` - Move an order along the status machine (admin)

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::{trimmed, trimmed_opt, QueryParams, ValidatedJson},
};
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use dairydrop_shared::{
    auth::middleware::AuthContext,
    models::order::{Order, OrderStatus, PlaceOrder, RequestedItem, ShippingAddress},
};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;
use validator::Validate;

/// Shipping address supplied at checkout
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ShippingAddressRequest {
    #[serde(deserialize_with = "trimmed")]
    #[validate(length(min = 1, message = "Recipient name is required"))]
    pub name: String,

    #[serde(deserialize_with = "trimmed")]
    #[validate(length(min = 6, message = "Phone must be at least 6 characters"))]
    pub phone: String,

    #[serde(deserialize_with = "trimmed")]
    #[validate(length(min = 1, message = "Address line 1 is required"))]
    pub line1: String,

    #[serde(default, deserialize_with = "trimmed_opt")]
    pub line2: Option<String>,

    #[serde(deserialize_with = "trimmed")]
    #[validate(length(min = 1, message = "City is required"))]
    pub city: String,

    #[serde(default, deserialize_with = "trimmed_opt")]
    pub state: Option<String>,

    #[serde(default, deserialize_with = "trimmed_opt")]
    pub postal_code: Option<String>,

    #[serde(deserialize_with = "trimmed")]
    #[validate(length(min = 1, message = "Country is required"))]
    pub country: String,
}

/// Explicit checkout line
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemRequest {
    pub product_id: Uuid,

    #[validate(range(min = 1, max = 10000, message = "Quantity must be between 1 and 10000"))]
    pub quantity: i32,
}

fn default_true() -> bool {
    true
}

/// Checkout request
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrderRequest {
    #[validate(nested)]
    pub address: ShippingAddressRequest,

    #[serde(default)]
    #[validate(nested)]
    pub items: Vec<OrderItemRequest>,

    #[serde(default = "default_true")]
    pub from_cart: bool,
}

impl From<PlaceOrderRequest> for PlaceOrder {
    fn from(req: PlaceOrderRequest) -> Self {
        let a = req.address;
        PlaceOrder {
            address: ShippingAddress {
                name: a.name,
                phone: a.phone,
                line1: a.line1,
                line2: a.line2,
                city: a.city,
                state: a.state,
                postal_code: a.postal_code,
                country: a.country,
            },
            items: req
                .items
                .into_iter()
                .map(|i| RequestedItem {
                    product_id: i.product_id,
                    quantity: i.quantity,
                })
                .collect(),
            from_cart: req.from_cart,
        }
    }
}

/// Admin listing filter
#[derive(Debug, Default, Deserialize)]
pub struct OrderListQuery {
    pub status: Option<OrderStatus>,
}

/// Status change request
#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: OrderStatus,
}

#[derive(Debug, Serialize)]
pub struct OrderResponse {
    pub order: Order,
}

#[derive(Debug, Serialize)]
pub struct OrdersResponse {
    pub orders: Vec<Order>,
}

/// Place an order
///
/// Stock is checked and decremented in the same transaction that stores the
/// order, so a failed check leaves stock untouched.
///
/// # Errors
///
/// - `400 Bad Request`: Empty cart, inactive product or insufficient stock
/// - `404 Not Found`: Unknown product
pub async fn place_order(
    State(state): State<AppState>,
    auth: AuthContext,
    ValidatedJson(req): ValidatedJson<PlaceOrderRequest>,
) -> ApiResult<(StatusCode, Json<OrderResponse>)> {
    let order = Order::place(&state.db, auth.user_id, req.into()).await?;
    Ok((StatusCode::CREATED, Json(OrderResponse { order })))
}

/// Caller's orders, newest first
pub async fn my_orders(
    State(state): State<AppState>,
    auth: AuthContext,
) -> ApiResult<Json<OrdersResponse>> {
    let orders = Order::list_for_user(&state.db, auth.user_id).await?;
    Ok(Json(OrdersResponse { orders }))
}

/// One of the caller's orders
pub async fn get_order(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<OrderResponse>> {
    let order = Order::find_for_user(&state.db, auth.user_id, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Order not found".to_string()))?;

    Ok(Json(OrderResponse { order }))
}

/// Cancel a pending order
pub async fn cancel_order(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<OrderResponse>> {
    let order = Order::cancel_for_user(&state.db, auth.user_id, id).await?;
    Ok(Json(OrderResponse { order }))
}

/// All orders (admin)
pub async fn list_all_orders(
    State(state): State<AppState>,
    QueryParams(query): QueryParams<OrderListQuery>,
) -> ApiResult<Json<OrdersResponse>> {
    let orders = Order::list_all(&state.db, query.status).await?;
    Ok(Json(OrdersResponse { orders }))
}

/// Change an order's status (admin)
///
/// # Errors
///
/// - `400 Bad Request`: Transition not allowed
/// - `404 Not Found`: Unknown order
pub async fn update_order_status(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
    payload: Result<Json<UpdateStatusRequest>, JsonRejection>,
) -> ApiResult<Json<OrderResponse>> {
    let Json(req) = payload?;
    let order = Order::update_status(&state.db, id, req.status).await?;
    info!(order_id = %id, admin_id = %auth.user_id, status = %order.status, "Order updated by admin");
    Ok(Json(OrderResponse { order }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn address() -> serde_json::Value {
        json!({
            "name": "Asha",
            "phone": "9876543210",
            "line1": "12 MG Road",
            "city": "Pune",
            "postalCode": "411001",
            "country": "India"
        })
    }

    #[test]
    fn test_from_cart_defaults_to_true() {
        let req: PlaceOrderRequest = serde_json::from_value(json!({ "address": address() })).unwrap();

        assert!(req.from_cart);
        assert!(req.items.is_empty());
        assert!(req.validate().is_ok());

        let order: PlaceOrder = req.into();
        assert!(order.uses_cart());
        assert_eq!(order.address.postal_code.as_deref(), Some("411001"));
    }

    #[test]
    fn test_explicit_items() {
        let product_id = Uuid::new_v4();
        let req: PlaceOrderRequest = serde_json::from_value(json!({
            "address": address(),
            "items": [{ "productId": product_id, "quantity": 2 }],
            "fromCart": false
        }))
        .unwrap();

        let order: PlaceOrder = req.into();
        assert!(!order.uses_cart());
        assert_eq!(order.items, vec![RequestedItem { product_id, quantity: 2 }]);
    }

    #[test]
    fn test_nested_validation() {
        let mut bad_address = address();
        bad_address["phone"] = json!("12");

        let req: PlaceOrderRequest = serde_json::from_value(json!({
            "address": bad_address,
            "items": [{ "productId": Uuid::new_v4(), "quantity": 0 }],
            "fromCart": false
        }))
        .unwrap();

        let errors = req.validate().unwrap_err();
        let keys: Vec<_> = errors.errors().keys().map(|k| k.to_string()).collect();
        assert!(keys.contains(&"address".to_string()));
        assert!(keys.contains(&"items".to_string()));
    }

    #[test]
    fn test_item_quantity_upper_bound() {
        let request = |quantity: i32| -> PlaceOrderRequest {
            serde_json::from_value(json!({
                "address": address(),
                "items": [{ "productId": Uuid::new_v4(), "quantity": quantity }],
                "fromCart": false
            }))
            .unwrap()
        };

        assert!(request(10_000).validate().is_ok());
        assert!(request(10_001).validate().is_err());
    }

    #[test]
    fn test_status_request_uses_variant_names() {
        let req: UpdateStatusRequest = serde_json::from_value(json!({ "status": "Shipped" })).unwrap();
        assert_eq!(req.status, OrderStatus::Shipped);

        assert!(serde_json::from_value::<UpdateStatusRequest>(json!({ "status": "Lost" })).is_err());
    }
}
