/// Cart endpoints under `/api/auth/cart`

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::ValidatedJson,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use dairydrop_shared::{
    auth::middleware::AuthContext,
    models::{cart::CartItem, product::Product},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Product and quantity for add or update
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CartLineRequest {
    pub product_id: Uuid,

    #[validate(range(min = 1, max = 10000, message = "Quantity must be between 1 and 10000"))]
    pub quantity: i32,
}

/// The user's cart
#[derive(Debug, Serialize)]
pub struct CartResponse {
    pub cart: Vec<CartItem>,
}

async fn current_cart(state: &AppState, user_id: Uuid) -> ApiResult<Json<CartResponse>> {
    let cart = CartItem::list_for_user(&state.db, user_id).await?;
    Ok(Json(CartResponse { cart }))
}

/// Get the cart
pub async fn get_cart(
    State(state): State<AppState>,
    auth: AuthContext,
) -> ApiResult<Json<CartResponse>> {
    current_cart(&state, auth.user_id).await
}

/// Add a product to the cart
///
/// Adding a product that is already in the cart increases its quantity and
/// keeps the original price snapshot.
///
/// # Errors
///
/// - `404 Not Found`: Product missing or inactive
pub async fn add_to_cart(
    State(state): State<AppState>,
    auth: AuthContext,
    ValidatedJson(req): ValidatedJson<CartLineRequest>,
) -> ApiResult<(StatusCode, Json<CartResponse>)> {
    let product = Product::find_by_id(&state.db, req.product_id)
        .await?
        .filter(|p| p.is_active)
        .ok_or_else(|| ApiError::NotFound("Product not found".to_string()))?;

    CartItem::add(&state.db, auth.user_id, &product, req.quantity).await?;

    let cart = current_cart(&state, auth.user_id).await?;
    Ok((StatusCode::CREATED, cart))
}

/// Set the quantity of a cart line
pub async fn update_cart_item(
    State(state): State<AppState>,
    auth: AuthContext,
    ValidatedJson(req): ValidatedJson<CartLineRequest>,
) -> ApiResult<Json<CartResponse>> {
    if !CartItem::set_quantity(&state.db, auth.user_id, req.product_id, req.quantity).await? {
        return Err(ApiError::NotFound("Item not found".to_string()));
    }

    current_cart(&state, auth.user_id).await
}

/// Remove a product from the cart
pub async fn remove_cart_item(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(product_id): Path<Uuid>,
) -> ApiResult<Json<CartResponse>> {
    CartItem::remove(&state.db, auth.user_id, product_id).await?;
    current_cart(&state, auth.user_id).await
}

/// Empty the cart
pub async fn clear_cart(
    State(state): State<AppState>,
    auth: AuthContext,
) -> ApiResult<Json<CartResponse>> {
    CartItem::clear(&state.db, auth.user_id).await?;
    Ok(Json(CartResponse { cart: Vec::new() }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_quantity_must_be_positive() {
        let req: CartLineRequest = serde_json::from_value(json!({
            "productId": Uuid::new_v4(),
            "quantity": 0
        }))
        .unwrap();
        assert!(req.validate().is_err());

        let req: CartLineRequest = serde_json::from_value(json!({
            "productId": Uuid::new_v4(),
            "quantity": 3
        }))
        .unwrap();
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_quantity_upper_bound() {
        let line = |quantity: i64| -> CartLineRequest {
            serde_json::from_value(json!({ "productId": Uuid::new_v4(), "quantity": quantity }))
                .unwrap()
        };

        assert!(line(10_000).validate().is_ok());
        assert!(line(10_001).validate().is_err());
        assert!(line(i64::from(i32::MAX)).validate().is_err());
    }

    #[test]
    fn test_product_id_must_be_uuid() {
        let result = serde_json::from_value::<CartLineRequest>(json!({
            "productId": "abc",
            "quantity": 1
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_empty_cart_response() {
        let json = serde_json::to_value(CartResponse { cart: Vec::new() }).unwrap();
        assert_eq!(json, json!({ "cart": [] }));
    }
}
