/// Address book endpoints under `/api/auth/addresses`
///
/// Every write runs in a transaction with the user row locked, so two
/// concurrent edits can't both leave a default behind.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::{trimmed, trimmed_opt, ValidatedJson},
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use dairydrop_shared::{
    auth::middleware::AuthContext,
    models::{
        address::{Address, AddressPatch, NewAddress},
        user::User,
    },
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Address to add
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AddAddressRequest {
    #[serde(default, deserialize_with = "trimmed_opt")]
    pub label: Option<String>,

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

    #[serde(default)]
    pub is_default: bool,
}

/// Partial address update
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAddressRequest {
    #[serde(default, deserialize_with = "trimmed_opt")]
    pub label: Option<String>,
    #[serde(default, deserialize_with = "trimmed_opt")]
    pub line1: Option<String>,
    #[serde(default, deserialize_with = "trimmed_opt")]
    pub line2: Option<String>,
    #[serde(default, deserialize_with = "trimmed_opt")]
    pub city: Option<String>,
    #[serde(default, deserialize_with = "trimmed_opt")]
    pub state: Option<String>,
    #[serde(default, deserialize_with = "trimmed_opt")]
    pub postal_code: Option<String>,
    #[serde(default, deserialize_with = "trimmed_opt")]
    pub country: Option<String>,
    pub is_default: Option<bool>,
}

impl From<AddAddressRequest> for NewAddress {
    fn from(req: AddAddressRequest) -> Self {
        NewAddress {
            label: req.label,
            line1: req.line1,
            line2: req.line2,
            city: req.city,
            state: req.state,
            postal_code: req.postal_code,
            country: req.country,
            is_default: req.is_default,
        }
    }
}

impl From<UpdateAddressRequest> for AddressPatch {
    fn from(req: UpdateAddressRequest) -> Self {
        AddressPatch {
            label: req.label,
            line1: req.line1,
            line2: req.line2,
            city: req.city,
            state: req.state,
            postal_code: req.postal_code,
            country: req.country,
            is_default: req.is_default,
        }
    }
}

/// The user's address book
#[derive(Debug, Serialize)]
pub struct AddressesResponse {
    pub addresses: Vec<Address>,
}

fn user_not_found() -> ApiError {
    ApiError::NotFound("User not found".to_string())
}

/// List saved addresses
pub async fn list_addresses(
    State(state): State<AppState>,
    auth: AuthContext,
) -> ApiResult<Json<AddressesResponse>> {
    let addresses = Address::list_for_user(&state.db, auth.user_id).await?;
    Ok(Json(AddressesResponse { addresses }))
}

/// Add an address
pub async fn add_address(
    State(state): State<AppState>,
    auth: AuthContext,
    ValidatedJson(req): ValidatedJson<AddAddressRequest>,
) -> ApiResult<(StatusCode, Json<AddressesResponse>)> {
    let mut tx = state.db.begin().await?;
    if !User::lock(&mut tx, auth.user_id).await? {
        return Err(user_not_found());
    }

    Address::add(&mut tx, auth.user_id, req.into()).await?;
    let addresses = Address::list_for_user(&mut *tx, auth.user_id).await?;
    tx.commit().await?;

    Ok((StatusCode::CREATED, Json(AddressesResponse { addresses })))
}

/// Update an address
///
/// # Errors
///
/// - `404 Not Found`: Address missing or owned by another user
pub async fn update_address(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<UpdateAddressRequest>,
) -> ApiResult<Json<AddressesResponse>> {
    let mut tx = state.db.begin().await?;
    if !User::lock(&mut tx, auth.user_id).await? {
        return Err(user_not_found());
    }

    if !Address::update(&mut tx, auth.user_id, id, req.into()).await? {
        return Err(ApiError::NotFound("Address not found".to_string()));
    }

    let addresses = Address::list_for_user(&mut *tx, auth.user_id).await?;
    tx.commit().await?;

    Ok(Json(AddressesResponse { addresses }))
}

/// Delete an address
pub async fn delete_address(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<AddressesResponse>> {
    let mut tx = state.db.begin().await?;
    if !User::lock(&mut tx, auth.user_id).await? {
        return Err(user_not_found());
    }

    if !Address::delete(&mut tx, auth.user_id, id).await? {
        return Err(ApiError::NotFound("Address not found".to_string()));
    }

    let addresses = Address::list_for_user(&mut *tx, auth.user_id).await?;
    tx.commit().await?;

    Ok(Json(AddressesResponse { addresses }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_add_request_requires_core_fields() {
        let req: AddAddressRequest = serde_json::from_value(json!({
            "line1": "  ",
            "city": "Pune",
            "country": ""
        }))
        .unwrap();

        let errors = req.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("line1"));
        assert!(fields.contains_key("country"));
        assert!(!fields.contains_key("city"));
    }

    #[test]
    fn test_add_request_maps_to_new_address() {
        let req: AddAddressRequest = serde_json::from_value(json!({
            "label": "Home",
            "line1": "12 MG Road",
            "city": "Pune",
            "postalCode": " 411001 ",
            "country": "India",
            "isDefault": true
        }))
        .unwrap();

        let address: NewAddress = req.into();
        assert_eq!(address.postal_code.as_deref(), Some("411001"));
        assert!(address.is_default);
        assert!(address.line2.is_none());
    }

    #[test]
    fn test_patch_defaults_to_no_changes() {
        let patch: AddressPatch = serde_json::from_value::<UpdateAddressRequest>(json!({}))
            .unwrap()
            .into();

        assert!(patch.line1.is_none());
        assert!(patch.is_default.is_none());
    }
}
