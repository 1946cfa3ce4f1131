/// User administration endpoints (admin only)

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use dairydrop_shared::{
    auth::middleware::AuthContext,
    models::user::{User, UserRole},
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;

/// Role change request; the role is checked by hand for a clearer error
#[derive(Debug, Deserialize)]
pub struct UpdateRoleRequest {
    pub role: String,
}

/// Activation change request
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStatusRequest {
    pub is_active: bool,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub user: User,
}

fn user_not_found() -> ApiError {
    ApiError::NotFound("User not found".to_string())
}

/// List all users, newest first
pub async fn list_users(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let users = User::list(&state.db).await?;
    Ok(Json(json!({ "users": users })))
}

/// Get one user
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<UserResponse>> {
    let user = User::find_by_id(&state.db, id)
        .await?
        .ok_or_else(user_not_found)?;

    Ok(Json(UserResponse { user }))
}

/// Change a user's role
///
/// # Errors
///
/// - `400 Bad Request`: Role is not `user` or `admin`
pub async fn update_user_role(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
    payload: Result<Json<UpdateRoleRequest>, JsonRejection>,
) -> ApiResult<Json<UserResponse>> {
    let Json(req) = payload?;
    let role = UserRole::parse(req.role.trim())
        .ok_or_else(|| ApiError::BadRequest("Invalid role".to_string()))?;

    let user = User::set_role(&state.db, id, role)
        .await?
        .ok_or_else(user_not_found)?;

    info!(user_id = %id, admin_id = %auth.user_id, role = role.as_str(), "User role changed");
    Ok(Json(UserResponse { user }))
}

/// Activate or deactivate a user
///
/// # Errors
///
/// - `400 Bad Request`: Admin tried to deactivate their own account
pub async fn update_user_status(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
    payload: Result<Json<UpdateStatusRequest>, JsonRejection>,
) -> ApiResult<Json<UserResponse>> {
    let Json(req) = payload?;
    if id == auth.user_id && !req.is_active {
        return Err(ApiError::BadRequest(
            "You cannot deactivate your own account".to_string(),
        ));
    }

    let user = User::set_active(&state.db, id, req.is_active)
        .await?
        .ok_or_else(user_not_found)?;

    info!(user_id = %id, admin_id = %auth.user_id, active = req.is_active, "User status changed");
    Ok(Json(UserResponse { user }))
}

/// Delete a user and everything they own
pub async fn delete_user(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Value>> {
    if !User::delete(&state.db, id).await? {
        return Err(user_not_found());
    }

    info!(user_id = %id, admin_id = %auth.user_id, "User deleted");
    Ok(Json(json!({ "message": "User deleted" })))
}
