/// Authentication and profile endpoints
///
/// # Endpoints
///
/// - `POST /api/auth/register` - Register and receive a token
/// - `POST /api/auth/login` - Log in by email or phone
/// - `GET /api/auth/me` - Current user with addresses and cart
/// - `PATCH /api/auth/me` - Update name, email or phone
/// - `POST /api/auth/change-password` - Change password

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::{trimmed, trimmed_opt, ValidatedJson},
};
use axum::{extract::State, http::StatusCode, Json};
use dairydrop_shared::{
    auth::{
        jwt::{create_token, Claims},
        middleware::AuthContext,
        password::{hash_password, verify_password},
    },
    models::{
        address::Address,
        cart::CartItem,
        user::{normalize_email, CreateUser, UpdateUser, User, UserRole},
    },
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{info, warn};
use validator::Validate;

/// Register request
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[serde(deserialize_with = "trimmed")]
    #[validate(length(min = 2, message = "Name must be at least 2 characters"))]
    pub name: String,

    #[serde(deserialize_with = "trimmed")]
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[serde(deserialize_with = "trimmed")]
    #[validate(length(min = 6, message = "Phone must be at least 6 characters"))]
    pub phone: String,

    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
}

/// Login request
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    /// Email address or phone number
    #[serde(deserialize_with = "trimmed")]
    #[validate(length(min = 3, message = "Email or phone is required"))]
    pub email_or_phone: String,

    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
}

/// Token response for register and login
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: User,
}

/// Profile update request
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[serde(default, deserialize_with = "trimmed_opt")]
    #[validate(length(min = 2, message = "Name must be at least 2 characters"))]
    pub name: Option<String>,

    #[serde(default, deserialize_with = "trimmed_opt")]
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,

    #[serde(default, deserialize_with = "trimmed_opt")]
    #[validate(length(min = 6, message = "Phone must be at least 6 characters"))]
    pub phone: Option<String>,
}

/// Password change request
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub old_password: String,

    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub new_password: String,
}

/// The signed-in user with their address book and cart
#[derive(Debug, Serialize)]
pub struct UserProfile {
    #[serde(flatten)]
    pub user: User,
    pub addresses: Vec<Address>,
    pub cart: Vec<CartItem>,
}

/// Issues an access token for the user
pub(crate) fn issue_token(state: &AppState, user: &User) -> ApiResult<String> {
    let claims = Claims::new(user.id, user.role, state.config.jwt.expires_in);
    Ok(create_token(&claims, state.jwt_secret())?)
}

/// Register a new customer account
///
/// # Errors
///
/// - `400 Bad Request`: Validation failed
/// - `409 Conflict`: Email or phone already in use
pub async fn register(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<AuthResponse>)> {
    let email = normalize_email(&req.email);

    if User::contact_taken(&state.db, Some(&email), Some(&req.phone), None).await? {
        return Err(ApiError::Conflict("Email or phone already in use".to_string()));
    }

    let password_hash = hash_password(&req.password)?;
    let user = User::create(
        &state.db,
        CreateUser {
            name: req.name,
            email,
            phone: req.phone,
            password_hash,
            role: UserRole::User,
        },
    )
    .await?;

    let token = issue_token(&state, &user)?;
    info!(user_id = %user.id, "User registered");

    Ok((StatusCode::CREATED, Json(AuthResponse { token, user })))
}

/// Log in with email or phone and password
///
/// # Errors
///
/// - `401 Unauthorized`: Unknown account or wrong password
/// - `403 Forbidden`: Account deactivated
pub async fn login(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<LoginRequest>,
) -> ApiResult<Json<AuthResponse>> {
    let invalid = || ApiError::Unauthorized("Invalid credentials".to_string());

    let user = User::find_by_login(&state.db, &req.email_or_phone)
        .await?
        .ok_or_else(invalid)?;

    if !verify_password(&req.password, &user.password_hash)? {
        warn!(user_id = %user.id, "Failed login attempt");
        return Err(invalid());
    }

    if !user.is_active {
        return Err(ApiError::Forbidden("Account is deactivated".to_string()));
    }

    let token = issue_token(&state, &user)?;
    info!(user_id = %user.id, "User logged in");

    Ok(Json(AuthResponse { token, user }))
}

/// Current user profile
pub async fn me(State(state): State<AppState>, auth: AuthContext) -> ApiResult<Json<Value>> {
    let user = User::find_by_id(&state.db, auth.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    let addresses = Address::list_for_user(&state.db, user.id).await?;
    let cart = CartItem::list_for_user(&state.db, user.id).await?;

    Ok(Json(json!({ "user": UserProfile { user, addresses, cart } })))
}

/// Update the current user's name, email or phone
///
/// # Errors
///
/// - `409 Conflict`: Email or phone belongs to another account
pub async fn update_profile(
    State(state): State<AppState>,
    auth: AuthContext,
    ValidatedJson(req): ValidatedJson<UpdateProfileRequest>,
) -> ApiResult<Json<Value>> {
    if (req.email.is_some() || req.phone.is_some())
        && User::contact_taken(
            &state.db,
            req.email.as_deref(),
            req.phone.as_deref(),
            Some(auth.user_id),
        )
        .await?
    {
        return Err(ApiError::Conflict("Email or phone already in use".to_string()));
    }

    let user = User::update_profile(
        &state.db,
        auth.user_id,
        UpdateUser {
            name: req.name,
            email: req.email,
            phone: req.phone,
        },
    )
    .await?
    .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(Json(json!({ "user": user })))
}

/// Change the current user's password
///
/// # Errors
///
/// - `400 Bad Request`: Old password incorrect
pub async fn change_password(
    State(state): State<AppState>,
    auth: AuthContext,
    ValidatedJson(req): ValidatedJson<ChangePasswordRequest>,
) -> ApiResult<Json<Value>> {
    let user = User::find_by_id(&state.db, auth.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    if !verify_password(&req.old_password, &user.password_hash)? {
        return Err(ApiError::BadRequest("Old password incorrect".to_string()));
    }

    let password_hash = hash_password(&req.new_password)?;
    User::update_password(&state.db, user.id, &password_hash).await?;
    info!(user_id = %user.id, "Password changed");

    Ok(Json(json!({ "message": "Password updated" })))
}
