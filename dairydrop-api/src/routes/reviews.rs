/// Review endpoints
///
/// Public product listings show approved reviews only. Every write
/// recomputes the product's rating aggregate.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::{trimmed_opt, QueryParams, ValidatedJson},
};
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use dairydrop_shared::{
    auth::middleware::AuthContext,
    models::{
        page::{PageRequest, Pagination},
        review::{Review, ReviewView, DEFAULT_ADMIN_PAGE_SIZE, DEFAULT_PRODUCT_PAGE_SIZE},
    },
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;
use validator::Validate;

/// Create or replace the caller's review of a product
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ReviewRequest {
    pub product_id: Uuid,

    #[validate(range(min = 1, max = 5, message = "Rating must be between 1 and 5"))]
    pub rating: i16,

    #[serde(default, deserialize_with = "trimmed_opt")]
    #[validate(length(max = 2000, message = "Comment must be at most 2000 characters"))]
    pub comment: Option<String>,
}

/// Paging for product reviews
#[derive(Debug, Default, Deserialize)]
pub struct ReviewPageQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

/// Moderation listing query
#[derive(Debug, Default, Deserialize)]
pub struct ModerationQuery {
    pub search: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

/// Moderation decision
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModerateRequest {
    pub is_approved: bool,
}

#[derive(Debug, Serialize)]
pub struct ReviewResponse {
    pub review: Review,
}

/// Approved reviews of a product
#[derive(Debug, Serialize)]
pub struct ProductReviewsResponse {
    pub reviews: Vec<ReviewView>,
    pub pagination: Pagination,
}

/// Reviews for moderation
#[derive(Debug, Serialize)]
pub struct ModerationResponse {
    pub reviews: Vec<ReviewView>,
    pub total: i64,
}

fn review_not_found() -> ApiError {
    ApiError::NotFound("Review not found".to_string())
}

/// Add or update the caller's review
///
/// # Errors
///
/// - `400 Bad Request`: Rating outside 1..=5
/// - `404 Not Found`: Unknown product
pub async fn add_or_update_review(
    State(state): State<AppState>,
    auth: AuthContext,
    ValidatedJson(req): ValidatedJson<ReviewRequest>,
) -> ApiResult<(StatusCode, Json<ReviewResponse>)> {
    let review = Review::upsert(&state.db, req.product_id, auth.user_id, req.rating, req.comment)
        .await?
        .ok_or_else(|| ApiError::NotFound("Product not found".to_string()))?;

    Ok((StatusCode::CREATED, Json(ReviewResponse { review })))
}

/// Approved reviews of one product, newest first
pub async fn list_product_reviews(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
    QueryParams(query): QueryParams<ReviewPageQuery>,
) -> ApiResult<Json<ProductReviewsResponse>> {
    let page = PageRequest::new(query.page, query.limit, DEFAULT_PRODUCT_PAGE_SIZE);
    let (reviews, total) = Review::list_for_product(&state.db, product_id, page).await?;

    Ok(Json(ProductReviewsResponse {
        reviews,
        pagination: page.summary(total),
    }))
}

/// Delete the caller's review of a product
pub async fn delete_my_review(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(product_id): Path<Uuid>,
) -> ApiResult<Json<Value>> {
    if !Review::delete_own(&state.db, product_id, auth.user_id).await? {
        return Err(review_not_found());
    }

    Ok(Json(json!({ "message": "Review removed" })))
}

/// All reviews with optional search (admin)
pub async fn list_all_reviews(
    State(state): State<AppState>,
    QueryParams(query): QueryParams<ModerationQuery>,
) -> ApiResult<Json<ModerationResponse>> {
    let page = PageRequest::new(query.page, query.limit, DEFAULT_ADMIN_PAGE_SIZE);
    let (reviews, total) =
        Review::list_for_moderation(&state.db, query.search.as_deref(), page).await?;

    Ok(Json(ModerationResponse { reviews, total }))
}

/// Approve or hide a review (admin)
pub async fn moderate_review(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
    payload: Result<Json<ModerateRequest>, JsonRejection>,
) -> ApiResult<Json<ReviewResponse>> {
    let Json(req) = payload?;

    let review = Review::moderate(&state.db, id, req.is_approved)
        .await?
        .ok_or_else(review_not_found)?;

    info!(review_id = %id, admin_id = %auth.user_id, approved = req.is_approved, "Review moderated");
    Ok(Json(ReviewResponse { review }))
}

/// Delete any review (admin)
pub async fn delete_review(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Value>> {
    if !Review::delete(&state.db, id).await? {
        return Err(review_not_found());
    }

    info!(review_id = %id, admin_id = %auth.user_id, "Review deleted");
    Ok(Json(json!({ "message": "Review deleted" })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rating_bounds() {
        for (rating, ok) in [(0, false), (1, true), (5, true), (6, false)] {
            let req: ReviewRequest = serde_json::from_value(json!({
                "productId": Uuid::new_v4(),
                "rating": rating
            }))
            .unwrap();
            assert_eq!(req.validate().is_ok(), ok, "rating {}", rating);
        }
    }

    #[test]
    fn test_blank_comment_is_none() {
        let req: ReviewRequest = serde_json::from_value(json!({
            "productId": Uuid::new_v4(),
            "rating": 4,
            "comment": "   "
        }))
        .unwrap();

        assert!(req.comment.is_none());
    }

    #[test]
    fn test_moderate_request() {
        let req: ModerateRequest = serde_json::from_value(json!({ "isApproved": false })).unwrap();
        assert!(!req.is_approved);
        assert!(serde_json::from_value::<ModerateRequest>(json!({})).is_err());
    }
}
