/// Product catalog endpoints
///
/// Reads are public. Create and update accept either a JSON body or a
/// `multipart/form-data` form whose `images` file parts are uploaded to the
/// image host and replace the product's image list.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult, ValidationErrorDetail},
    extract::QueryParams,
};
use axum::{
    async_trait,
    extract::{FromRequest, Multipart, Path, Request, State},
    http::{header, StatusCode},
    Json,
};
use dairydrop_shared::{
    media::{delete_all_best_effort, upload_all, ImageUpload},
    models::{
        page::PageRequest,
        product::{NewProduct, Product, ProductFilter, ProductPatch, ProductSort, DEFAULT_PAGE_SIZE},
    },
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::{collections::HashMap, str::FromStr};
use tracing::info;
use uuid::Uuid;

/// Catalog query string
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub sort: Option<String>,
    pub q: Option<String>,
    pub category: Option<String>,
    pub min_price: Option<String>,
    pub max_price: Option<String>,
    pub in_stock: Option<String>,
    /// Comma-separated star values; the lowest is used as the floor
    pub ratings: Option<String>,
}

/// One page of the catalog
#[derive(Debug, Serialize)]
pub struct ProductPage {
    pub items: Vec<Product>,
    pub total: i64,
    pub page: u32,
    pub pages: i64,
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

impl ProductQuery {
    /// Parses filters, sort and paging, rejecting malformed numbers and unknown sort fields
    pub fn parse(&self) -> ApiResult<(ProductFilter, ProductSort, PageRequest)> {
        let mut details = Vec::new();

        let mut decimal = |field: &str, value: Option<&str>| -> Option<Decimal> {
            let raw = non_blank(value)?;
            match Decimal::from_str(raw) {
                Ok(v) => Some(v),
                Err(_) => {
                    details.push(ValidationErrorDetail::new(field, "Must be a number"));
                    None
                }
            }
        };
        let min_price = decimal("minPrice", self.min_price.as_deref());
        let max_price = decimal("maxPrice", self.max_price.as_deref());

        let min_stock = match non_blank(self.in_stock.as_deref()) {
            Some(raw) => match raw.parse::<i32>() {
                Ok(v) => Some(v),
                Err(_) => {
                    details.push(ValidationErrorDetail::new("inStock", "Must be an integer"));
                    None
                }
            },
            None => None,
        };

        let sort = match non_blank(self.sort.as_deref()) {
            Some(raw) => match ProductSort::parse(raw) {
                Some(sort) => sort,
                None => {
                    details.push(ValidationErrorDetail::new(
                        "sort",
                        format!("Unsupported sort field: {}", raw),
                    ));
                    ProductSort::default()
                }
            },
            None => ProductSort::default(),
        };

        if !details.is_empty() {
            return Err(ApiError::ValidationError(details));
        }

        let filter = ProductFilter {
            q: non_blank(self.q.as_deref()).map(str::to_string),
            category: non_blank(self.category.as_deref()).map(str::to_string),
            min_price,
            max_price,
            min_stock,
            min_rating: non_blank(self.ratings.as_deref()).and_then(ProductFilter::min_rating_from_list),
        };
        let page = PageRequest::new(self.page, self.limit, DEFAULT_PAGE_SIZE);

        Ok((filter, sort, page))
    }
}

/// Product fields from a JSON or multipart body
///
/// Values are kept as text until [`ProductForm::into_patch`] so both body
/// types share one set of coercion and validation rules.
#[derive(Debug, Default)]
pub struct ProductForm {
    values: HashMap<String, String>,
    image_urls: Option<Vec<String>>,
    files: Vec<ImageUpload>,
}

#[async_trait]
impl<S> FromRequest<S> for ProductForm
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_multipart = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("multipart/form-data"));

        if is_multipart {
            let multipart = Multipart::from_request(req, state)
                .await
                .map_err(|e| ApiError::BadRequest(e.body_text()))?;
            Self::from_multipart(multipart).await
        } else {
            let Json(body) = Json::<Map<String, Value>>::from_request(req, state).await?;
            Ok(Self::from_json(body))
        }
    }
}

impl ProductForm {
    async fn from_multipart(mut multipart: Multipart) -> ApiResult<Self> {
        let mut form = ProductForm::default();

        while let Some(field) = multipart.next_field().await? {
            let name = field.name().unwrap_or_default().to_string();

            if let Some(file_name) = field.file_name().map(str::to_string) {
                if name != "images" {
                    return Err(ApiError::invalid_field(&name, "Unexpected file field"));
                }
                let content_type = field.content_type().map(str::to_string);
                let bytes = field.bytes().await?;
                form.files
                    .push(ImageUpload::new(file_name, content_type.as_deref(), bytes));
            } else {
                let text = field.text().await?;
                form.values.insert(name, text);
            }
        }

        Ok(form)
    }

    fn from_json(body: Map<String, Value>) -> Self {
        let mut form = ProductForm::default();

        for (key, value) in body {
            match (key.as_str(), value) {
                ("images", Value::Array(items)) => {
                    form.image_urls = Some(
                        items
                            .into_iter()
                            .filter_map(|v| v.as_str().map(str::to_string))
                            .collect(),
                    );
                }
                (_, Value::String(s)) => {
                    form.values.insert(key, s);
                }
                (_, Value::Number(n)) => {
                    form.values.insert(key, n.to_string());
                }
                (_, Value::Bool(b)) => {
                    form.values.insert(key, b.to_string());
                }
                _ => {}
            }
        }

        form
    }

    /// Whether image files were attached
    pub fn has_files(&self) -> bool {
        !self.files.is_empty()
    }

    fn text(&self, key: &str) -> Option<String> {
        non_blank(self.values.get(key).map(String::as_str)).map(str::to_string)
    }

    /// Coerces and validates the fields, returning the patch and any attached files
    ///
    /// With `require_core` set, `name`, `price` and `inStock` must be present.
    pub fn into_patch(self, require_core: bool) -> ApiResult<(ProductPatch, Vec<ImageUpload>)> {
        let mut details = Vec::new();

        let name = self.text("name");
        match &name {
            Some(n) if n.chars().count() < 2 => {
                details.push(ValidationErrorDetail::new("name", "Name must be at least 2 characters"))
            }
            None if require_core => {
                details.push(ValidationErrorDetail::new("name", "Name is required"))
            }
            _ => {}
        }

        let price = match self.text("price") {
            Some(raw) => match Decimal::from_str(&raw) {
                Ok(p) if p >= Decimal::ZERO => Some(p.round_dp(2)),
                _ => {
                    details.push(ValidationErrorDetail::new(
                        "price",
                        "Price must be a non-negative number",
                    ));
                    None
                }
            },
            None => {
                if require_core {
                    details.push(ValidationErrorDetail::new("price", "Price is required"));
                }
                None
            }
        };

        let in_stock = match self.text("inStock") {
            Some(raw) => match raw.parse::<i32>() {
                Ok(n) if n >= 0 => Some(n),
                _ => {
                    details.push(ValidationErrorDetail::new(
                        "inStock",
                        "Stock must be a non-negative integer",
                    ));
                    None
                }
            },
            None => {
                if require_core {
                    details.push(ValidationErrorDetail::new("inStock", "Stock is required"));
                }
                None
            }
        };

        let is_active = match self.text("isActive").as_deref() {
            Some("true") | Some("1") => Some(true),
            Some("false") | Some("0") => Some(false),
            Some(_) => {
                details.push(ValidationErrorDetail::new("isActive", "Must be true or false"));
                None
            }
            None => None,
        };

        if !details.is_empty() {
            return Err(ApiError::ValidationError(details));
        }

        let description = self.text("description");
        let category = self.text("category");
        let patch = ProductPatch {
            name,
            description,
            images: self.image_urls,
            price,
            category,
            in_stock,
            is_active,
        };

        Ok((patch, self.files))
    }
}

fn not_found() -> ApiError {
    ApiError::NotFound("Product not found".to_string())
}

/// List active products
///
/// # Errors
///
/// - `400 Bad Request`: Malformed number or unsupported sort field
pub async fn list_products(
    State(state): State<AppState>,
    QueryParams(query): QueryParams<ProductQuery>,
) -> ApiResult<Json<ProductPage>> {
    let (filter, sort, page) = query.parse()?;
    let (items, total) = Product::list(&state.db, &filter, sort, page).await?;

    Ok(Json(ProductPage {
        items,
        total,
        page: page.page,
        pages: page.pages(total),
    }))
}

/// Distinct categories of active products
pub async fn list_categories(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let categories = Product::categories(&state.db).await?;
    Ok(Json(json!({ "categories": categories })))
}

/// Get one product
pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Value>> {
    let product = Product::find_by_id(&state.db, id)
        .await?
        .ok_or_else(not_found)?;

    Ok(Json(json!({ "product": product })))
}

/// Create a product (admin)
///
/// # Errors
///
/// - `400 Bad Request`: Missing or invalid fields, bad image files
/// - `503 Service Unavailable`: Files attached but no image host configured
pub async fn create_product(
    State(state): State<AppState>,
    form: ProductForm,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let (patch, files) = form.into_patch(true)?;

    let mut images = patch.images.unwrap_or_default();
    let uploaded = !files.is_empty();
    if uploaded {
        images = upload_all(state.images.as_ref(), files).await?;
    }

    let data = NewProduct {
        name: patch.name.unwrap_or_default(),
        description: patch.description,
        images,
        price: patch.price.unwrap_or_default(),
        category: patch.category,
        in_stock: patch.in_stock.unwrap_or_default(),
        is_active: patch.is_active.unwrap_or(true),
    };
    let image_urls = data.images.clone();

    let product = match Product::create(&state.db, data).await {
        Ok(product) => product,
        Err(e) => {
            if uploaded {
                delete_all_best_effort(state.images.as_ref(), &image_urls).await;
            }
            return Err(e.into());
        }
    };

    info!(product_id = %product.id, name = %product.name, "Product created");
    Ok((StatusCode::CREATED, Json(json!({ "product": product }))))
}

/// Update a product (admin)
///
/// Uploaded files replace the image list; the previous hosted images are
/// removed once the update is stored.
pub async fn update_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    form: ProductForm,
) -> ApiResult<Json<Value>> {
    let existing = Product::find_by_id(&state.db, id)
        .await?
        .ok_or_else(not_found)?;

    let (mut patch, files) = form.into_patch(false)?;
    let uploaded = !files.is_empty();
    if uploaded {
        patch.images = Some(upload_all(state.images.as_ref(), files).await?);
    }
    let replaced = patch.images.is_some();
    let new_urls = patch.images.clone().unwrap_or_default();

    let product = match Product::update(&state.db, id, patch).await {
        Ok(Some(product)) => product,
        result => {
            if uploaded {
                delete_all_best_effort(state.images.as_ref(), &new_urls).await;
            }
            return match result {
                Err(e) => Err(e.into()),
                _ => Err(not_found()),
            };
        }
    };

    if replaced {
        let stale: Vec<String> = existing
            .images
            .into_iter()
            .filter(|url| !product.images.contains(url))
            .collect();
        delete_all_best_effort(state.images.as_ref(), &stale).await;
    }

    info!(product_id = %product.id, "Product updated");
    Ok(Json(json!({ "product": product })))
}

/// Delete a product (admin)
pub async fn delete_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Value>> {
    let product = Product::delete(&state.db, id).await?.ok_or_else(not_found)?;

    delete_all_best_effort(state.images.as_ref(), &product.images).await;
    info!(product_id = %product.id, "Product deleted");

    Ok(Json(json!({ "message": "Product deleted" })))
}
