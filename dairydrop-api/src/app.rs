/// Application state and router builder
///
/// # Example
///
/// ```no_run
/// use dairydrop_api::{app::{build_router, AppState}, config::Config};
/// use dairydrop_shared::media::DisabledImageStore;
/// use sqlx::PgPool;
/// use std::sync::Arc;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let pool = PgPool::connect(&config.database.url).await?;
/// let state = AppState::new(pool, config, Arc::new(DisabledImageStore));
/// let app = build_router(state);
/// # Ok(())
/// # }
/// ```

use crate::{
    config::Config,
    error::ApiError,
    middleware::{
        rate_limit::{rate_limit_layer, RateLimiter},
        security::SecurityHeadersLayer,
    },
};
use axum::{
    extract::{DefaultBodyLimit, Request, State},
    http::{header, HeaderValue, Method},
    middleware::{from_fn, from_fn_with_state, Next},
    response::Response,
    routing::{delete, get, patch, post},
    Router,
};
use dairydrop_shared::{
    auth::{
        authorization::require_role,
        middleware::{authenticate, AuthContext},
    },
    media::ImageStore,
    models::user::UserRole,
};
use sqlx::PgPool;
use std::{sync::Arc, time::Instant};
use tower_http::{
    compression::CompressionLayer,
    cors::CorsLayer,
    limit::RequestBodyLimitLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// JSON body limit
pub const JSON_BODY_LIMIT: usize = 1024 * 1024;

/// Body limit on product routes, which accept image uploads
pub const UPLOAD_BODY_LIMIT: usize = 10 * 1024 * 1024;

/// Shared application state
///
/// Cloned for each request handler via Axum's `State` extractor; every field
/// is cheap to clone.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: PgPool,

    /// Application configuration
    pub config: Arc<Config>,

    /// Product image host
    pub images: Arc<dyn ImageStore>,

    /// Per-client request budget
    pub rate_limiter: Arc<RateLimiter>,

    /// Process start, for uptime reporting
    pub started_at: Instant,
}

impl AppState {
    /// Creates new application state
    pub fn new(db: PgPool, config: Config, images: Arc<dyn ImageStore>) -> Self {
        let rate_limiter = Arc::new(RateLimiter::new(config.rate_limit));
        Self {
            db,
            config: Arc::new(config),
            images,
            rate_limiter,
            started_at: Instant::now(),
        }
    }

    /// Gets JWT secret for token operations
    pub fn jwt_secret(&self) -> &str {
        &self.config.jwt.secret
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// ```text
/// /                               # Service banner (public)
/// /api/
/// ├── health                      # Health check (public)
/// ├── auth/                       # Register, login, profile, addresses, cart
/// ├── products/                   # Catalog (public reads, admin writes)
/// ├── orders/                     # Checkout and order history (user), fulfilment (admin)
/// ├── reviews/                    # Reviews (public reads, user writes, admin moderation)
/// └── users/                      # User administration (admin)
/// ```
///
/// # Middleware Stack
///
/// Outermost first: security headers, CORS, compression, tracing, body
/// limits, rate limiting, then per-route authentication and role guards.
pub fn build_router(state: AppState) -> Router {
    use crate::routes;

    let auth_layer = || from_fn_with_state(state.clone(), jwt_auth_layer);

    // Auth routes: register and login are public, everything else needs a token
    let auth_routes = Router::new()
        .route("/me", get(routes::auth::me).patch(routes::auth::update_profile))
        .route("/change-password", post(routes::auth::change_password))
        .route(
            "/addresses",
            get(routes::addresses::list_addresses).post(routes::addresses::add_address),
        )
        .route(
            "/addresses/:id",
            patch(routes::addresses::update_address).delete(routes::addresses::delete_address),
        )
        .route(
            "/cart",
            get(routes::cart::get_cart)
                .post(routes::cart::add_to_cart)
                .patch(routes::cart::update_cart_item)
                .delete(routes::cart::clear_cart),
        )
        .route("/cart/:product_id", delete(routes::cart::remove_cart_item))
        .layer(auth_layer())
        .route("/register", post(routes::auth::register))
        .route("/login", post(routes::auth::login));

    let product_routes = Router::new()
        .route("/", post(routes::products::create_product))
        .route(
            "/:id",
            patch(routes::products::update_product).delete(routes::products::delete_product),
        )
        .layer(from_fn(require_admin))
        .layer(auth_layer())
        .route("/", get(routes::products::list_products))
        .route("/categories", get(routes::products::list_categories))
        .route("/:id", get(routes::products::get_product))
        .layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT));

    let order_admin_routes = Router::new()
        .route("/", get(routes::orders::list_all_orders))
        .route("/:id/status", patch(routes::orders::update_order_status))
        .layer(from_fn(require_admin));

    let order_routes = Router::new()
        .route("/", post(routes::orders::place_order))
        .route("/me", get(routes::orders::my_orders))
        .route("/:id", get(routes::orders::get_order))
        .route("/:id/cancel", post(routes::orders::cancel_order))
        .merge(order_admin_routes)
        .layer(auth_layer());

    let review_routes = Router::new()
        .route("/admin", get(routes::reviews::list_all_reviews))
        .route("/:id/moderate", patch(routes::reviews::moderate_review))
        .route("/:id", delete(routes::reviews::delete_review))
        .layer(from_fn(require_admin))
        .route("/", post(routes::reviews::add_or_update_review))
        .route("/product/:product_id", delete(routes::reviews::delete_my_review))
        .layer(auth_layer())
        .route("/product/:product_id", get(routes::reviews::list_product_reviews));

    let user_routes = Router::new()
        .route("/", get(routes::users::list_users))
        .route(
            "/:id",
            get(routes::users::get_user).delete(routes::users::delete_user),
        )
        .route("/:id/role", patch(routes::users::update_user_role))
        .route("/:id/status", patch(routes::users::update_user_status))
        .layer(from_fn(require_admin))
        .layer(auth_layer());

    let api_routes = Router::new()
        .route("/health", get(routes::health::health_check))
        .nest("/auth", auth_routes)
        .nest("/products", product_routes)
        .nest("/orders", order_routes)
        .nest("/reviews", review_routes)
        .nest("/users", user_routes);

    Router::new()
        .route("/", get(routes::health::root))
        .nest("/api", api_routes)
        .fallback(routes::health::not_found)
        .layer(from_fn_with_state(state.clone(), rate_limit_layer))
        .layer(DefaultBodyLimit::max(JSON_BODY_LIMIT))
        .layer(RequestBodyLimitLayer::new(UPLOAD_BODY_LIMIT))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(CompressionLayer::new())
        .layer(cors_layer(&state.config))
        .layer(SecurityHeadersLayer::new(state.config.is_production()))
        .with_state(state)
}

/// CORS: permissive for `*`, otherwise an explicit origin list with credentials
fn cors_layer(config: &Config) -> CorsLayer {
    if config.cors_allows_any() {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = config
        .api
        .cors_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
        .max_age(std::time::Duration::from_secs(3600))
}

/// JWT authentication middleware layer
///
/// Validates the bearer token and injects [`AuthContext`] into request
/// extensions.
async fn jwt_auth_layer(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth_context = authenticate(req.headers(), state.jwt_secret())?;
    req.extensions_mut().insert(auth_context);
    Ok(next.run(req).await)
}

/// Admin role guard; must run after [`jwt_auth_layer`]
async fn require_admin(auth: AuthContext, req: Request, next: Next) -> Result<Response, ApiError> {
    require_role(&auth, UserRole::Admin)?;
    Ok(next.run(req).await)
}
