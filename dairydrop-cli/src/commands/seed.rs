//! Seed data for a fresh installation.
//!
//! # Usage
//!
//! ```bash
//! ADMIN_EMAIL=owner@dairydrop.test dairydrop seed
//! ```
//!
//! # Environment Variables
//!
//! - `ADMIN_EMAIL` - Admin account to create or promote (skipped when unset)
//! - `ADMIN_PHONE` - Phone for a newly created admin (random when unset)
//! - `ADMIN_PASSWORD` - Password for the admin; generated and logged when unset

use dairydrop_shared::{
    auth::password::{generate_password, hash_password},
    models::{
        product::{NewProduct, Product},
        user::{normalize_email, CreateUser, User, UserRole},
    },
};
use rand::Rng;
use rust_decimal::Decimal;
use sqlx::PgPool;
use tracing::{info, warn};

/// Length of generated admin passwords
const GENERATED_PASSWORD_LENGTH: usize = 16;

/// Admin account settings
#[derive(Debug, Clone, Default)]
pub struct AdminSeed {
    pub email: String,
    pub phone: Option<String>,
    pub password: Option<String>,
}

/// What happened to the admin account
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminOutcome {
    /// No `ADMIN_EMAIL` configured
    Skipped,

    /// New account; carries the password if it was generated
    Created { generated_password: Option<String> },

    /// Existing account promoted, password reset only when one was supplied
    Updated { password_reset: bool },
}

/// A random 10-digit phone number starting with 9
pub fn random_phone() -> String {
    let mut rng = rand::thread_rng();
    let digits: String = (0..9)
        .map(|_| char::from(b'0' + rng.gen_range(0..10u8)))
        .collect();
    format!("9{}", digits)
}

/// Creates the admin account or promotes the existing one
pub async fn seed_admin(pool: &PgPool, seed: Option<AdminSeed>) -> anyhow::Result<AdminOutcome> {
    let Some(seed) = seed.filter(|s| !s.email.trim().is_empty()) else {
        warn!("ADMIN_EMAIL not set; skipping admin seed");
        return Ok(AdminOutcome::Skipped);
    };
    let email = normalize_email(&seed.email);

    if let Some(existing) = User::find_by_email(pool, &email).await? {
        User::promote_to_admin(pool, &email).await?;

        let password_reset = match seed.password.as_deref() {
            Some(password) => {
                User::update_password(pool, existing.id, &hash_password(password)?).await?;
                true
            }
            None => false,
        };

        info!(email = %email, password_reset, "Ensured admin role");
        return Ok(AdminOutcome::Updated { password_reset });
    }

    let (password, generated) = match seed.password {
        Some(password) => (password, false),
        None => (generate_password(GENERATED_PASSWORD_LENGTH), true),
    };

    let admin = User::create(
        pool,
        CreateUser {
            name: "Administrator".to_string(),
            email,
            phone: seed.phone.unwrap_or_else(random_phone),
            password_hash: hash_password(&password)?,
            role: UserRole::Admin,
        },
    )
    .await?;
    info!(user_id = %admin.id, email = %admin.email, "Created admin");

    if generated {
        warn!(password = %password, "Generated ADMIN_PASSWORD; store it now, it is not shown again");
    }

    Ok(AdminOutcome::Created {
        generated_password: generated.then_some(password),
    })
}

/// The sample dairy catalog
pub fn sample_products() -> Vec<NewProduct> {
    let product = |name: &str, description: &str, cents: i64, category: &str, stock: i32| NewProduct {
        name: name.to_string(),
        description: Some(description.to_string()),
        images: Vec::new(),
        price: Decimal::new(cents, 2),
        category: Some(category.to_string()),
        in_stock: stock,
        is_active: true,
    };

    vec![
        product(
            "Fresh Cow Milk 1L",
            "Pure fresh cow milk, pasteurized. Ideal for daily use.",
            249,
            "Milk",
            500,
        ),
        product(
            "Buffalo Milk 1L",
            "Creamy buffalo milk, rich taste and high nutrition.",
            299,
            "Milk",
            300,
        ),
        product(
            "Desi Ghee 500g",
            "Traditional clarified butter made from cow milk.",
            799,
            "Ghee",
            200,
        ),
        product("Yogurt 500g", "Fresh and thick plain yogurt.", 199, "Yogurt", 400),
        product(
            "Paneer 250g",
            "Soft cottage cheese, perfect for cooking.",
            349,
            "Cheese",
            250,
        ),
    ]
}

/// Inserts the sample catalog when the products table is empty
///
/// Returns the number of products inserted.
pub async fn seed_products(pool: &PgPool) -> anyhow::Result<usize> {
    let existing = Product::count(pool).await?;
    if existing > 0 {
        info!(existing, "Products exist; skipping sample insert");
        return Ok(0);
    }

    let mut tx = pool.begin().await?;
    let items = sample_products();
    let inserted = items.len();
    for item in items {
        sqlx::query(
            r#"
            INSERT INTO products (name, description, images, price, category, in_stock, is_active)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(item.name)
        .bind(item.description)
        .bind(item.images)
        .bind(item.price)
        .bind(item.category)
        .bind(item.in_stock)
        .bind(item.is_active)
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await?;

    info!(inserted, "Inserted sample products");
    Ok(inserted)
}
