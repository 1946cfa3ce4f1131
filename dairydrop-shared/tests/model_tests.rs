/// Integration tests for checkout, cancellation, addresses and reviews
///
/// Require PostgreSQL; ignored by default. See `db_tests.rs` for how to run.

mod common;

use dairydrop_shared::models::address::{Address, NewAddress};
use dairydrop_shared::models::cart::{CartItem, MAX_LINE_QUANTITY};
use dairydrop_shared::models::order::{
    Order, OrderError, OrderStatus, PaymentStatus, PlaceOrder, RequestedItem, ShippingAddress,
};
use dairydrop_shared::models::page::PageRequest;
use dairydrop_shared::models::product::Product;
use dairydrop_shared::models::review::Review;
use dairydrop_shared::models::user::User;
use rust_decimal::Decimal;
use std::str::FromStr;
use uuid::Uuid;

fn shipping() -> ShippingAddress {
    ShippingAddress {
        name: "Asha".to_string(),
        phone: "9876543210".to_string(),
        line1: format!("{} Lake Road", Uuid::new_v4().simple()),
        line2: None,
        city: "Pune".to_string(),
        state: Some("MH".to_string()),
        postal_code: Some("411001".to_string()),
        country: "India".to_string(),
    }
}

fn explicit(items: Vec<(Uuid, i32)>) -> PlaceOrder {
    PlaceOrder {
        address: shipping(),
        items: items
            .into_iter()
            .map(|(product_id, quantity)| RequestedItem { product_id, quantity })
            .collect(),
        from_cart: false,
    }
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_checkout_from_cart_snapshots_and_clears() {
    let pool = common::setup().await;
    let user = common::create_user(&pool).await;
    let milk = common::create_product(&pool, "Cow Milk 1L", "2.49", 10).await;

    CartItem::add(&pool, user.id, &milk, 2).await.unwrap();
    CartItem::add(&pool, user.id, &milk, 1).await.unwrap();

    // Price change after adding does not affect the cart snapshot
    sqlx::query("UPDATE products SET price = 9.99 WHERE id = $1")
        .bind(milk.id)
        .execute(&pool)
        .await
        .unwrap();

    let order = Order::place(
        &pool,
        user.id,
        PlaceOrder { address: shipping(), items: vec![], from_cart: true },
    )
    .await
    .unwrap();

    assert_eq!(order.items.len(), 1);
    assert_eq!(order.items[0].quantity, 3);
    assert_eq!(order.total_amount, Decimal::from_str("7.47").unwrap());
    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(order.payment_status, PaymentStatus::Unpaid);

    assert_eq!(common::stock_of(&pool, milk.id).await, 7);
    assert!(CartItem::list_for_user(&pool, user.id).await.unwrap().is_empty());

    // Shipping address saved and made default as the first address
    let addresses = Address::list_for_user(&pool, user.id).await.unwrap();
    assert_eq!(addresses.len(), 1);
    assert!(addresses[0].is_default);
    assert_eq!(addresses[0].label.as_deref(), Some("Asha"));
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_insufficient_stock_changes_nothing() {
    let pool = common::setup().await;
    let user = common::create_user(&pool).await;
    let ghee = common::create_product(&pool, "Desi Ghee", "7.99", 5).await;
    let paneer = common::create_product(&pool, "Paneer", "3.49", 1).await;

    let err = Order::place(&pool, user.id, explicit(vec![(ghee.id, 2), (paneer.id, 2)]))
        .await
        .unwrap_err();

    assert!(matches!(err, OrderError::InsufficientStock(name) if name == "Paneer"));
    assert_eq!(common::stock_of(&pool, ghee.id).await, 5);
    assert_eq!(common::stock_of(&pool, paneer.id).await, 1);
    assert!(Order::list_for_user(&pool, user.id).await.unwrap().is_empty());
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_repeated_lines_are_summed_against_stock() {
    let pool = common::setup().await;
    let user = common::create_user(&pool).await;
    let yogurt = common::create_product(&pool, "Yogurt", "1.99", 3).await;

    let err = Order::place(&pool, user.id, explicit(vec![(yogurt.id, 2), (yogurt.id, 2)]))
        .await
        .unwrap_err();

    assert!(matches!(err, OrderError::InsufficientStock(_)));
    assert_eq!(common::stock_of(&pool, yogurt.id).await, 3);
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_empty_cart_and_unknown_product() {
    let pool = common::setup().await;
    let user = common::create_user(&pool).await;

    let err = Order::place(
        &pool,
        user.id,
        PlaceOrder { address: shipping(), items: vec![], from_cart: true },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, OrderError::CartEmpty));

    let err = Order::place(&pool, user.id, explicit(vec![(Uuid::new_v4(), 1)]))
        .await
        .unwrap_err();
    assert!(matches!(err, OrderError::ProductNotFound(_)));
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_cancel_restocks_once() {
    let pool = common::setup().await;
    let user = common::create_user(&pool).await;
    let milk = common::create_product(&pool, "Buffalo Milk", "2.99", 4).await;

    let order = Order::place(&pool, user.id, explicit(vec![(milk.id, 3)])).await.unwrap();
    assert_eq!(common::stock_of(&pool, milk.id).await, 1);

    let cancelled = Order::cancel_for_user(&pool, user.id, order.id).await.unwrap();
    assert_eq!(cancelled.status, OrderStatus::Cancelled);
    assert_eq!(common::stock_of(&pool, milk.id).await, 4);

    let err = Order::cancel_for_user(&pool, user.id, order.id).await.unwrap_err();
    assert!(matches!(err, OrderError::NotPending));
    assert_eq!(common::stock_of(&pool, milk.id).await, 4);

    let stranger = common::create_user(&pool).await;
    let err = Order::cancel_for_user(&pool, stranger.id, order.id).await.unwrap_err();
    assert!(matches!(err, OrderError::NotFound));
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_status_machine_and_payment() {
    let pool = common::setup().await;
    let user = common::create_user(&pool).await;
    let paneer = common::create_product(&pool, "Paneer 250g", "3.49", 10).await;

    let order = Order::place(&pool, user.id, explicit(vec![(paneer.id, 1)])).await.unwrap();

    let err = Order::update_status(&pool, order.id, OrderStatus::Delivered).await.unwrap_err();
    assert!(matches!(err, OrderError::InvalidTransition { .. }));

    Order::update_status(&pool, order.id, OrderStatus::Confirmed).await.unwrap();
    Order::update_status(&pool, order.id, OrderStatus::Shipped).await.unwrap();
    let delivered = Order::update_status(&pool, order.id, OrderStatus::Delivered).await.unwrap();

    assert_eq!(delivered.status, OrderStatus::Delivered);
    assert_eq!(delivered.payment_status, PaymentStatus::Paid);

    let err = Order::update_status(&pool, order.id, OrderStatus::Cancelled).await.unwrap_err();
    assert!(matches!(err, OrderError::InvalidTransition { .. }));
    assert_eq!(common::stock_of(&pool, paneer.id).await, 9);
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_single_default_address() {
    let pool = common::setup().await;
    let user = common::create_user(&pool).await;
    let mut conn = pool.acquire().await.unwrap();

    let home = NewAddress {
        label: Some("Home".to_string()),
        line1: "1 Main St".to_string(),
        city: "Pune".to_string(),
        country: "India".to_string(),
        ..Default::default()
    };
    let work = NewAddress {
        label: Some("Work".to_string()),
        line1: "2 Office Park".to_string(),
        is_default: true,
        ..home.clone()
    };

    Address::add(&mut conn, user.id, home).await.unwrap();
    Address::add(&mut conn, user.id, work).await.unwrap();

    let addresses = Address::list_for_user(&pool, user.id).await.unwrap();
    let defaults: Vec<_> = addresses.iter().filter(|a| a.is_default).collect();
    assert_eq!(defaults.len(), 1);
    assert_eq!(defaults[0].label.as_deref(), Some("Work"));

    // Deleting the default promotes the remaining address
    assert!(Address::delete(&mut conn, user.id, defaults[0].id).await.unwrap());
    let addresses = Address::list_for_user(&pool, user.id).await.unwrap();
    assert_eq!(addresses.len(), 1);
    assert!(addresses[0].is_default);
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_review_upsert_and_rating_aggregate() {
    let pool = common::setup().await;
    let product = common::create_product(&pool, "Desi Ghee 500g", "7.99", 5).await;
    let alice = common::create_user(&pool).await;
    let bob = common::create_user(&pool).await;

    Review::upsert(&pool, product.id, alice.id, 5, Some("Great".to_string())).await.unwrap();
    Review::upsert(&pool, product.id, bob.id, 2, None).await.unwrap();
    // Second review by the same user replaces the first
    let review = Review::upsert(&pool, product.id, alice.id, 4, None).await.unwrap().unwrap();

    let refreshed = Product::find_by_id(&pool, product.id).await.unwrap().unwrap();
    assert_eq!(refreshed.rating_count, 2);
    assert!((refreshed.average_rating - 3.0).abs() < 1e-9);

    // Hidden reviews drop out of the aggregate and the public list
    Review::moderate(&pool, review.id, false).await.unwrap();
    let refreshed = Product::find_by_id(&pool, product.id).await.unwrap().unwrap();
    assert_eq!(refreshed.rating_count, 1);
    assert!((refreshed.average_rating - 2.0).abs() < 1e-9);

    let (reviews, total) =
        Review::list_for_product(&pool, product.id, PageRequest::new(None, None, 5)).await.unwrap();
    assert_eq!(total, 1);
    assert_eq!(reviews.len(), 1);

    assert!(Review::delete_own(&pool, product.id, bob.id).await.unwrap());
    let refreshed = Product::find_by_id(&pool, product.id).await.unwrap().unwrap();
    assert_eq!(refreshed.rating_count, 0);
    assert_eq!(refreshed.average_rating, 0.0);

    assert!(Review::upsert(&pool, Uuid::new_v4(), alice.id, 3, None).await.unwrap().is_none());
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_login_by_email_or_phone() {
    let pool = common::setup().await;
    let user = common::create_user(&pool).await;

    let by_email = User::find_by_login(&pool, &user.email.to_uppercase()).await.unwrap();
    assert_eq!(by_email.map(|u| u.id), Some(user.id));

    let by_phone = User::find_by_login(&pool, &user.phone).await.unwrap();
    assert_eq!(by_phone.map(|u| u.id), Some(user.id));

    assert!(User::contact_taken(&pool, Some(&user.email), None, None).await.unwrap());
    assert!(!User::contact_taken(&pool, Some(&user.email), None, Some(user.id)).await.unwrap());
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_cart_reports_live_stock() {
    let pool = common::setup().await;
    let user = common::create_user(&pool).await;
    let curd = common::create_product(&pool, "Fresh Curd 400g", "1.49", 4).await;

    CartItem::add(&pool, user.id, &curd, 2).await.unwrap();
    let cart = CartItem::list_for_user(&pool, user.id).await.unwrap();
    assert_eq!(cart[0].in_stock, Some(4));

    let mut conn = pool.acquire().await.unwrap();
    Product::restock(&mut conn, curd.id, 6).await.unwrap();

    let cart = CartItem::list_for_user(&pool, user.id).await.unwrap();
    assert_eq!(cart[0].in_stock, Some(10));
    assert_eq!(cart[0].quantity, 2);
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_cart_line_quantity_is_capped() {
    let pool = common::setup().await;
    let user = common::create_user(&pool).await;
    let milk = common::create_product(&pool, "Toned Milk 1L", "1.29", 1).await;

    CartItem::add(&pool, user.id, &milk, 9_000).await.unwrap();
    CartItem::add(&pool, user.id, &milk, 9_000).await.unwrap();

    let cart = CartItem::list_for_user(&pool, user.id).await.unwrap();
    assert_eq!(cart[0].quantity, MAX_LINE_QUANTITY);
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_deleting_user_returns_stock_of_open_orders() {
    let pool = common::setup().await;
    let user = common::create_user(&pool).await;
    let butter = common::create_product(&pool, "White Butter", "4.25", 5).await;
    let cheese = common::create_product(&pool, "Cheddar Block", "6.10", 5).await;

    Order::place(&pool, user.id, explicit(vec![(butter.id, 3)])).await.unwrap();
    let shipped = Order::place(&pool, user.id, explicit(vec![(cheese.id, 2)])).await.unwrap();
    Order::update_status(&pool, shipped.id, OrderStatus::Confirmed).await.unwrap();
    Order::update_status(&pool, shipped.id, OrderStatus::Shipped).await.unwrap();

    assert_eq!(common::stock_of(&pool, butter.id).await, 2);
    assert_eq!(common::stock_of(&pool, cheese.id).await, 3);

    assert!(User::delete(&pool, user.id).await.unwrap());

    // Pending stock comes back; shipped goods have left the warehouse
    assert_eq!(common::stock_of(&pool, butter.id).await, 5);
    assert_eq!(common::stock_of(&pool, cheese.id).await, 3);
    assert!(!User::delete(&pool, user.id).await.unwrap());
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_concurrent_review_writes_do_not_conflict() {
    let pool = common::setup().await;
    let product = common::create_product(&pool, "Malai Paneer", "3.99", 5).await;
    let author = common::create_user(&pool).await;

    let review = Review::upsert(&pool, product.id, author.id, 4, None).await.unwrap().unwrap();

    let mut handles = Vec::new();
    for round in 0..20 {
        let pool = pool.clone();
        let (product_id, user_id, review_id) = (product.id, author.id, review.id);
        handles.push(tokio::spawn(async move {
            if round % 2 == 0 {
                Review::moderate(&pool, review_id, round % 4 == 0).await.map(|_| ())
            } else {
                Review::upsert(&pool, product_id, user_id, 5, None).await.map(|_| ())
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert!(Review::delete(&pool, review.id).await.unwrap());
    let refreshed = Product::find_by_id(&pool, product.id).await.unwrap().unwrap();
    assert_eq!(refreshed.rating_count, 0);
    assert!(!Review::delete(&pool, review.id).await.unwrap());
}
