/// API route handlers
///
/// Handlers are organized by resource:
///
/// - `health`: Service banner, health check and 404 fallback
/// - `auth`: Registration, login and profile
/// - `addresses`: Saved shipping addresses
/// - `cart`: Shopping cart
/// - `products`: Product catalog and image uploads
/// - `orders`: Checkout, order history and fulfilment
/// - `reviews`: Product reviews and moderation
/// - `users`: User administration

pub mod addresses;
pub mod auth;
pub mod cart;
pub mod health;
pub mod orders;
pub mod products;
pub mod reviews;
pub mod users;
