//! # Dairy Drop Shared Library
//!
//! Domain types, persistence and authentication used by the Dairy Drop API
//! server and the `dairydrop` admin CLI.
//!
//! ## Module Organization
//!
//! - `auth`: JWT issuing, password hashing, request authentication and role checks
//! - `db`: Connection pool and migrations
//! - `models`: Users, addresses, cart, products, orders and reviews
//! - `media`: Product image hosting

pub mod auth;
pub mod db;
pub mod media;
pub mod models;

/// Current version of the Dairy Drop shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
