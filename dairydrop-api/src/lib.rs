//! # Dairy Drop API Server Library
//!
//! REST backend for the Dairy Drop storefront: accounts, catalog, cart,
//! checkout, reviews and user administration.
//!
//! ## Modules
//!
//! - `app`: Application state and router builder
//! - `bootstrap`: Startup tasks (admin promotion, image host)
//! - `config`: Configuration management
//! - `error`: Error handling and HTTP response mapping
//! - `extract`: Validating request extractors
//! - `middleware`: Rate limiting and security headers
//! - `routes`: API route handlers

pub mod app;
pub mod bootstrap;
pub mod config;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod routes;
