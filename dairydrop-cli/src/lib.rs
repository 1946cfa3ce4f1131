//! # Dairy Drop CLI Library
//!
//! Operational commands for the Dairy Drop database: migrations, seeding
//! and admin management. The `dairydrop` binary is a thin clap front end
//! over these functions.
//!
//! ## Modules
//!
//! - `commands::migrate`: Apply and inspect schema migrations
//! - `commands::seed`: Seed the admin account and the sample catalog
//! - `commands::admin`: Promote existing accounts

pub mod commands;
