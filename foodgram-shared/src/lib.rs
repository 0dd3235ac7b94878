//! # Foodgram Shared Library
//!
//! Types, storage access and business rules shared by the Foodgram API server.
//!
//! ## Module Organization
//!
//! - `db`: Connection pool and migration runner
//! - `models`: Database models (users, recipes, ingredients, tags)
//! - `auth`: JWT validation, password hashing, request authentication and authorization
//! - `shopping_list`: Ingredient quantity aggregation for a user's shopping cart
//! - `relations`: Favourites, shopping cart and follow membership with uniqueness checks
//! - `composition`: Recipe payload validation and atomic persistence of link rows
//! - `validation`: Field-level validation error flattening

pub mod auth;
pub mod composition;
pub mod db;
pub mod models;
pub mod relations;
pub mod shopping_list;
pub mod validation;

/// Current version of the Foodgram shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
