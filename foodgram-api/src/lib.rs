//! # Foodgram API Server Library
//!
//! HTTP layer of the Foodgram recipe service. Domain logic and storage live
//! in `foodgram-shared`; this crate maps them onto routes.
//!
//! ## Modules
//!
//! - `app`: Application state and router builder
//! - `config`: Configuration from environment variables
//! - `error`: `ApiError` and its HTTP mapping
//! - `extract`: Json/Query/Path extractors that reject with `ApiError`
//! - `middleware`: Security headers
//! - `pagination`: `limit`/`offset` handling for list endpoints
//! - `routes`: Route handlers

pub mod app;
pub mod config;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod pagination;
pub mod routes;
