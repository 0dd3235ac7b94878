/// Extractors whose rejections are [`ApiError`]s
///
/// axum's own `Json`, `Query` and `Path` reject with plain-text bodies and
/// 415/422 statuses. These wrappers run the same extraction but answer with
/// the API's JSON error body: malformed bodies and query strings are 400, a
/// path id that does not parse is 404.

use axum::extract::{FromRequest, FromRequestParts};

use crate::error::ApiError;

/// JSON request body
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

/// Query string
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct ApiQuery<T>(pub T);

/// Path parameters
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub struct ApiPath<T>(pub T);
