/// Error handling for the API server
///
/// Every handler returns [`ApiResult`]. Errors from the shared crate convert
/// into [`ApiError`] through the `From` impls below, so `?` is enough in
/// handlers.
///
/// | Variant           | Status | `error` code       |
/// |-------------------|--------|--------------------|
/// | `BadRequest`      | 400    | `bad_request`      |
/// | `ValidationError` | 400    | `validation_error` |
/// | `Unauthorized`    | 401    | `unauthorized`     |
/// | `Forbidden`       | 403    | `forbidden`        |
/// | `NotFound`        | 404    | `not_found`        |
/// | `InternalError`   | 500    | `internal_error`   |
///
/// # Example
///
/// ```
/// use foodgram_api::error::{ApiError, ApiResult};
///
/// fn find(id: i64) -> ApiResult<i64> {
///     if id > 0 {
///         Ok(id)
///     } else {
///         Err(ApiError::NotFound("Recipe not found".to_string()))
///     }
/// }
///
/// assert!(find(0).is_err());
/// ```

use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use foodgram_shared::{
    auth::{
        authorization::AuthzError,
        jwt::JwtError,
        middleware::AuthError,
        password::PasswordError,
    },
    composition::CompositionError,
    relations::{Relation, RelationError},
    validation::FieldViolation,
};
use serde::{Deserialize, Serialize};
use std::fmt;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug)]
pub enum ApiError {
    /// 400, with a single message
    BadRequest(String),

    /// 400, with one entry per failed field rule
    ValidationError(Vec<FieldViolation>),

    Unauthorized(String),

    Forbidden(String),

    NotFound(String),

    /// 500; the message is logged, never sent
    InternalError(String),
}

/// Error body
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,

    pub message: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<FieldViolation>>,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) | ApiError::ValidationError(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Single-field validation failure
    pub fn invalid_field(field: &str, message: impl Into<String>) -> Self {
        ApiError::ValidationError(vec![FieldViolation::new(field, message)])
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            ApiError::ValidationError(errors) => {
                write!(f, "Validation failed: {} errors", errors.len())
            }
            ApiError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            ApiError::Forbidden(msg) => write!(f, "Forbidden: {}", msg),
            ApiError::NotFound(msg) => write!(f, "Not found: {}", msg),
            ApiError::InternalError(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        let (error_code, message, details) = match self {
            ApiError::BadRequest(msg) => ("bad_request", msg, None),
            ApiError::ValidationError(errors) => (
                "validation_error",
                "Request validation failed".to_string(),
                Some(errors),
            ),
            ApiError::Unauthorized(msg) => ("unauthorized", msg, None),
            ApiError::Forbidden(msg) => ("forbidden", msg, None),
            ApiError::NotFound(msg) => ("not_found", msg, None),
            ApiError::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    "internal_error",
                    "An internal error occurred".to_string(),
                    None,
                )
            }
        };

        let body = Json(ErrorResponse {
            error: error_code.to_string(),
            message,
            details,
        });

        (status, body).into_response()
    }
}

/// Message for a unique-constraint violation, by constraint name
fn unique_violation_message(constraint: Option<&str>) -> String {
    match constraint {
        Some("users_email_key") => "A user with that email already exists".to_string(),
        Some("users_username_key") => "A user with that username already exists".to_string(),
        Some(name) => match Relation::from_constraint(name) {
            Some(relation) => relation.already_exists_message().to_string(),
            None => format!("Duplicate value ({})", name),
        },
        None => "Duplicate value".to_string(),
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => ApiError::NotFound("Resource not found".to_string()),
            sqlx::Error::Database(db_err) => {
                if db_err.is_unique_violation() {
                    return ApiError::BadRequest(unique_violation_message(db_err.constraint()));
                }
                if db_err.is_foreign_key_violation() {
                    return ApiError::NotFound("Referenced resource not found".to_string());
                }
                if db_err.is_check_violation() {
                    return ApiError::BadRequest("Value out of allowed range".to_string());
                }

                ApiError::InternalError(format!("Database error: {}", db_err))
            }
            _ => ApiError::InternalError(format!("Database error: {}", err)),
        }
    }
}

impl From<RelationError> for ApiError {
    fn from(err: RelationError) -> Self {
        match err {
            RelationError::AlreadyExists(_) | RelationError::SelfFollow => {
                ApiError::BadRequest(err.to_string())
            }
            RelationError::NotMember(_) | RelationError::TargetNotFound(_) => {
                ApiError::NotFound(err.to_string())
            }
            RelationError::Database(db_err) => db_err.into(),
        }
    }
}

impl From<CompositionError> for ApiError {
    fn from(err: CompositionError) -> Self {
        match err {
            CompositionError::Invalid(violations) => ApiError::ValidationError(violations),
            CompositionError::IngredientNotFound(_)
            | CompositionError::TagNotFound(_)
            | CompositionError::RecipeNotFound(_) => ApiError::NotFound(err.to_string()),
            CompositionError::Database(db_err) => db_err.into(),
        }
    }
}

impl From<Vec<FieldViolation>> for ApiError {
    fn from(violations: Vec<FieldViolation>) -> Self {
        ApiError::ValidationError(violations)
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::DatabaseError(msg) => ApiError::InternalError(msg),
            other => ApiError::Unauthorized(other.to_string()),
        }
    }
}

impl From<AuthzError> for ApiError {
    fn from(err: AuthzError) -> Self {
        match err {
            AuthzError::Denied(reason) => ApiError::Forbidden(reason),
        }
    }
}

impl From<PasswordError> for ApiError {
    fn from(err: PasswordError) -> Self {
        ApiError::InternalError(format!("Password operation failed: {}", err))
    }
}

impl From<JwtError> for ApiError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::Expired => ApiError::Unauthorized("Token expired".to_string()),
            JwtError::CreateError(msg) => ApiError::InternalError(msg),
            _ => ApiError::Unauthorized(format!("Invalid token: {}", err)),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(_: PathRejection) -> Self {
        ApiError::NotFound("Resource not found".to_string())
    }
}
