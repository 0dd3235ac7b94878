/// Request authentication
///
/// [`authenticate`] runs on every request. Without an `Authorization` header
/// the request continues anonymously; with one, the bearer token must be a
/// valid access token for an existing user, otherwise the request is rejected
/// with 401. On success an [`AuthContext`] is stored in the request extensions.
///
/// Handlers take `AuthContext` to require a user, or `Option<AuthContext>` to
/// accept anonymous callers.
///
/// # Example
///
/// ```no_run
/// use axum::{middleware, routing::get, Router};
/// use foodgram_shared::auth::middleware::{authenticate, AuthContext, AuthState};
/// # use sqlx::PgPool;
///
/// async fn me(auth: AuthContext) -> String {
///     auth.user_id.to_string()
/// }
///
/// # fn example(pool: PgPool) {
/// let auth = AuthState::new(pool, "a-shared-secret-of-at-least-32-bytes!");
/// let app: Router = Router::new()
///     .route("/me", get(me))
///     .layer(middleware::from_fn_with_state(auth, authenticate));
/// # }
/// ```

use std::sync::Arc;

use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::PgPool;
use tracing::{debug, error};

use super::jwt::{validate_access_token, JwtError};
use crate::models::user::{AccessLevel, User};

/// Authenticated requester
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthContext {
    pub user_id: i64,
    pub access_level: AccessLevel,
}

impl AuthContext {
    pub fn from_user(user: &User) -> Self {
        Self {
            user_id: user.id,
            access_level: user.access_level,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.access_level.is_admin()
    }
}

/// Authentication errors
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Authentication credentials were not provided")]
    MissingCredentials,

    #[error("{0}")]
    InvalidFormat(String),

    #[error("{0}")]
    InvalidToken(String),

    /// Token is valid but its user no longer exists
    #[error("User not found")]
    UnknownUser,

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl AuthError {
    pub fn status(&self) -> StatusCode {
        match self {
            AuthError::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::UNAUTHORIZED,
        }
    }
}

impl From<JwtError> for AuthError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::Expired => AuthError::InvalidToken("Token expired".to_string()),
            JwtError::InvalidIssuer => AuthError::InvalidToken("Invalid token issuer".to_string()),
            other => AuthError::InvalidToken(format!("Invalid token: {}", other)),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            AuthError::DatabaseError(msg) => {
                error!(error = %msg, "Authentication lookup failed");
                "An internal error occurred".to_string()
            }
            other => other.to_string(),
        };

        let code = if status == StatusCode::UNAUTHORIZED {
            "unauthorized"
        } else {
            "internal_error"
        };

        (status, Json(json!({ "error": code, "message": message }))).into_response()
    }
}

/// State for [`authenticate`]
#[derive(Clone)]
pub struct AuthState {
    pub pool: PgPool,
    pub jwt_secret: Arc<str>,
}

impl AuthState {
    pub fn new(pool: PgPool, jwt_secret: impl Into<Arc<str>>) -> Self {
        Self {
            pool,
            jwt_secret: jwt_secret.into(),
        }
    }
}

/// Extracts the bearer token, or None if no Authorization header is present
fn bearer_token(headers: &HeaderMap) -> Result<Option<&str>, AuthError> {
    let Some(value) = headers.get(header::AUTHORIZATION) else {
        return Ok(None);
    };

    let value = value
        .to_str()
        .map_err(|_| AuthError::InvalidFormat("Authorization header is not valid text".to_string()))?;

    value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(Some)
        .ok_or_else(|| AuthError::InvalidFormat("Expected Bearer token".to_string()))
}

/// Resolves the requester from the request headers
///
/// Returns `Ok(None)` for anonymous requests.
pub async fn resolve_auth_context(
    pool: &PgPool,
    secret: &str,
    headers: &HeaderMap,
) -> Result<Option<AuthContext>, AuthError> {
    let Some(token) = bearer_token(headers)? else {
        return Ok(None);
    };

    let claims = validate_access_token(token, secret)?;
    let user_id = claims.user_id()?;

    let user = User::find_by_id(pool, user_id)
        .await
        .map_err(|e| AuthError::DatabaseError(e.to_string()))?
        .ok_or(AuthError::UnknownUser)?;

    debug!(user_id, "Request authenticated");
    Ok(Some(AuthContext::from_user(&user)))
}

/// Middleware storing the requester's [`AuthContext`] in request extensions
pub async fn authenticate(
    State(state): State<AuthState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let context = resolve_auth_context(&state.pool, &state.jwt_secret, req.headers()).await?;
    if let Some(context) = context {
        req.extensions_mut().insert(context);
    }

    Ok(next.run(req).await)
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthContext
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthContext>()
            .copied()
            .ok_or(AuthError::MissingCredentials)
    }
}
