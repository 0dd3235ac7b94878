/// Authentication and authorization
///
/// # Modules
///
/// - [`password`]: Argon2id password hashing and password rules
/// - [`jwt`]: JWT access token validation (HS256, issuer `foodgram`)
/// - [`middleware`]: Request authentication and the `AuthContext` extractor
/// - [`authorization`]: Per-operation allow/deny predicates
///
/// # Example
///
/// ```
/// use foodgram_shared::auth::authorization::{ensure, recipe_write};
/// use foodgram_shared::auth::middleware::AuthContext;
/// use foodgram_shared::models::user::AccessLevel;
///
/// let requester = AuthContext { user_id: 1, access_level: AccessLevel::User };
/// assert!(ensure(recipe_write(&requester, 1)).is_ok());
/// assert!(ensure(recipe_write(&requester, 2)).is_err());
/// ```

pub mod authorization;
pub mod jwt;
pub mod middleware;
pub mod password;
