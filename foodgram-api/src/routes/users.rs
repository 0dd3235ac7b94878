/// User endpoints
///
/// # Endpoints
///
/// - `GET  /api/users/` - List users (paginated)
/// - `POST /api/users/` - Register (anonymous)
/// - `GET  /api/users/me/` - Current user
/// - `POST /api/users/set_password/` - Change own password
/// - `GET  /api/users/subscriptions/` - Followed authors with their recipes
/// - `GET  /api/users/{id}/` - One user
/// - `POST/DELETE /api/users/{id}/subscribe/` - Follow / unfollow an author
///
/// Every user object carries `is_subscribed`: whether the requester follows
/// that user (always false for anonymous requesters).

use std::collections::{HashMap, HashSet};

use axum::{extract::State, http::StatusCode, Json};
use foodgram_shared::{
    auth::{
        middleware::AuthContext,
        password::{hash_password, validate_password_rules, verify_password},
    },
    models::{
        recipe::Recipe,
        user::{validate_username, CreateUser, User},
    },
    relations::{self, Relation},
    validation::{self, FieldViolation},
};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::info;
use validator::Validate;

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::{ApiJson, ApiPath, ApiQuery},
    pagination::{Page, Pagination},
    routes::recipes::ShortRecipe,
};

/// Public user object
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserResponse {
    pub email: String,
    pub id: i64,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub is_subscribed: bool,
}

impl UserResponse {
    pub fn new(user: &User, is_subscribed: bool) -> Self {
        Self {
            email: user.email.clone(),
            id: user.id,
            username: user.username.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            is_subscribed,
        }
    }
}

/// Followed author with a preview of their recipes
#[derive(Debug, Serialize, Deserialize)]
pub struct SubscriptionResponse {
    #[serde(flatten)]
    pub author: UserResponse,
    pub recipes: Vec<ShortRecipe>,
    pub recipes_count: i64,
}

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(
        email(message = "Invalid email format"),
        length(max = 254, message = "Email must be at most 254 characters")
    )]
    pub email: String,

    pub username: String,

    #[validate(length(min = 1, max = 150, message = "First name must be 1-150 characters"))]
    pub first_name: String,

    #[validate(length(min = 1, max = 150, message = "Last name must be 1-150 characters"))]
    pub last_name: String,

    pub password: String,
}

impl RegisterRequest {
    /// Derived rules plus username and password rules
    fn violations(&self) -> Vec<FieldViolation> {
        let mut violations = validation::check(self).err().unwrap_or_default();

        if let Err(message) = validate_username(&self.username) {
            violations.push(FieldViolation::new("username", message));
        }

        if let Err(message) = validate_password_rules(
            &self.password,
            &[self.username.as_str(), self.email.as_str()],
        ) {
            violations.push(FieldViolation::new("password", message));
        }

        violations
    }
}

/// Registration response; never includes the password
#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub email: String,
    pub id: i64,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Debug, Deserialize)]
pub struct SetPasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

/// Query of the subscription endpoints
#[derive(Debug, Default, Deserialize)]
pub struct SubscriptionQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,

    /// Recipes shown per author; anything but a non-negative integer is ignored
    pub recipes_limit: Option<String>,
}

impl SubscriptionQuery {
    fn pagination(&self) -> Pagination {
        Pagination {
            limit: self.limit,
            offset: self.offset,
        }
    }

    fn recipes_limit(&self) -> Option<i64> {
        self.recipes_limit
            .as_deref()
            .and_then(|value| value.trim().parse::<i64>().ok())
            .filter(|limit| *limit >= 0)
    }
}

/// User objects for `users`, with `is_subscribed` for `requester`
pub(crate) async fn user_views(
    pool: &PgPool,
    requester: Option<&AuthContext>,
    users: &[User],
) -> ApiResult<Vec<UserResponse>> {
    let followed = match requester {
        Some(requester) => {
            let ids: Vec<i64> = users.iter().map(|u| u.id).collect();
            relations::existing_targets(pool, Relation::Follow, requester.user_id, &ids).await?
        }
        None => HashSet::new(),
    };

    Ok(users
        .iter()
        .map(|user| UserResponse::new(user, followed.contains(&user.id)))
        .collect())
}

async fn subscription_views(
    pool: &PgPool,
    requester: &AuthContext,
    authors: &[User],
    recipes_limit: Option<i64>,
) -> ApiResult<Vec<SubscriptionResponse>> {
    let author_ids: Vec<i64> = authors.iter().map(|a| a.id).collect();

    let mut recipes_by_author: HashMap<i64, Vec<ShortRecipe>> = HashMap::new();
    for recipe in Recipe::latest_by_authors(pool, &author_ids, recipes_limit).await? {
        recipes_by_author
            .entry(recipe.author_id)
            .or_default()
            .push(ShortRecipe::from(&recipe));
    }
    let counts = Recipe::count_by_authors(pool, &author_ids).await?;

    let views = user_views(pool, Some(requester), authors).await?;

    Ok(views
        .into_iter()
        .map(|author| SubscriptionResponse {
            recipes: recipes_by_author.remove(&author.id).unwrap_or_default(),
            recipes_count: counts.get(&author.id).copied().unwrap_or(0),
            author,
        })
        .collect())
}

/// Registers a new account
///
/// # Errors
///
/// - `400`: a field rule failed, or the email or username is taken
pub async fn register(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<RegisterResponse>)> {
    let violations = req.violations();
    if !violations.is_empty() {
        return Err(ApiError::ValidationError(violations));
    }

    let password_hash = hash_password(&req.password)?;

    let user = User::create(
        &state.db,
        CreateUser {
            email: req.email,
            username: req.username,
            first_name: req.first_name,
            last_name: req.last_name,
            password_hash,
            access_level: Default::default(),
        },
    )
    .await?;

    info!(user_id = user.id, "User registered");

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            email: user.email,
            id: user.id,
            username: user.username,
            first_name: user.first_name,
            last_name: user.last_name,
        }),
    ))
}

pub async fn list_users(
    State(state): State<AppState>,
    auth: Option<AuthContext>,
    ApiQuery(pagination): ApiQuery<Pagination>,
) -> ApiResult<Json<Page<UserResponse>>> {
    let users = User::list(&state.db, pagination.limit(), pagination.offset()).await?;
    let count = User::count(&state.db).await?;

    let results = user_views(&state.db, auth.as_ref(), &users).await?;
    Ok(Json(Page::new(count, results)))
}

pub async fn get_user(
    State(state): State<AppState>,
    auth: Option<AuthContext>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Json<UserResponse>> {
    let user = User::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    let is_subscribed = match auth {
        Some(requester) => {
            relations::exists(&state.db, Relation::Follow, requester.user_id, user.id).await?
        }
        None => false,
    };

    Ok(Json(UserResponse::new(&user, is_subscribed)))
}

/// The requester's own profile; nobody follows themselves
pub async fn me(State(state): State<AppState>, auth: AuthContext) -> ApiResult<Json<UserResponse>> {
    let user = User::find_by_id(&state.db, auth.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(Json(UserResponse::new(&user, false)))
}

/// Changes the requester's password
///
/// # Errors
///
/// - `400`: `current_password` is wrong or `new_password` breaks a rule
pub async fn set_password(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiJson(req): ApiJson<SetPasswordRequest>,
) -> ApiResult<StatusCode> {
    let user = User::find_by_id(&state.db, auth.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    if !verify_password(&req.current_password, &user.password_hash)? {
        return Err(ApiError::invalid_field("current_password", "Wrong password"));
    }

    validate_password_rules(
        &req.new_password,
        &[user.username.as_str(), user.email.as_str()],
    )
    .map_err(|message| ApiError::invalid_field("new_password", message))?;

    let password_hash = hash_password(&req.new_password)?;
    User::update_password(&state.db, user.id, &password_hash).await?;

    info!(user_id = user.id, "Password changed");
    Ok(StatusCode::NO_CONTENT)
}

/// Authors the requester follows, most recently followed first
pub async fn subscriptions(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiQuery(query): ApiQuery<SubscriptionQuery>,
) -> ApiResult<Json<Page<SubscriptionResponse>>> {
    let pagination = query.pagination();

    let authors = User::list_subscriptions(
        &state.db,
        auth.user_id,
        pagination.limit(),
        pagination.offset(),
    )
    .await?;
    let count = User::count_subscriptions(&state.db, auth.user_id).await?;

    let results = subscription_views(&state.db, &auth, &authors, query.recipes_limit()).await?;
    Ok(Json(Page::new(count, results)))
}

/// Follows author `id`
///
/// # Errors
///
/// - `400`: already following, or `id` is the requester
/// - `404`: no such user
pub async fn subscribe(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiPath(id): ApiPath<i64>,
    ApiQuery(query): ApiQuery<SubscriptionQuery>,
) -> ApiResult<(StatusCode, Json<SubscriptionResponse>)> {
    relations::add(&state.db, Relation::Follow, auth.user_id, id).await?;

    let author = User::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Author not found".to_string()))?;

    let view = subscription_views(&state.db, &auth, std::slice::from_ref(&author), query.recipes_limit())
        .await?
        .pop()
        .ok_or_else(|| ApiError::InternalError("Subscription view missing".to_string()))?;

    Ok((StatusCode::CREATED, Json(view)))
}

/// Stops following author `id`
///
/// # Errors
///
/// - `400`: `id` is the requester
/// - `404`: no such user, or not following
pub async fn unsubscribe(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<StatusCode> {
    relations::remove(&state.db, Relation::Follow, auth.user_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
