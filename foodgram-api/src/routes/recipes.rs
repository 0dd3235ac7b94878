/// Recipe endpoints
///
/// # Endpoints
///
/// - `GET  /api/recipes/` - List with filters (paginated)
/// - `POST /api/recipes/` - Create
/// - `GET  /api/recipes/download_shopping_cart/` - Shopping list as text
/// - `GET/PUT/PATCH/DELETE /api/recipes/{id}/` - Read, replace, delete
/// - `POST/DELETE /api/recipes/{id}/favorite/` - Favourites
/// - `POST/DELETE /api/recipes/{id}/shopping_cart/` - Shopping cart
///
/// PUT and PATCH both replace the recipe with the request body.

use std::collections::{HashMap, HashSet};

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use foodgram_shared::{
    auth::{
        authorization::{ensure, recipe_write},
        middleware::AuthContext,
    },
    composition::{self, RecipeDraft},
    models::{
        recipe::{Recipe, RecipeFilter, RecipeIngredient},
        tag::Tag,
        user::User,
    },
    relations::{self, Relation},
    shopping_list::{ShoppingList, FILE_NAME},
};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::info;

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::{ApiJson, ApiPath, ApiQuery},
    pagination::{Page, Pagination},
    routes::users::{user_views, UserResponse},
};

/// Full recipe object
#[derive(Debug, Serialize, Deserialize)]
pub struct RecipeResponse {
    pub id: i64,
    pub tags: Vec<Tag>,
    pub author: UserResponse,
    pub ingredients: Vec<RecipeIngredient>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
    pub name: String,
    pub image: String,
    pub text: String,
    pub cooking_time: i32,
    pub pub_date: DateTime<Utc>,
}

/// Recipe summary used by favourites, cart and subscriptions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShortRecipe {
    pub id: i64,
    pub name: String,
    pub image: String,
    pub cooking_time: i32,
}

impl From<&Recipe> for ShortRecipe {
    fn from(recipe: &Recipe) -> Self {
        Self {
            id: recipe.id,
            name: recipe.name.clone(),
            image: recipe.image.clone(),
            cooking_time: recipe.cooking_time,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct RecipeListQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,

    pub author: Option<i64>,

    /// Comma-separated tag slugs, any of which matches
    pub tags: Option<String>,

    pub is_favorited: Option<String>,
    pub is_in_shopping_cart: Option<String>,
}

fn is_set(flag: &Option<String>) -> bool {
    matches!(
        flag.as_deref().map(str::trim),
        Some("1") | Some("true") | Some("True")
    )
}

impl RecipeListQuery {
    fn pagination(&self) -> Pagination {
        Pagination {
            limit: self.limit,
            offset: self.offset,
        }
    }

    /// Favourite and cart flags only apply to an authenticated requester
    fn filter(&self, requester: Option<&AuthContext>) -> RecipeFilter {
        let tag_slugs = self
            .tags
            .as_deref()
            .map(|tags| {
                tags.split(',')
                    .map(str::trim)
                    .filter(|slug| !slug.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        let user_id = requester.map(|r| r.user_id);

        RecipeFilter {
            author_id: self.author,
            tag_slugs,
            favorited_by: user_id.filter(|_| is_set(&self.is_favorited)),
            in_cart_of: user_id.filter(|_| is_set(&self.is_in_shopping_cart)),
        }
    }
}

/// Assembles full recipe objects, batching every lookup over `recipes`
async fn recipe_views(
    pool: &PgPool,
    requester: Option<&AuthContext>,
    recipes: Vec<Recipe>,
) -> ApiResult<Vec<RecipeResponse>> {
    let ids: Vec<i64> = recipes.iter().map(|r| r.id).collect();

    let mut tags: HashMap<i64, Vec<Tag>> = HashMap::new();
    for row in Recipe::tags_for(pool, &ids).await? {
        tags.entry(row.recipe_id).or_default().push(row.tag);
    }

    let mut ingredients: HashMap<i64, Vec<RecipeIngredient>> = HashMap::new();
    for row in Recipe::ingredients_for(pool, &ids).await? {
        ingredients.entry(row.recipe_id).or_default().push(row);
    }

    let mut author_ids: Vec<i64> = recipes.iter().map(|r| r.author_id).collect();
    author_ids.sort_unstable();
    author_ids.dedup();
    let authors = User::find_many(pool, &author_ids).await?;
    let authors: HashMap<i64, UserResponse> = user_views(pool, requester, &authors)
        .await?
        .into_iter()
        .map(|author| (author.id, author))
        .collect();

    let (favourites, cart) = match requester {
        Some(requester) => (
            relations::existing_targets(pool, Relation::Favourite, requester.user_id, &ids).await?,
            relations::existing_targets(pool, Relation::ShoppingCart, requester.user_id, &ids)
                .await?,
        ),
        None => (HashSet::new(), HashSet::new()),
    };

    recipes
        .into_iter()
        .map(|recipe| {
            let author = authors.get(&recipe.author_id).cloned().ok_or_else(|| {
                ApiError::InternalError(format!("Author {} of recipe {} missing", recipe.author_id, recipe.id))
            })?;

            Ok(RecipeResponse {
                id: recipe.id,
                tags: tags.remove(&recipe.id).unwrap_or_default(),
                author,
                ingredients: ingredients.remove(&recipe.id).unwrap_or_default(),
                is_favorited: favourites.contains(&recipe.id),
                is_in_shopping_cart: cart.contains(&recipe.id),
                name: recipe.name,
                image: recipe.image,
                text: recipe.text,
                cooking_time: recipe.cooking_time,
                pub_date: recipe.pub_date,
            })
        })
        .collect()
}

async fn recipe_view(
    pool: &PgPool,
    requester: Option<&AuthContext>,
    recipe: Recipe,
) -> ApiResult<RecipeResponse> {
    recipe_views(pool, requester, vec![recipe])
        .await?
        .pop()
        .ok_or_else(|| ApiError::InternalError("Recipe view missing".to_string()))
}

async fn find_recipe(pool: &PgPool, id: i64) -> ApiResult<Recipe> {
    Recipe::find_by_id(pool, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Recipe not found".to_string()))
}

/// Lists recipes, newest first
///
/// # Query
///
/// `author`, `tags` (comma-separated slugs), `is_favorited=1`,
/// `is_in_shopping_cart=1`, `limit`, `offset`.
pub async fn list_recipes(
    State(state): State<AppState>,
    auth: Option<AuthContext>,
    ApiQuery(query): ApiQuery<RecipeListQuery>,
) -> ApiResult<Json<Page<RecipeResponse>>> {
    let filter = query.filter(auth.as_ref());
    let pagination = query.pagination();

    let recipes = Recipe::list(&state.db, &filter, pagination.limit(), pagination.offset()).await?;
    let count = Recipe::count(&state.db, &filter).await?;

    let results = recipe_views(&state.db, auth.as_ref(), recipes).await?;
    Ok(Json(Page::new(count, results)))
}

pub async fn get_recipe(
    State(state): State<AppState>,
    auth: Option<AuthContext>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Json<RecipeResponse>> {
    let recipe = find_recipe(&state.db, id).await?;
    Ok(Json(recipe_view(&state.db, auth.as_ref(), recipe).await?))
}

/// Creates a recipe authored by the requester
///
/// # Errors
///
/// - `400`: a field rule failed
/// - `404`: an ingredient or tag id does not exist
pub async fn create_recipe(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiJson(draft): ApiJson<RecipeDraft>,
) -> ApiResult<(StatusCode, Json<RecipeResponse>)> {
    let recipe = composition::create_recipe(&state.db, auth.user_id, &draft).await?;
    let view = recipe_view(&state.db, Some(&auth), recipe).await?;

    Ok((StatusCode::CREATED, Json(view)))
}

/// Replaces a recipe (PUT and PATCH)
///
/// # Errors
///
/// - `400`: a field rule failed
/// - `403`: requester is neither the author nor an admin
/// - `404`: recipe, ingredient or tag not found
pub async fn update_recipe(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiPath(id): ApiPath<i64>,
    ApiJson(draft): ApiJson<RecipeDraft>,
) -> ApiResult<Json<RecipeResponse>> {
    let recipe = find_recipe(&state.db, id).await?;
    ensure(recipe_write(&auth, recipe.author_id))?;

    let recipe = composition::update_recipe(&state.db, id, &draft).await?;
    Ok(Json(recipe_view(&state.db, Some(&auth), recipe).await?))
}

pub async fn delete_recipe(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<StatusCode> {
    let recipe = find_recipe(&state.db, id).await?;
    ensure(recipe_write(&auth, recipe.author_id))?;

    if !Recipe::delete(&state.db, id).await? {
        return Err(ApiError::NotFound("Recipe not found".to_string()));
    }

    info!(recipe_id = id, user_id = auth.user_id, "Recipe deleted");
    Ok(StatusCode::NO_CONTENT)
}

async fn add_relation(
    state: &AppState,
    relation: Relation,
    auth: &AuthContext,
    recipe_id: i64,
) -> ApiResult<(StatusCode, Json<ShortRecipe>)> {
    relations::add(&state.db, relation, auth.user_id, recipe_id).await?;
    let recipe = find_recipe(&state.db, recipe_id).await?;

    Ok((StatusCode::CREATED, Json(ShortRecipe::from(&recipe))))
}

async fn remove_relation(
    state: &AppState,
    relation: Relation,
    auth: &AuthContext,
    recipe_id: i64,
) -> ApiResult<StatusCode> {
    relations::remove(&state.db, relation, auth.user_id, recipe_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn add_favorite(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<(StatusCode, Json<ShortRecipe>)> {
    add_relation(&state, Relation::Favourite, &auth, id).await
}

pub async fn remove_favorite(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<StatusCode> {
    remove_relation(&state, Relation::Favourite, &auth, id).await
}

pub async fn add_to_shopping_cart(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<(StatusCode, Json<ShortRecipe>)> {
    add_relation(&state, Relation::ShoppingCart, &auth, id).await
}

pub async fn remove_from_shopping_cart(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<StatusCode> {
    remove_relation(&state, Relation::ShoppingCart, &auth, id).await
}

/// `Content-Disposition` of the shopping list download
pub fn attachment_disposition() -> String {
    format!("attachment; filename=\"{}\"", FILE_NAME)
}

/// Aggregated ingredients of every recipe in the requester's cart
///
/// Plain text: a header line, then one `name (unit) - total` line per
/// ingredient in the order first met.
pub async fn download_shopping_cart(
    State(state): State<AppState>,
    auth: AuthContext,
) -> ApiResult<impl IntoResponse> {
    let list = ShoppingList::for_user(&state.db, auth.user_id).await?;

    Ok((
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, attachment_disposition()),
        ],
        list.render(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use foodgram_shared::models::user::AccessLevel;

    fn requester(user_id: i64) -> AuthContext {
        AuthContext {
            user_id,
            access_level: AccessLevel::User,
        }
    }

    #[test]
    fn test_filter_from_query() {
        let query = RecipeListQuery {
            author: Some(4),
            tags: Some("breakfast, lunch,,".to_string()),
            ..Default::default()
        };

        let filter = query.filter(None);
        assert_eq!(filter.author_id, Some(4));
        assert_eq!(filter.tag_slugs, vec!["breakfast", "lunch"]);
        assert_eq!(filter.favorited_by, None);
        assert_eq!(filter.in_cart_of, None);
    }

    #[test]
    fn test_relation_flags_need_requester() {
        let query = RecipeListQuery {
            is_favorited: Some("1".to_string()),
            is_in_shopping_cart: Some("true".to_string()),
            ..Default::default()
        };

        let anonymous = query.filter(None);
        assert_eq!(anonymous.favorited_by, None);
        assert_eq!(anonymous.in_cart_of, None);

        let authenticated = query.filter(Some(&requester(9)));
        assert_eq!(authenticated.favorited_by, Some(9));
        assert_eq!(authenticated.in_cart_of, Some(9));
    }

    #[test]
    fn test_unset_flags_ignored() {
        let query = RecipeListQuery {
            is_favorited: Some("0".to_string()),
            is_in_shopping_cart: Some("".to_string()),
            ..Default::default()
        };

        let filter = query.filter(Some(&requester(9)));
        assert_eq!(filter.favorited_by, None);
        assert_eq!(filter.in_cart_of, None);
    }

    #[test]
    fn test_short_recipe_from_recipe() {
        let recipe = Recipe {
            id: 3,
            author_id: 1,
            name: "Omelette".to_string(),
            text: "Whisk and fry".to_string(),
            image: "recipes/images/omelette.png".to_string(),
            cooking_time: 10,
            pub_date: Utc::now(),
        };

        assert_eq!(
            ShortRecipe::from(&recipe),
            ShortRecipe {
                id: 3,
                name: "Omelette".to_string(),
                image: "recipes/images/omelette.png".to_string(),
                cooking_time: 10,
            }
        );
    }

    #[test]
    fn test_attachment_disposition() {
        assert_eq!(
            attachment_disposition(),
            "attachment; filename=\"shopping_list.txt\""
        );
    }
}
