/// Ingredient catalog endpoints
///
/// # Endpoints
///
/// - `GET    /api/ingredients/?search=<prefix>` - List, optionally by name prefix
/// - `POST   /api/ingredients/` - Add (admin)
/// - `GET    /api/ingredients/{id}/` - One ingredient
/// - `PUT/PATCH /api/ingredients/{id}/` - Rename or change unit (admin)
/// - `DELETE /api/ingredients/{id}/` - Remove (admin)

use axum::{extract::State, http::StatusCode, Json};
use foodgram_shared::{
    auth::{
        authorization::{catalog_write, ensure},
        middleware::AuthContext,
    },
    models::ingredient::{CreateIngredient, Ingredient},
    validation,
};
use serde::Deserialize;
use tracing::info;

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::{ApiJson, ApiPath, ApiQuery},
};

#[derive(Debug, Default, Deserialize)]
pub struct IngredientQuery {
    /// Case-insensitive name prefix
    pub search: Option<String>,
}

pub async fn list_ingredients(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<IngredientQuery>,
) -> ApiResult<Json<Vec<Ingredient>>> {
    let prefix = query.search.as_deref().map(str::trim);
    Ok(Json(Ingredient::search(&state.db, prefix).await?))
}

pub async fn get_ingredient(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Json<Ingredient>> {
    let ingredient = Ingredient::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Ingredient not found".to_string()))?;

    Ok(Json(ingredient))
}

/// # Errors
///
/// - `400`: name or unit empty or too long
/// - `403`: requester is not an admin
pub async fn create_ingredient(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiJson(req): ApiJson<CreateIngredient>,
) -> ApiResult<(StatusCode, Json<Ingredient>)> {
    ensure(catalog_write(&auth))?;
    validation::check(&req)?;

    let ingredient = Ingredient::create(&state.db, req).await?;

    info!(ingredient_id = ingredient.id, user_id = auth.user_id, "Ingredient added");
    Ok((StatusCode::CREATED, Json(ingredient)))
}

/// Replaces an ingredient's name and unit (PUT and PATCH)
///
/// # Errors
///
/// - `400`: name or unit empty or too long
/// - `403`: requester is not an admin
/// - `404`: no such ingredient
pub async fn update_ingredient(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiPath(id): ApiPath<i64>,
    ApiJson(req): ApiJson<CreateIngredient>,
) -> ApiResult<Json<Ingredient>> {
    ensure(catalog_write(&auth))?;
    validation::check(&req)?;

    let ingredient = Ingredient::update(&state.db, id, req)
        .await?
        .ok_or_else(|| ApiError::NotFound("Ingredient not found".to_string()))?;

    info!(ingredient_id = id, user_id = auth.user_id, "Ingredient updated");
    Ok(Json(ingredient))
}

/// Removes an ingredient together with the recipe rows that use it
pub async fn delete_ingredient(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<StatusCode> {
    ensure(catalog_write(&auth))?;

    if !Ingredient::delete(&state.db, id).await? {
        return Err(ApiError::NotFound("Ingredient not found".to_string()));
    }

    info!(ingredient_id = id, user_id = auth.user_id, "Ingredient removed");
    Ok(StatusCode::NO_CONTENT)
}
