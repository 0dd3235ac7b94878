/// Recipe composition
///
/// Validates a recipe payload and persists the recipe together with its
/// ingredient and tag link rows in one transaction. Updates are full
/// replacements: scalar fields are overwritten and every link row is deleted
/// and re-inserted from the new payload.
///
/// Rules:
/// - `name` 1..=200 characters, `text` and `image` non-empty
/// - `cooking_time` and each ingredient `amount` in 1..=32000
/// - at least one ingredient and one tag
/// - tag ids are distinct; an ingredient may be listed more than once
/// - every referenced ingredient and tag exists
///
/// # Example
///
/// ```no_run
/// use foodgram_shared::composition::{create_recipe, IngredientAmount, RecipeDraft};
/// # use sqlx::PgPool;
///
/// # async fn example(pool: PgPool) -> Result<(), foodgram_shared::composition::CompositionError> {
/// let draft = RecipeDraft {
///     name: "Pancakes".to_string(),
///     text: "Mix and fry.".to_string(),
///     image: "recipes/images/pancakes.png".to_string(),
///     cooking_time: 20,
///     ingredients: vec![IngredientAmount { id: 1, amount: 200 }],
///     tags: vec![1],
/// };
///
/// let recipe = create_recipe(&pool, 7, &draft).await?;
/// assert_eq!(recipe.author_id, 7);
/// # Ok(())
/// # }
/// ```

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool};
use tracing::{debug, info};
use validator::Validate;

use crate::models::{
    ingredient::Ingredient,
    recipe::{Recipe, RecipeFields},
    tag::Tag,
};
use crate::validation::{self, FieldViolation};

pub const MIN_COOKING_TIME: i32 = 1;
pub const MAX_COOKING_TIME: i32 = 32_000;
pub const MIN_AMOUNT: i32 = 1;
pub const MAX_AMOUNT: i32 = 32_000;

/// Ingredient reference with its amount
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngredientAmount {
    /// Ingredient id
    pub id: i64,
    pub amount: i32,
}

/// Recipe payload for create and update
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RecipeDraft {
    #[validate(length(min = 1, max = 200, message = "Name must be 1-200 characters"))]
    pub name: String,

    #[validate(length(min = 1, message = "Text is required"))]
    pub text: String,

    #[validate(length(min = 1, message = "Image is required"))]
    pub image: String,

    #[validate(range(
        min = 1,
        max = 32000,
        message = "Cooking time must be between 1 and 32000"
    ))]
    pub cooking_time: i32,

    #[validate(length(min = 1, message = "At least one ingredient is required"))]
    pub ingredients: Vec<IngredientAmount>,

    #[validate(length(min = 1, message = "At least one tag is required"))]
    pub tags: Vec<i64>,
}

impl RecipeDraft {
    /// Runs every field rule, collecting all violations
    pub fn check(&self) -> Result<(), CompositionError> {
        let mut violations = validation::check(self).err().unwrap_or_default();

        for (position, item) in self.ingredients.iter().enumerate() {
            if !(MIN_AMOUNT..=MAX_AMOUNT).contains(&item.amount) {
                violations.push(FieldViolation::new(
                    format!("ingredients[{}].amount", position),
                    format!("Amount must be between {} and {}", MIN_AMOUNT, MAX_AMOUNT),
                ));
            }
        }

        let mut seen = HashSet::with_capacity(self.tags.len());
        if let Some(duplicate) = self.tags.iter().find(|id| !seen.insert(**id)) {
            violations.push(FieldViolation::new(
                "tags",
                format!("Tag {} is listed more than once", duplicate),
            ));
        }

        if violations.is_empty() {
            Ok(())
        } else {
            Err(CompositionError::Invalid(violations))
        }
    }

    pub fn fields(&self) -> RecipeFields {
        RecipeFields {
            name: self.name.clone(),
            text: self.text.clone(),
            image: self.image.clone(),
            cooking_time: self.cooking_time,
        }
    }

    fn ingredient_ids(&self) -> Vec<i64> {
        self.ingredients.iter().map(|i| i.id).collect()
    }

    fn amounts(&self) -> Vec<i32> {
        self.ingredients.iter().map(|i| i.amount).collect()
    }
}

/// Composition errors
#[derive(Debug, thiserror::Error)]
pub enum CompositionError {
    /// One or more field rules failed
    #[error("Recipe validation failed: {} errors", .0.len())]
    Invalid(Vec<FieldViolation>),

    #[error("Ingredient {0} not found")]
    IngredientNotFound(i64),

    #[error("Tag {0} not found")]
    TagNotFound(i64),

    #[error("Recipe {0} not found")]
    RecipeNotFound(i64),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

async fn ensure_references(conn: &mut PgConnection, draft: &RecipeDraft) -> Result<(), CompositionError> {
    if let Some(id) = Ingredient::find_missing(&mut *conn, &draft.ingredient_ids()).await? {
        return Err(CompositionError::IngredientNotFound(id));
    }
    if let Some(id) = Tag::find_missing(&mut *conn, &draft.tags).await? {
        return Err(CompositionError::TagNotFound(id));
    }
    Ok(())
}

async fn insert_links(
    conn: &mut PgConnection,
    recipe_id: i64,
    draft: &RecipeDraft,
) -> Result<(), CompositionError> {
    let ingredients =
        Recipe::insert_ingredients(&mut *conn, recipe_id, &draft.ingredient_ids(), &draft.amounts())
            .await?;
    let tags = Recipe::insert_tags(&mut *conn, recipe_id, &draft.tags).await?;

    debug!(recipe_id, ingredients, tags, "Inserted recipe links");
    Ok(())
}

/// Validates `draft` and creates the recipe with `author_id` as author
///
/// # Errors
///
/// - [`CompositionError::Invalid`] when a field rule fails
/// - [`CompositionError::IngredientNotFound`] / [`CompositionError::TagNotFound`]
///   naming the first missing id
///
/// Nothing is written unless every step succeeds.
pub async fn create_recipe(
    pool: &PgPool,
    author_id: i64,
    draft: &RecipeDraft,
) -> Result<Recipe, CompositionError> {
    draft.check()?;

    let mut tx = pool.begin().await?;

    ensure_references(&mut tx, draft).await?;
    let recipe = Recipe::insert(&mut *tx, author_id, &draft.fields()).await?;
    insert_links(&mut tx, recipe.id, draft).await?;

    tx.commit().await?;

    info!(recipe_id = recipe.id, author_id, "Recipe created");
    Ok(recipe)
}

/// Validates `draft` and replaces recipe `recipe_id` with it
///
/// Author and publication date are kept. Access control is the caller's job.
pub async fn update_recipe(
    pool: &PgPool,
    recipe_id: i64,
    draft: &RecipeDraft,
) -> Result<Recipe, CompositionError> {
    draft.check()?;

    let mut tx = pool.begin().await?;

    if Recipe::lock(&mut *tx, recipe_id).await?.is_none() {
        return Err(CompositionError::RecipeNotFound(recipe_id));
    }

    ensure_references(&mut tx, draft).await?;

    let recipe = Recipe::update_fields(&mut *tx, recipe_id, &draft.fields())
        .await?
        .ok_or(CompositionError::RecipeNotFound(recipe_id))?;

    Recipe::delete_ingredients(&mut *tx, recipe_id).await?;
    Recipe::delete_tags(&mut *tx, recipe_id).await?;
    insert_links(&mut tx, recipe_id, draft).await?;

    tx.commit().await?;

    info!(recipe_id, "Recipe updated");
    Ok(recipe)
}
