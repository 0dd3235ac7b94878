/// Database models for Foodgram
///
/// One module per table (or table family) with its CRUD operations.
///
/// # Models
///
/// - `user`: User accounts, access levels and subscription listings
/// - `tag`: Recipe tags
/// - `ingredient`: Ingredient catalog
/// - `recipe`: Recipes with their ingredient and tag link rows
///
/// Favourites, shopping cart and follows are handled by [`crate::relations`].
///
/// # Example
///
/// ```no_run
/// use foodgram_shared::models::recipe::{Recipe, RecipeFilter};
/// # use sqlx::PgPool;
///
/// # async fn example(pool: PgPool) -> Result<(), sqlx::Error> {
/// let filter = RecipeFilter {
///     tag_slugs: vec!["breakfast".to_string()],
///     ..Default::default()
/// };
/// let page = Recipe::list(&pool, &filter, 6, 0).await?;
/// # Ok(())
/// # }
/// ```

pub mod ingredient;
pub mod recipe;
pub mod tag;
pub mod user;
