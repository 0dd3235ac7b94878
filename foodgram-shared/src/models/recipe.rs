/// Recipe model and its link tables
///
/// A recipe belongs to its author and references ingredients (with an
/// amount) and tags through `ingredient_recipes` and `tag_recipes`. Link rows
/// are never edited in place: an update deletes them and inserts the new set.
/// Transactional create/update lives in [`crate::composition`]; the statements
/// here accept any executor so they can run inside that transaction.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE recipes (
///     id BIGSERIAL PRIMARY KEY,
///     author_id BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     name VARCHAR(200) NOT NULL,
///     text TEXT NOT NULL,
///     image VARCHAR(512) NOT NULL,
///     cooking_time INTEGER NOT NULL CHECK (cooking_time BETWEEN 1 AND 32000),
///     pub_date TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
///
/// CREATE TABLE ingredient_recipes (
///     id BIGSERIAL PRIMARY KEY,
///     recipe_id BIGINT NOT NULL REFERENCES recipes(id) ON DELETE CASCADE,
///     ingredient_id BIGINT NOT NULL REFERENCES ingredients(id) ON DELETE CASCADE,
///     amount INTEGER NOT NULL CHECK (amount BETWEEN 1 AND 32000)
/// );
///
/// CREATE TABLE tag_recipes (
///     id BIGSERIAL PRIMARY KEY,
///     recipe_id BIGINT NOT NULL REFERENCES recipes(id) ON DELETE CASCADE,
///     tag_id BIGINT NOT NULL REFERENCES tags(id) ON DELETE CASCADE,
///     UNIQUE (recipe_id, tag_id)
/// );
/// ```

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgExecutor, PgPool, Postgres, QueryBuilder};

use super::tag::Tag;

/// Recipe row
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Recipe {
    pub id: i64,
    pub author_id: i64,
    pub name: String,
    pub text: String,

    /// Image reference (URL or storage path)
    pub image: String,

    /// Minutes, 1..=32000
    pub cooking_time: i32,

    /// Set once on insert
    pub pub_date: DateTime<Utc>,
}

/// Scalar fields written on create and update
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipeFields {
    pub name: String,
    pub text: String,
    pub image: String,
    pub cooking_time: i32,
}

/// Ingredient row of a recipe, joined with the catalog entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct RecipeIngredient {
    #[serde(skip)]
    pub recipe_id: i64,

    /// Ingredient id
    pub id: i64,
    pub name: String,
    pub measurement_unit: String,
    pub amount: i32,
}

/// Tag of a recipe
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RecipeTag {
    pub recipe_id: i64,

    #[sqlx(flatten)]
    pub tag: Tag,
}

/// Filters for [`Recipe::list`]
#[derive(Debug, Clone, Default)]
pub struct RecipeFilter {
    /// Only recipes by this author
    pub author_id: Option<i64>,

    /// Recipes carrying any of these tag slugs
    pub tag_slugs: Vec<String>,

    /// Only recipes in this user's favourites
    pub favorited_by: Option<i64>,

    /// Only recipes in this user's shopping cart
    pub in_cart_of: Option<i64>,
}

impl RecipeFilter {
    fn push_conditions(&self, builder: &mut QueryBuilder<'_, Postgres>) {
        if let Some(author_id) = self.author_id {
            builder.push(" AND r.author_id = ").push_bind(author_id);
        }

        if !self.tag_slugs.is_empty() {
            builder
                .push(
                    " AND EXISTS (SELECT 1 FROM tag_recipes tr JOIN tags t ON t.id = tr.tag_id \
                     WHERE tr.recipe_id = r.id AND t.slug = ANY(",
                )
                .push_bind(self.tag_slugs.clone())
                .push("))");
        }

        if let Some(user_id) = self.favorited_by {
            builder
                .push(" AND EXISTS (SELECT 1 FROM favourites f WHERE f.recipe_id = r.id AND f.user_id = ")
                .push_bind(user_id)
                .push(")");
        }

        if let Some(user_id) = self.in_cart_of {
            builder
                .push(" AND EXISTS (SELECT 1 FROM shopping_cart sc WHERE sc.recipe_id = r.id AND sc.user_id = ")
                .push_bind(user_id)
                .push(")");
        }
    }
}

impl Recipe {
    pub async fn find_by_id(pool: &PgPool, id: i64) -> Result<Option<Self>, sqlx::Error> {
        let recipe = sqlx::query_as::<_, Recipe>(
            r#"
            SELECT id, author_id, name, text, image, cooking_time, pub_date
            FROM recipes
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(recipe)
    }

    /// Newest-first page of recipes matching `filter`
    pub async fn list(
        pool: &PgPool,
        filter: &RecipeFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let mut builder = QueryBuilder::<Postgres>::new(
            "SELECT r.id, r.author_id, r.name, r.text, r.image, r.cooking_time, r.pub_date \
             FROM recipes r WHERE TRUE",
        );
        filter.push_conditions(&mut builder);
        builder
            .push(" ORDER BY r.pub_date DESC, r.id DESC LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(offset);

        let recipes = builder.build_query_as::<Recipe>().fetch_all(pool).await?;
        Ok(recipes)
    }

    /// Number of recipes matching `filter`
    pub async fn count(pool: &PgPool, filter: &RecipeFilter) -> Result<i64, sqlx::Error> {
        let mut builder = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM recipes r WHERE TRUE");
        filter.push_conditions(&mut builder);

        let (count,) = builder.build_query_as::<(i64,)>().fetch_one(pool).await?;
        Ok(count)
    }

    pub async fn delete(pool: &PgPool, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM recipes WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Tags of the given recipes, in link insertion order
    pub async fn tags_for(pool: &PgPool, recipe_ids: &[i64]) -> Result<Vec<RecipeTag>, sqlx::Error> {
        if recipe_ids.is_empty() {
            return Ok(Vec::new());
        }

        let tags = sqlx::query_as::<_, RecipeTag>(
            r#"
            SELECT tr.recipe_id, t.id, t.name, t.color, t.slug
            FROM tag_recipes tr
            JOIN tags t ON t.id = tr.tag_id
            WHERE tr.recipe_id = ANY($1)
            ORDER BY tr.recipe_id, tr.id
            "#,
        )
        .bind(recipe_ids)
        .fetch_all(pool)
        .await?;

        Ok(tags)
    }

    /// Ingredient rows of the given recipes, in row insertion order
    pub async fn ingredients_for(
        pool: &PgPool,
        recipe_ids: &[i64],
    ) -> Result<Vec<RecipeIngredient>, sqlx::Error> {
        if recipe_ids.is_empty() {
            return Ok(Vec::new());
        }

        let ingredients = sqlx::query_as::<_, RecipeIngredient>(
            r#"
            SELECT ir.recipe_id, i.id, i.name, i.measurement_unit, ir.amount
            FROM ingredient_recipes ir
            JOIN ingredients i ON i.id = ir.ingredient_id
            WHERE ir.recipe_id = ANY($1)
            ORDER BY ir.recipe_id, ir.id
            "#,
        )
        .bind(recipe_ids)
        .fetch_all(pool)
        .await?;

        Ok(ingredients)
    }

    /// Newest recipes of each author, at most `per_author` each when given
    pub async fn latest_by_authors(
        pool: &PgPool,
        author_ids: &[i64],
        per_author: Option<i64>,
    ) -> Result<Vec<Self>, sqlx::Error> {
        if author_ids.is_empty() {
            return Ok(Vec::new());
        }

        let recipes = sqlx::query_as::<_, Recipe>(
            r#"
            SELECT id, author_id, name, text, image, cooking_time, pub_date
            FROM (
                SELECT r.*,
                       ROW_NUMBER() OVER (
                           PARTITION BY r.author_id ORDER BY r.pub_date DESC, r.id DESC
                       ) AS seq
                FROM recipes r
                WHERE r.author_id = ANY($1)
            ) ranked
            WHERE $2::bigint IS NULL OR seq <= $2
            ORDER BY author_id, seq
            "#,
        )
        .bind(author_ids)
        .bind(per_author)
        .fetch_all(pool)
        .await?;

        Ok(recipes)
    }

    /// Recipe count per author; authors without recipes are absent
    pub async fn count_by_authors(
        pool: &PgPool,
        author_ids: &[i64],
    ) -> Result<HashMap<i64, i64>, sqlx::Error> {
        if author_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows: Vec<(i64, i64)> = sqlx::query_as(
            "SELECT author_id, COUNT(*) FROM recipes WHERE author_id = ANY($1) GROUP BY author_id",
        )
        .bind(author_ids)
        .fetch_all(pool)
        .await?;

        Ok(rows.into_iter().collect())
    }

    pub(crate) async fn insert<'e, E>(
        executor: E,
        author_id: i64,
        fields: &RecipeFields,
    ) -> Result<Self, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let recipe = sqlx::query_as::<_, Recipe>(
            r#"
            INSERT INTO recipes (author_id, name, text, image, cooking_time)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, author_id, name, text, image, cooking_time, pub_date
            "#,
        )
        .bind(author_id)
        .bind(&fields.name)
        .bind(&fields.text)
        .bind(&fields.image)
        .bind(fields.cooking_time)
        .fetch_one(executor)
        .await?;

        Ok(recipe)
    }

    /// Row-locks the recipe for the rest of the transaction
    pub(crate) async fn lock<'e, E>(executor: E, id: i64) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let recipe = sqlx::query_as::<_, Recipe>(
            r#"
            SELECT id, author_id, name, text, image, cooking_time, pub_date
            FROM recipes
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(id)
        .fetch_optional(executor)
        .await?;

        Ok(recipe)
    }

    /// Overwrites the scalar fields; `author_id` and `pub_date` never change
    pub(crate) async fn update_fields<'e, E>(
        executor: E,
        id: i64,
        fields: &RecipeFields,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let recipe = sqlx::query_as::<_, Recipe>(
            r#"
            UPDATE recipes
            SET name = $2, text = $3, image = $4, cooking_time = $5
            WHERE id = $1
            RETURNING id, author_id, name, text, image, cooking_time, pub_date
            "#,
        )
        .bind(id)
        .bind(&fields.name)
        .bind(&fields.text)
        .bind(&fields.image)
        .bind(fields.cooking_time)
        .fetch_optional(executor)
        .await?;

        Ok(recipe)
    }

    /// Bulk-inserts ingredient rows; `ingredient_ids[i]` pairs with `amounts[i]`
    pub(crate) async fn insert_ingredients<'e, E>(
        executor: E,
        recipe_id: i64,
        ingredient_ids: &[i64],
        amounts: &[i32],
    ) -> Result<u64, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query(
            r#"
            INSERT INTO ingredient_recipes (recipe_id, ingredient_id, amount)
            SELECT $1, payload.ingredient_id, payload.amount
            FROM UNNEST($2::bigint[], $3::int[]) WITH ORDINALITY
                 AS payload(ingredient_id, amount, seq)
            ORDER BY payload.seq
            "#,
        )
        .bind(recipe_id)
        .bind(ingredient_ids)
        .bind(amounts)
        .execute(executor)
        .await?;

        Ok(result.rows_affected())
    }

    pub(crate) async fn insert_tags<'e, E>(
        executor: E,
        recipe_id: i64,
        tag_ids: &[i64],
    ) -> Result<u64, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query(
            r#"
            INSERT INTO tag_recipes (recipe_id, tag_id)
            SELECT $1, payload.tag_id
            FROM UNNEST($2::bigint[]) WITH ORDINALITY AS payload(tag_id, seq)
            ORDER BY payload.seq
            "#,
        )
        .bind(recipe_id)
        .bind(tag_ids)
        .execute(executor)
        .await?;

        Ok(result.rows_affected())
    }

    pub(crate) async fn delete_ingredients<'e, E>(executor: E, recipe_id: i64) -> Result<u64, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query("DELETE FROM ingredient_recipes WHERE recipe_id = $1")
            .bind(recipe_id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected())
    }

    pub(crate) async fn delete_tags<'e, E>(executor: E, recipe_id: i64) -> Result<u64, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query("DELETE FROM tag_recipes WHERE recipe_id = $1")
            .bind(recipe_id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_without_conditions() {
        let mut builder = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM recipes r WHERE TRUE");
        RecipeFilter::default().push_conditions(&mut builder);
        assert_eq!(builder.sql(), "SELECT COUNT(*) FROM recipes r WHERE TRUE");
    }

    #[test]
    fn test_filter_binds_in_order() {
        let filter = RecipeFilter {
            author_id: Some(3),
            tag_slugs: vec!["breakfast".to_string(), "lunch".to_string()],
            favorited_by: Some(7),
            in_cart_of: None,
        };

        let mut builder = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM recipes r WHERE TRUE");
        filter.push_conditions(&mut builder);
        let sql = builder.sql();

        assert!(sql.contains("r.author_id = $1"));
        assert!(sql.contains("t.slug = ANY($2)"));
        assert!(sql.contains("f.user_id = $3"));
        assert!(!sql.contains("shopping_cart"));
    }

    #[test]
    fn test_recipe_ingredient_serializes_without_recipe_id() {
        let row = RecipeIngredient {
            recipe_id: 1,
            id: 2,
            name: "Salt".to_string(),
            measurement_unit: "g".to_string(),
            amount: 5,
        };

        let json = serde_json::to_value(&row).unwrap();
        assert!(json.get("recipe_id").is_none());
        assert_eq!(json["id"], 2);
        assert_eq!(json["amount"], 5);
    }
}
