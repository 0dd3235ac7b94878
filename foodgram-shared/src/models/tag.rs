/// Tag model
///
/// Tags are a small curated catalog (breakfast, lunch, dinner...). Recipes
/// reference them through `tag_recipes`.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE tags (
///     id BIGSERIAL PRIMARY KEY,
///     name VARCHAR(200) NOT NULL UNIQUE,
///     color VARCHAR(7) NOT NULL CHECK (color ~ '^#[0-9A-Fa-f]{6}$'),
///     slug VARCHAR(200) NOT NULL UNIQUE
/// );
/// ```

use serde::{Deserialize, Serialize};
use sqlx::{PgExecutor, PgPool};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Tag {
    pub id: i64,
    pub name: String,

    /// Display color as `#RRGGBB`
    pub color: String,

    pub slug: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTag {
    pub name: String,
    pub color: String,
    pub slug: String,
}

impl Tag {
    pub async fn create(pool: &PgPool, data: CreateTag) -> Result<Self, sqlx::Error> {
        let tag = sqlx::query_as::<_, Tag>(
            r#"
            INSERT INTO tags (name, color, slug)
            VALUES ($1, $2, $3)
            RETURNING id, name, color, slug
            "#,
        )
        .bind(data.name)
        .bind(data.color)
        .bind(data.slug)
        .fetch_one(pool)
        .await?;

        Ok(tag)
    }

    pub async fn find_by_id(pool: &PgPool, id: i64) -> Result<Option<Self>, sqlx::Error> {
        let tag = sqlx::query_as::<_, Tag>("SELECT id, name, color, slug FROM tags WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await?;

        Ok(tag)
    }

    /// All tags ordered by name
    pub async fn list(pool: &PgPool) -> Result<Vec<Self>, sqlx::Error> {
        let tags = sqlx::query_as::<_, Tag>("SELECT id, name, color, slug FROM tags ORDER BY name")
            .fetch_all(pool)
            .await?;

        Ok(tags)
    }

    /// First id in `ids` (in the given order) with no matching tag
    pub async fn find_missing<'e, E>(executor: E, ids: &[i64]) -> Result<Option<i64>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let missing = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT requested.id
            FROM UNNEST($1::bigint[]) WITH ORDINALITY AS requested(id, seq)
            LEFT JOIN tags t ON t.id = requested.id
            WHERE t.id IS NULL
            ORDER BY requested.seq
            LIMIT 1
            "#,
        )
        .bind(ids)
        .fetch_optional(executor)
        .await?;

        Ok(missing)
    }
}
