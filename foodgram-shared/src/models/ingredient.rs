/// Ingredient catalog
///
/// An ingredient is identified by id; two rows may share a name when their
/// measurement units differ ("Salt, g" and "Salt, pinch").
///
/// # Schema
///
/// ```sql
/// CREATE TABLE ingredients (
///     id BIGSERIAL PRIMARY KEY,
///     name VARCHAR(200) NOT NULL,
///     measurement_unit VARCHAR(200) NOT NULL
/// );
/// ```

use serde::{Deserialize, Serialize};
use sqlx::{PgExecutor, PgPool};
use validator::Validate;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Ingredient {
    pub id: i64,
    pub name: String,
    pub measurement_unit: String,
}

/// Input for adding an ingredient to the catalog
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateIngredient {
    #[validate(length(min = 1, max = 200, message = "Name must be 1-200 characters"))]
    pub name: String,

    #[validate(length(
        min = 1,
        max = 200,
        message = "Measurement unit must be 1-200 characters"
    ))]
    pub measurement_unit: String,
}

/// Escapes LIKE wildcards so user input matches literally
fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

impl Ingredient {
    pub async fn create(pool: &PgPool, data: CreateIngredient) -> Result<Self, sqlx::Error> {
        let ingredient = sqlx::query_as::<_, Ingredient>(
            r#"
            INSERT INTO ingredients (name, measurement_unit)
            VALUES ($1, $2)
            RETURNING id, name, measurement_unit
            "#,
        )
        .bind(data.name)
        .bind(data.measurement_unit)
        .fetch_one(pool)
        .await?;

        Ok(ingredient)
    }

    pub async fn find_by_id(pool: &PgPool, id: i64) -> Result<Option<Self>, sqlx::Error> {
        let ingredient = sqlx::query_as::<_, Ingredient>(
            "SELECT id, name, measurement_unit FROM ingredients WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(ingredient)
    }

    /// Replaces name and unit; `None` when no ingredient has `id`
    pub async fn update(
        pool: &PgPool,
        id: i64,
        data: CreateIngredient,
    ) -> Result<Option<Self>, sqlx::Error> {
        let ingredient = sqlx::query_as::<_, Ingredient>(
            r#"
            UPDATE ingredients
            SET name = $2, measurement_unit = $3
            WHERE id = $1
            RETURNING id, name, measurement_unit
            "#,
        )
        .bind(id)
        .bind(data.name)
        .bind(data.measurement_unit)
        .fetch_optional(pool)
        .await?;

        Ok(ingredient)
    }

    /// Lists ingredients ordered by name
    ///
    /// With `prefix`, only names starting with it (case-insensitive) are returned.
    pub async fn search(pool: &PgPool, prefix: Option<&str>) -> Result<Vec<Self>, sqlx::Error> {
        let ingredients = match prefix.filter(|p| !p.is_empty()) {
            Some(prefix) => {
                sqlx::query_as::<_, Ingredient>(
                    r#"
                    SELECT id, name, measurement_unit
                    FROM ingredients
                    WHERE LOWER(name) LIKE LOWER($1) || '%'
                    ORDER BY name, id
                    "#,
                )
                .bind(escape_like(prefix))
                .fetch_all(pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, Ingredient>(
                    "SELECT id, name, measurement_unit FROM ingredients ORDER BY name, id",
                )
                .fetch_all(pool)
                .await?
            }
        };

        Ok(ingredients)
    }

    /// First id in `ids` (in the given order) with no matching ingredient
    pub async fn find_missing<'e, E>(executor: E, ids: &[i64]) -> Result<Option<i64>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let missing = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT requested.id
            FROM UNNEST($1::bigint[]) WITH ORDINALITY AS requested(id, seq)
            LEFT JOIN ingredients i ON i.id = requested.id
            WHERE i.id IS NULL
            ORDER BY requested.seq
            LIMIT 1
            "#,
        )
        .bind(ids)
        .fetch_optional(executor)
        .await?;

        Ok(missing)
    }

    /// Removes an ingredient; recipe rows using it are removed by cascade
    pub async fn delete(pool: &PgPool, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM ingredients WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("salt"), "salt");
        assert_eq!(escape_like("100%"), "100\\%");
        assert_eq!(escape_like("a_b"), "a\\_b");
        assert_eq!(escape_like("back\\slash"), "back\\\\slash");
    }

    #[test]
    fn test_create_ingredient_validation() {
        let ok = CreateIngredient {
            name: "Salt".to_string(),
            measurement_unit: "g".to_string(),
        };
        assert!(ok.validate().is_ok());

        let empty_unit = CreateIngredient {
            name: "Salt".to_string(),
            measurement_unit: String::new(),
        };
        let errors = empty_unit.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("measurement_unit"));
    }
}
