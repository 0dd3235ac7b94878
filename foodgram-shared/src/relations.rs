/// User relations: favourites, shopping cart and follows
///
/// Each relation is a (user, target) pair that exists at most once. The pair
/// is checked before inserting, and the insert itself is
/// `ON CONFLICT DO NOTHING` against the table's unique constraint, so two
/// concurrent requests for the same pair yield one row and one
/// [`RelationError::AlreadyExists`].
///
/// # Example
///
/// ```no_run
/// use foodgram_shared::relations::{self, Relation};
/// # use sqlx::PgPool;
///
/// # async fn example(pool: PgPool) -> Result<(), relations::RelationError> {
/// relations::add(&pool, Relation::Favourite, 1, 42).await?;
/// assert!(relations::exists(&pool, Relation::Favourite, 1, 42).await?);
/// relations::remove(&pool, Relation::Favourite, 1, 42).await?;
/// # Ok(())
/// # }
/// ```

use std::collections::HashSet;

use sqlx::PgPool;
use tracing::{debug, info};

/// Kind of user relation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Relation {
    /// User marked a recipe as favourite
    Favourite,

    /// User put a recipe in the shopping cart
    ShoppingCart,

    /// User subscribed to an author
    Follow,
}

impl Relation {
    pub const ALL: [Relation; 3] = [Relation::Favourite, Relation::ShoppingCart, Relation::Follow];

    pub fn table(&self) -> &'static str {
        match self {
            Relation::Favourite => "favourites",
            Relation::ShoppingCart => "shopping_cart",
            Relation::Follow => "follows",
        }
    }

    /// Column holding the target id
    pub fn target_column(&self) -> &'static str {
        match self {
            Relation::Favourite | Relation::ShoppingCart => "recipe_id",
            Relation::Follow => "author_id",
        }
    }

    /// Table the target id points into
    pub fn target_table(&self) -> &'static str {
        match self {
            Relation::Favourite | Relation::ShoppingCart => "recipes",
            Relation::Follow => "users",
        }
    }

    /// Unique constraint over (user_id, target)
    pub fn constraint(&self) -> &'static str {
        match self {
            Relation::Favourite => "unique_favorite_recipe",
            Relation::ShoppingCart => "unique_shopping_cart_recipe",
            Relation::Follow => "unique_follow",
        }
    }

    pub fn from_constraint(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|r| r.constraint() == name)
    }

    pub fn already_exists_message(&self) -> &'static str {
        match self {
            Relation::Favourite => "Recipe is already in favorites",
            Relation::ShoppingCart => "Recipe is already in shopping list",
            Relation::Follow => "Already subscribed to this author",
        }
    }

    pub fn not_member_message(&self) -> &'static str {
        match self {
            Relation::Favourite => "Recipe is not in favorites",
            Relation::ShoppingCart => "Recipe is not in shopping list",
            Relation::Follow => "Not subscribed to this author",
        }
    }

    pub fn target_not_found_message(&self) -> &'static str {
        match self {
            Relation::Favourite | Relation::ShoppingCart => "Recipe not found",
            Relation::Follow => "Author not found",
        }
    }
}

/// Relation errors
#[derive(Debug, thiserror::Error)]
pub enum RelationError {
    /// The pair already exists
    #[error("{}", .0.already_exists_message())]
    AlreadyExists(Relation),

    /// Follow or unfollow with user == author
    #[error("Cannot subscribe to yourself")]
    SelfFollow,

    /// Removing a pair that does not exist
    #[error("{}", .0.not_member_message())]
    NotMember(Relation),

    /// The recipe or author does not exist
    #[error("{}", .0.target_not_found_message())]
    TargetNotFound(Relation),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

fn reject_self_follow(relation: Relation, user_id: i64, target_id: i64) -> Result<(), RelationError> {
    if relation == Relation::Follow && user_id == target_id {
        return Err(RelationError::SelfFollow);
    }
    Ok(())
}

async fn ensure_target_exists(
    pool: &PgPool,
    relation: Relation,
    target_id: i64,
) -> Result<(), RelationError> {
    let sql = format!(
        "SELECT EXISTS (SELECT 1 FROM {} WHERE id = $1)",
        relation.target_table()
    );
    let found: bool = sqlx::query_scalar(&sql)
        .bind(target_id)
        .fetch_one(pool)
        .await?;

    if found {
        Ok(())
    } else {
        Err(RelationError::TargetNotFound(relation))
    }
}

/// Returns true if `user_id` already holds the pair
pub async fn exists(
    pool: &PgPool,
    relation: Relation,
    user_id: i64,
    target_id: i64,
) -> Result<bool, sqlx::Error> {
    let sql = format!(
        "SELECT EXISTS (SELECT 1 FROM {} WHERE user_id = $1 AND {} = $2)",
        relation.table(),
        relation.target_column()
    );

    sqlx::query_scalar(&sql)
        .bind(user_id)
        .bind(target_id)
        .fetch_one(pool)
        .await
}

/// Creates the pair
///
/// # Errors
///
/// - [`RelationError::SelfFollow`] when following yourself
/// - [`RelationError::TargetNotFound`] when the recipe/author is missing
/// - [`RelationError::AlreadyExists`] when the pair is already present,
///   including when a concurrent request inserted it first
pub async fn add(
    pool: &PgPool,
    relation: Relation,
    user_id: i64,
    target_id: i64,
) -> Result<(), RelationError> {
    reject_self_follow(relation, user_id, target_id)?;
    ensure_target_exists(pool, relation, target_id).await?;

    if exists(pool, relation, user_id, target_id).await? {
        debug!(?relation, user_id, target_id, "Relation already present");
        return Err(RelationError::AlreadyExists(relation));
    }

    let sql = format!(
        "INSERT INTO {} (user_id, {}) VALUES ($1, $2) ON CONFLICT ON CONSTRAINT {} DO NOTHING",
        relation.table(),
        relation.target_column(),
        relation.constraint()
    );

    let result = sqlx::query(&sql)
        .bind(user_id)
        .bind(target_id)
        .execute(pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.is_foreign_key_violation() {
                    return RelationError::TargetNotFound(relation);
                }
            }
            RelationError::Database(e)
        })?;

    if result.rows_affected() == 0 {
        debug!(?relation, user_id, target_id, "Relation inserted concurrently");
        return Err(RelationError::AlreadyExists(relation));
    }

    info!(?relation, user_id, target_id, "Relation created");
    Ok(())
}

/// Deletes the pair
///
/// # Errors
///
/// - [`RelationError::SelfFollow`] when unfollowing yourself
/// - [`RelationError::TargetNotFound`] when the recipe/author is missing
/// - [`RelationError::NotMember`] when the pair does not exist
pub async fn remove(
    pool: &PgPool,
    relation: Relation,
    user_id: i64,
    target_id: i64,
) -> Result<(), RelationError> {
    reject_self_follow(relation, user_id, target_id)?;
    ensure_target_exists(pool, relation, target_id).await?;

    let sql = format!(
        "DELETE FROM {} WHERE user_id = $1 AND {} = $2",
        relation.table(),
        relation.target_column()
    );

    let result = sqlx::query(&sql)
        .bind(user_id)
        .bind(target_id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(RelationError::NotMember(relation));
    }

    info!(?relation, user_id, target_id, "Relation removed");
    Ok(())
}

/// Subset of `target_ids` that `user_id` holds a pair with
///
/// Used to fill `is_favorited`, `is_in_shopping_cart` and `is_subscribed`
/// for a whole page in one query.
pub async fn existing_targets(
    pool: &PgPool,
    relation: Relation,
    user_id: i64,
    target_ids: &[i64],
) -> Result<HashSet<i64>, sqlx::Error> {
    if target_ids.is_empty() {
        return Ok(HashSet::new());
    }

    let sql = format!(
        "SELECT {column} FROM {table} WHERE user_id = $1 AND {column} = ANY($2)",
        column = relation.target_column(),
        table = relation.table()
    );

    let ids: Vec<i64> = sqlx::query_scalar(&sql)
        .bind(user_id)
        .bind(target_ids)
        .fetch_all(pool)
        .await?;

    Ok(ids.into_iter().collect())
}
