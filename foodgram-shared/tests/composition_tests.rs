/// Integration tests for recipe create/update with link rows
///
/// Run with: cargo test -p foodgram-shared --test composition_tests -- --ignored

mod common;

use common::{create_ingredient, create_tag, create_user, draft, setup_pool};
use foodgram_shared::composition::{create_recipe, update_recipe, CompositionError};
use foodgram_shared::models::recipe::Recipe;

#[tokio::test]
#[ignore]
async fn test_create_persists_links_in_order() {
    let pool = setup_pool().await;
    let author = create_user(&pool).await;
    let flour = create_ingredient(&pool, "Flour", "g").await;
    let eggs = create_ingredient(&pool, "Eggs", "pcs").await;
    let tag = create_tag(&pool).await;

    let recipe = create_recipe(&pool, author.id, &draft(&[(flour.id, 200), (eggs.id, 2)], &[tag.id]))
        .await
        .expect("Create should succeed");
    assert_eq!(recipe.author_id, author.id);

    let ingredients = Recipe::ingredients_for(&pool, &[recipe.id]).await.unwrap();
    let pairs: Vec<(i64, i32)> = ingredients.iter().map(|i| (i.id, i.amount)).collect();
    assert_eq!(pairs, vec![(flour.id, 200), (eggs.id, 2)]);

    let tags = Recipe::tags_for(&pool, &[recipe.id]).await.unwrap();
    assert_eq!(tags.len(), 1);
    assert_eq!(tags[0].tag.id, tag.id);
}

#[tokio::test]
#[ignore]
async fn test_update_replaces_ingredient_set() {
    let pool = setup_pool().await;
    let author = create_user(&pool).await;
    let milk = create_ingredient(&pool, "Milk", "ml").await;
    let sugar = create_ingredient(&pool, "Sugar", "g").await;
    let cocoa = create_ingredient(&pool, "Cocoa", "g").await;
    let tag = create_tag(&pool).await;

    let recipe = create_recipe(&pool, author.id, &draft(&[(milk.id, 250), (sugar.id, 10)], &[tag.id]))
        .await
        .unwrap();

    // drop sugar, add cocoa
    let mut replacement = draft(&[(milk.id, 300), (cocoa.id, 15)], &[tag.id]);
    replacement.name = "Hot chocolate".to_string();
    let updated = update_recipe(&pool, recipe.id, &replacement).await.unwrap();

    assert_eq!(updated.name, "Hot chocolate");
    assert_eq!(updated.pub_date, recipe.pub_date);
    assert_eq!(updated.author_id, author.id);

    let ingredients = Recipe::ingredients_for(&pool, &[recipe.id]).await.unwrap();
    let pairs: Vec<(i64, i32)> = ingredients.iter().map(|i| (i.id, i.amount)).collect();
    assert_eq!(pairs, vec![(milk.id, 300), (cocoa.id, 15)]);
}

#[tokio::test]
#[ignore]
async fn test_missing_ingredient_rolls_back() {
    let pool = setup_pool().await;
    let author = create_user(&pool).await;
    let salt = create_ingredient(&pool, "Salt", "g").await;
    let tag = create_tag(&pool).await;

    let err = create_recipe(&pool, author.id, &draft(&[(salt.id, 1), (i64::MAX, 1)], &[tag.id]))
        .await
        .unwrap_err();
    assert!(matches!(err, CompositionError::IngredientNotFound(id) if id == i64::MAX));

    let err = create_recipe(&pool, author.id, &draft(&[(salt.id, 1)], &[i64::MAX]))
        .await
        .unwrap_err();
    assert!(matches!(err, CompositionError::TagNotFound(_)));

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM recipes WHERE author_id = $1")
        .bind(author.id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 0);
}

#[tokio::test]
#[ignore]
async fn test_failed_update_keeps_previous_links() {
    let pool = setup_pool().await;
    let author = create_user(&pool).await;
    let salt = create_ingredient(&pool, "Salt", "g").await;
    let tag = create_tag(&pool).await;

    let recipe = create_recipe(&pool, author.id, &draft(&[(salt.id, 3)], &[tag.id]))
        .await
        .unwrap();

    let err = update_recipe(&pool, recipe.id, &draft(&[(i64::MAX, 1)], &[tag.id]))
        .await
        .unwrap_err();
    assert!(matches!(err, CompositionError::IngredientNotFound(_)));

    let ingredients = Recipe::ingredients_for(&pool, &[recipe.id]).await.unwrap();
    assert_eq!(ingredients.len(), 1);
    assert_eq!(ingredients[0].amount, 3);
}

#[tokio::test]
#[ignore]
async fn test_update_missing_recipe() {
    let pool = setup_pool().await;
    let salt = create_ingredient(&pool, "Salt", "g").await;
    let tag = create_tag(&pool).await;

    let err = update_recipe(&pool, i64::MAX, &draft(&[(salt.id, 1)], &[tag.id]))
        .await
        .unwrap_err();
    assert!(matches!(err, CompositionError::RecipeNotFound(_)));
}

#[tokio::test]
#[ignore]
async fn test_cooking_time_bounds_at_storage() {
    let pool = setup_pool().await;
    let author = create_user(&pool).await;
    let salt = create_ingredient(&pool, "Salt", "g").await;
    let tag = create_tag(&pool).await;

    let mut d = draft(&[(salt.id, 1)], &[tag.id]);
    d.cooking_time = 0;
    assert!(matches!(
        create_recipe(&pool, author.id, &d).await,
        Err(CompositionError::Invalid(_))
    ));

    d.cooking_time = 1;
    let recipe = create_recipe(&pool, author.id, &d).await.expect("1 minute is valid");
    assert_eq!(recipe.cooking_time, 1);
}
