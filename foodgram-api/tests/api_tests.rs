/// End-to-end API tests against a live database
///
/// Marked `#[ignore]`; run with `cargo test -p foodgram-api -- --ignored`.

mod common;

use axum::http::{header, Method, StatusCode};
use common::{recipe_body, unique, TestContext};
use foodgram_shared::models::user::AccessLevel;
use serde_json::json;

#[tokio::test]
#[ignore]
async fn test_register_then_duplicate_rejected() {
    let ctx = TestContext::new().await.unwrap();
    let username = unique("julia");
    let body = json!({
        "email": format!("{}@example.com", username),
        "username": username,
        "first_name": "Julia",
        "last_name": "Child",
        "password": "bouillabaisse",
    });

    let response = ctx.post("/api/users/", None, Some(body.clone())).await;
    assert_eq!(response.status, StatusCode::CREATED, "{}", response.text);
    assert_eq!(response.json["username"], username.as_str());
    assert!(response.json.get("password").is_none());

    let response = ctx.post("/api/users/", None, Some(body)).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(response.json["message"].as_str().unwrap().contains("already exists"));
}

#[tokio::test]
#[ignore]
async fn test_me_and_profile() {
    let ctx = TestContext::new().await.unwrap();
    let user = ctx.create_user().await;

    let response = ctx.get("/api/users/me/", Some(&user)).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json["id"], user.id);
    assert_eq!(response.json["is_subscribed"], false);

    let response = ctx.get(&format!("/api/users/{}/", user.id), None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json["email"], user.email.as_str());

    let response = ctx.get("/api/users/999999999/", None).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
#[ignore]
async fn test_create_and_read_recipe() {
    let ctx = TestContext::new().await.unwrap();
    let author = ctx.create_user().await;
    let flour = ctx.create_ingredient("g").await;
    let tag = ctx.create_tag().await;

    let response = ctx
        .post(
            "/api/recipes/",
            Some(&author),
            Some(recipe_body(&[(flour.id, 200)], &[tag.id], 1)),
        )
        .await;
    assert_eq!(response.status, StatusCode::CREATED, "{}", response.text);

    let recipe = &response.json;
    assert_eq!(recipe["author"]["id"], author.id);
    assert_eq!(recipe["cooking_time"], 1);
    assert_eq!(recipe["tags"][0]["slug"], tag.slug.as_str());
    assert_eq!(recipe["ingredients"][0]["id"], flour.id);
    assert_eq!(recipe["ingredients"][0]["amount"], 200);
    assert_eq!(recipe["is_favorited"], false);

    let id = recipe["id"].as_i64().unwrap();
    let response = ctx.get(&format!("/api/recipes/{}/", id), None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json["is_in_shopping_cart"], false);
}

#[tokio::test]
#[ignore]
async fn test_invalid_recipes_rejected() {
    let ctx = TestContext::new().await.unwrap();
    let author = ctx.create_user().await;
    let flour = ctx.create_ingredient("g").await;
    let tag = ctx.create_tag().await;

    for cooking_time in [0, -5] {
        let response = ctx
            .post(
                "/api/recipes/",
                Some(&author),
                Some(recipe_body(&[(flour.id, 200)], &[tag.id], cooking_time)),
            )
            .await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST);
        assert_eq!(response.json["details"][0]["field"], "cooking_time");
    }

    let response = ctx
        .post(
            "/api/recipes/",
            Some(&author),
            Some(recipe_body(&[(flour.id, 200)], &[tag.id, tag.id], 10)),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let response = ctx
        .post(
            "/api/recipes/",
            Some(&author),
            Some(recipe_body(&[(999_999_999, 5)], &[tag.id], 10)),
        )
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert!(response.json["message"].as_str().unwrap().contains("999999999"));

    let response = ctx
        .post("/api/recipes/", None, Some(recipe_body(&[(flour.id, 1)], &[tag.id], 10)))
        .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore]
async fn test_only_author_or_admin_may_update() {
    let ctx = TestContext::new().await.unwrap();
    let author = ctx.create_user().await;
    let stranger = ctx.create_user().await;
    let admin = ctx.create_user_with_level(AccessLevel::Admin).await;
    let salt = ctx.create_ingredient("g").await;
    let pepper = ctx.create_ingredient("g").await;
    let tag = ctx.create_tag().await;

    let id = ctx.create_recipe(&author, &[(salt.id, 5)], &[tag.id]).await;
    let uri = format!("/api/recipes/{}/", id);

    let replacement = recipe_body(&[(pepper.id, 2)], &[tag.id], 30);

    let response = ctx
        .request(Method::PUT, &uri, Some(&stranger), Some(replacement.clone()))
        .await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);

    let response = ctx
        .request(Method::PATCH, &uri, Some(&admin), Some(replacement))
        .await;
    assert_eq!(response.status, StatusCode::OK, "{}", response.text);

    let ingredients = response.json["ingredients"].as_array().unwrap();
    assert_eq!(ingredients.len(), 1);
    assert_eq!(ingredients[0]["id"], pepper.id);
    assert_eq!(response.json["author"]["id"], author.id);

    let response = ctx.delete(&uri, Some(&stranger)).await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);

    let response = ctx.delete(&uri, Some(&author)).await;
    assert_eq!(response.status, StatusCode::NO_CONTENT);

    let response = ctx.get(&uri, None).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
#[ignore]
async fn test_favorite_twice_rejected() {
    let ctx = TestContext::new().await.unwrap();
    let author = ctx.create_user().await;
    let reader = ctx.create_user().await;
    let salt = ctx.create_ingredient("g").await;
    let tag = ctx.create_tag().await;
    let id = ctx.create_recipe(&author, &[(salt.id, 5)], &[tag.id]).await;
    let uri = format!("/api/recipes/{}/favorite/", id);

    let response = ctx.post(&uri, Some(&reader), None).await;
    assert_eq!(response.status, StatusCode::CREATED);
    assert_eq!(response.json["id"], id);
    assert!(response.json.get("text").is_none());

    let response = ctx.post(&uri, Some(&reader), None).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let response = ctx.get("/api/recipes/?is_favorited=1", Some(&reader)).await;
    assert_eq!(response.json["count"], 1);
    assert_eq!(response.json["results"][0]["is_favorited"], true);

    let response = ctx.delete(&uri, Some(&reader)).await;
    assert_eq!(response.status, StatusCode::NO_CONTENT);

    let response = ctx.delete(&uri, Some(&reader)).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);

    let response = ctx.post("/api/recipes/999999999/favorite/", Some(&reader), None).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
#[ignore]
async fn test_shopping_cart_download() {
    let ctx = TestContext::new().await.unwrap();
    let author = ctx.create_user().await;
    let shopper = ctx.create_user().await;
    let salt = ctx.create_ingredient("g").await;
    let flour = ctx.create_ingredient("g").await;
    let tag = ctx.create_tag().await;

    let response = ctx.get("/api/recipes/download_shopping_cart/", Some(&shopper)).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.text, "Shopping list:");

    let first = ctx.create_recipe(&author, &[(salt.id, 5), (flour.id, 200)], &[tag.id]).await;
    let second = ctx.create_recipe(&author, &[(salt.id, 10)], &[tag.id]).await;

    for id in [first, second] {
        let response = ctx
            .post(&format!("/api/recipes/{}/shopping_cart/", id), Some(&shopper), None)
            .await;
        assert_eq!(response.status, StatusCode::CREATED);
    }

    let response = ctx.get("/api/recipes/download_shopping_cart/", Some(&shopper)).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(
        response.headers.get(header::CONTENT_DISPOSITION).unwrap(),
        "attachment; filename=\"shopping_list.txt\""
    );
    assert!(response.headers[header::CONTENT_TYPE]
        .to_str()
        .unwrap()
        .starts_with("text/plain"));
    assert_eq!(
        response.text,
        format!("Shopping list:\n{} (g) - 15\n{} (g) - 200", salt.name, flour.name)
    );

    let response = ctx.get("/api/recipes/download_shopping_cart/", None).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore]
async fn test_subscriptions() {
    let ctx = TestContext::new().await.unwrap();
    let author = ctx.create_user().await;
    let follower = ctx.create_user().await;
    let salt = ctx.create_ingredient("g").await;
    let tag = ctx.create_tag().await;

    for _ in 0..3 {
        ctx.create_recipe(&author, &[(salt.id, 1)], &[tag.id]).await;
    }

    let response = ctx
        .post(&format!("/api/users/{}/subscribe/", follower.id), Some(&follower), None)
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let uri = format!("/api/users/{}/subscribe/?recipes_limit=2", author.id);
    let response = ctx.post(&uri, Some(&follower), None).await;
    assert_eq!(response.status, StatusCode::CREATED, "{}", response.text);
    assert_eq!(response.json["is_subscribed"], true);
    assert_eq!(response.json["recipes"].as_array().unwrap().len(), 2);
    assert_eq!(response.json["recipes_count"], 3);

    let response = ctx.post(&uri, Some(&follower), None).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let response = ctx
        .get("/api/users/subscriptions/?recipes_limit=abc", Some(&follower))
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json["count"], 1);
    assert_eq!(response.json["results"][0]["id"], author.id);
    assert_eq!(response.json["results"][0]["recipes"].as_array().unwrap().len(), 3);

    let response = ctx.get(&format!("/api/users/{}/", author.id), Some(&follower)).await;
    assert_eq!(response.json["is_subscribed"], true);

    let response = ctx
        .delete(&format!("/api/users/{}/subscribe/", author.id), Some(&follower))
        .await;
    assert_eq!(response.status, StatusCode::NO_CONTENT);
}

#[tokio::test]
#[ignore]
async fn test_ingredient_catalog_admin_only() {
    let ctx = TestContext::new().await.unwrap();
    let user = ctx.create_user().await;
    let admin = ctx.create_user_with_level(AccessLevel::Admin).await;
    let name = unique("Saffron");
    let body = json!({ "name": name, "measurement_unit": "pinch" });

    let response = ctx.post("/api/ingredients/", Some(&user), Some(body.clone())).await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);

    let response = ctx.post("/api/ingredients/", Some(&admin), Some(body)).await;
    assert_eq!(response.status, StatusCode::CREATED);
    let id = response.json["id"].as_i64().unwrap();

    let response = ctx
        .get(&format!("/api/ingredients/?search={}", name.to_lowercase()), None)
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json.as_array().unwrap().len(), 1);

    let uri = format!("/api/ingredients/{}/", id);
    let response = ctx.delete(&uri, Some(&user)).await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);

    let response = ctx.delete(&uri, Some(&admin)).await;
    assert_eq!(response.status, StatusCode::NO_CONTENT);

    let response = ctx.get(&uri, None).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
#[ignore]
async fn test_filter_by_tag_and_author() {
    let ctx = TestContext::new().await.unwrap();
    let author = ctx.create_user().await;
    let salt = ctx.create_ingredient("g").await;
    let breakfast = ctx.create_tag().await;
    let dinner = ctx.create_tag().await;

    let morning = ctx.create_recipe(&author, &[(salt.id, 1)], &[breakfast.id]).await;
    let evening = ctx.create_recipe(&author, &[(salt.id, 1)], &[dinner.id]).await;

    let response = ctx
        .get(&format!("/api/recipes/?tags={}", breakfast.slug), None)
        .await;
    assert_eq!(response.json["count"], 1);
    assert_eq!(response.json["results"][0]["id"], morning);

    let response = ctx
        .get(
            &format!("/api/recipes/?author={}&tags={},{}", author.id, breakfast.slug, dinner.slug),
            None,
        )
        .await;
    assert_eq!(response.json["count"], 2);
    // newest first
    assert_eq!(response.json["results"][0]["id"], evening);
    assert_eq!(response.json["results"][1]["id"], morning);
}

#[tokio::test]
#[ignore]
async fn test_ingredient_update_admin_only() {
    let ctx = TestContext::new().await.unwrap();
    let user = ctx.create_user().await;
    let admin = ctx.create_user_with_level(AccessLevel::Admin).await;
    let ingredient = ctx.create_ingredient("g").await;
    let uri = format!("/api/ingredients/{}/", ingredient.id);
    let body = json!({ "name": unique("Sea salt"), "measurement_unit": "pinch" });

    let response = ctx
        .request(Method::PUT, &uri, Some(&user), Some(body.clone()))
        .await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);

    let response = ctx
        .request(Method::PATCH, &uri, Some(&admin), Some(body.clone()))
        .await;
    assert_eq!(response.status, StatusCode::OK, "{}", response.text);
    assert_eq!(response.json["id"], ingredient.id);
    assert_eq!(response.json["name"], body["name"]);
    assert_eq!(response.json["measurement_unit"], "pinch");

    let response = ctx
        .request(
            Method::PUT,
            &uri,
            Some(&admin),
            Some(json!({ "name": "", "measurement_unit": "g" })),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let response = ctx
        .request(Method::PUT, "/api/ingredients/999999999/", Some(&admin), Some(body))
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}
