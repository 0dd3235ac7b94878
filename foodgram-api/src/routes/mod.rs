/// API route handlers, one module per resource
///
/// - `health`: Service and database status
/// - `users`: Registration, profiles, password change and subscriptions
/// - `recipes`: Recipe CRUD, favourites, shopping cart and its download
/// - `tags`: Read-only tag list
/// - `ingredients`: Ingredient catalog

pub mod health;
pub mod ingredients;
pub mod recipes;
pub mod tags;
pub mod users;
