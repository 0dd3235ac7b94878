/// Shopping list aggregation
///
/// Sums ingredient amounts over every recipe in a user's shopping cart.
/// Ingredients are grouped by (name, measurement unit), so "Salt (g)" and
/// "Salt (pinch)" stay separate lines. Lines keep the order in which each
/// ingredient was first seen: cart entries oldest first, then ingredient rows
/// in the order they were stored for the recipe.
///
/// # Example
///
/// ```
/// use foodgram_shared::shopping_list::ShoppingList;
///
/// let mut list = ShoppingList::new();
/// list.add("Salt", "g", 5);
/// list.add("Flour", "g", 200);
/// list.add("Salt", "g", 10);
///
/// assert_eq!(list.total_for("Salt", "g"), Some(15));
/// assert_eq!(list.render(), "Shopping list:\nSalt (g) - 15\nFlour (g) - 200");
/// ```

use std::collections::HashMap;
use std::fmt;

use serde::Serialize;
use sqlx::PgPool;
use tracing::debug;

/// First line of the rendered list
pub const HEADER: &str = "Shopping list:";

/// File name offered for download
pub const FILE_NAME: &str = "shopping_list.txt";

/// One ingredient row reached through the cart
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct CartIngredientRow {
    pub name: String,
    pub measurement_unit: String,
    pub amount: i32,
}

/// Aggregated line of the list
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShoppingListItem {
    pub name: String,
    pub measurement_unit: String,
    pub total: i64,
}

/// Ingredient totals in first-seen order
#[derive(Debug, Clone, Default)]
pub struct ShoppingList {
    items: Vec<ShoppingListItem>,
    index: HashMap<(String, String), usize>,
}

impl ShoppingList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `amount` to the ingredient's total, appending it if unseen
    pub fn add(&mut self, name: &str, measurement_unit: &str, amount: i64) {
        let key = (name.to_string(), measurement_unit.to_string());

        match self.index.get(&key) {
            Some(&position) => self.items[position].total += amount,
            None => {
                self.index.insert(key, self.items.len());
                self.items.push(ShoppingListItem {
                    name: name.to_string(),
                    measurement_unit: measurement_unit.to_string(),
                    total: amount,
                });
            }
        }
    }

    pub fn items(&self) -> &[ShoppingListItem] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn total_for(&self, name: &str, measurement_unit: &str) -> Option<i64> {
        self.index
            .get(&(name.to_string(), measurement_unit.to_string()))
            .map(|&position| self.items[position].total)
    }

    /// Header line followed by `<name> (<unit>) - <total>` per ingredient
    pub fn render(&self) -> String {
        self.to_string()
    }

    /// Builds the list for everything in `user_id`'s shopping cart
    pub async fn for_user(pool: &PgPool, user_id: i64) -> Result<Self, sqlx::Error> {
        let rows = sqlx::query_as::<_, CartIngredientRow>(
            r#"
            SELECT i.name, i.measurement_unit, ir.amount
            FROM shopping_cart sc
            JOIN ingredient_recipes ir ON ir.recipe_id = sc.recipe_id
            JOIN ingredients i ON i.id = ir.ingredient_id
            WHERE sc.user_id = $1
            ORDER BY sc.created_at, sc.id, ir.id
            "#,
        )
        .bind(user_id)
        .fetch_all(pool)
        .await?;

        let list: ShoppingList = rows.into_iter().collect();
        debug!(
            user_id,
            lines = list.len(),
            "Aggregated shopping list"
        );

        Ok(list)
    }
}

impl Extend<CartIngredientRow> for ShoppingList {
    fn extend<I: IntoIterator<Item = CartIngredientRow>>(&mut self, rows: I) {
        for row in rows {
            self.add(&row.name, &row.measurement_unit, i64::from(row.amount));
        }
    }
}

impl FromIterator<CartIngredientRow> for ShoppingList {
    fn from_iter<I: IntoIterator<Item = CartIngredientRow>>(rows: I) -> Self {
        let mut list = ShoppingList::new();
        list.extend(rows);
        list
    }
}

impl fmt::Display for ShoppingList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(HEADER)?;
        for item in &self.items {
            write!(
                f,
                "\n{} ({}) - {}",
                item.name, item.measurement_unit, item.total
            )?;
        }
        Ok(())
    }
}
