use crate::{
    error::QueryError,
    schema::{CartLineItem, Id},
};

use sqlx::{Pool, Postgres};

/// Every line item of every recipe in the user's shopping cart, unmerged.
pub async fn list_cart_line_items(
    user_id: Id,
    pool: &Pool<Postgres>,
) -> Result<Vec<CartLineItem>, potion::Error> {
    let rows: Vec<CartLineItem> = sqlx::query_as(
        "
        SELECT i.id AS ingredient_id, i.name, i.measurement_unit, ri.amount
        FROM shopping_cart sc
        INNER JOIN recipe_ingredients ri ON ri.recipe_id = sc.recipe_id
        INNER JOIN ingredients i ON i.id = ri.ingredient_id
        WHERE sc.user_id = $1
    ",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(rows)
}
