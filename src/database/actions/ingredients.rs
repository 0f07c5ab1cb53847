use crate::{
    authentication::permissions::ActionType,
    error::{NotFoundError, QueryError},
    form::IngredientForm,
    jwt::SessionData,
    schema::{Id, Ingredient},
};

use super::contains_pattern;

use log::info;
use sqlx::{PgConnection, Pool, Postgres};

pub async fn create_ingredient(
    session: &SessionData,
    form: IngredientForm,
    pool: &Pool<Postgres>,
) -> Result<Ingredient, potion::Error> {
    session.authenticate(ActionType::ManageCatalog)?;
    form.validate()?;

    let ingredient: Ingredient = sqlx::query_as(
        "INSERT INTO ingredients (name, measurement_unit) VALUES ($1, $2) RETURNING *",
    )
    .bind(form.name.trim())
    .bind(form.measurement_unit.trim())
    .fetch_one(pool)
    .await
    .map_err(QueryError::from)?;

    info!("Created ingredient {} ({})", ingredient.id, ingredient.name);
    Ok(ingredient)
}

pub async fn get_ingredient(id: Id, pool: &Pool<Postgres>) -> Result<Ingredient, potion::Error> {
    let ingredient: Option<Ingredient> = sqlx::query_as("SELECT * FROM ingredients WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(QueryError::from)?;

    ingredient.ok_or_else(|| NotFoundError::new("No ingredient exists with specified id").into())
}

/// Ingredients whose name contains `search`, names starting with it first.
pub async fn list_ingredients(
    search: Option<&str>,
    pool: &Pool<Postgres>,
) -> Result<Vec<Ingredient>, potion::Error> {
    let rows: Vec<Ingredient> = match search.map(str::trim).filter(|s| !s.is_empty()) {
        Some(search) => sqlx::query_as(
            "
            SELECT * FROM ingredients
            WHERE name ILIKE $1
            ORDER BY starts_with(LOWER(name), LOWER($2)) DESC, name, id
        ",
        )
        .bind(contains_pattern(search))
        .bind(search)
        .fetch_all(pool)
        .await
        .map_err(QueryError::from)?,
        None => sqlx::query_as("SELECT * FROM ingredients ORDER BY name, id")
            .fetch_all(pool)
            .await
            .map_err(QueryError::from)?,
    };

    Ok(rows)
}

/// Ids from `ingredient_ids` that have no row.
pub(crate) async fn find_missing_ingredients(
    ingredient_ids: &[Id],
    conn: &mut PgConnection,
) -> Result<Vec<Id>, potion::Error> {
    let found: Vec<(Id,)> = sqlx::query_as("SELECT id FROM ingredients WHERE id = ANY($1)")
        .bind(ingredient_ids.to_vec())
        .fetch_all(&mut *conn)
        .await
        .map_err(QueryError::from)?;

    Ok(ingredient_ids
        .iter()
        .copied()
        .filter(|id| !found.iter().any(|(found,)| found == id))
        .collect())
}
