use std::collections::HashSet;

use crate::{
    authentication::permissions::ActionType,
    error::{ConflictError, NotFoundError, QueryError},
    jwt::SessionData,
    schema::{Id, RecipePreview},
};

use log::debug;
use sqlx::{Pool, Postgres};

/// Caller scoped recipe sets with (user, recipe) primary keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecipeRelation {
    Favorites,
    ShoppingCart,
}

impl RecipeRelation {
    pub fn table(self) -> &'static str {
        match self {
            RecipeRelation::Favorites => "favorites",
            RecipeRelation::ShoppingCart => "shopping_cart",
        }
    }

    fn already_added(self) -> &'static str {
        match self {
            RecipeRelation::Favorites => "Recipe is already in favorites",
            RecipeRelation::ShoppingCart => "Recipe is already in the shopping cart",
        }
    }

    fn not_added(self) -> &'static str {
        match self {
            RecipeRelation::Favorites => "Recipe is not in favorites",
            RecipeRelation::ShoppingCart => "Recipe is not in the shopping cart",
        }
    }
}

pub async fn get_recipe_preview(
    id: Id,
    pool: &Pool<Postgres>,
) -> Result<RecipePreview, potion::Error> {
    let preview: Option<RecipePreview> =
        sqlx::query_as("SELECT id, author_id, name, image, cooking_time FROM recipes WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
            .map_err(QueryError::from)?;

    preview.ok_or_else(|| NotFoundError::new("No recipe exists with specified id").into())
}

pub async fn is_related(
    relation: RecipeRelation,
    user_id: Id,
    recipe_id: Id,
    pool: &Pool<Postgres>,
) -> Result<bool, potion::Error> {
    let result: Option<(Id,)> = sqlx::query_as(&format!(
        "SELECT recipe_id FROM {} WHERE user_id = $1 AND recipe_id = $2",
        relation.table()
    ))
    .bind(user_id)
    .bind(recipe_id)
    .fetch_optional(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(result.is_some())
}

/// Which of `recipe_ids` the user has in `relation`.
pub async fn related_recipe_ids(
    relation: RecipeRelation,
    user_id: Id,
    recipe_ids: &[Id],
    pool: &Pool<Postgres>,
) -> Result<HashSet<Id>, potion::Error> {
    let rows: Vec<(Id,)> = sqlx::query_as(&format!(
        "SELECT recipe_id FROM {} WHERE user_id = $1 AND recipe_id = ANY($2)",
        relation.table()
    ))
    .bind(user_id)
    .bind(recipe_ids.to_vec())
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(rows.into_iter().map(|(id,)| id).collect())
}

/// Adds the recipe to the caller's set. The primary key settles races
/// between concurrent adds; both paths report the same conflict.
pub async fn add_recipe_relation(
    relation: RecipeRelation,
    session: &SessionData,
    recipe_id: Id,
    pool: &Pool<Postgres>,
) -> Result<RecipePreview, potion::Error> {
    session.authenticate(ActionType::ManageOwnRelations)?;
    let preview = get_recipe_preview(recipe_id, pool).await?;

    if is_related(relation, session.user_id, recipe_id, pool).await? {
        return Err(ConflictError::new(relation.already_added()).into());
    }

    let result = sqlx::query(&format!(
        "INSERT INTO {} (user_id, recipe_id) VALUES ($1, $2)",
        relation.table()
    ))
    .bind(session.user_id)
    .bind(recipe_id)
    .execute(pool)
    .await;

    if let Err(e) = result {
        let e = QueryError::from(e);
        if e.is_unique_violation() {
            return Err(ConflictError::new(relation.already_added()).into());
        }
        return Err(e.into());
    }

    debug!(
        "User {} added recipe {} to {}",
        session.user_id,
        recipe_id,
        relation.table()
    );
    Ok(preview)
}

pub async fn remove_recipe_relation(
    relation: RecipeRelation,
    session: &SessionData,
    recipe_id: Id,
    pool: &Pool<Postgres>,
) -> Result<(), potion::Error> {
    session.authenticate(ActionType::ManageOwnRelations)?;

    let result = sqlx::query(&format!(
        "DELETE FROM {} WHERE user_id = $1 AND recipe_id = $2",
        relation.table()
    ))
    .bind(session.user_id)
    .bind(recipe_id)
    .execute(pool)
    .await
    .map_err(QueryError::from)?;

    if result.rows_affected() == 0 {
        return Err(NotFoundError::new(relation.not_added()).into());
    }

    Ok(())
}

pub async fn add_to_favorites(
    session: &SessionData,
    recipe_id: Id,
    pool: &Pool<Postgres>,
) -> Result<RecipePreview, potion::Error> {
    add_recipe_relation(RecipeRelation::Favorites, session, recipe_id, pool).await
}

pub async fn remove_from_favorites(
    session: &SessionData,
    recipe_id: Id,
    pool: &Pool<Postgres>,
) -> Result<(), potion::Error> {
    remove_recipe_relation(RecipeRelation::Favorites, session, recipe_id, pool).await
}

pub async fn add_to_shopping_cart(
    session: &SessionData,
    recipe_id: Id,
    pool: &Pool<Postgres>,
) -> Result<RecipePreview, potion::Error> {
    add_recipe_relation(RecipeRelation::ShoppingCart, session, recipe_id, pool).await
}

pub async fn remove_from_shopping_cart(
    session: &SessionData,
    recipe_id: Id,
    pool: &Pool<Postgres>,
) -> Result<(), potion::Error> {
    remove_recipe_relation(RecipeRelation::ShoppingCart, session, recipe_id, pool).await
}
