use std::collections::{HashMap, HashSet};

use crate::{
    authentication::permissions::ActionType,
    error::{NotFoundError, QueryError, ValidationError},
    filter::RecipeFilter,
    form::{IngredientAmount, RecipeChanges, RecipeForm},
    jwt::SessionData,
    pagination::{Page, PageQuery},
    schema::{Id, Recipe, RecipePart, RecipeRow, RecipeView, UserProfile},
};

use super::{
    contains_pattern, find_missing_ingredients, find_missing_tags, list_recipe_tags,
    list_user_profiles, related_recipe_ids, set_recipe_tags, RecipeRelation,
};

use log::info;
use sqlx::{PgConnection, Pool, Postgres, QueryBuilder};

pub async fn get_recipe(id: Id, pool: &Pool<Postgres>) -> Result<Option<Recipe>, potion::Error> {
    let row: Option<Recipe> = sqlx::query_as("SELECT * FROM recipes WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(row)
}

/// Recipe the caller is allowed to change: their own, or any with `ManageAllRecipes`.
pub async fn get_recipe_mut(
    id: Id,
    session: &SessionData,
    pool: &Pool<Postgres>,
) -> Result<Recipe, potion::Error> {
    let recipe = get_recipe(id, pool)
        .await?
        .ok_or_else(|| NotFoundError::new("No recipe exists with specified id"))?;

    session.authenticate_owner(
        recipe.author_id,
        ActionType::ManageOwnRecipes,
        ActionType::ManageAllRecipes,
    )?;

    Ok(recipe)
}

pub async fn create_recipe(
    session: &SessionData,
    form: RecipeForm,
    pool: &Pool<Postgres>,
) -> Result<RecipeView, potion::Error> {
    session.authenticate(ActionType::CreateRecipes)?;
    let changes = form.validate(false)?;

    let mut tx = pool.begin().await.map_err(QueryError::from)?;
    check_references(&changes, &mut tx).await?;

    let recipe: Recipe = sqlx::query_as(
        "
        INSERT INTO recipes (author_id, name, text, image, cooking_time)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
    ",
    )
    .bind(session.user_id)
    .bind(&changes.name)
    .bind(&changes.text)
    .bind(&changes.image)
    .bind(changes.cooking_time)
    .fetch_one(&mut *tx)
    .await
    .map_err(QueryError::from)?;

    apply_relations(recipe.id, &changes, &mut tx).await?;
    tx.commit().await.map_err(QueryError::from)?;

    info!("User {} created recipe {}", session.user_id, recipe.id);
    get_recipe_view(recipe.id, Some(session.user_id), pool).await
}

/// `partial` is a `PATCH`: omitted fields, tags and ingredients stay as they are.
pub async fn update_recipe(
    session: &SessionData,
    id: Id,
    form: RecipeForm,
    partial: bool,
    pool: &Pool<Postgres>,
) -> Result<RecipeView, potion::Error> {
    let recipe = get_recipe_mut(id, session, pool).await?;
    let changes = form.validate(partial)?;

    let mut tx = pool.begin().await.map_err(QueryError::from)?;
    check_references(&changes, &mut tx).await?;

    sqlx::query(
        "
        UPDATE recipes SET
        name = COALESCE($1, name),
        text = COALESCE($2, text),
        image = COALESCE($3, image),
        cooking_time = COALESCE($4, cooking_time)
        WHERE id = $5
    ",
    )
    .bind(&changes.name)
    .bind(&changes.text)
    .bind(&changes.image)
    .bind(changes.cooking_time)
    .bind(recipe.id)
    .execute(&mut *tx)
    .await
    .map_err(QueryError::from)?;

    apply_relations(recipe.id, &changes, &mut tx).await?;
    tx.commit().await.map_err(QueryError::from)?;

    info!("User {} updated recipe {}", session.user_id, recipe.id);
    get_recipe_view(recipe.id, Some(session.user_id), pool).await
}

pub async fn delete_recipe(
    session: &SessionData,
    id: Id,
    pool: &Pool<Postgres>,
) -> Result<(), potion::Error> {
    let recipe = get_recipe_mut(id, session, pool).await?;

    sqlx::query("DELETE FROM recipes WHERE id = $1")
        .bind(recipe.id)
        .execute(pool)
        .await
        .map_err(QueryError::from)?;

    info!("User {} deleted recipe {}", session.user_id, recipe.id);
    Ok(())
}

/// Every referenced ingredient and tag must exist.
async fn check_references(
    changes: &RecipeChanges,
    conn: &mut PgConnection,
) -> Result<(), potion::Error> {
    let mut errors = ValidationError::new();

    if let Some(ingredients) = &changes.ingredients {
        let ids: Vec<Id> = ingredients.iter().map(|ingredient| ingredient.id).collect();
        for id in find_missing_ingredients(&ids, conn).await? {
            errors.add("ingredients", &format!("Ingredient with id {id} does not exist."));
        }
    }

    if let Some(tags) = &changes.tags {
        for id in find_missing_tags(tags, conn).await? {
            errors.add("tags", &format!("Tag with id {id} does not exist."));
        }
    }

    errors.into_result()?;
    Ok(())
}

async fn apply_relations(
    recipe_id: Id,
    changes: &RecipeChanges,
    conn: &mut PgConnection,
) -> Result<(), potion::Error> {
    if let Some(tags) = &changes.tags {
        set_recipe_tags(recipe_id, tags, conn).await?;
    }
    if let Some(ingredients) = &changes.ingredients {
        set_recipe_parts(recipe_id, ingredients, conn).await?;
    }

    Ok(())
}

/// Deletes every line item of the recipe and bulk-inserts `ingredients`.
pub(crate) async fn set_recipe_parts(
    recipe_id: Id,
    ingredients: &[IngredientAmount],
    conn: &mut PgConnection,
) -> Result<(), potion::Error> {
    sqlx::query("DELETE FROM recipe_ingredients WHERE recipe_id = $1")
        .bind(recipe_id)
        .execute(&mut *conn)
        .await
        .map_err(QueryError::from)?;

    if ingredients.is_empty() {
        return Ok(());
    }

    let mut query = QueryBuilder::<Postgres>::new(
        "INSERT INTO recipe_ingredients (recipe_id, ingredient_id, amount) ",
    );
    query.push_values(ingredients, |mut row, ingredient| {
        row.push_bind(recipe_id)
            .push_bind(ingredient.id)
            .push_bind(ingredient.amount);
    });

    query
        .build()
        .execute(&mut *conn)
        .await
        .map_err(QueryError::from)?;

    Ok(())
}

pub async fn list_recipe_parts(
    recipe_ids: &[Id],
    pool: &Pool<Postgres>,
) -> Result<Vec<RecipePart>, potion::Error> {
    let rows: Vec<RecipePart> = sqlx::query_as(
        "
        SELECT ri.recipe_id, i.id, i.name, i.measurement_unit, ri.amount
        FROM recipe_ingredients ri
        INNER JOIN ingredients i ON i.id = ri.ingredient_id
        WHERE ri.recipe_id = ANY($1)
        ORDER BY ri.id
    ",
    )
    .bind(recipe_ids.to_vec())
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(rows)
}

pub async fn get_recipe_view(
    id: Id,
    caller: Option<Id>,
    pool: &Pool<Postgres>,
) -> Result<RecipeView, potion::Error> {
    let recipe = get_recipe(id, pool)
        .await?
        .ok_or_else(|| NotFoundError::new("No recipe exists with specified id"))?;

    let mut views = build_recipe_views(vec![recipe], caller, pool).await?;
    views
        .pop()
        .ok_or_else(|| NotFoundError::new("No recipe exists with specified id").into())
}

pub async fn fetch_recipes(
    filter: &RecipeFilter,
    page: PageQuery,
    caller: Option<Id>,
    path: &str,
    pool: &Pool<Postgres>,
) -> Result<Page<RecipeView>, potion::Error> {
    let mut query =
        QueryBuilder::<Postgres>::new("SELECT r.*, COUNT(*) OVER() AS count FROM recipes r WHERE TRUE");
    push_recipe_filter(&mut query, filter, caller);

    query
        .push(" ORDER BY r.pub_date DESC, r.id DESC LIMIT ")
        .push_bind(page.limit())
        .push(" OFFSET ")
        .push_bind(page.offset());

    let rows: Vec<RecipeRow> = query
        .build_query_as()
        .fetch_all(pool)
        .await
        .map_err(QueryError::from)?;

    let total_count = match rows.first() {
        Some(row) => row.count,
        None if page.past_end(rows.len()) => count_recipes(filter, caller, pool).await?,
        None => 0,
    };
    let recipes = rows.into_iter().map(|row| row.recipe).collect();
    let views = build_recipe_views(recipes, caller, pool).await?;

    Ok(Page::from_rows(views, total_count, page, path))
}

async fn count_recipes(
    filter: &RecipeFilter,
    caller: Option<Id>,
    pool: &Pool<Postgres>,
) -> Result<i64, potion::Error> {
    let mut query = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM recipes r WHERE TRUE");
    push_recipe_filter(&mut query, filter, caller);

    let (count,): (i64,) = query
        .build_query_as()
        .fetch_one(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(count)
}

/// Appends the `AND ...` clauses of `filter` to a query over `recipes r`.
fn push_recipe_filter(
    query: &mut QueryBuilder<'_, Postgres>,
    filter: &RecipeFilter,
    caller: Option<Id>,
) {
    if !filter.tags.is_empty() {
        query
            .push(
                " AND r.id IN (SELECT rt.recipe_id FROM recipe_tags rt INNER JOIN tags t ON t.id = rt.tag_id WHERE t.slug = ANY(",
            )
            .push_bind(filter.tags.clone())
            .push("))");
    }

    if let Some(author) = filter.author {
        query.push(" AND r.author_id = ").push_bind(author);
    }

    if let Some(name) = &filter.name {
        query
            .push(
                " AND r.id IN (SELECT ri.recipe_id FROM recipe_ingredients ri INNER JOIN ingredients i ON i.id = ri.ingredient_id WHERE i.name ILIKE ",
            )
            .push_bind(contains_pattern(name))
            .push(")");
    }

    for (relation, flag) in [
        (RecipeRelation::Favorites, filter.is_favorited),
        (RecipeRelation::ShoppingCart, filter.is_in_shopping_cart),
    ] {
        match (flag, caller) {
            (Some(wanted), Some(user_id)) => {
                let negate = if wanted { "" } else { "NOT " };
                query
                    .push(format!(
                        " AND r.id {negate}IN (SELECT recipe_id FROM {} WHERE user_id = ",
                        relation.table()
                    ))
                    .push_bind(user_id)
                    .push(")");
            }
            // Anonymous callers have empty favorites and carts.
            (Some(true), None) => {
                query.push(" AND FALSE");
            }
            _ => {}
        }
    }
}

/// Joins tags, line items, authors and the caller's flags onto `recipes`,
/// keeping their order.
async fn build_recipe_views(
    recipes: Vec<Recipe>,
    caller: Option<Id>,
    pool: &Pool<Postgres>,
) -> Result<Vec<RecipeView>, potion::Error> {
    if recipes.is_empty() {
        return Ok(vec![]);
    }

    let ids: Vec<Id> = recipes.iter().map(|recipe| recipe.id).collect();
    let author_ids: Vec<Id> = recipes
        .iter()
        .map(|recipe| recipe.author_id)
        .collect::<HashSet<Id>>()
        .into_iter()
        .collect();

    let mut tags: HashMap<Id, Vec<_>> = HashMap::new();
    for linked in list_recipe_tags(&ids, pool).await? {
        tags.entry(linked.recipe_id).or_default().push(linked.tag);
    }

    let mut parts: HashMap<Id, Vec<RecipePart>> = HashMap::new();
    for part in list_recipe_parts(&ids, pool).await? {
        parts.entry(part.recipe_id).or_default().push(part);
    }

    let authors: HashMap<Id, UserProfile> = list_user_profiles(&author_ids, caller, pool)
        .await?
        .into_iter()
        .map(|profile| (profile.id, profile))
        .collect();

    let (favorited, in_cart) = match caller {
        Some(user_id) => (
            related_recipe_ids(RecipeRelation::Favorites, user_id, &ids, pool).await?,
            related_recipe_ids(RecipeRelation::ShoppingCart, user_id, &ids, pool).await?,
        ),
        None => (HashSet::new(), HashSet::new()),
    };

    let mut views = Vec::with_capacity(recipes.len());
    for recipe in recipes {
        let author = authors
            .get(&recipe.author_id)
            .cloned()
            .ok_or_else(|| QueryError::new(format!("Author of recipe {} is missing", recipe.id)))?;

        views.push(RecipeView {
            id: recipe.id,
            tags: tags.remove(&recipe.id).unwrap_or_default(),
            author,
            ingredients: parts.remove(&recipe.id).unwrap_or_default(),
            is_favorited: favorited.contains(&recipe.id),
            is_in_shopping_cart: in_cart.contains(&recipe.id),
            name: recipe.name,
            image: recipe.image,
            text: recipe.text,
            cooking_time: recipe.cooking_time,
        });
    }

    Ok(views)
}
