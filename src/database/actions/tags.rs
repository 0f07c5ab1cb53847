use crate::{
    authentication::permissions::ActionType,
    error::{ConflictError, NotFoundError, QueryError},
    form::TagForm,
    jwt::SessionData,
    schema::{Id, LinkedRecipeTag, Tag},
};

use log::info;
use sqlx::{PgConnection, Pool, Postgres, QueryBuilder};

pub async fn create_tag(
    session: &SessionData,
    form: TagForm,
    pool: &Pool<Postgres>,
) -> Result<Tag, potion::Error> {
    session.authenticate(ActionType::ManageCatalog)?;
    form.validate()?;
    let slug = form.slug();

    let tag: Option<Tag> = sqlx::query_as(
        "INSERT INTO tags (name, color, slug) VALUES ($1, $2, $3) ON CONFLICT (slug) DO NOTHING RETURNING *",
    )
    .bind(form.name.trim())
    .bind(form.color.trim())
    .bind(&slug)
    .fetch_optional(pool)
    .await
    .map_err(QueryError::from)?;

    match tag {
        Some(tag) => {
            info!("Created tag {} ({})", tag.id, tag.slug);
            Ok(tag)
        }
        None => Err(ConflictError::new(&format!("Tag with slug '{slug}' already exists.")).into()),
    }
}

pub async fn get_tag(id: Id, pool: &Pool<Postgres>) -> Result<Tag, potion::Error> {
    let tag: Option<Tag> = sqlx::query_as("SELECT * FROM tags WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(QueryError::from)?;

    tag.ok_or_else(|| NotFoundError::new("No tag exists with specified id").into())
}

pub async fn list_tags(pool: &Pool<Postgres>) -> Result<Vec<Tag>, potion::Error> {
    let list: Vec<Tag> = sqlx::query_as("SELECT * FROM tags ORDER BY id")
        .fetch_all(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(list)
}

pub async fn list_recipe_tags(
    recipe_ids: &[Id],
    pool: &Pool<Postgres>,
) -> Result<Vec<LinkedRecipeTag>, potion::Error> {
    let list: Vec<LinkedRecipeTag> = sqlx::query_as(
        "
        SELECT rt.recipe_id, t.id, t.name, t.color, t.slug
        FROM recipe_tags rt
        INNER JOIN tags t ON t.id = rt.tag_id
        WHERE rt.recipe_id = ANY($1)
        ORDER BY t.id
    ",
    )
    .bind(recipe_ids.to_vec())
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(list)
}

/// Ids from `tag_ids` that have no row.
pub(crate) async fn find_missing_tags(
    tag_ids: &[Id],
    conn: &mut PgConnection,
) -> Result<Vec<Id>, potion::Error> {
    let found: Vec<(Id,)> = sqlx::query_as("SELECT id FROM tags WHERE id = ANY($1)")
        .bind(tag_ids.to_vec())
        .fetch_all(&mut *conn)
        .await
        .map_err(QueryError::from)?;

    Ok(tag_ids
        .iter()
        .copied()
        .filter(|id| !found.iter().any(|(found,)| found == id))
        .collect())
}

/// Replaces the whole tag set of a recipe.
pub(crate) async fn set_recipe_tags(
    recipe_id: Id,
    tag_ids: &[Id],
    conn: &mut PgConnection,
) -> Result<(), potion::Error> {
    sqlx::query("DELETE FROM recipe_tags WHERE recipe_id = $1")
        .bind(recipe_id)
        .execute(&mut *conn)
        .await
        .map_err(QueryError::from)?;

    if tag_ids.is_empty() {
        return Ok(());
    }

    let mut query = QueryBuilder::<Postgres>::new("INSERT INTO recipe_tags (recipe_id, tag_id) ");
    query.push_values(tag_ids, |mut row, tag_id| {
        row.push_bind(recipe_id).push_bind(*tag_id);
    });

    query
        .build()
        .execute(&mut *conn)
        .await
        .map_err(QueryError::from)?;

    Ok(())
}
