use std::collections::HashMap;

use crate::{
    authentication::permissions::ActionType,
    error::{ConflictError, NotFoundError, QueryError},
    jwt::SessionData,
    pagination::{Page, PageQuery},
    schema::{Id, RecipePreview, Subscription, UserProfile, UserProfileRow},
};

use super::{get_user_profile, PROFILE_COLUMNS};

use log::debug;
use sqlx::{Pool, Postgres};

/// Subscribes the caller to `target_id`. Self-follow is rejected before
/// touching the store; the primary key settles concurrent duplicates.
pub async fn follow_user(
    session: &SessionData,
    target_id: Id,
    recipes_limit: Option<usize>,
    pool: &Pool<Postgres>,
) -> Result<Subscription, potion::Error> {
    if session.user_id == target_id {
        return Err(ConflictError::new("You cannot subscribe to yourself").into());
    }
    session.authenticate(ActionType::ManageOwnRelations)?;

    let profile = get_user_profile(target_id, Some(session.user_id), pool).await?;
    if profile.is_subscribed {
        return Err(ConflictError::new("You are already subscribed to this user").into());
    }

    let result = sqlx::query("INSERT INTO follows (follower_id, followed_id) VALUES ($1, $2)")
        .bind(session.user_id)
        .bind(target_id)
        .execute(pool)
        .await;

    if let Err(e) = result {
        let e = QueryError::from(e);
        if e.is_unique_violation() {
            return Err(ConflictError::new("You are already subscribed to this user").into());
        }
        return Err(e.into());
    }

    debug!("User {} followed user {}", session.user_id, target_id);

    let profile = UserProfile {
        is_subscribed: true,
        ..profile
    };
    let previews = list_author_previews(&[target_id], pool).await?;

    let mut subscriptions = assemble_subscriptions(vec![profile], previews, recipes_limit);
    subscriptions
        .pop()
        .ok_or_else(|| NotFoundError::new("No user exists with specified id").into())
}

pub async fn unfollow_user(
    session: &SessionData,
    target_id: Id,
    pool: &Pool<Postgres>,
) -> Result<(), potion::Error> {
    session.authenticate(ActionType::ManageOwnRelations)?;

    let result = sqlx::query("DELETE FROM follows WHERE follower_id = $1 AND followed_id = $2")
        .bind(session.user_id)
        .bind(target_id)
        .execute(pool)
        .await
        .map_err(QueryError::from)?;

    if result.rows_affected() == 0 {
        return Err(NotFoundError::new("You are not subscribed to this user").into());
    }

    debug!("User {} unfollowed user {}", session.user_id, target_id);
    Ok(())
}

/// Users the caller follows, each with a preview of their recipes.
pub async fn list_subscriptions(
    session: &SessionData,
    page: PageQuery,
    recipes_limit: Option<usize>,
    path: &str,
    pool: &Pool<Postgres>,
) -> Result<Page<Subscription>, potion::Error> {
    let rows: Vec<UserProfileRow> = sqlx::query_as(&format!(
        "
        SELECT {PROFILE_COLUMNS}, COUNT(*) OVER() AS count
        FROM follows fl
        INNER JOIN users u ON u.id = fl.followed_id
        WHERE fl.follower_id = $1
        ORDER BY u.id
        LIMIT $2 OFFSET $3
    "
    ))
    .bind(session.user_id)
    .bind(page.limit())
    .bind(page.offset())
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    let total_count = match rows.first() {
        Some(row) => row.count,
        None if page.past_end(rows.len()) => {
            let (count,): (i64,) =
                sqlx::query_as("SELECT COUNT(*) FROM follows WHERE follower_id = $1")
                    .bind(session.user_id)
                    .fetch_one(pool)
                    .await
                    .map_err(QueryError::from)?;
            count
        }
        None => 0,
    };
    let profiles: Vec<UserProfile> = rows.into_iter().map(|row| row.profile).collect();

    let author_ids: Vec<Id> = profiles.iter().map(|profile| profile.id).collect();
    let previews = list_author_previews(&author_ids, pool).await?;

    Ok(Page::from_rows(
        assemble_subscriptions(profiles, previews, recipes_limit),
        total_count,
        page,
        path,
    ))
}

/// Recipes of the given authors, newest first.
pub async fn list_author_previews(
    author_ids: &[Id],
    pool: &Pool<Postgres>,
) -> Result<Vec<RecipePreview>, potion::Error> {
    let rows: Vec<RecipePreview> = sqlx::query_as(
        "
        SELECT id, author_id, name, image, cooking_time
        FROM recipes
        WHERE author_id = ANY($1)
        ORDER BY pub_date DESC, id DESC
    ",
    )
    .bind(author_ids.to_vec())
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(rows)
}

/// `recipes_count` counts every recipe, `recipes` is cut to `recipes_limit`.
fn assemble_subscriptions(
    profiles: Vec<UserProfile>,
    previews: Vec<RecipePreview>,
    recipes_limit: Option<usize>,
) -> Vec<Subscription> {
    let mut by_author: HashMap<Id, Vec<RecipePreview>> = HashMap::new();
    for preview in previews {
        by_author.entry(preview.author_id).or_default().push(preview);
    }

    profiles
        .into_iter()
        .map(|profile| {
            let mut recipes = by_author.remove(&profile.id).unwrap_or_default();
            let recipes_count = recipes.len() as i64;
            if let Some(limit) = recipes_limit {
                recipes.truncate(limit);
            }

            Subscription {
                profile,
                recipes,
                recipes_count,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn profile(id: Id) -> UserProfile {
        UserProfile {
            email: format!("user{id}@example.com"),
            id,
            username: format!("user{id}"),
            first_name: String::new(),
            last_name: String::new(),
            is_subscribed: true,
        }
    }

    fn preview(id: Id, author_id: Id) -> RecipePreview {
        RecipePreview {
            id,
            author_id,
            name: format!("Recipe {id}"),
            image: None,
            cooking_time: 10,
        }
    }

    #[test]
    fn counts_all_recipes_but_truncates_preview() {
        let subscriptions = assemble_subscriptions(
            vec![profile(1), profile(2)],
            vec![preview(10, 1), preview(11, 1), preview(12, 1), preview(20, 2)],
            Some(2),
        );

        assert_eq!(subscriptions.len(), 2);
        assert_eq!(subscriptions[0].recipes_count, 3);
        assert_eq!(
            subscriptions[0]
                .recipes
                .iter()
                .map(|r| r.id)
                .collect::<Vec<_>>(),
            vec![10, 11]
        );
        assert_eq!(subscriptions[1].recipes_count, 1);
    }

    #[test]
    fn author_without_recipes_gets_empty_preview() {
        let subscriptions = assemble_subscriptions(vec![profile(5)], vec![], None);

        assert_eq!(subscriptions[0].recipes_count, 0);
        assert!(subscriptions[0].recipes.is_empty());
    }

    #[test]
    fn subscription_serializes_profile_fields_inline() {
        let subscriptions = assemble_subscriptions(vec![profile(1)], vec![preview(10, 1)], None);
        let value = serde_json::to_value(&subscriptions[0]).unwrap();

        assert_eq!(value["id"], 1);
        assert_eq!(value["is_subscribed"], true);
        assert_eq!(value["recipes_count"], 1);
        assert_eq!(
            value["recipes"][0],
            serde_json::json!({ "id": 10, "name": "Recipe 10", "image": null, "cooking_time": 10 })
        );
    }
}
