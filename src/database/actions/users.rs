use crate::{
    authentication::{
        cryptography::{hash_password, verify_password},
        jwt::{generate_jwt_session, SessionKey},
    },
    error::{ConflictError, NotFoundError, QueryError, ValidationError},
    form::RegisterForm,
    pagination::{Page, PageQuery},
    schema::{Id, User, UserProfile, UserProfileRow},
};

use log::info;
use sqlx::{Pool, Postgres};

/// Public user columns plus `is_subscribed` relative to the user bound as `$1`.
pub(crate) const PROFILE_COLUMNS: &str = "
    u.email, u.id, u.username, u.first_name, u.last_name,
    EXISTS (SELECT 1 FROM follows f WHERE f.follower_id = $1 AND f.followed_id = u.id) AS is_subscribed
";

pub async fn get_user(pool: &Pool<Postgres>, email: &str) -> Result<Option<User>, potion::Error> {
    let row: Option<User> = sqlx::query_as("SELECT * FROM users WHERE LOWER(email) = LOWER($1)")
        .bind(email)
        .fetch_optional(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(row)
}

/// Creates a user, storing the argon2 hash of their password.
pub async fn register_user(form: RegisterForm, pool: &Pool<Postgres>) -> Result<User, potion::Error> {
    form.validate()?;

    let password = hash_password(&form.password)
        .map_err(|e| QueryError::new(format!("Failed to hash password: {e}")))?;

    let user: Option<User> = sqlx::query_as(
        "
        INSERT INTO users (email, username, first_name, last_name, password)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT DO NOTHING RETURNING *;
    ",
    )
    .bind(form.email.trim())
    .bind(form.username.trim())
    .bind(form.first_name.trim())
    .bind(form.last_name.trim())
    .bind(password)
    .fetch_optional(pool)
    .await
    .map_err(QueryError::from)?;

    match user {
        Some(user) => {
            info!("Registered user {} ({})", user.id, user.username);
            Ok(user)
        }
        None => Err(ConflictError::new("A user with that email or username already exists.").into()),
    }
}

pub async fn login_user(
    email: &str,
    password: &str,
    key: &SessionKey,
    pool: &Pool<Postgres>,
) -> Result<String, potion::Error> {
    let invalid = || ValidationError::field(
        "non_field_errors",
        "Unable to log in with provided credentials.",
    );

    let user = match get_user(pool, email).await? {
        Some(user) => user,
        None => return Err(invalid().into()),
    };

    let authenticated = verify_password(password, &user.password).unwrap_or(false);
    if !authenticated {
        return Err(invalid().into());
    }

    generate_jwt_session(&user, key)
}

pub async fn get_user_profile(
    user_id: Id,
    caller: Option<Id>,
    pool: &Pool<Postgres>,
) -> Result<UserProfile, potion::Error> {
    let profile: Option<UserProfile> =
        sqlx::query_as(&format!("SELECT {PROFILE_COLUMNS} FROM users u WHERE u.id = $2"))
            .bind(caller)
            .bind(user_id)
            .fetch_optional(pool)
            .await
            .map_err(QueryError::from)?;

    profile.ok_or_else(|| NotFoundError::new("No user exists with specified id").into())
}

pub async fn list_user_profiles(
    user_ids: &[Id],
    caller: Option<Id>,
    pool: &Pool<Postgres>,
) -> Result<Vec<UserProfile>, potion::Error> {
    let profiles: Vec<UserProfile> =
        sqlx::query_as(&format!("SELECT {PROFILE_COLUMNS} FROM users u WHERE u.id = ANY($2)"))
            .bind(caller)
            .bind(user_ids.to_vec())
            .fetch_all(pool)
            .await
            .map_err(QueryError::from)?;

    Ok(profiles)
}

pub async fn fetch_user_profiles(
    caller: Option<Id>,
    page: PageQuery,
    path: &str,
    pool: &Pool<Postgres>,
) -> Result<Page<UserProfile>, potion::Error> {
    let rows: Vec<UserProfileRow> = sqlx::query_as(&format!(
        "SELECT {PROFILE_COLUMNS}, COUNT(*) OVER() AS count FROM users u ORDER BY u.id LIMIT $2 OFFSET $3"
    ))
    .bind(caller)
    .bind(page.limit())
    .bind(page.offset())
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    let total_count = match rows.first() {
        Some(row) => row.count,
        None if page.past_end(rows.len()) => {
            let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
                .fetch_one(pool)
                .await
                .map_err(QueryError::from)?;
            count
        }
        None => 0,
    };
    let profiles = rows.into_iter().map(|row| row.profile).collect();

    Ok(Page::from_rows(profiles, total_count, page, path))
}
