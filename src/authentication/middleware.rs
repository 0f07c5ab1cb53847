use warp::{
    reject::{self, Rejection},
    Filter,
};

use super::jwt::{verify_jwt_session, SessionData, SessionKey};

#[derive(Debug)]
pub struct Unauthorized;

impl reject::Reject for Unauthorized {}

/// Token from `Authorization: Token <jwt>` (or `Bearer <jwt>`).
fn token_from_header(value: &str) -> Option<&str> {
    let (scheme, token) = value.trim().split_once(' ')?;

    match scheme {
        "Token" | "Bearer" => Some(token.trim()),
        _ => None,
    }
}

fn session_from_header(header: Option<String>, key: &SessionKey) -> Option<SessionData> {
    let header = header?;
    let token = token_from_header(&header)?;

    verify_jwt_session(token, key).ok().map(SessionData::from)
}

pub fn with_session(
    key: SessionKey,
) -> impl Filter<Extract = (SessionData,), Error = Rejection> + Clone {
    warp::header::optional::<String>("authorization").and_then(move |header: Option<String>| {
        let session = session_from_header(header, &key);
        async move { session.ok_or_else(|| reject::custom(Unauthorized)) }
    })
}

pub fn with_possible_session(
    key: SessionKey,
) -> impl Filter<Extract = (Option<SessionData>,), Error = Rejection> + Clone {
    warp::header::optional::<String>("authorization")
        .map(move |header: Option<String>| session_from_header(header, &key))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        jwt::generate_jwt_session,
        schema::{User, UserRole},
    };

    fn token(key: &SessionKey) -> String {
        let user = User {
            id: 3,
            email: String::from("cook@example.com"),
            username: String::from("cook"),
            first_name: String::new(),
            last_name: String::new(),
            password: String::new(),
            role: UserRole::User,
        };
        generate_jwt_session(&user, key).ok().unwrap()
    }

    #[test]
    fn header_schemes() {
        assert_eq!(token_from_header("Token abc"), Some("abc"));
        assert_eq!(token_from_header("Bearer abc"), Some("abc"));
        assert_eq!(token_from_header("Basic abc"), None);
        assert_eq!(token_from_header("abc"), None);
    }

    #[tokio::test]
    async fn required_session_rejects_anonymous() {
        let key = SessionKey::new(b"secret", 1);
        let filter = with_session(key.clone());

        assert!(warp::test::request().filter(&filter).await.is_err());

        let session = warp::test::request()
            .header("authorization", format!("Token {}", token(&key)))
            .filter(&filter)
            .await
            .ok()
            .unwrap();
        assert_eq!(session.user_id, 3);
    }

    #[tokio::test]
    async fn possible_session_treats_bad_tokens_as_anonymous() {
        let key = SessionKey::new(b"secret", 1);
        let filter = with_possible_session(key);

        let session = warp::test::request()
            .header("authorization", "Token nonsense")
            .filter(&filter)
            .await
            .ok()
            .unwrap();
        assert!(session.is_none());
    }
}
