use std::sync::Arc;

use chrono::Duration;
use chrono::Local;
use hmac::{Hmac, Mac};
use jwt::SignWithKey;
use jwt::VerifyWithKey;
use potion::HtmlError;
use serde::Deserialize;
use serde::Serialize;
use sha2::Sha256;

use crate::database::schema::{Id, User};
use crate::error::PermissionError;
use crate::schema::UserRole;

use super::permissions::ActionType;

/// Signing secret and token lifetime, shared by every request.
#[derive(Clone)]
pub struct SessionKey {
    secret: Arc<[u8]>,
    lifetime: Duration,
}

impl SessionKey {
    pub fn new(secret: &[u8], lifetime_hours: i64) -> Self {
        Self {
            secret: Arc::from(secret),
            lifetime: Duration::hours(lifetime_hours),
        }
    }

    fn hmac(&self) -> Result<Hmac<Sha256>, potion::Error> {
        Hmac::new_from_slice(&self.secret)
            .map_err(|_| HtmlError::InvalidSession.new("Invalid session key"))
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct JwtSessionData {
    pub user_id: Id,
    pub email: String,
    pub role: UserRole,
    iat: i64,
    exp: i64,
}

impl JwtSessionData {
    pub fn new(id: Id, email: String, role: UserRole, lifetime: Duration) -> Self {
        let now = Local::now();
        let iat = now.timestamp();
        let exp = (now + lifetime).timestamp();

        Self {
            user_id: id,
            email,
            role,
            iat,
            exp,
        }
    }
}

/// Identity of an authenticated caller.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct SessionData {
    pub user_id: Id,
    pub email: String,
    pub role: UserRole,
}

impl SessionData {
    pub fn authenticate(&self, action: ActionType) -> Result<(), potion::Error> {
        if !action.authenticate(self) {
            return Err(PermissionError::default().into());
        }
        Ok(())
    }

    /// Own resources need `own`, foreign ones need `all`.
    pub fn authenticate_owner(
        &self,
        owner_id: Id,
        own: ActionType,
        all: ActionType,
    ) -> Result<(), potion::Error> {
        if owner_id == self.user_id {
            self.authenticate(own)
        } else {
            self.authenticate(all)
        }
    }
}

impl From<JwtSessionData> for SessionData {
    fn from(value: JwtSessionData) -> Self {
        SessionData {
            user_id: value.user_id,
            email: value.email,
            role: value.role,
        }
    }
}

pub fn generate_jwt_session(user: &User, key: &SessionKey) -> Result<String, potion::Error> {
    let claims = JwtSessionData::new(user.id, user.email.to_owned(), user.role, key.lifetime);

    claims
        .sign_with_key(&key.hmac()?)
        .map_err(|_| HtmlError::InvalidSession.new("Failed to sign session"))
}

pub fn verify_jwt_session(token: &str, key: &SessionKey) -> Result<JwtSessionData, potion::Error> {
    let session: JwtSessionData = token
        .verify_with_key(&key.hmac()?)
        .map_err(|_| HtmlError::InvalidSession.new("Invalid Session; Invalid token"))?;

    let now = Local::now().timestamp();
    if (session.exp - now).is_negative() {
        return Err(HtmlError::InvalidSession.new("Invalid session; Token expired"));
    }

    Ok(session)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn user() -> User {
        User {
            id: 42,
            email: String::from("cook@example.com"),
            username: String::from("cook"),
            first_name: String::from("Ada"),
            last_name: String::from("Cook"),
            password: String::new(),
            role: UserRole::Moderator,
        }
    }

    #[test]
    fn token_round_trip() {
        let key = SessionKey::new(b"test-secret", 1);
        let token = generate_jwt_session(&user(), &key).ok().unwrap();

        let session: SessionData = verify_jwt_session(&token, &key).ok().unwrap().into();
        assert_eq!(
            session,
            SessionData {
                user_id: 42,
                email: String::from("cook@example.com"),
                role: UserRole::Moderator,
            }
        );
    }

    #[test]
    fn token_signed_with_other_key_is_rejected() {
        let token = generate_jwt_session(&user(), &SessionKey::new(b"one", 1))
            .ok()
            .unwrap();

        assert!(verify_jwt_session(&token, &SessionKey::new(b"two", 1)).is_err());
        assert!(verify_jwt_session("garbage", &SessionKey::new(b"one", 1)).is_err());
    }

    #[test]
    fn expired_token_is_rejected() {
        let key = SessionKey::new(b"test-secret", -1);
        let token = generate_jwt_session(&user(), &key).ok().unwrap();

        assert!(verify_jwt_session(&token, &key).is_err());
    }

    #[test]
    fn owner_checks_fall_back_to_global_permission() {
        let session: SessionData = JwtSessionData::new(
            1,
            String::from("cook@example.com"),
            UserRole::User,
            Duration::hours(1),
        )
        .into();

        assert!(session
            .authenticate_owner(1, ActionType::ManageOwnRecipes, ActionType::ManageAllRecipes)
            .is_ok());
        assert!(session
            .authenticate_owner(2, ActionType::ManageOwnRecipes, ActionType::ManageAllRecipes)
            .is_err());
    }
}
