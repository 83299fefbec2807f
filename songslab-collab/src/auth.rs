use argon2::{
    password_hash::{Encoding, SaltString},
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
};
use chrono::{Duration, Utc};
use log::warn;
use rand::rngs::OsRng;
use thiserror::Error;

use crate::{
    util::random_string, Database, DatabaseError, NewSession, NewUser, SessionData,
    SongslabContext, UserData,
};

pub struct Auth<Db> {
    context: SongslabContext<Db>,
    argon: Argon2<'static>,
}

#[derive(Debug, Error)]
pub enum AuthError {
    /// Username or password is incorrect
    #[error("Invalid credentials")]
    InvalidCredentials,
    /// Something else went wrong with the database
    #[error(transparent)]
    Db(DatabaseError),
    #[error("HashError: {0}")]
    HashError(String),
}

impl<Db> Auth<Db>
where
    Db: Database,
{
    const SESSION_DURATION_IN_DAYS: i64 = 7;

    pub fn new(context: &SongslabContext<Db>) -> Self {
        Self {
            context: context.clone(),
            argon: Argon2::default(),
        }
    }

    /// Logs in a user, returning a new session
    pub async fn login(&self, credentials: Credentials) -> Result<SessionData, AuthError> {
        self.clear_expired().await;

        let user = self
            .context
            .database
            .user_by_username(&credentials.username)
            .await
            .map_err(|e| match e {
                DatabaseError::NotFound { .. } => AuthError::InvalidCredentials,
                err => AuthError::Db(err),
            })?;

        let stored_password = PasswordHash::parse(&user.password, Encoding::default())
            .map_err(|e| AuthError::HashError(e.to_string()))?;

        self.argon
            .verify_password(credentials.password.as_bytes(), &stored_password)
            .map_err(|_| AuthError::InvalidCredentials)?;

        let expires_at = Utc::now() + Duration::days(Self::SESSION_DURATION_IN_DAYS);

        let new_session = NewSession {
            token: random_string(32),
            user_id: user.id,
            expires_at,
        };

        self.context
            .database
            .create_session(new_session)
            .await
            .map_err(AuthError::Db)
    }

    /// Deletes the associated session, if it exists
    pub async fn logout(&self, token: &str) -> Result<(), DatabaseError> {
        self.context.database.delete_session_by_token(token).await
    }

    /// Creates a new account. The password is stored hashed.
    pub async fn register(&self, registration: NewRegistration) -> Result<UserData, AuthError> {
        let salt = SaltString::generate(&mut OsRng);
        let hashed_password = self
            .argon
            .hash_password(registration.password.as_bytes(), &salt)
            .map_err(|e| AuthError::HashError(e.to_string()))?
            .to_string();

        self.context
            .database
            .create_user(NewUser {
                username: registration.username,
                email: registration.email,
                password: hashed_password,
                display_name: registration.display_name,
            })
            .await
            .map_err(AuthError::Db)
    }

    /// Returns a session if it exists
    pub async fn session(&self, token: &str) -> Result<SessionData, DatabaseError> {
        self.context.database.session_by_token(token).await
    }

    async fn clear_expired(&self) {
        if let Err(e) = self.context.database.clear_expired_sessions().await {
            warn!("failed to clear expired sessions: {}", e);
        }
    }
}

#[derive(Debug)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

#[derive(Debug)]
pub struct NewRegistration {
    pub username: String,
    pub email: String,
    pub password: String,
    pub display_name: String,
}

#[cfg(test)]
mod test {
    use super::Credentials;
    use crate::test_util;

    #[tokio::test]
    async fn login_requires_the_right_password() {
        let lab = test_util::setup().await;
        let user = test_util::register_user(&lab, "mary").await;

        let session = lab
            .auth
            .login(Credentials {
                username: "mary".to_string(),
                password: test_util::PASSWORD.to_string(),
            })
            .await
            .expect("login succeeds");

        assert_eq!(session.user.id, user.id);

        let denied = lab
            .auth
            .login(Credentials {
                username: "mary".to_string(),
                password: "wrong password".to_string(),
            })
            .await;

        assert!(denied.is_err());
    }

    #[tokio::test]
    async fn usernames_are_unique() {
        let lab = test_util::setup().await;

        test_util::register_user(&lab, "john").await;

        let duplicate = lab
            .auth
            .register(crate::NewRegistration {
                username: "john".to_string(),
                email: "other@example.com".to_string(),
                password: "some password".to_string(),
                display_name: "John".to_string(),
            })
            .await;

        assert!(duplicate.is_err());
    }
}
