//! Signup, login, and session handling.

use std::sync::Arc;

use sha2::{Digest, Sha256};
use thiserror::Error;
use uuid::Uuid;

use crate::application::repos::{RepoError, SessionsRepo, UsersRepo};
use crate::domain::entities::UserRecord;

const MIN_PASSWORD_LENGTH: usize = 8;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("signup rejected: {}", .0.join("; "))]
    InvalidSignup(Vec<String>),
    #[error("username `{username}` is already taken")]
    UsernameTaken { username: String },
    #[error("invalid username or password")]
    BadCredentials,
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Debug, Clone)]
pub struct SignupInput {
    pub username: String,
    pub password1: String,
    pub password2: String,
}

/// Stored hashes are `salt$hex(sha256(salt:password))`; the salt is a fresh
/// simple-format UUID per user.
fn hash_password(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(b":");
    hasher.update(password.as_bytes());
    format!("{salt}${}", hex::encode(hasher.finalize()))
}

fn verify_password(stored: &str, password: &str) -> bool {
    match stored.split_once('$') {
        Some((salt, _)) => hash_password(salt, password) == stored,
        None => false,
    }
}

fn valid_username(username: &str) -> bool {
    !username.is_empty()
        && username.len() <= 150
        && username
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UsersRepo>,
    sessions: Arc<dyn SessionsRepo>,
}

impl AuthService {
    pub fn new(users: Arc<dyn UsersRepo>, sessions: Arc<dyn SessionsRepo>) -> Self {
        Self { users, sessions }
    }

    pub async fn signup(&self, input: SignupInput) -> Result<UserRecord, AuthError> {
        let mut problems = Vec::new();
        if !valid_username(&input.username) {
            problems.push(
                "username must contain only letters, digits, and underscores".to_string(),
            );
        }
        if input.password1.len() < MIN_PASSWORD_LENGTH {
            problems.push(format!(
                "password must be at least {MIN_PASSWORD_LENGTH} characters"
            ));
        }
        if input.password1 != input.password2 {
            problems.push("passwords do not match".to_string());
        }
        if !problems.is_empty() {
            return Err(AuthError::InvalidSignup(problems));
        }

        if self.users.find_by_username(&input.username).await?.is_some() {
            return Err(AuthError::UsernameTaken {
                username: input.username,
            });
        }

        let salt = Uuid::new_v4().simple().to_string();
        let hash = hash_password(&salt, &input.password1);
        match self.users.create_user(&input.username, &hash).await {
            Ok(user) => Ok(user),
            Err(RepoError::Duplicate { .. }) => Err(AuthError::UsernameTaken {
                username: input.username,
            }),
            Err(err) => Err(err.into()),
        }
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<(UserRecord, Uuid), AuthError> {
        let user = self
            .users
            .find_by_username(username)
            .await?
            .ok_or(AuthError::BadCredentials)?;
        if !verify_password(&user.password_hash, password) {
            return Err(AuthError::BadCredentials);
        }
        let token = self.open_session(user.id).await?;
        Ok((user, token))
    }

    pub async fn logout(&self, token: Uuid) -> Result<(), AuthError> {
        self.sessions.delete_session(token).await?;
        Ok(())
    }

    pub async fn viewer_from_token(&self, token: Uuid) -> Result<Option<UserRecord>, AuthError> {
        Ok(self.sessions.find_user_by_token(token).await?)
    }

    async fn open_session(&self, user_id: i64) -> Result<Uuid, AuthError> {
        let token = Uuid::new_v4();
        self.sessions.create_session(user_id, token).await?;
        Ok(token)
    }
}
