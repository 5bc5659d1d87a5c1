use std::sync::Arc;

use tracing::{info, instrument};
use uuid::Uuid;

use crate::data::Repositories;
use crate::data::user_repository::UserRepository;
use crate::domain::error::{DomainError, FieldErrors};
use crate::domain::user::User;
use crate::infrastructure::security::{JwtKeys, hash_password, verify_password};

const USERNAME_MAX_CHARS: usize = 150;
const PASSWORD_MIN_CHARS: usize = 8;

fn valid_username_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_')
}

#[derive(Clone)]
pub struct AuthService {
    repo: Arc<dyn UserRepository>,
    keys: JwtKeys,
}

impl AuthService {
    pub fn new(repos: &Repositories, keys: JwtKeys) -> Self {
        Self {
            repo: Arc::clone(&repos.users),
            keys,
        }
    }

    pub fn keys(&self) -> &JwtKeys {
        &self.keys
    }

    pub async fn get_user(&self, id: Uuid) -> Result<User, DomainError> {
        self.repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::UserNotFound(id.to_string()))
    }

    #[instrument(skip(self, password))]
    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<User, DomainError> {
        let username = username.trim();
        let email = email.trim();
        let mut errors = FieldErrors::new();
        if username.is_empty() {
            errors.add("username", "field must not be empty");
        } else if username.chars().count() > USERNAME_MAX_CHARS
            || !username.chars().all(valid_username_char)
        {
            errors.add(
                "username",
                "use at most 150 letters, digits and @/./+/-/_ characters",
            );
        }
        if !email.contains('@') {
            errors.add("email", "enter a valid email address");
        }
        if password.chars().count() < PASSWORD_MIN_CHARS {
            errors.add("password", "password must be at least 8 characters");
        }
        errors.into_result()?;

        let hash =
            hash_password(password).map_err(|err| DomainError::Internal(err.to_string()))?;
        let user = User::new(username.to_string(), email.to_lowercase(), hash);
        let user = self.repo.create(user).await?;
        info!(user_id = %user.id, "user registered");
        Ok(user)
    }

    /// Verifies credentials and issues a token for the user.
    #[instrument(skip(self, password))]
    pub async fn login(&self, username: &str, password: &str) -> Result<(User, String), DomainError> {
        let user = self
            .repo
            .find_by_username(username.trim())
            .await?
            .ok_or(DomainError::Unauthorized)?;

        let valid = verify_password(password, &user.password_hash)
            .map_err(|_| DomainError::Unauthorized)?;
        if !valid {
            return Err(DomainError::Unauthorized);
        }

        let token = self
            .keys
            .generate_token(user.id)
            .map_err(|err| DomainError::Internal(err.to_string()))?;
        Ok((user, token))
    }
}
