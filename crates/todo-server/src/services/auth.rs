//! Authentication service

use crate::repository::UserRepository;
use crate::services::validation;
use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use todo_core::{AuthTokens, Principal, Result, Role, TodoError, User};
use tracing::{debug, info, warn};

const INVALID_CREDENTIALS: &str = "Invalid username or password";
const INVALID_TOKEN: &str = "Invalid or expired token";
const MAX_TOKEN_TTL_HOURS: u64 = 24 * 366;

pub struct AuthService {
    users: Arc<UserRepository>,
    jwt_secret: String,
    token_ttl: Duration,
    admins: HashSet<String>,
}

impl AuthService {
    pub fn new(users: Arc<UserRepository>, jwt_secret: String, token_ttl_hours: u64) -> Self {
        Self {
            users,
            jwt_secret,
            token_ttl: Duration::hours(token_ttl_hours.min(MAX_TOKEN_TTL_HOURS) as i64),
            admins: HashSet::new(),
        }
    }

    /// Usernames registered with the admin role. There is no other way to
    /// create an admin.
    #[must_use]
    pub fn with_admins<I>(mut self, usernames: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.admins = usernames
            .into_iter()
            .map(|name| name.into().trim().to_string())
            .filter(|name| !name.is_empty())
            .collect();
        self
    }

    pub async fn register(&self, username: &str, email: &str, password: &str) -> Result<AuthTokens> {
        validation::require(username, "Username")?;
        validation::require(password, "Password")?;
        validation::require(email, "Email")?;
        validation::check_email(email)?;
        validation::check_password(password)?;

        let username = username.trim();
        let email = email.trim();
        self.ensure_available(None, Some(username), Some(email))
            .await?;

        let role = if self.admins.contains(username) {
            Role::Admin
        } else {
            Role::User
        };
        let user = User {
            id: uuid::Uuid::new_v4().to_string(),
            username: username.to_string(),
            email: email.to_string(),
            password_hash: hash_password(password).await?,
            role,
        };
        let user = self.users.insert(user).await?;
        info!(user_id = %user.id, username = %user.username, role = %user.role, "Registered user");

        self.issue_token(&user.id, user.role)
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<AuthTokens> {
        validation::require(username, "Username")?;
        validation::require(password, "Password")?;

        let user = self.users.find_one_by("username", username.trim()).await?;
        let verified = match &user {
            Some(user) => verify_password(password, &user.password_hash).await,
            None => false,
        };
        match user {
            Some(user) if verified => {
                debug!(user_id = %user.id, "Login succeeded");
                self.issue_token(&user.id, user.role)
            }
            _ => {
                debug!(username = %username, "Login rejected");
                Err(TodoError::Unauthenticated(INVALID_CREDENTIALS.to_string()))
            }
        }
    }

    /// Fails with `AlreadyExists` when another account (not `except_id`)
    /// already holds the username or email.
    pub async fn ensure_available(
        &self,
        except_id: Option<&str>,
        username: Option<&str>,
        email: Option<&str>,
    ) -> Result<()> {
        let taken_by_other = |user: &Option<User>| match user {
            Some(user) => Some(user.id.as_str()) != except_id,
            None => false,
        };

        if let Some(username) = username {
            if taken_by_other(&self.users.find_one_by("username", username).await?) {
                return Err(TodoError::AlreadyExists(
                    "Username is already taken".to_string(),
                ));
            }
        }
        if let Some(email) = email {
            if taken_by_other(&self.users.find_one_by("email", email).await?) {
                return Err(TodoError::AlreadyExists("Email is already taken".to_string()));
            }
        }
        Ok(())
    }

    pub fn issue_token(&self, user_id: &str, role: Role) -> Result<AuthTokens> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id.to_string(),
            role,
            iat: now.timestamp(),
            exp: (now + self.token_ttl).timestamp(),
        };

        let access_token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_bytes()),
        )
        .map_err(|e| TodoError::Internal(format!("Failed to sign token: {}", e)))?;

        Ok(AuthTokens {
            access_token,
            expires_in: self.token_ttl.num_seconds(),
        })
    }

    /// Verifies signature and expiry. Accepts an optional `Bearer ` prefix.
    pub fn validate_token(&self, token: &str) -> Result<Principal> {
        let token = token.trim();
        let token = token.strip_prefix("Bearer ").unwrap_or(token).trim();
        if token.is_empty() {
            return Err(TodoError::Unauthenticated("Missing token".to_string()));
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_bytes()),
            &validation,
        )
        .map_err(|e| {
            warn!(error = %e, "Token rejected");
            TodoError::Unauthenticated(INVALID_TOKEN.to_string())
        })?;

        Ok(Principal::new(token_data.claims.sub, token_data.claims.role))
    }
}

/// Argon2 hash with a fresh salt, computed on the blocking pool.
pub async fn hash_password(password: &str) -> Result<String> {
    let password = password.to_string();
    tokio::task::spawn_blocking(move || {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| TodoError::Internal(format!("Failed to hash password: {}", e)))
    })
    .await
    .map_err(|e| TodoError::Internal(format!("Password hashing task failed: {}", e)))?
}

pub async fn verify_password(password: &str, password_hash: &str) -> bool {
    let password = password.to_string();
    let password_hash = password_hash.to_string();
    let verified = tokio::task::spawn_blocking(move || match PasswordHash::new(&password_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            warn!(error = %e, "Stored password hash is malformed");
            false
        }
    })
    .await;

    verified.unwrap_or_else(|e| {
        warn!(error = %e, "Password verification task failed");
        false
    })
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    role: Role,
    iat: i64,
    exp: i64,
}
