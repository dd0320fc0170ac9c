//! Authentication service

use crate::storage::MemoryCache;
use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use lingo_core::ports::UserStore;
use lingo_core::{AuthTokens, Identity, LingoError, ProfileUpdate, User, UserRegistration};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Registration failed: {0}")]
    Registration(String),

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("The email has already been taken.")]
    EmailTaken,

    #[error("{0}")]
    Profile(String),

    #[error("{0}")]
    Failed(String),
}

pub type AuthResult<T> = std::result::Result<T, AuthError>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // user_id
    pub exp: i64,
    pub iat: i64,
    pub jti: String,
}

pub struct AuthService {
    users: Arc<dyn UserStore>,
    cache: Arc<MemoryCache>,
    jwt_secret: String,
    token_ttl: Duration,
}

impl AuthService {
    pub fn new(
        users: Arc<dyn UserStore>,
        cache: Arc<MemoryCache>,
        jwt_secret: String,
        token_ttl: Duration,
    ) -> Self {
        Self {
            users,
            cache,
            jwt_secret,
            token_ttl,
        }
    }

    pub async fn register(&self, registration: &UserRegistration) -> AuthResult<(User, AuthTokens)> {
        let password_hash = hash_password(&registration.password)
            .map_err(|e| AuthError::Registration(format!("Failed to hash password: {}", e)))?;

        let user = self
            .users
            .create_user(&registration.name, &registration.email, &password_hash)
            .await
            .map_err(|e| match e {
                LingoError::Conflict(_) => {
                    AuthError::Registration("The email has already been taken.".to_string())
                }
                other => AuthError::Registration(other.to_string()),
            })?;

        info!("Registered user {} ({})", user.id, user.email);
        let tokens = self.issue_token(&user.id)?;
        Ok((user, tokens))
    }

    pub async fn login(&self, email: &str, password: &str) -> AuthResult<(User, AuthTokens)> {
        let credentials = self
            .users
            .get_user_credentials(email)
            .await
            .map_err(|e| AuthError::Failed(format!("Login failed: {}", e)))?;

        if let Some((user, password_hash)) = credentials {
            let matches = verify_password(password, &password_hash)
                .map_err(|e| AuthError::Failed(format!("Login failed: {}", e)))?;
            if matches {
                info!("Login successful for: {}", email);
                let tokens = self.issue_token(&user.id)?;
                return Ok((user, tokens));
            }
        }

        warn!("Login rejected for: {}", email);
        Err(AuthError::InvalidCredentials)
    }

    /// Decode and check a bearer token, rejecting revoked ones
    pub fn validate_token(&self, token: &str) -> AuthResult<Claims> {
        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_bytes()),
            &Validation::default(),
        )
        .map_err(|e| AuthError::InvalidToken(e.to_string()))?;

        if self.cache.exists(&revoked_key(&token_data.claims.jti)) {
            return Err(AuthError::InvalidToken("token has been revoked".to_string()));
        }

        Ok(token_data.claims)
    }

    /// Resolve a bearer token to the caller's identity
    pub async fn authenticate(&self, token: &str) -> AuthResult<(Identity, Claims)> {
        let claims = self.validate_token(token)?;
        let user = self
            .users
            .get_user(&claims.sub)
            .await
            .map_err(|e| AuthError::Failed(e.to_string()))?
            .ok_or_else(|| AuthError::InvalidToken("user no longer exists".to_string()))?;

        Ok((Identity::from(&user), claims))
    }

    /// Revoke the presented token until it would have expired anyway
    pub fn logout(&self, claims: &Claims) {
        let remaining = (claims.exp - Utc::now().timestamp()).max(1);
        self.cache.set_with_ttl(
            revoked_key(&claims.jti),
            Vec::new(),
            std::time::Duration::from_secs(remaining.unsigned_abs()),
        );
        info!("Revoked token {} for user {}", claims.jti, claims.sub);
    }

    pub async fn profile(&self, identity: &Identity) -> AuthResult<User> {
        self.users
            .get_user(&identity.user_id)
            .await
            .map_err(|e| AuthError::Failed(e.to_string()))?
            .ok_or_else(|| AuthError::InvalidToken("user no longer exists".to_string()))
    }

    /// Change name and email, and the password when a new one is given.
    /// A supplied `current_password` must match the stored one.
    pub async fn update_profile(&self, identity: &Identity, update: &ProfileUpdate) -> AuthResult<User> {
        let failed = |e: String| AuthError::Profile(format!("Profile update failed: {}", e));

        if let Some(current) = update.current_password.as_deref() {
            let stored_hash = self
                .users
                .get_user_credentials(&identity.email)
                .await
                .map_err(|e| failed(e.to_string()))?
                .filter(|(user, _)| user.id == identity.user_id)
                .map(|(_, hash)| hash)
                .ok_or_else(|| AuthError::InvalidToken("user no longer exists".to_string()))?;

            if !verify_password(current, &stored_hash).map_err(failed)? {
                warn!("Profile update rejected for {}: wrong current password", identity.user_id);
                return Err(AuthError::Profile("Current password is incorrect".to_string()));
            }
        }

        let password_hash = update
            .new_password
            .as_deref()
            .map(hash_password)
            .transpose()
            .map_err(|e| failed(e.to_string()))?;

        let user = self
            .users
            .update_user(
                &identity.user_id,
                &update.name,
                &update.email,
                password_hash.as_deref(),
            )
            .await
            .map_err(|e| match e {
                LingoError::Conflict(_) => AuthError::EmailTaken,
                other => failed(other.to_string()),
            })?;

        info!(
            "Updated profile for {} (password changed: {})",
            user.id,
            password_hash.is_some()
        );
        Ok(user)
    }

    fn issue_token(&self, user_id: &str) -> AuthResult<AuthTokens> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id.to_string(),
            exp: (now + self.token_ttl).timestamp(),
            iat: now.timestamp(),
            jti: uuid::Uuid::new_v4().to_string(),
        };

        let access_token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_bytes()),
        )
        .map_err(|e| AuthError::Failed(format!("Failed to sign token: {}", e)))?;

        Ok(AuthTokens {
            access_token,
            token_type: "Bearer".to_string(),
            expires_in: self.token_ttl.num_seconds(),
        })
    }
}

fn revoked_key(jti: &str) -> String {
    format!("auth.revoked.{}", jti)
}

fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    Ok(Argon2::default()
        .hash_password(password.as_bytes(), &salt)?
        .to_string())
}

fn verify_password(password: &str, stored_hash: &str) -> Result<bool, String> {
    let parsed = PasswordHash::new(stored_hash)
        .map_err(|e| format!("invalid password hash: {}", e))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Database;

    async fn service() -> AuthService {
        let db = Arc::new(Database::in_memory().await.unwrap());
        AuthService::new(
            db,
            Arc::new(MemoryCache::new()),
            "test-secret".to_string(),
            Duration::hours(1),
        )
    }

    fn registration() -> UserRegistration {
        UserRegistration {
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            password: "correct horse".to_string(),
        }
    }

    #[tokio::test]
    async fn test_register_then_login() {
        let auth = service().await;
        let (user, tokens) = auth.register(&registration()).await.unwrap();
        assert_eq!(tokens.token_type, "Bearer");
        assert_eq!(tokens.expires_in, 3600);

        let (identity, claims) = auth.authenticate(&tokens.access_token).await.unwrap();
        assert_eq!(identity.user_id, user.id);
        assert_eq!(claims.sub, user.id);

        let (logged_in, _) = auth.login("ada@example.com", "correct horse").await.unwrap();
        assert_eq!(logged_in.id, user.id);
    }

    #[tokio::test]
    async fn test_bad_credentials() {
        let auth = service().await;
        auth.register(&registration()).await.unwrap();

        assert_eq!(
            auth.login("ada@example.com", "wrong").await.unwrap_err(),
            AuthError::InvalidCredentials
        );
        assert_eq!(
            auth.login("nobody@example.com", "correct horse").await.unwrap_err(),
            AuthError::InvalidCredentials
        );
    }

    #[tokio::test]
    async fn test_duplicate_email() {
        let auth = service().await;
        auth.register(&registration()).await.unwrap();
        let err = auth.register(&registration()).await.unwrap_err();
        assert!(matches!(err, AuthError::Registration(_)));
    }

    #[tokio::test]
    async fn test_logout_revokes_token() {
        let auth = service().await;
        let (_, tokens) = auth.register(&registration()).await.unwrap();
        let claims = auth.validate_token(&tokens.access_token).unwrap();

        auth.logout(&claims);
        assert!(matches!(
            auth.validate_token(&tokens.access_token),
            Err(AuthError::InvalidToken(_))
        ));

        // A fresh login is unaffected
        let (_, fresh) = auth.login("ada@example.com", "correct horse").await.unwrap();
        assert!(auth.validate_token(&fresh.access_token).is_ok());
    }

    fn profile_update(email: &str) -> ProfileUpdate {
        ProfileUpdate {
            name: "Ada Lovelace".to_string(),
            email: email.to_string(),
            current_password: None,
            new_password: None,
        }
    }

    #[tokio::test]
    async fn test_update_profile_name_and_email() {
        let auth = service().await;
        let (user, _) = auth.register(&registration()).await.unwrap();
        let identity = Identity::from(&user);

        let updated = auth
            .update_profile(&identity, &profile_update("ada@lovelace.dev"))
            .await
            .unwrap();
        assert_eq!(updated.id, user.id);
        assert_eq!(updated.name, "Ada Lovelace");
        assert_eq!(updated.email, "ada@lovelace.dev");

        // Password is untouched
        assert!(auth.login("ada@lovelace.dev", "correct horse").await.is_ok());
    }

    #[tokio::test]
    async fn test_update_profile_changes_password() {
        let auth = service().await;
        let (user, _) = auth.register(&registration()).await.unwrap();
        let identity = Identity::from(&user);

        let update = ProfileUpdate {
            current_password: Some("correct horse".to_string()),
            new_password: Some("battery staple".to_string()),
            ..profile_update("ada@example.com")
        };
        auth.update_profile(&identity, &update).await.unwrap();

        assert_eq!(
            auth.login("ada@example.com", "correct horse").await.unwrap_err(),
            AuthError::InvalidCredentials
        );
        assert!(auth.login("ada@example.com", "battery staple").await.is_ok());
    }

    #[tokio::test]
    async fn test_update_profile_rejects_wrong_current_password() {
        let auth = service().await;
        let (user, _) = auth.register(&registration()).await.unwrap();
        let identity = Identity::from(&user);

        let update = ProfileUpdate {
            current_password: Some("not my password".to_string()),
            new_password: Some("battery staple".to_string()),
            ..profile_update("ada@lovelace.dev")
        };
        assert_eq!(
            auth.update_profile(&identity, &update).await.unwrap_err(),
            AuthError::Profile("Current password is incorrect".to_string())
        );

        // Nothing was written
        let unchanged = auth.profile(&identity).await.unwrap();
        assert_eq!(unchanged.email, "ada@example.com");
        assert!(auth.login("ada@example.com", "correct horse").await.is_ok());
    }

    #[tokio::test]
    async fn test_update_profile_email_taken() {
        let auth = service().await;
        let (user, _) = auth.register(&registration()).await.unwrap();
        auth.register(&UserRegistration {
            name: "Bob".to_string(),
            email: "bob@example.com".to_string(),
            password: "hunter2hunter2".to_string(),
        })
        .await
        .unwrap();

        let err = auth
            .update_profile(&Identity::from(&user), &profile_update("bob@example.com"))
            .await
            .unwrap_err();
        assert_eq!(err, AuthError::EmailTaken);
    }

    #[tokio::test]
    async fn test_foreign_signature_rejected() {
        let auth = service().await;
        let (_, tokens) = auth.register(&registration()).await.unwrap();

        let other = AuthService::new(
            Arc::new(Database::in_memory().await.unwrap()),
            Arc::new(MemoryCache::new()),
            "another-secret".to_string(),
            Duration::hours(1),
        );
        assert!(other.validate_token(&tokens.access_token).is_err());
        assert!(auth.validate_token("not-a-jwt").is_err());
    }
}
