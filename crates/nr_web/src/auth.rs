//! Password hashing, JWT issuance and the bearer-token middleware.

use std::fmt;

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use nr_core::{Error, Result, Role, User};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::error::ApiError;
use crate::AppState;

pub const MIN_PASSWORD_LEN: usize = 8;
pub const DEFAULT_TOKEN_TTL_HOURS: i64 = 168;

#[derive(Clone)]
pub struct AuthConfig {
    secret: String,
    pub token_ttl: Duration,
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("secret", &"<redacted>")
            .field("token_ttl", &self.token_ttl)
            .finish()
    }
}

impl AuthConfig {
    pub fn new(secret: impl Into<String>, ttl_hours: i64) -> Result<Self> {
        let secret = secret.into();
        if secret.trim().is_empty() {
            return Err(Error::validation("JWT secret must not be empty"));
        }
        Ok(Self {
            secret,
            token_ttl: Duration::hours(ttl_hours.max(1)),
        })
    }

    pub fn issue_token(&self, user: &User) -> Result<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: user.id,
            role: user.role,
            iat: now.timestamp(),
            exp: (now + self.token_ttl).timestamp(),
        };
        encode(&Header::default(), &claims, &EncodingKey::from_secret(self.secret.as_bytes()))
            .map_err(|e| Error::Storage(format!("failed to sign token: {}", e)))
    }

    pub fn verify_token(&self, token: &str) -> Result<Claims> {
        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::default(),
        )
        .map(|data| data.claims)
        .map_err(|e| Error::Unauthorized(format!("invalid token: {}", e)))
    }
}

/// JWT payload (HS256).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Claims {
    pub sub: Uuid,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| Error::Storage(format!("failed to hash password: {}", e)))
}

pub fn verify_password(password: &str, hash: &str) -> bool {
    PasswordHash::new(hash)
        .map(|parsed| Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok())
        .unwrap_or(false)
}

pub fn require_role(user: &User, role: Role) -> Result<()> {
    if user.role >= role {
        Ok(())
    } else {
        Err(Error::Forbidden(format!("requires the {} role", role.as_str())))
    }
}

pub fn ensure_owner_or_admin(user: &User, owner_id: Uuid) -> Result<()> {
    if user.id == owner_id || user.is_admin() {
        Ok(())
    } else {
        Err(Error::Forbidden("you do not have access to this resource".to_string()))
    }
}

/// Resolves a token to its stored user. Deleted users and bad tokens are both unauthorized.
pub async fn authenticate(state: &AppState, token: &str) -> Result<User> {
    let claims = state.auth.verify_token(token)?;
    state
        .storage
        .get_user(claims.sub)
        .await?
        .ok_or_else(|| Error::Unauthorized("user no longer exists".to_string()))
}

fn bearer_token(request: &Request) -> Option<&str> {
    request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Middleware for protected routes: puts the authenticated [`User`] into the
/// request extensions.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> std::result::Result<Response, ApiError> {
    let token = bearer_token(&request)
        .ok_or_else(|| ApiError::Unauthorized("missing bearer token".to_string()))?;
    let user = authenticate(&state, token).await?;
    debug!("Authenticated {} ({})", user.email, user.role.as_str());
    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> AuthConfig {
        AuthConfig::new("test-secret", 1).unwrap()
    }

    #[test]
    fn test_token_round_trip() {
        let mut user = User::new("Ada".into(), "ada@example.com".into(), String::new());
        user.role = Role::Editor;
        let auth = config();
        let token = auth.issue_token(&user).unwrap();
        let claims = auth.verify_token(&token).unwrap();
        assert_eq!(claims.sub, user.id);
        assert_eq!(claims.role, Role::Editor);
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn test_expired_and_foreign_tokens_rejected() {
        let auth = config();
        let past = Utc::now() - Duration::hours(2);
        let claims = Claims {
            sub: Uuid::new_v4(),
            role: Role::User,
            iat: past.timestamp(),
            exp: (past + Duration::minutes(5)).timestamp(),
        };
        let expired = encode(&Header::default(), &claims, &EncodingKey::from_secret(b"test-secret")).unwrap();
        assert!(matches!(auth.verify_token(&expired), Err(Error::Unauthorized(_))));

        let user = User::new("Ada".into(), "ada@example.com".into(), String::new());
        let other = AuthConfig::new("other-secret", 1).unwrap().issue_token(&user).unwrap();
        assert!(auth.verify_token(&other).is_err());
        assert!(auth.verify_token("garbage").is_err());
    }

    #[test]
    fn test_password_hashing() {
        let hash = hash_password("correct horse").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("correct horse", &hash));
        assert!(!verify_password("wrong horse", &hash));
        assert!(!verify_password("correct horse", "not a hash"));
        let again = hash_password("correct horse").unwrap();
        assert_ne!(hash, again);
        let salt_of = |h: &str| PasswordHash::new(h).unwrap().salt.map(|s| s.to_string());
        assert_ne!(salt_of(&hash), salt_of(&again));
        assert!(verify_password("correct horse", &again));
    }

    #[test]
    fn test_role_checks() {
        let mut user = User::new("Ada".into(), "ada@example.com".into(), String::new());
        assert!(require_role(&user, Role::User).is_ok());
        assert!(matches!(require_role(&user, Role::Editor), Err(Error::Forbidden(_))));
        assert!(ensure_owner_or_admin(&user, user.id).is_ok());
        assert!(ensure_owner_or_admin(&user, Uuid::new_v4()).is_err());

        user.role = Role::Admin;
        assert!(require_role(&user, Role::Editor).is_ok());
        assert!(ensure_owner_or_admin(&user, Uuid::new_v4()).is_ok());
    }

    #[test]
    fn test_debug_redacts_secret() {
        let rendered = format!("{:?}", config());
        assert!(!rendered.contains("test-secret"));
        assert!(AuthConfig::new("  ", 1).is_err());
    }
}
