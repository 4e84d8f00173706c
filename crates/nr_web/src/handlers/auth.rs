use axum::{
    extract::State,
    http::StatusCode,
    Extension, Json,
};
use chrono::Utc;
use nr_core::{Error, Platform, Preferences, Role, User};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::auth::{hash_password, require_role, verify_password, MIN_PASSWORD_LEN};
use crate::error::{ApiError, ApiResult};
use crate::extract::{ApiJson, ApiPath};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

impl RegisterRequest {
    fn validate(&self) -> Result<(), Error> {
        if self.name.trim().is_empty() {
            return Err(Error::validation("name is required"));
        }
        validate_email(&self.email)?;
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(Error::validation(format!(
                "password must be at least {} characters",
                MIN_PASSWORD_LEN
            )));
        }
        Ok(())
    }
}

fn validate_email(email: &str) -> Result<(), Error> {
    let email = email.trim();
    let valid = match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.'),
        None => false,
    };
    if valid && !email.contains(char::is_whitespace) {
        Ok(())
    } else {
        Err(Error::validation("a valid email is required"))
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: User,
}

#[derive(Debug, Deserialize)]
pub struct ConnectRequest {
    pub username: String,
}

#[derive(Debug, Deserialize)]
pub struct RoleRequest {
    pub role: String,
}

pub async fn register(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<AuthResponse>)> {
    request.validate()?;
    if state.storage.find_user_by_email(&request.email).await?.is_some() {
        return Err(ApiError::Conflict("email is already registered".to_string()));
    }

    let user = User::new(
        request.name.trim().to_string(),
        request.email,
        hash_password(&request.password)?,
    );
    state.storage.create_user(&user).await?;
    info!("👤 Registered {}", user.email);

    let token = state.auth.issue_token(&user)?;
    Ok((StatusCode::CREATED, Json(AuthResponse { token, user })))
}

pub async fn login(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<LoginRequest>,
) -> ApiResult<Json<AuthResponse>> {
    let invalid = || ApiError::Unauthorized("invalid email or password".to_string());
    let user = state
        .storage
        .find_user_by_email(&request.email)
        .await?
        .ok_or_else(invalid)?;
    if !verify_password(&request.password, &user.password_hash) {
        return Err(invalid());
    }
    let token = state.auth.issue_token(&user)?;
    Ok(Json(AuthResponse { token, user }))
}

pub async fn me(Extension(user): Extension<User>) -> Json<User> {
    Json(user)
}

pub async fn update_preferences(
    State(state): State<AppState>,
    Extension(mut user): Extension<User>,
    ApiJson(preferences): ApiJson<Preferences>,
) -> ApiResult<Json<User>> {
    if let Some(voice_id) = preferences.default_brand_voice_id {
        let voice = state
            .storage
            .get_brand_voice(voice_id)
            .await?
            .ok_or_else(|| Error::not_found("Brand voice"))?;
        if voice.owner_id != user.id {
            return Err(ApiError::BadRequest("default brand voice must be one of your own".to_string()));
        }
    }
    user.preferences = preferences;
    user.updated_at = Utc::now();
    state.storage.update_user(&user).await?;
    Ok(Json(user))
}

fn social_platform(raw: &str) -> Result<Platform, Error> {
    let platform: Platform = raw.parse()?;
    if !platform.is_social() {
        return Err(Error::validation(format!("{} does not use a social account", platform)));
    }
    Ok(platform)
}

pub async fn connect_social(
    State(state): State<AppState>,
    Extension(mut user): Extension<User>,
    ApiPath(platform): ApiPath<String>,
    ApiJson(request): ApiJson<ConnectRequest>,
) -> ApiResult<Json<User>> {
    let platform = social_platform(&platform)?;
    let username = request.username.trim().trim_start_matches('@').to_string();
    if username.is_empty() {
        return Err(ApiError::BadRequest("username is required".to_string()));
    }
    user.connect_account(platform, username);
    state.storage.update_user(&user).await?;
    info!("🔗 {} connected {}", user.email, platform);
    Ok(Json(user))
}

pub async fn disconnect_social(
    State(state): State<AppState>,
    Extension(mut user): Extension<User>,
    ApiPath(platform): ApiPath<String>,
) -> ApiResult<Json<User>> {
    let platform = social_platform(&platform)?;
    user.disconnect_account(platform);
    state.storage.update_user(&user).await?;
    Ok(Json(user))
}

pub async fn list_users(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
) -> ApiResult<Json<Vec<User>>> {
    require_role(&user, Role::Admin)?;
    Ok(Json(state.storage.list_users().await?))
}

pub async fn update_role(
    State(state): State<AppState>,
    Extension(admin): Extension<User>,
    ApiPath(user_id): ApiPath<Uuid>,
    ApiJson(request): ApiJson<RoleRequest>,
) -> ApiResult<Json<User>> {
    require_role(&admin, Role::Admin)?;
    let role: Role = request.role.parse()?;
    if admin.id == user_id {
        return Err(ApiError::BadRequest("you cannot change your own role".to_string()));
    }

    let mut user = state
        .storage
        .get_user(user_id)
        .await?
        .ok_or_else(|| Error::not_found("User"))?;
    user.role = role;
    user.updated_at = Utc::now();
    state.storage.update_user(&user).await?;
    info!("🛡️ {} is now {}", user.email, role.as_str());
    Ok(Json(user))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_validation() {
        let ok = RegisterRequest {
            name: "Ada".into(),
            email: "ada@example.com".into(),
            password: "long enough".into(),
        };
        assert!(ok.validate().is_ok());

        for (name, email, password) in [
            ("", "ada@example.com", "long enough"),
            ("Ada", "ada.example.com", "long enough"),
            ("Ada", "ada@localhost", "long enough"),
            ("Ada", "a da@example.com", "long enough"),
            ("Ada", "ada@example.com", "short"),
        ] {
            let request = RegisterRequest {
                name: name.into(),
                email: email.into(),
                password: password.into(),
            };
            assert!(request.validate().is_err(), "{} / {} / {}", name, email, password);
        }
    }

    #[test]
    fn test_only_social_platforms_connect() {
        assert_eq!(social_platform("Twitter").unwrap(), Platform::Twitter);
        assert!(social_platform("blog").is_err());
        assert!(social_platform("myspace").is_err());
    }
}
