use axum::{
    extract::State,
    http::StatusCode,
    Extension, Json,
};
use chrono::Utc;
use nr_core::{BrandVoice, Error, Role, Style, Tone, User};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::auth::{ensure_owner_or_admin, require_role};
use crate::error::ApiResult;
use crate::extract::{ApiJson, ApiPath};
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrandVoiceRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub tone: Tone,
    pub style: Style,
    #[serde(default)]
    pub target_audience: Option<String>,
    #[serde(default)]
    pub custom_prompt: Option<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub avoid_words: Vec<String>,
    #[serde(default)]
    pub is_default: bool,
}

fn clean_list(words: Vec<String>) -> Vec<String> {
    words
        .into_iter()
        .map(|w| w.trim().to_string())
        .filter(|w| !w.is_empty())
        .collect()
}

impl BrandVoiceRequest {
    fn apply(self, voice: &mut BrandVoice) -> Result<(), Error> {
        if self.name.trim().is_empty() {
            return Err(Error::validation("name is required"));
        }
        voice.name = self.name.trim().to_string();
        voice.description = self.description;
        voice.tone = self.tone;
        voice.style = self.style;
        voice.target_audience = self.target_audience;
        voice.custom_prompt = self.custom_prompt;
        voice.keywords = clean_list(self.keywords);
        voice.avoid_words = clean_list(self.avoid_words);
        voice.is_default = self.is_default;
        voice.updated_at = Utc::now();
        Ok(())
    }
}

/// Only one voice per owner can be the default.
async fn clear_other_defaults(state: &AppState, voice: &BrandVoice) -> Result<(), Error> {
    if !voice.is_default {
        return Ok(());
    }
    for mut other in state.storage.list_brand_voices(Some(voice.owner_id)).await? {
        if other.id != voice.id && other.is_default {
            other.is_default = false;
            other.updated_at = Utc::now();
            state.storage.update_brand_voice(&other).await?;
        }
    }
    Ok(())
}

async fn load_visible(state: &AppState, user: &User, id: Uuid) -> Result<BrandVoice, Error> {
    let voice = state
        .storage
        .get_brand_voice(id)
        .await?
        .ok_or_else(|| Error::not_found("Brand voice"))?;
    ensure_owner_or_admin(user, voice.owner_id)?;
    Ok(voice)
}

pub async fn list_brand_voices(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
) -> ApiResult<Json<Vec<BrandVoice>>> {
    Ok(Json(state.storage.list_brand_voices(Some(user.id)).await?))
}

pub async fn create_brand_voice(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    ApiJson(request): ApiJson<BrandVoiceRequest>,
) -> ApiResult<(StatusCode, Json<BrandVoice>)> {
    require_role(&user, Role::Editor)?;
    let now = Utc::now();
    let mut voice = BrandVoice {
        id: Uuid::new_v4(),
        owner_id: user.id,
        name: String::new(),
        description: None,
        tone: request.tone,
        style: request.style,
        target_audience: None,
        custom_prompt: None,
        keywords: Vec::new(),
        avoid_words: Vec::new(),
        is_default: false,
        created_at: now,
        updated_at: now,
    };
    request.apply(&mut voice)?;
    clear_other_defaults(&state, &voice).await?;
    state.storage.create_brand_voice(&voice).await?;
    info!("🎙️ Created brand voice \"{}\"", voice.name);
    Ok((StatusCode::CREATED, Json(voice)))
}

pub async fn get_brand_voice(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<BrandVoice>> {
    Ok(Json(load_visible(&state, &user, id).await?))
}

pub async fn update_brand_voice(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(request): ApiJson<BrandVoiceRequest>,
) -> ApiResult<Json<BrandVoice>> {
    require_role(&user, Role::Editor)?;
    let mut voice = load_visible(&state, &user, id).await?;
    request.apply(&mut voice)?;
    clear_other_defaults(&state, &voice).await?;
    state.storage.update_brand_voice(&voice).await?;
    Ok(Json(voice))
}

pub async fn delete_brand_voice(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<StatusCode> {
    require_role(&user, Role::Editor)?;
    let voice = load_visible(&state, &user, id).await?;
    state.storage.delete_brand_voice(voice.id).await?;
    Ok(StatusCode::NO_CONTENT)
}
