use axum::{
    body::Bytes,
    extract::State,
    Extension, Json,
};
use nr_core::{FakeNewsDetection, ReformattedContent, User};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::ApiResult;
use crate::extract::{optional_json, ApiJson, ApiPath};
use crate::services::process::{ContentUpdate, ProcessStatus};
use crate::services::{ProcessOutcome, ProcessRequest};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct DetectRequest {
    #[serde(default)]
    pub title: String,
    pub content: String,
}

pub async fn process_article(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    ApiPath(article_id): ApiPath<Uuid>,
    body: Bytes,
) -> ApiResult<Json<ProcessOutcome>> {
    let request: ProcessRequest = optional_json(&body)?;
    let outcome = state.process_service().process(&user, article_id, request).await?;
    Ok(Json(outcome))
}

pub async fn detect(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<DetectRequest>,
) -> ApiResult<Json<FakeNewsDetection>> {
    let detection = state
        .process_service()
        .detect(&request.title, &request.content)
        .await?;
    Ok(Json(detection))
}

pub async fn status(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    ApiPath(article_id): ApiPath<Uuid>,
) -> ApiResult<Json<ProcessStatus>> {
    Ok(Json(state.process_service().status(&user, article_id).await?))
}

pub async fn update_content(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    ApiPath(content_id): ApiPath<Uuid>,
    ApiJson(update): ApiJson<ContentUpdate>,
) -> ApiResult<Json<ReformattedContent>> {
    let content = state
        .process_service()
        .update_content(&user, content_id, update)
        .await?;
    Ok(Json(content))
}
