use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::Utc;
use nr_core::{Article, ArticleStatus, Error, GenerateRequest, ReformattedContent, SourceType, User};
use nr_ingest::{extract_file, ExtractedArticle};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::auth::ensure_owner_or_admin;
use crate::error::{ApiError, ApiResult};
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateArticleRequest {
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub authors: Vec<String>,
}

impl CreateArticleRequest {
    fn validate(&self) -> Result<(), Error> {
        if self.title.trim().is_empty() {
            return Err(Error::validation("title is required"));
        }
        if self.content.trim().is_empty() {
            return Err(Error::validation("content is required"));
        }
        Ok(())
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdateArticleRequest {
    pub title: Option<String>,
    pub content: Option<String>,
    pub summary: Option<String>,
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
pub struct ImportRequest {
    pub url: String,
}

fn article_from_extracted(owner: &User, extracted: ExtractedArticle, source_type: SourceType) -> Article {
    let mut article = Article::new(owner.id, extracted.title, extracted.content, source_type);
    article.summary = extracted.summary;
    article.authors = extracted.authors;
    article.source_url = extracted.source_url;
    article
}

async fn load_owned(state: &AppState, user: &User, id: Uuid) -> ApiResult<Article> {
    let article = state
        .storage
        .get_article(id)
        .await?
        .ok_or_else(|| Error::not_found("Article"))?;
    ensure_owner_or_admin(user, article.owner_id)?;
    Ok(article)
}

pub async fn list_articles(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    ApiQuery(query): ApiQuery<ListQuery>,
) -> ApiResult<Json<Vec<Article>>> {
    let status = query
        .status
        .as_deref()
        .filter(|s| !s.is_empty())
        .map(str::parse::<ArticleStatus>)
        .transpose()?;
    let owner = if user.is_admin() { None } else { Some(user.id) };
    Ok(Json(state.storage.list_articles(owner, status).await?))
}

pub async fn create_article(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    ApiJson(request): ApiJson<CreateArticleRequest>,
) -> ApiResult<(StatusCode, Json<Article>)> {
    request.validate()?;
    let mut article = Article::new(
        user.id,
        request.title.trim().to_string(),
        request.content.trim().to_string(),
        SourceType::Manual,
    );
    article.summary = request.summary;
    article.tags = request.tags;
    article.authors = request.authors;
    state.storage.create_article(&article).await?;
    info!("📝 Created article \"{}\"", article.title);
    Ok((StatusCode::CREATED, Json(article)))
}

fn multipart_error(err: axum::extract::multipart::MultipartError) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge("uploaded file is too large".to_string())
    } else {
        ApiError::BadRequest(format!("invalid upload: {}", err.body_text()))
    }
}

pub async fn upload_article(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    mut multipart: Multipart,
) -> ApiResult<(StatusCode, Json<Article>)> {
    let mut file: Option<(String, Option<String>, Vec<u8>)> = None;
    let mut title: Option<String> = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        match field.name() {
            Some("file") => {
                let file_name = field.file_name().unwrap_or("upload.txt").to_string();
                let content_type = field.content_type().map(str::to_string);
                let bytes = field.bytes().await.map_err(multipart_error)?;
                file = Some((file_name, content_type, bytes.to_vec()));
            }
            Some("title") => {
                let text = field.text().await.map_err(multipart_error)?;
                title = Some(text.trim().to_string()).filter(|t| !t.is_empty());
            }
            _ => {}
        }
    }

    let (file_name, content_type, bytes) =
        file.ok_or_else(|| ApiError::BadRequest("a file field is required".to_string()))?;
    let extracted = extract_file(&file_name, content_type.as_deref(), &bytes)?;

    let mut article = article_from_extracted(&user, extracted, SourceType::Upload);
    if let Some(title) = title {
        article.title = title;
    }
    article.file_name = Some(file_name);
    state.storage.create_article(&article).await?;
    info!("📎 Uploaded \"{}\" ({} bytes)", article.title, bytes.len());
    Ok((StatusCode::CREATED, Json(article)))
}

pub async fn import_article(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    ApiJson(request): ApiJson<ImportRequest>,
) -> ApiResult<(StatusCode, Json<Article>)> {
    let extracted = state.importer.import(&request.url).await.map_err(|err| match err {
        Error::Http(e) => ApiError::BadRequest(format!("could not fetch {}: {}", request.url, e)),
        other => ApiError::from(other),
    })?;
    let article = article_from_extracted(&user, extracted, SourceType::Url);
    state.storage.create_article(&article).await?;
    Ok((StatusCode::CREATED, Json(article)))
}

pub async fn generate_article(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    ApiJson(request): ApiJson<GenerateRequest>,
) -> ApiResult<(StatusCode, Json<Article>)> {
    if request.topic.trim().is_empty() {
        return Err(ApiError::BadRequest("topic is required".to_string()));
    }
    let voice = match request.brand_voice_id {
        Some(id) => {
            let voice = state
                .storage
                .get_brand_voice(id)
                .await?
                .ok_or_else(|| Error::not_found("Brand voice"))?;
            ensure_owner_or_admin(&user, voice.owner_id)?;
            Some(voice)
        }
        None => None,
    };

    let generated = state.agent.generate_article(&request, voice.as_ref()).await?;
    let mut article = Article::new(user.id, generated.title, generated.content, SourceType::Generated);
    article.summary = generated.summary;
    article.tags = request.key_points.iter().take(5).map(|p| p.trim().to_lowercase()).collect();
    state.storage.create_article(&article).await?;
    info!("🪄 Generated \"{}\"", article.title);
    Ok((StatusCode::CREATED, Json(article)))
}

pub async fn get_article(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<Article>> {
    Ok(Json(load_owned(&state, &user, id).await?))
}

pub async fn update_article(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(request): ApiJson<UpdateArticleRequest>,
) -> ApiResult<Json<Article>> {
    let mut article = load_owned(&state, &user, id).await?;
    if article.status == ArticleStatus::Processing {
        return Err(ApiError::Conflict("article is being processed".to_string()));
    }

    if let Some(title) = request.title {
        if title.trim().is_empty() {
            return Err(ApiError::BadRequest("title must not be empty".to_string()));
        }
        article.title = title.trim().to_string();
    }
    if let Some(content) = request.content {
        if content.trim().is_empty() {
            return Err(ApiError::BadRequest("content must not be empty".to_string()));
        }
        article.content = content.trim().to_string();
    }
    if request.summary.is_some() {
        article.summary = request.summary;
    }
    if let Some(tags) = request.tags {
        article.tags = tags;
    }
    article.updated_at = Utc::now();
    state.storage.update_article(&article).await?;
    Ok(Json(article))
}

pub async fn delete_article(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<StatusCode> {
    let article = load_owned(&state, &user, id).await?;
    let removed = state.storage.delete_content_for_article(article.id).await?;
    state.storage.delete_article(article.id).await?;
    info!("🗑️ Deleted \"{}\" and {} content(s)", article.title, removed);
    Ok(StatusCode::NO_CONTENT)
}

pub async fn article_contents(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<Vec<ReformattedContent>>> {
    let article = load_owned(&state, &user, id).await?;
    Ok(Json(state.storage.list_content_for_article(article.id).await?))
}
