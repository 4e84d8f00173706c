use axum::{
    extract::State,
    Extension, Json,
};
use nr_core::{ReformattedContent, User};
use uuid::Uuid;

use crate::error::ApiResult;
use crate::extract::ApiPath;
use crate::services::DistributionOutcome;
use crate::AppState;

pub async fn distribute_content(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    ApiPath(content_id): ApiPath<Uuid>,
) -> ApiResult<Json<ReformattedContent>> {
    Ok(Json(state.distribution_service().distribute(&user, content_id).await?))
}

pub async fn distribute_article(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    ApiPath(article_id): ApiPath<Uuid>,
) -> ApiResult<Json<Vec<DistributionOutcome>>> {
    Ok(Json(
        state
            .distribution_service()
            .distribute_article(&user, article_id)
            .await?,
    ))
}
