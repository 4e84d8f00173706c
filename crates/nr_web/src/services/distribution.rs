use std::sync::Arc;

use chrono::Utc;
use nr_core::events::{DISTRIBUTION_COMPLETED, DISTRIBUTION_FAILED, DISTRIBUTION_STARTED};
use nr_core::{ContentStatus, Error, Event, EventSink, Platform, ReformattedContent, Result, Storage, User};
use serde::Serialize;
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::ensure_owner_or_admin;

/// Result of distributing one content as part of a whole article.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DistributionOutcome {
    pub content_id: Uuid,
    pub platform: Platform,
    pub success: bool,
    pub published_url: Option<String>,
    pub error: Option<String>,
}

pub fn published_url(platform: Platform, username: Option<&str>, content_id: Uuid) -> String {
    format!(
        "https://{}/{}/posts/{}",
        platform.host(),
        username.filter(|u| !u.is_empty()).unwrap_or("newsroom"),
        content_id
    )
}

/// Marks contents as published on their platform. Nothing is actually posted.
pub struct DistributionService {
    storage: Arc<dyn Storage>,
    events: Arc<dyn EventSink>,
}

impl DistributionService {
    pub fn new(storage: Arc<dyn Storage>, events: Arc<dyn EventSink>) -> Self {
        Self { storage, events }
    }

    pub async fn distribute(&self, user: &User, content_id: Uuid) -> Result<ReformattedContent> {
        match self.publish(user, content_id).await {
            Ok(content) => Ok(content),
            Err(err) => {
                warn!("📭 Distribution of {} refused: {}", content_id, err);
                self.events.emit(
                    user.id,
                    Event::new(
                        DISTRIBUTION_FAILED,
                        json!({ "contentId": content_id, "message": err.to_string() }),
                    ),
                );
                Err(err)
            }
        }
    }

    async fn publish(&self, user: &User, content_id: Uuid) -> Result<ReformattedContent> {
        let mut content = self
            .storage
            .get_content(content_id)
            .await?
            .ok_or_else(|| Error::not_found("Content"))?;
        ensure_owner_or_admin(user, content.owner_id)?;
        if content.status == ContentStatus::Published {
            return Err(Error::Conflict("content is already published".to_string()));
        }

        let owner = if content.owner_id == user.id {
            user.clone()
        } else {
            self.storage
                .get_user(content.owner_id)
                .await?
                .ok_or_else(|| Error::not_found("Content owner"))?
        };

        let username = if content.platform.is_social() {
            let account = owner
                .social_account(content.platform)
                .filter(|a| a.connected)
                .ok_or_else(|| {
                    Error::validation(format!("connect a {} account before distributing", content.platform))
                })?;
            account.username.clone()
        } else {
            None
        };

        self.events.emit(
            user.id,
            Event::new(
                DISTRIBUTION_STARTED,
                json!({ "contentId": content.id, "platform": content.platform }),
            ),
        );

        let now = Utc::now();
        let url = published_url(content.platform, username.as_deref(), content.id);
        content.status = ContentStatus::Published;
        content.published_at = Some(now);
        content.published_url = Some(url.clone());
        content.updated_at = now;
        self.storage.update_content(&content).await?;

        info!("📣 Published {} content to {}", content.platform, url);
        self.events.emit(
            user.id,
            Event::new(
                DISTRIBUTION_COMPLETED,
                json!({ "contentId": content.id, "platform": content.platform, "publishedUrl": url }),
            ),
        );
        Ok(content)
    }

    /// Distributes every draft or approved content of an article, one after another.
    pub async fn distribute_article(&self, user: &User, article_id: Uuid) -> Result<Vec<DistributionOutcome>> {
        let article = self
            .storage
            .get_article(article_id)
            .await?
            .ok_or_else(|| Error::not_found("Article"))?;
        ensure_owner_or_admin(user, article.owner_id)?;

        let pending: Vec<ReformattedContent> = self
            .storage
            .list_content_for_article(article.id)
            .await?
            .into_iter()
            .filter(|c| matches!(c.status, ContentStatus::Draft | ContentStatus::Approved))
            .collect();
        if pending.is_empty() {
            return Err(Error::validation("article has no content to distribute"));
        }

        let mut outcomes = Vec::with_capacity(pending.len());
        for content in pending {
            let outcome = match self.distribute(user, content.id).await {
                Ok(published) => DistributionOutcome {
                    content_id: published.id,
                    platform: published.platform,
                    success: true,
                    published_url: published.published_url,
                    error: None,
                },
                Err(err) => DistributionOutcome {
                    content_id: content.id,
                    platform: content.platform,
                    success: false,
                    published_url: None,
                    error: Some(err.to_string()),
                },
            };
            outcomes.push(outcome);
        }
        Ok(outcomes)
    }
}
