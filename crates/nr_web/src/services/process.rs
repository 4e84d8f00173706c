use std::sync::Arc;

use chrono::Utc;
use nr_core::events::{
    AGENT_STATUS, PROCESS_COMPLETED, PROCESS_ERROR, PROCESS_FAKE_NEWS_COMPLETE,
    PROCESS_PLATFORM_COMPLETE, PROCESS_STARTED,
};
use nr_core::{
    Article, ArticleStatus, BrandVoice, ContentAgent, ContentStatus, Error, Event, EventSink,
    FakeNewsDetection, Platform, ReformattedContent, Result, Storage, User,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{error, info};
use uuid::Uuid;

use crate::auth::ensure_owner_or_admin;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProcessRequest {
    pub platforms: Vec<String>,
    pub brand_voice_id: Option<Uuid>,
    pub run_fake_news_check: Option<bool>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessOutcome {
    pub article: Article,
    pub contents: Vec<ReformattedContent>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessStatus {
    pub status: ArticleStatus,
    pub fake_news_detection: Option<FakeNewsDetection>,
    pub content_count: usize,
    pub processed_at: Option<chrono::DateTime<Utc>>,
}

/// Manual edits to a reformatted content.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ContentUpdate {
    pub content: Option<String>,
    pub hashtags: Option<Vec<String>>,
    pub status: Option<ContentStatus>,
}

/// Runs detection, reformatting and fact checking over an article, one
/// awaited step after another.
///
/// The pipeline runs on its own task, so a caller that goes away mid-run
/// still leaves the article `completed` or `failed`.
#[derive(Clone)]
pub struct ProcessService {
    storage: Arc<dyn Storage>,
    agent: Arc<dyn ContentAgent>,
    events: Arc<dyn EventSink>,
}

impl ProcessService {
    pub fn new(storage: Arc<dyn Storage>, agent: Arc<dyn ContentAgent>, events: Arc<dyn EventSink>) -> Self {
        Self { storage, agent, events }
    }

    fn emit(&self, user_id: Uuid, name: &str, data: Value) {
        self.events.emit(user_id, Event::new(name, data));
    }

    async fn load_article(&self, user: &User, article_id: Uuid) -> Result<Article> {
        let article = self
            .storage
            .get_article(article_id)
            .await?
            .ok_or_else(|| Error::not_found("Article"))?;
        ensure_owner_or_admin(user, article.owner_id)?;
        Ok(article)
    }

    /// Requested platforms, else the user's defaults, else the built-in set.
    pub fn resolve_platforms(user: &User, requested: &[String]) -> Result<Vec<Platform>> {
        let platforms = if !requested.is_empty() {
            requested
                .iter()
                .map(|p| p.parse::<Platform>())
                .collect::<Result<Vec<_>>>()?
        } else if !user.preferences.default_platforms.is_empty() {
            user.preferences.default_platforms.clone()
        } else {
            Platform::default_set()
        };

        let mut unique = Vec::with_capacity(platforms.len());
        for platform in platforms {
            if !unique.contains(&platform) {
                unique.push(platform);
            }
        }
        Ok(unique)
    }

    async fn resolve_voice(&self, user: &User, requested: Option<Uuid>) -> Result<Option<BrandVoice>> {
        if let Some(id) = requested {
            let voice = self
                .storage
                .get_brand_voice(id)
                .await?
                .ok_or_else(|| Error::not_found("Brand voice"))?;
            ensure_owner_or_admin(user, voice.owner_id)?;
            return Ok(Some(voice));
        }

        if let Some(id) = user.preferences.default_brand_voice_id {
            if let Some(voice) = self.storage.get_brand_voice(id).await? {
                return Ok(Some(voice));
            }
        }

        let voices = self.storage.list_brand_voices(Some(user.id)).await?;
        Ok(voices.into_iter().find(|v| v.is_default))
    }

    pub async fn process(&self, user: &User, article_id: Uuid, request: ProcessRequest) -> Result<ProcessOutcome> {
        let mut article = self.load_article(user, article_id).await?;
        if article.status == ArticleStatus::Processing {
            return Err(Error::Conflict("article is already being processed".to_string()));
        }
        let platforms = Self::resolve_platforms(user, &request.platforms)?;
        let voice = self.resolve_voice(user, request.brand_voice_id).await?;
        let run_detection = request.run_fake_news_check.unwrap_or(true);

        article.set_status(ArticleStatus::Processing);
        if !self.storage.begin_processing(&article).await? {
            return Err(Error::Conflict("article is already being processed".to_string()));
        }
        info!(
            "⚙️ Processing \"{}\" for {}",
            article.title,
            platforms.iter().map(Platform::as_str).collect::<Vec<_>>().join(", ")
        );
        self.emit(
            user.id,
            PROCESS_STARTED,
            json!({ "articleId": article.id, "platforms": platforms }),
        );

        let service = self.clone();
        let owner = user.clone();
        let task = tokio::spawn(async move {
            service
                .finish(&owner, article, &platforms, voice.as_ref(), run_detection)
                .await
        });
        match task.await {
            Ok(outcome) => outcome,
            Err(join_err) => {
                let err = Error::Inference(format!("processing task stopped: {}", join_err));
                if let Ok(Some(mut article)) = self.storage.get_article(article_id).await {
                    self.fail(user.id, &mut article, &err).await;
                }
                Err(err)
            }
        }
    }

    async fn finish(
        &self,
        user: &User,
        mut article: Article,
        platforms: &[Platform],
        voice: Option<&BrandVoice>,
        run_detection: bool,
    ) -> Result<ProcessOutcome> {
        match self.run(user, &mut article, platforms, voice, run_detection).await {
            Ok(contents) => Ok(ProcessOutcome { article, contents }),
            Err(err) => {
                self.fail(user.id, &mut article, &err).await;
                Err(err)
            }
        }
    }

    async fn fail(&self, user_id: Uuid, article: &mut Article, err: &Error) {
        error!("❌ Processing of {} failed: {}", article.id, err);
        article.set_status(ArticleStatus::Failed);
        if let Err(update_err) = self.storage.update_article(article).await {
            error!("❌ Could not mark {} as failed: {}", article.id, update_err);
        }
        self.emit(
            user_id,
            PROCESS_ERROR,
            json!({ "articleId": article.id, "message": err.to_string() }),
        );
    }

    async fn run(
        &self,
        user: &User,
        article: &mut Article,
        platforms: &[Platform],
        voice: Option<&BrandVoice>,
        run_detection: bool,
    ) -> Result<Vec<ReformattedContent>> {
        if run_detection {
            self.emit(
                user.id,
                AGENT_STATUS,
                json!({ "articleId": article.id, "phase": "fake_news_detection" }),
            );
            let detection = self.agent.detect_fake_news(&article.title, &article.content).await?;
            info!("🔎 Authenticity score {} ({:?})", detection.score, detection.status);
            article.fake_news_detection = Some(detection.clone());
            article.updated_at = Utc::now();
            self.storage.update_article(article).await?;
            self.emit(
                user.id,
                PROCESS_FAKE_NEWS_COMPLETE,
                json!({ "articleId": article.id, "detection": detection }),
            );
        }

        let mut contents = Vec::with_capacity(platforms.len());
        for &platform in platforms {
            self.emit(
                user.id,
                AGENT_STATUS,
                json!({ "articleId": article.id, "phase": "reformatting", "platform": platform }),
            );
            let output = self.agent.reformat(article, platform, voice).await?;
            let mut content = ReformattedContent::new(article, platform, output);
            content.brand_voice_id = voice.map(|v| v.id);

            if user.preferences.auto_fact_check {
                self.emit(
                    user.id,
                    AGENT_STATUS,
                    json!({ "articleId": article.id, "phase": "fact_checking", "platform": platform }),
                );
                content.fact_check = Some(self.agent.fact_check(&content.content, article).await?);
            }

            let stored = self.storage.upsert_content(&content).await?;
            info!("✍️ {} draft ready ({} chars)", platform, stored.content.chars().count());
            self.emit(
                user.id,
                PROCESS_PLATFORM_COMPLETE,
                json!({ "articleId": article.id, "platform": platform, "contentId": stored.id }),
            );
            contents.push(stored);
        }

        article.processed_at = Some(Utc::now());
        article.set_status(ArticleStatus::Completed);
        self.storage.update_article(article).await?;
        self.emit(
            user.id,
            PROCESS_COMPLETED,
            json!({
                "articleId": article.id,
                "contentIds": contents.iter().map(|c| c.id).collect::<Vec<_>>(),
            }),
        );
        info!("✅ Finished processing \"{}\"", article.title);
        Ok(contents)
    }

    /// Authenticity check on text that is not stored.
    pub async fn detect(&self, title: &str, content: &str) -> Result<FakeNewsDetection> {
        if content.trim().is_empty() {
            return Err(Error::validation("content is required"));
        }
        self.agent.detect_fake_news(title, content).await
    }

    pub async fn status(&self, user: &User, article_id: Uuid) -> Result<ProcessStatus> {
        let article = self.load_article(user, article_id).await?;
        let content_count = self.storage.list_content_for_article(article.id).await?.len();
        Ok(ProcessStatus {
            status: article.status,
            fake_news_detection: article.fake_news_detection,
            content_count,
            processed_at: article.processed_at,
        })
    }

    pub async fn update_content(&self, user: &User, content_id: Uuid, update: ContentUpdate) -> Result<ReformattedContent> {
        let mut content = self
            .storage
            .get_content(content_id)
            .await?
            .ok_or_else(|| Error::not_found("Content"))?;
        ensure_owner_or_admin(user, content.owner_id)?;
        if content.status == ContentStatus::Published {
            return Err(Error::Conflict("published content can no longer be edited".to_string()));
        }

        if let Some(text) = update.content {
            let text = text.trim().to_string();
            if text.is_empty() {
                return Err(Error::validation("content must not be empty"));
            }
            if let Some(limit) = content.platform.max_chars() {
                if text.chars().count() > limit {
                    return Err(Error::validation(format!(
                        "{} posts are limited to {} characters",
                        content.platform, limit
                    )));
                }
            }
            content.content = text;
        }
        if let Some(hashtags) = update.hashtags {
            content.hashtags = hashtags;
        }
        match update.status {
            Some(status @ (ContentStatus::Draft | ContentStatus::Approved)) => content.status = status,
            Some(other) => {
                return Err(Error::validation(format!(
                    "status can only be set to draft or approved, not {:?}",
                    other
                )))
            }
            None => {}
        }

        content.updated_at = Utc::now();
        self.storage.update_content(&content).await?;
        Ok(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventHub;
    use async_trait::async_trait;
    use nr_core::{
        ArticleStore, BrandVoiceStore, ContentStore, FactCheck, GenerateRequest, GeneratedArticle,
        Reformatted, Role, SourceType, Style, Tone, UserStore,
    };
    use nr_inference::MockAgent;
    use nr_storage::MemoryStorage;

    #[derive(Debug)]
    struct BrokenReformatter;

    #[async_trait]
    impl ContentAgent for BrokenReformatter {
        fn name(&self) -> &str {
            "broken"
        }

        async fn detect_fake_news(&self, title: &str, content: &str) -> Result<FakeNewsDetection> {
            MockAgent::new().detect_fake_news(title, content).await
        }

        async fn reformat(&self, _: &Article, _: Platform, _: Option<&BrandVoice>) -> Result<Reformatted> {
            Err(Error::Inference("model exploded".to_string()))
        }

        async fn fact_check(&self, text: &str, source: &Article) -> Result<FactCheck> {
            MockAgent::new().fact_check(text, source).await
        }

        async fn generate_article(&self, request: &GenerateRequest, voice: Option<&BrandVoice>) -> Result<GeneratedArticle> {
            MockAgent::new().generate_article(request, voice).await
        }
    }

    /// Mock agent that takes its time on every model call.
    #[derive(Debug)]
    struct SlowAgent;

    #[async_trait]
    impl ContentAgent for SlowAgent {
        fn name(&self) -> &str {
            "slow"
        }

        async fn detect_fake_news(&self, title: &str, content: &str) -> Result<FakeNewsDetection> {
            tokio::time::sleep(std::time::Duration::from_millis(150)).await;
            MockAgent::new().detect_fake_news(title, content).await
        }

        async fn reformat(&self, article: &Article, platform: Platform, voice: Option<&BrandVoice>) -> Result<Reformatted> {
            tokio::time::sleep(std::time::Duration::from_millis(150)).await;
            MockAgent::new().reformat(article, platform, voice).await
        }

        async fn fact_check(&self, text: &str, source: &Article) -> Result<FactCheck> {
            MockAgent::new().fact_check(text, source).await
        }

        async fn generate_article(&self, request: &GenerateRequest, voice: Option<&BrandVoice>) -> Result<GeneratedArticle> {
            MockAgent::new().generate_article(request, voice).await
        }
    }

    async fn setup(agent: Arc<dyn ContentAgent>) -> (ProcessService, Arc<MemoryStorage>, Arc<EventHub>, User, Article) {
        let storage = Arc::new(MemoryStorage::new());
        let events = Arc::new(EventHub::default());
        let user = User::new("Rita".into(), "rita@example.com".into(), String::new());
        storage.create_user(&user).await.unwrap();
        let article = Article::new(
            user.id,
            "Harbor expansion approved".into(),
            "The port authority approved the harbor expansion on Monday. Construction starts in May, \
             according to the authority. The project adds two berths."
                .into(),
            SourceType::Manual,
        );
        storage.create_article(&article).await.unwrap();
        let service = ProcessService::new(storage.clone(), agent, events.clone());
        (service, storage, events, user, article)
    }

    fn drain(rx: &mut tokio::sync::broadcast::Receiver<Event>) -> Vec<String> {
        let mut names = Vec::new();
        while let Ok(event) = rx.try_recv() {
            names.push(event.event);
        }
        names
    }

    #[tokio::test]
    async fn test_process_runs_every_phase() {
        let (service, storage, events, user, article) = setup(Arc::new(MockAgent::new())).await;
        let mut rx = events.subscribe(user.id);

        let request = ProcessRequest {
            platforms: vec!["twitter".into(), "blog".into(), "twitter".into()],
            ..Default::default()
        };
        let outcome = service.process(&user, article.id, request).await.unwrap();

        assert_eq!(outcome.article.status, ArticleStatus::Completed);
        assert!(outcome.article.fake_news_detection.is_some());
        assert!(outcome.article.processed_at.is_some());
        assert_eq!(outcome.contents.len(), 2);
        assert!(outcome.contents.iter().all(|c| c.fact_check.is_some()));
        assert!(outcome.contents[0].content.chars().count() <= 280);

        let stored = storage.get_article(article.id).await.unwrap().unwrap();
        assert_eq!(stored.status, ArticleStatus::Completed);

        assert_eq!(
            drain(&mut rx),
            vec![
                PROCESS_STARTED,
                AGENT_STATUS,
                PROCESS_FAKE_NEWS_COMPLETE,
                AGENT_STATUS,
                AGENT_STATUS,
                PROCESS_PLATFORM_COMPLETE,
                AGENT_STATUS,
                AGENT_STATUS,
                PROCESS_PLATFORM_COMPLETE,
                PROCESS_COMPLETED,
            ]
        );
    }

    #[tokio::test]
    async fn test_reprocessing_keeps_one_content_per_platform() {
        let (service, storage, _events, user, article) = setup(Arc::new(MockAgent::new())).await;
        let request = ProcessRequest {
            platforms: vec!["linkedin".into()],
            run_fake_news_check: Some(false),
            ..Default::default()
        };
        let first = service.process(&user, article.id, request.clone()).await.unwrap();
        let second = service.process(&user, article.id, request).await.unwrap();

        assert_eq!(first.contents[0].id, second.contents[0].id);
        assert!(second.article.fake_news_detection.is_none());
        assert_eq!(storage.list_content_for_article(article.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_defaults_and_brand_voice_resolution() {
        let (service, storage, _events, mut user, article) = setup(Arc::new(MockAgent::new())).await;
        user.preferences.default_platforms = vec![Platform::Newsletter];
        let now = Utc::now();
        let voice = BrandVoice {
            id: Uuid::new_v4(),
            owner_id: user.id,
            name: "Harbor desk".into(),
            description: None,
            tone: Tone::Friendly,
            style: Style::Conversational,
            target_audience: None,
            custom_prompt: None,
            keywords: vec!["ports".into()],
            avoid_words: vec![],
            is_default: true,
            created_at: now,
            updated_at: now,
        };
        storage.create_brand_voice(&voice).await.unwrap();

        let outcome = service.process(&user, article.id, ProcessRequest::default()).await.unwrap();
        assert_eq!(outcome.contents.len(), 1);
        assert_eq!(outcome.contents[0].platform, Platform::Newsletter);
        assert_eq!(outcome.contents[0].brand_voice_id, Some(voice.id));

        user.preferences.default_platforms.clear();
        let platforms = ProcessService::resolve_platforms(&user, &[]).unwrap();
        assert_eq!(platforms, Platform::default_set());
        assert!(ProcessService::resolve_platforms(&user, &["myspace".into()]).is_err());
    }

    #[tokio::test]
    async fn test_failure_marks_article_failed() {
        let (service, storage, events, user, article) = setup(Arc::new(BrokenReformatter)).await;
        let mut rx = events.subscribe(user.id);

        let result = service.process(&user, article.id, ProcessRequest::default()).await;
        assert!(matches!(result, Err(Error::Inference(_))));

        let stored = storage.get_article(article.id).await.unwrap().unwrap();
        assert_eq!(stored.status, ArticleStatus::Failed);
        assert!(stored.fake_news_detection.is_some());
        assert_eq!(drain(&mut rx).last().map(String::as_str), Some(PROCESS_ERROR));
    }

    #[tokio::test]
    async fn test_access_and_conflicts() {
        let (service, storage, _events, user, mut article) = setup(Arc::new(MockAgent::new())).await;
        let stranger = User::new("Sam".into(), "sam@example.com".into(), String::new());
        assert!(matches!(
            service.process(&stranger, article.id, ProcessRequest::default()).await,
            Err(Error::Forbidden(_))
        ));

        let mut admin = stranger.clone();
        admin.role = Role::Admin;
        assert!(service.status(&admin, article.id).await.is_ok());

        article.set_status(ArticleStatus::Processing);
        storage.update_article(&article).await.unwrap();
        assert!(matches!(
            service.process(&user, article.id, ProcessRequest::default()).await,
            Err(Error::Conflict(_))
        ));
        assert!(matches!(
            service.process(&user, Uuid::new_v4(), ProcessRequest::default()).await,
            Err(Error::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_update_content_rules() {
        let (service, _storage, _events, user, article) = setup(Arc::new(MockAgent::new())).await;
        let request = ProcessRequest {
            platforms: vec!["twitter".into()],
            ..Default::default()
        };
        let outcome = service.process(&user, article.id, request).await.unwrap();
        let content_id = outcome.contents[0].id;

        let approved = service
            .update_content(
                &user,
                content_id,
                ContentUpdate {
                    content: Some("Harbor gets two new berths.".into()),
                    status: Some(ContentStatus::Approved),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(approved.content, "Harbor gets two new berths.");
        assert_eq!(approved.status, ContentStatus::Approved);

        let too_long = ContentUpdate {
            content: Some("x".repeat(281)),
            ..Default::default()
        };
        assert!(matches!(
            service.update_content(&user, content_id, too_long).await,
            Err(Error::Validation(_))
        ));
        let publish = ContentUpdate {
            status: Some(ContentStatus::Published),
            ..Default::default()
        };
        assert!(matches!(
            service.update_content(&user, content_id, publish).await,
            Err(Error::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_dropped_caller_still_finishes_run() {
        let (service, storage, _events, user, article) = setup(Arc::new(SlowAgent)).await;
        let request = ProcessRequest {
            platforms: vec!["twitter".into()],
            ..Default::default()
        };

        let cancelled = tokio::time::timeout(
            std::time::Duration::from_millis(100),
            service.process(&user, article.id, request.clone()),
        )
        .await;
        assert!(cancelled.is_err());

        let mut status = ArticleStatus::Processing;
        for _ in 0..50 {
            status = storage.get_article(article.id).await.unwrap().unwrap().status;
            if status != ArticleStatus::Processing {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        }
        assert_eq!(status, ArticleStatus::Completed);
        assert_eq!(storage.list_content_for_article(article.id).await.unwrap().len(), 1);

        let retry = service.process(&user, article.id, request).await.unwrap();
        assert_eq!(retry.article.status, ArticleStatus::Completed);
    }

    #[tokio::test]
    async fn test_concurrent_runs_are_rejected() {
        let (service, storage, _events, user, article) = setup(Arc::new(SlowAgent)).await;
        let request = ProcessRequest {
            platforms: vec!["blog".into()],
            run_fake_news_check: Some(false),
            ..Default::default()
        };

        let (first, second) = tokio::join!(
            service.process(&user, article.id, request.clone()),
            service.process(&user, article.id, request.clone()),
        );
        let conflicts = [&first, &second]
            .iter()
            .filter(|r| matches!(r, Err(Error::Conflict(_))))
            .count();
        assert_eq!(conflicts, 1);
        assert!(first.is_ok() || second.is_ok());
        assert_eq!(
            storage.get_article(article.id).await.unwrap().unwrap().status,
            ArticleStatus::Completed
        );
    }
}
