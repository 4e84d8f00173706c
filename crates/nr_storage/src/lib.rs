use std::sync::Arc;

use nr_core::{Error, ReformattedContent, Result, Storage};
use tracing::info;

pub mod backends;

pub use backends::*;

/// Applies an incoming content to the record already stored for the same
/// (article, platform) pair: the stored identity is kept, the rest replaced.
pub fn merge_existing(existing: &ReformattedContent, incoming: &ReformattedContent) -> ReformattedContent {
    ReformattedContent {
        id: existing.id,
        created_at: existing.created_at,
        ..incoming.clone()
    }
}

/// Builds the backend named by `kind` (`memory` or `sqlite`).
pub async fn create_storage(kind: &str, url: Option<&str>) -> Result<Arc<dyn Storage>> {
    match kind {
        "memory" => {
            info!("💾 Using in-memory storage");
            Ok(Arc::new(MemoryStorage::new()))
        }
        #[cfg(feature = "sqlite")]
        "sqlite" => {
            let url = url.unwrap_or("sqlite://newsroom.db");
            info!("💾 Using SQLite storage at {}", url);
            Ok(Arc::new(SQLiteStorage::connect(url).await?))
        }
        other => {
            let _ = url;
            Err(Error::Storage(format!("unsupported storage backend: {}", other)))
        }
    }
}

pub mod prelude {
    pub use super::backends::*;
    pub use super::create_storage;
}

#[cfg(test)]
pub(crate) mod test_support {
    use chrono::{Duration, Utc};
    use nr_core::{
        Article, ArticleStatus, BrandVoice, ContentStatus, Platform, Reformatted, ReformattedContent,
        SourceType, Storage, Style, Tone, User,
    };
    use uuid::Uuid;

    /// Behaviour every backend must share.
    pub async fn exercise_storage(storage: &dyn Storage) {
        // users
        let user = User::new("Ana".to_string(), "ana@example.com".to_string(), "hash".to_string());
        storage.create_user(&user).await.unwrap();
        let duplicate = User::new("Other".to_string(), "ANA@example.com".to_string(), "hash".to_string());
        assert!(matches!(
            storage.create_user(&duplicate).await,
            Err(nr_core::Error::Conflict(_))
        ));
        let mut loaded = storage.find_user_by_email("ana@example.com").await.unwrap().unwrap();
        assert_eq!(loaded.id, user.id);
        loaded.connect_account(Platform::Twitter, "ana".to_string());
        storage.update_user(&loaded).await.unwrap();
        let reloaded = storage.get_user(user.id).await.unwrap().unwrap();
        assert!(reloaded.social_account(Platform::Twitter).unwrap().connected);
        assert_eq!(storage.list_users().await.unwrap().len(), 1);

        // articles
        let mut older = Article::new(user.id, "Older".to_string(), "One".to_string(), SourceType::Manual);
        older.created_at = Utc::now() - Duration::minutes(5);
        let newer = Article::new(user.id, "Newer".to_string(), "Two".to_string(), SourceType::Upload);
        let foreign = Article::new(Uuid::new_v4(), "Foreign".to_string(), "Three".to_string(), SourceType::Url);
        for article in [&older, &newer, &foreign] {
            storage.create_article(article).await.unwrap();
        }
        let own = storage.list_articles(Some(user.id), None).await.unwrap();
        assert_eq!(own.iter().map(|a| a.title.as_str()).collect::<Vec<_>>(), vec!["Newer", "Older"]);
        assert_eq!(storage.list_articles(None, None).await.unwrap().len(), 3);

        // only one run may hold an article
        let mut claim = older.clone();
        claim.set_status(ArticleStatus::Processing);
        assert!(storage.begin_processing(&claim).await.unwrap());
        assert!(!storage.begin_processing(&claim).await.unwrap());
        assert_eq!(
            storage.get_article(older.id).await.unwrap().unwrap().status,
            ArticleStatus::Processing
        );
        let unknown = Article::new(user.id, "Unknown".to_string(), "x".to_string(), SourceType::Manual);
        assert!(matches!(
            storage.begin_processing(&unknown).await,
            Err(nr_core::Error::NotFound(_))
        ));

        older.set_status(ArticleStatus::Completed);
        storage.update_article(&older).await.unwrap();
        let completed = storage.list_articles(None, Some(ArticleStatus::Completed)).await.unwrap();
        assert_eq!(completed.len(), 1);
        assert_eq!(completed[0].id, older.id);

        // brand voices
        let now = Utc::now();
        let mut voice = BrandVoice {
            id: Uuid::new_v4(),
            owner_id: user.id,
            name: "Desk".to_string(),
            description: None,
            tone: Tone::Professional,
            style: Style::Formal,
            target_audience: None,
            custom_prompt: None,
            keywords: vec!["news".to_string()],
            avoid_words: vec![],
            is_default: true,
            created_at: now,
            updated_at: now,
        };
        storage.create_brand_voice(&voice).await.unwrap();
        voice.name = "Desk v2".to_string();
        storage.update_brand_voice(&voice).await.unwrap();
        let voices = storage.list_brand_voices(Some(user.id)).await.unwrap();
        assert_eq!(voices.len(), 1);
        assert_eq!(voices[0].name, "Desk v2");
        assert!(storage.list_brand_voices(Some(Uuid::new_v4())).await.unwrap().is_empty());

        // contents: one record per (article, platform)
        let first = ReformattedContent::new(
            &newer,
            Platform::Twitter,
            Reformatted { content: "first".to_string(), hashtags: vec![], seo: None },
        );
        let stored = storage.upsert_content(&first).await.unwrap();
        assert_eq!(stored.id, first.id);

        let second = ReformattedContent::new(
            &newer,
            Platform::Twitter,
            Reformatted { content: "second".to_string(), hashtags: vec![], seo: None },
        );
        let replaced = storage.upsert_content(&second).await.unwrap();
        assert_eq!(replaced.id, first.id);
        assert_eq!(replaced.content, "second");

        let blog = ReformattedContent::new(
            &newer,
            Platform::Blog,
            Reformatted { content: "blog".to_string(), hashtags: vec![], seo: None },
        );
        storage.upsert_content(&blog).await.unwrap();

        let contents = storage.list_content_for_article(newer.id).await.unwrap();
        assert_eq!(contents.len(), 2);

        let mut approved = storage.get_content(first.id).await.unwrap().unwrap();
        assert_eq!(approved.content, "second");
        approved.status = ContentStatus::Approved;
        storage.update_content(&approved).await.unwrap();
        assert_eq!(
            storage.get_content(first.id).await.unwrap().unwrap().status,
            ContentStatus::Approved
        );

        // deletes
        assert_eq!(storage.delete_content_for_article(newer.id).await.unwrap(), 2);
        assert!(storage.delete_article(newer.id).await.unwrap());
        assert!(!storage.delete_article(newer.id).await.unwrap());
        assert!(storage.get_article(newer.id).await.unwrap().is_none());
        assert!(storage.delete_brand_voice(voice.id).await.unwrap());

        let missing = Article::new(user.id, "Missing".to_string(), "x".to_string(), SourceType::Manual);
        assert!(matches!(
            storage.update_article(&missing).await,
            Err(nr_core::Error::NotFound(_))
        ));
    }
}
