use async_trait::async_trait;
use uuid::Uuid;

use crate::types::{Article, ArticleStatus, BrandVoice, ReformattedContent, User};
use crate::Result;

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert a new user. Fails with `Conflict` when the email is taken.
    async fn create_user(&self, user: &User) -> Result<()>;

    async fn get_user(&self, id: Uuid) -> Result<Option<User>>;

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>>;

    async fn update_user(&self, user: &User) -> Result<()>;

    async fn list_users(&self) -> Result<Vec<User>>;
}

#[async_trait]
pub trait ArticleStore: Send + Sync {
    async fn create_article(&self, article: &Article) -> Result<()>;

    async fn get_article(&self, id: Uuid) -> Result<Option<Article>>;

    /// Newest first. `owner` of `None` lists every article.
    async fn list_articles(&self, owner: Option<Uuid>, status: Option<ArticleStatus>) -> Result<Vec<Article>>;

    async fn update_article(&self, article: &Article) -> Result<()>;

    /// Stores `article`, already marked processing, unless the stored record
    /// is itself processing. Returns false when another run holds it.
    async fn begin_processing(&self, article: &Article) -> Result<bool>;

    /// Returns false when nothing was deleted.
    async fn delete_article(&self, id: Uuid) -> Result<bool>;
}

#[async_trait]
pub trait BrandVoiceStore: Send + Sync {
    async fn create_brand_voice(&self, voice: &BrandVoice) -> Result<()>;

    async fn get_brand_voice(&self, id: Uuid) -> Result<Option<BrandVoice>>;

    async fn list_brand_voices(&self, owner: Option<Uuid>) -> Result<Vec<BrandVoice>>;

    async fn update_brand_voice(&self, voice: &BrandVoice) -> Result<()>;

    async fn delete_brand_voice(&self, id: Uuid) -> Result<bool>;
}

#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Insert or replace the content for `(article_id, platform)`.
    ///
    /// When a record already exists for the pair its `id` and `created_at`
    /// are kept; the stored record is returned.
    async fn upsert_content(&self, content: &ReformattedContent) -> Result<ReformattedContent>;

    async fn get_content(&self, id: Uuid) -> Result<Option<ReformattedContent>>;

    async fn list_content_for_article(&self, article_id: Uuid) -> Result<Vec<ReformattedContent>>;

    async fn update_content(&self, content: &ReformattedContent) -> Result<()>;

    /// Returns the number of removed records.
    async fn delete_content_for_article(&self, article_id: Uuid) -> Result<usize>;
}

/// Everything the web layer needs from a backend.
pub trait Storage: UserStore + ArticleStore + BrandVoiceStore + ContentStore {
    fn backend_name(&self) -> &str;
}
