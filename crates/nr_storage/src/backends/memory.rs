use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use nr_core::{
    Article, ArticleStatus, ArticleStore, BrandVoice, BrandVoiceStore, ContentStore, Error,
    ReformattedContent, Result, Storage, User, UserStore,
};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::merge_existing;

#[derive(Default)]
struct MemoryStore {
    users: HashMap<Uuid, User>,
    articles: HashMap<Uuid, Article>,
    brand_voices: HashMap<Uuid, BrandVoice>,
    contents: HashMap<Uuid, ReformattedContent>,
}

/// Process-local backend. Everything is lost on restart.
#[derive(Clone, Default)]
pub struct MemoryStorage {
    store: Arc<RwLock<MemoryStore>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for MemoryStorage {
    fn backend_name(&self) -> &str {
        "memory"
    }
}

#[async_trait]
impl UserStore for MemoryStorage {
    async fn create_user(&self, user: &User) -> Result<()> {
        let mut store = self.store.write().await;
        if store.users.values().any(|u| u.email == user.email) {
            return Err(Error::Conflict(format!("email {} is already registered", user.email)));
        }
        store.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn get_user(&self, id: Uuid) -> Result<Option<User>> {
        Ok(self.store.read().await.users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let email = email.trim().to_lowercase();
        Ok(self.store.read().await.users.values().find(|u| u.email == email).cloned())
    }

    async fn update_user(&self, user: &User) -> Result<()> {
        let mut store = self.store.write().await;
        match store.users.get_mut(&user.id) {
            Some(existing) => {
                *existing = user.clone();
                Ok(())
            }
            None => Err(Error::not_found("User")),
        }
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        let mut users: Vec<User> = self.store.read().await.users.values().cloned().collect();
        users.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(users)
    }
}

#[async_trait]
impl ArticleStore for MemoryStorage {
    async fn create_article(&self, article: &Article) -> Result<()> {
        self.store.write().await.articles.insert(article.id, article.clone());
        Ok(())
    }

    async fn get_article(&self, id: Uuid) -> Result<Option<Article>> {
        Ok(self.store.read().await.articles.get(&id).cloned())
    }

    async fn list_articles(&self, owner: Option<Uuid>, status: Option<ArticleStatus>) -> Result<Vec<Article>> {
        let store = self.store.read().await;
        let mut articles: Vec<Article> = store
            .articles
            .values()
            .filter(|a| owner.map_or(true, |o| a.owner_id == o))
            .filter(|a| status.map_or(true, |s| a.status == s))
            .cloned()
            .collect();
        articles.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(articles)
    }

    async fn update_article(&self, article: &Article) -> Result<()> {
        let mut store = self.store.write().await;
        match store.articles.get_mut(&article.id) {
            Some(existing) => {
                *existing = article.clone();
                Ok(())
            }
            None => Err(Error::not_found("Article")),
        }
    }

    async fn begin_processing(&self, article: &Article) -> Result<bool> {
        let mut store = self.store.write().await;
        match store.articles.get_mut(&article.id) {
            Some(existing) if existing.status == ArticleStatus::Processing => Ok(false),
            Some(existing) => {
                *existing = article.clone();
                Ok(true)
            }
            None => Err(Error::not_found("Article")),
        }
    }

    async fn delete_article(&self, id: Uuid) -> Result<bool> {
        Ok(self.store.write().await.articles.remove(&id).is_some())
    }
}

#[async_trait]
impl BrandVoiceStore for MemoryStorage {
    async fn create_brand_voice(&self, voice: &BrandVoice) -> Result<()> {
        self.store.write().await.brand_voices.insert(voice.id, voice.clone());
        Ok(())
    }

    async fn get_brand_voice(&self, id: Uuid) -> Result<Option<BrandVoice>> {
        Ok(self.store.read().await.brand_voices.get(&id).cloned())
    }

    async fn list_brand_voices(&self, owner: Option<Uuid>) -> Result<Vec<BrandVoice>> {
        let store = self.store.read().await;
        let mut voices: Vec<BrandVoice> = store
            .brand_voices
            .values()
            .filter(|v| owner.map_or(true, |o| v.owner_id == o))
            .cloned()
            .collect();
        voices.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(voices)
    }

    async fn update_brand_voice(&self, voice: &BrandVoice) -> Result<()> {
        let mut store = self.store.write().await;
        match store.brand_voices.get_mut(&voice.id) {
            Some(existing) => {
                *existing = voice.clone();
                Ok(())
            }
            None => Err(Error::not_found("Brand voice")),
        }
    }

    async fn delete_brand_voice(&self, id: Uuid) -> Result<bool> {
        Ok(self.store.write().await.brand_voices.remove(&id).is_some())
    }
}

#[async_trait]
impl ContentStore for MemoryStorage {
    async fn upsert_content(&self, content: &ReformattedContent) -> Result<ReformattedContent> {
        let mut store = self.store.write().await;
        let existing = store
            .contents
            .values()
            .find(|c| c.article_id == content.article_id && c.platform == content.platform)
            .cloned();
        let stored = match existing {
            Some(existing) => merge_existing(&existing, content),
            None => content.clone(),
        };
        store.contents.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn get_content(&self, id: Uuid) -> Result<Option<ReformattedContent>> {
        Ok(self.store.read().await.contents.get(&id).cloned())
    }

    async fn list_content_for_article(&self, article_id: Uuid) -> Result<Vec<ReformattedContent>> {
        let store = self.store.read().await;
        let mut contents: Vec<ReformattedContent> = store
            .contents
            .values()
            .filter(|c| c.article_id == article_id)
            .cloned()
            .collect();
        contents.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(contents)
    }

    async fn update_content(&self, content: &ReformattedContent) -> Result<()> {
        let mut store = self.store.write().await;
        match store.contents.get_mut(&content.id) {
            Some(existing) => {
                *existing = content.clone();
                Ok(())
            }
            None => Err(Error::not_found("Content")),
        }
    }

    async fn delete_content_for_article(&self, article_id: Uuid) -> Result<usize> {
        let mut store = self.store.write().await;
        let before = store.contents.len();
        store.contents.retain(|_, c| c.article_id != article_id);
        Ok(before - store.contents.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_storage() {
        let storage = MemoryStorage::new();
        crate::test_support::exercise_storage(&storage).await;
    }
}
