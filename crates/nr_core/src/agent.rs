use std::fmt;

use async_trait::async_trait;

use crate::types::{
    Article, BrandVoice, FactCheck, FakeNewsDetection, GenerateRequest, GeneratedArticle, Platform,
    Reformatted,
};
use crate::Result;

/// The content agent: everything the services ask of a language model.
#[async_trait]
pub trait ContentAgent: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;

    /// Classify the authenticity of an article.
    async fn detect_fake_news(&self, title: &str, content: &str) -> Result<FakeNewsDetection>;

    /// Rewrite an article for one platform, optionally in a brand voice.
    async fn reformat(
        &self,
        article: &Article,
        platform: Platform,
        voice: Option<&BrandVoice>,
    ) -> Result<Reformatted>;

    /// Check the claims of a reformatted text against its source article.
    async fn fact_check(&self, text: &str, source: &Article) -> Result<FactCheck>;

    /// Write a new article from a topic.
    async fn generate_article(
        &self,
        request: &GenerateRequest,
        voice: Option<&BrandVoice>,
    ) -> Result<GeneratedArticle>;
}
